//! Single/double/long-press disambiguation over a serial raw-event stream.
//!
//! Hybrid devices may report one physical tap as both a touch sequence and a
//! synthetic click, sometimes twice. The classifier collapses that stream
//! into at most one semantic gesture per episode: it debounces duplicate
//! deliveries, counts taps against the double-click window, arms a long-press
//! deadline while a touch is held, and briefly suppresses the synthetic click
//! that trails a double-tap.
//!
//! Everything is driven by the caller's clock: handlers take stamped events,
//! and due deadlines fire from [`GestureClassifier::poll`], so a timer firing
//! is just another step of the same serial queue.

use anyhow::Result;

use crate::config::Thresholds;
use crate::events::{PointerEvent, PointerEventKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gesture {
    SingleClick,
    DoubleClick,
    LongPress,
}

impl Gesture {
    /// Profile binding key for this gesture.
    pub fn binding_key(&self) -> &'static str {
        match self {
            Self::SingleClick => "single_click",
            Self::DoubleClick => "double_click",
            Self::LongPress => "long_press",
        }
    }
}

/// Injected gesture callbacks. All three are optional; the default body is a
/// no-op. A handler that never wants long presses can return `false` from
/// [`GestureHandler::handles_long_press`] and the hold deadline is never
/// armed. Errors returned here propagate to the caller after the session has
/// already been settled, so a failing callback cannot corrupt the machine.
pub trait GestureHandler {
    fn on_single_click(&mut self, event: &PointerEvent) -> Result<()> {
        let _ = event;
        Ok(())
    }

    fn on_double_click(&mut self, event: &PointerEvent) -> Result<()> {
        let _ = event;
        Ok(())
    }

    fn on_long_press(&mut self, event: &PointerEvent) -> Result<()> {
        let _ = event;
        Ok(())
    }

    fn handles_long_press(&self) -> bool {
        true
    }
}

/// What the session is currently waiting on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    /// A touch is down; the hold deadline may be armed.
    LongPressArmed,
    /// One tap seen; the confirmation deadline decides single vs double.
    AwaitingSecondClick,
    /// A double-tap just resolved; trailing synthetic clicks are dropped.
    SuppressingClick,
}

#[derive(Debug, Clone)]
struct PendingFire {
    deadline_ms: u64,
    event: PointerEvent,
}

#[derive(Debug)]
pub struct GestureClassifier<H: GestureHandler> {
    th: Thresholds,
    handler: H,
    phase: Phase,
    click_count: u8,
    long_press_fired: bool,
    touch_started_ms: Option<u64>,
    last_accepted_ms: Option<u64>,
    suppress_until_ms: u64,
    // at most one live deadline of each kind
    single_click: Option<PendingFire>,
    long_press: Option<PendingFire>,
    suppress_expiry: Option<u64>,
}

impl<H: GestureHandler> GestureClassifier<H> {
    pub fn new(th: Thresholds, handler: H) -> Self {
        Self {
            th,
            handler,
            phase: Phase::Idle,
            click_count: 0,
            long_press_fired: false,
            touch_started_ms: None,
            last_accepted_ms: None,
            suppress_until_ms: 0,
            single_click: None,
            long_press: None,
            suppress_expiry: None,
        }
    }

    /// Live tap count of the current episode (0, 1, or 2 before it resolves).
    pub fn click_count(&self) -> u8 {
        self.click_count
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn handler_mut(&mut self) -> &mut H {
        &mut self.handler
    }

    pub fn into_handler(self) -> H {
        self.handler
    }

    /// Earliest armed deadline, if any. Lets the host loop sleep precisely.
    pub fn next_deadline(&self) -> Option<u64> {
        let mut next: Option<u64> = None;
        for d in [
            self.suppress_expiry,
            self.long_press.as_ref().map(|p| p.deadline_ms),
            self.single_click.as_ref().map(|p| p.deadline_ms),
        ]
        .into_iter()
        .flatten()
        {
            next = Some(next.map_or(d, |n: u64| n.min(d)));
        }
        next
    }

    /// Fire every deadline due at or before `now_ms`, in deadline order.
    pub fn poll(&mut self, now_ms: u64) -> Result<()> {
        loop {
            let due = match self.next_deadline() {
                Some(d) if d <= now_ms => d,
                _ => return Ok(()),
            };
            // expiry before the others on a tie: it only clears state
            if self.suppress_expiry == Some(due) {
                self.fire_suppress_expiry();
            } else if self.long_press.as_ref().map(|p| p.deadline_ms) == Some(due) {
                self.fire_long_press()?;
            } else {
                self.fire_single_click()?;
            }
        }
    }

    /// Process one raw event. Deadlines due before the event's timestamp fire
    /// first, preserving serial-queue ordering.
    pub fn handle(&mut self, event: &PointerEvent) -> Result<()> {
        self.poll(event.timestamp_ms)?;
        match event.kind {
            PointerEventKind::TouchStart => {
                self.handle_touch_start(event);
                Ok(())
            }
            PointerEventKind::TouchMove => {
                self.handle_touch_move(event);
                Ok(())
            }
            PointerEventKind::TouchEnd => self.handle_touch_end(event),
            PointerEventKind::TouchCancel => {
                self.handle_touch_cancel(event);
                Ok(())
            }
            PointerEventKind::Click => self.handle_click(event),
        }
    }

    /// Abort any in-flight episode: cancel all deadlines, clear all counters.
    /// No callback fires.
    pub fn reset(&mut self) {
        self.reset_session();
        self.last_accepted_ms = None;
    }

    fn handle_touch_start(&mut self, event: &PointerEvent) {
        self.long_press_fired = false;
        self.touch_started_ms = Some(event.timestamp_ms);
        if self.handler.handles_long_press() {
            self.long_press = Some(PendingFire {
                deadline_ms: event.timestamp_ms + self.th.long_press_ms,
                event: event.clone(),
            });
        }
        self.phase = Phase::LongPressArmed;
    }

    fn handle_touch_move(&mut self, _event: &PointerEvent) {
        // movement invalidates the hold; taps in flight are unaffected
        self.long_press = None;
    }

    fn handle_touch_end(&mut self, event: &PointerEvent) -> Result<()> {
        if self.is_duplicate(event.timestamp_ms) {
            return Ok(());
        }
        self.last_accepted_ms = Some(event.timestamp_ms);

        self.long_press = None;
        let held_ms = self
            .touch_started_ms
            .map(|t0| event.timestamp_ms.saturating_sub(t0));
        if self.long_press_fired || held_ms.is_some_and(|h| h >= self.th.long_press_ms) {
            // the hold deadline already resolved (or was about to) this touch
            self.reset_session();
            return Ok(());
        }

        self.touch_started_ms = None;
        self.click_count += 1;
        if self.click_count == 1 {
            self.arm_single_click(event);
            Ok(())
        } else {
            self.resolve_double_click(event, true)
        }
    }

    fn handle_touch_cancel(&mut self, _event: &PointerEvent) {
        self.reset_session();
    }

    fn handle_click(&mut self, event: &PointerEvent) -> Result<()> {
        if self.is_duplicate(event.timestamp_ms) {
            return Ok(());
        }
        self.last_accepted_ms = Some(event.timestamp_ms);

        // the synthetic click trailing a double-tap
        if event.timestamp_ms < self.suppress_until_ms {
            return Ok(());
        }

        self.click_count += 1;
        if self.click_count == 1 {
            self.arm_single_click(event);
            Ok(())
        } else {
            self.resolve_double_click(event, false)
        }
    }

    fn is_duplicate(&self, timestamp_ms: u64) -> bool {
        self.last_accepted_ms
            .is_some_and(|last| timestamp_ms.saturating_sub(last) < self.th.debounce_ms)
    }

    fn arm_single_click(&mut self, event: &PointerEvent) {
        self.single_click = Some(PendingFire {
            deadline_ms: event.timestamp_ms + self.th.double_click_ms,
            event: event.clone(),
        });
        self.phase = Phase::AwaitingSecondClick;
    }

    fn resolve_double_click(&mut self, event: &PointerEvent, touch_path: bool) -> Result<()> {
        self.single_click = None;
        self.long_press = None;
        if touch_path {
            // touchscreens fire a synthetic click after the second tap;
            // open the suppression window and keep it across the reset
            self.suppress_until_ms = event.timestamp_ms + self.th.suppress_ms;
            self.suppress_expiry = Some(self.suppress_until_ms);
            self.reset_into_suppression();
        } else {
            self.reset_session();
        }
        self.handler.on_double_click(event)
    }

    fn fire_single_click(&mut self) -> Result<()> {
        let Some(pending) = self.single_click.take() else {
            return Ok(());
        };
        let confirmed = self.click_count == 1;
        self.reset_session();
        if confirmed {
            self.handler.on_single_click(&pending.event)
        } else {
            Ok(())
        }
    }

    fn fire_long_press(&mut self) -> Result<()> {
        let Some(pending) = self.long_press.take() else {
            return Ok(());
        };
        // the episode is over: no click may follow this touch
        self.long_press_fired = true;
        self.single_click = None;
        self.click_count = 0;
        self.handler.on_long_press(&pending.event)
    }

    fn fire_suppress_expiry(&mut self) {
        self.suppress_expiry = None;
        self.suppress_until_ms = 0;
        if self.phase == Phase::SuppressingClick {
            self.phase = Phase::Idle;
        }
    }

    /// Episode reset: counters and deadlines cleared. The last-accepted stamp
    /// survives so duplicate delivery of the very next report still debounces.
    fn reset_session(&mut self) {
        self.click_count = 0;
        self.long_press_fired = false;
        self.touch_started_ms = None;
        self.single_click = None;
        self.long_press = None;
        self.suppress_expiry = None;
        self.suppress_until_ms = 0;
        self.phase = Phase::Idle;
    }

    /// The double-tap reset: identical to [`Self::reset_session`] except the
    /// suppression window and its expiry deadline stay armed.
    fn reset_into_suppression(&mut self) {
        self.click_count = 0;
        self.long_press_fired = false;
        self.touch_started_ms = None;
        self.single_click = None;
        self.long_press = None;
        self.phase = Phase::SuppressingClick;
    }
}
