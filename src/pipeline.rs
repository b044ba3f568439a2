//! Foreground watch loop: raw devices in, gesture actions out.

use anyhow::{Result, anyhow};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::{thread, time::Duration};

use evdev::{AbsoluteAxisCode, Device, EventType, KeyCode, SynchronizationCode};

use crate::actions::ActionSink;
use crate::classifier::{Gesture, GestureClassifier, GestureHandler};
use crate::config::ConfigState;
use crate::events::{PointerEvent, PointerEventKind};
use crate::input::{self, DeviceKind};
use crate::logging::Scope;
use crate::tracker::ContactTracker;

/// Routes classifier callbacks into the action sink. Long-press deadlines
/// are only armed when the profile actually binds the gesture.
struct Dispatch {
    sink: ActionSink,
}

impl GestureHandler for Dispatch {
    fn on_single_click(&mut self, event: &PointerEvent) -> Result<()> {
        self.sink.dispatch(Gesture::SingleClick, event)
    }

    fn on_double_click(&mut self, event: &PointerEvent) -> Result<()> {
        self.sink.dispatch(Gesture::DoubleClick, event)
    }

    fn on_long_press(&mut self, event: &PointerEvent) -> Result<()> {
        self.sink.dispatch(Gesture::LongPress, event)
    }

    fn handles_long_press(&self) -> bool {
        self.sink.is_bound(Gesture::LongPress)
    }
}

pub fn run_watch(cfg: &ConfigState, device_override: Option<&str>) -> Result<()> {
    let scope = Scope::root().with("profile", &cfg.active_name);

    let term = Arc::new(AtomicBool::new(false));
    signal_hook::flag::register(signal_hook::consts::SIGINT, Arc::clone(&term))?;
    signal_hook::flag::register(signal_hook::consts::SIGTERM, Arc::clone(&term))?;

    let mut devs = open_devices(device_override, &scope)?;
    if devs.is_empty() {
        return Err(anyhow!("no usable input devices found"));
    }

    let mut tracker = ContactTracker::new(cfg.profile.thresholds.move_tol);
    let sink = ActionSink::new(&cfg.profile, scope.clone());
    let mut classifier =
        GestureClassifier::new(cfg.profile.thresholds.clone(), Dispatch { sink });

    scope.info(format!("watching {} device(s)", devs.len()));

    let mut queue: Vec<PointerEvent> = Vec::new();
    while !term.load(Ordering::Relaxed) {
        let mut any_event = false;

        for (dev, kind) in devs.iter_mut() {
            if let Ok(events) = dev.fetch_events() {
                for ev in events {
                    any_event = true;
                    match kind {
                        DeviceKind::Multitouch => {
                            if ev.event_type() == EventType::ABSOLUTE {
                                match ev.code() {
                                    c if c == AbsoluteAxisCode::ABS_MT_SLOT.0 => {
                                        tracker.on_slot(ev.value());
                                    }
                                    c if c == AbsoluteAxisCode::ABS_MT_TRACKING_ID.0 => {
                                        tracker.on_tracking_id(ev.value());
                                    }
                                    c if c == AbsoluteAxisCode::ABS_MT_POSITION_X.0 => {
                                        tracker.on_pos_x(ev.value());
                                    }
                                    c if c == AbsoluteAxisCode::ABS_MT_POSITION_Y.0 => {
                                        tracker.on_pos_y(ev.value());
                                    }
                                    _ => {}
                                }
                            } else if ev.event_type() == EventType::SYNCHRONIZATION
                                && ev.code() == SynchronizationCode::SYN_REPORT.0
                            {
                                queue.append(&mut tracker.on_syn_report());
                            }
                        }
                        DeviceKind::Pointer => {
                            // button release is the click; press carries no
                            // hold semantics on this path
                            if ev.event_type() == EventType::KEY
                                && ev.code() == KeyCode::BTN_LEFT.0
                                && ev.value() == 0
                            {
                                queue.push(PointerEvent::new(
                                    PointerEventKind::Click,
                                    tracker.now_ms(),
                                ));
                            }
                        }
                    }
                }
            }
        }

        for event in queue.drain(..) {
            scope.debug(format!("{:?} at t={}ms", event.kind, event.timestamp_ms));
            if let Err(e) = classifier.handle(&event) {
                scope.error(format!("gesture action failed: {e}"));
            }
        }
        if let Err(e) = classifier.poll(tracker.now_ms()) {
            scope.error(format!("gesture action failed: {e}"));
        }

        if !any_event {
            let now = tracker.now_ms();
            let wait = classifier
                .next_deadline()
                .map_or(4, |d| d.saturating_sub(now).min(4))
                .max(1);
            thread::sleep(Duration::from_millis(wait));
        }
    }

    classifier.reset();
    scope.info("shutting down");
    Ok(())
}

fn open_devices(
    device_override: Option<&str>,
    scope: &Scope,
) -> Result<Vec<(Device, DeviceKind)>> {
    let mut devs = Vec::new();

    if let Some(path) = device_override {
        let dev = Device::open(path)
            .map_err(|e| anyhow!("failed to open {path}: {e}"))?;
        let kind = input::classify(&dev)
            .ok_or_else(|| anyhow!("{path} is neither multitouch nor pointer-capable"))?;
        devs.push((dev, kind));
    } else {
        for info in input::discover() {
            match Device::open(&info.path) {
                Ok(dev) => devs.push((dev, info.kind)),
                Err(e) => scope.warn(format!("failed to open {}: {e}", info.path)),
            }
        }
    }

    for (dev, _) in devs.iter_mut() {
        dev.set_nonblocking(true)?;
    }
    Ok(devs)
}
