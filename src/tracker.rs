//! Single-contact touch tracking over raw evdev multitouch reports.
//!
//! The classifier only cares about one contact: the first finger down opens
//! the episode, and any additional finger aborts it. The tracker follows
//! that primary contact across slots, normalizes its coordinates, and turns
//! the low-level report stream into the classifier's event vocabulary.

use std::time::Instant;

use crate::events::{PointerEvent, PointerEventKind};

#[derive(Debug, Clone)]
struct PrimaryContact {
    slot: i32,
    tracking_id: i32,
    last_x_norm: f32,
    last_y_norm: f32,
    seen_x: bool,
    seen_y: bool,
    moved_norm: f32,
    move_reported: bool,
    canceled: bool,
}

impl PrimaryContact {
    fn new(slot: i32, tracking_id: i32) -> Self {
        Self {
            slot,
            tracking_id,
            last_x_norm: 0.0,
            last_y_norm: 0.0,
            seen_x: false,
            seen_y: false,
            moved_norm: 0.0,
            move_reported: false,
            canceled: false,
        }
    }
}

#[derive(Debug)]
pub struct ContactTracker {
    move_tol: f32,
    // normalization
    x_min: i32,
    x_max: i32,
    y_min: i32,
    y_max: i32,
    // time
    start_instant: Instant,
    cur_slot: i32,
    primary: Option<PrimaryContact>,
    extra_contacts: u32,
    pending: Vec<PointerEvent>,
}

impl ContactTracker {
    pub fn new(move_tol: f32) -> Self {
        Self {
            move_tol,
            x_min: 0,
            x_max: 4096,
            y_min: 0,
            y_max: 4096,
            start_instant: Instant::now(),
            cur_slot: 0,
            primary: None,
            extra_contacts: 0,
            pending: Vec::new(),
        }
    }

    pub fn set_norm_ranges(&mut self, x_min: i32, x_max: i32, y_min: i32, y_max: i32) {
        self.x_min = x_min;
        self.x_max = x_max.max(x_min + 1);
        self.y_min = y_min;
        self.y_max = y_max.max(y_min + 1);
    }

    /// Milliseconds since this tracker was created. Also the clock used to
    /// stamp click events from pointer devices, so both modalities share one
    /// timeline.
    pub fn now_ms(&self) -> u64 {
        self.start_instant.elapsed().as_millis() as u64
    }

    pub fn on_slot(&mut self, slot: i32) {
        self.cur_slot = slot;
    }

    pub fn on_tracking_id(&mut self, tracking_id: i32) {
        if tracking_id >= 0 {
            self.on_contact_down(tracking_id);
        } else {
            self.on_contact_up();
        }
    }

    fn on_contact_down(&mut self, tracking_id: i32) {
        if self.primary.is_none() && self.extra_contacts == 0 {
            self.primary = Some(PrimaryContact::new(self.cur_slot, tracking_id));
            self.push(PointerEventKind::TouchStart);
            return;
        }
        // a second finger: abort the episode once, then just count fingers
        self.extra_contacts += 1;
        if let Some(p) = self.primary.as_mut() {
            if !p.canceled {
                p.canceled = true;
                self.push(PointerEventKind::TouchCancel);
            }
        }
    }

    fn on_contact_up(&mut self) {
        if let Some(p) = &self.primary {
            if p.slot == self.cur_slot {
                let canceled = p.canceled;
                self.primary = None;
                if !canceled {
                    self.push(PointerEventKind::TouchEnd);
                }
                return;
            }
        }
        self.extra_contacts = self.extra_contacts.saturating_sub(1);
    }

    pub fn on_pos_x(&mut self, raw: i32) {
        let nx = ((raw - self.x_min) as f32 / (self.x_max - self.x_min) as f32).clamp(0.0, 1.0);
        let tol = self.move_tol;
        let mut moved = false;
        if let Some(p) = self.primary.as_mut() {
            if p.slot != self.cur_slot {
                return;
            }
            if p.seen_x && p.seen_y {
                p.moved_norm += (nx - p.last_x_norm).abs();
            } else {
                p.seen_x = true;
            }
            p.last_x_norm = nx;
            moved = Self::crossed_move_tol(p, tol);
        }
        if moved {
            self.push(PointerEventKind::TouchMove);
        }
    }

    pub fn on_pos_y(&mut self, raw: i32) {
        let ny = ((raw - self.y_min) as f32 / (self.y_max - self.y_min) as f32).clamp(0.0, 1.0);
        let tol = self.move_tol;
        let mut moved = false;
        if let Some(p) = self.primary.as_mut() {
            if p.slot != self.cur_slot {
                return;
            }
            if p.seen_x && p.seen_y {
                p.moved_norm += (ny - p.last_y_norm).abs();
            } else {
                p.seen_y = true;
            }
            p.last_y_norm = ny;
            moved = Self::crossed_move_tol(p, tol);
        }
        if moved {
            self.push(PointerEventKind::TouchMove);
        }
    }

    fn crossed_move_tol(p: &mut PrimaryContact, tol: f32) -> bool {
        if p.canceled || p.move_reported || p.moved_norm <= tol {
            return false;
        }
        p.move_reported = true;
        true
    }

    /// Drain the events accumulated since the last SYN_REPORT.
    pub fn on_syn_report(&mut self) -> Vec<PointerEvent> {
        std::mem::take(&mut self.pending)
    }

    fn push(&mut self, kind: PointerEventKind) {
        self.pending.push(PointerEvent::new(kind, self.now_ms()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::PointerEventKind::*;

    fn kinds(events: &[PointerEvent]) -> Vec<PointerEventKind> {
        events.iter().map(|e| e.kind).collect()
    }

    #[test]
    fn tap_becomes_start_then_end() {
        let mut t = ContactTracker::new(0.015);
        t.on_slot(0);
        t.on_tracking_id(7);
        t.on_pos_x(1000);
        t.on_pos_y(1000);
        let frame = t.on_syn_report();
        assert_eq!(kinds(&frame), vec![TouchStart]);

        t.on_tracking_id(-1);
        let frame = t.on_syn_report();
        assert_eq!(kinds(&frame), vec![TouchEnd]);
    }

    #[test]
    fn first_coordinates_establish_a_baseline_without_movement() {
        let mut t = ContactTracker::new(0.015);
        t.on_tracking_id(1);
        t.on_pos_x(4000);
        t.on_pos_y(4000);
        let frame = t.on_syn_report();
        assert_eq!(kinds(&frame), vec![TouchStart]);
    }

    #[test]
    fn movement_beyond_tolerance_reports_once() {
        let mut t = ContactTracker::new(0.015);
        t.on_tracking_id(1);
        t.on_pos_x(1000);
        t.on_pos_y(1000);
        t.on_syn_report();

        // ~0.05 normalized in x, well past 0.015
        t.on_pos_x(1200);
        t.on_pos_y(1000);
        let frame = t.on_syn_report();
        assert_eq!(kinds(&frame), vec![TouchMove]);

        t.on_pos_x(1400);
        let frame = t.on_syn_report();
        assert!(frame.is_empty());
    }

    #[test]
    fn jitter_below_tolerance_is_not_movement() {
        let mut t = ContactTracker::new(0.015);
        t.on_tracking_id(1);
        t.on_pos_x(1000);
        t.on_pos_y(1000);
        t.on_syn_report();

        t.on_pos_x(1010);
        t.on_pos_y(990);
        let frame = t.on_syn_report();
        assert!(frame.is_empty());
    }

    #[test]
    fn second_finger_cancels_the_episode() {
        let mut t = ContactTracker::new(0.015);
        t.on_slot(0);
        t.on_tracking_id(1);
        t.on_syn_report();

        t.on_slot(1);
        t.on_tracking_id(2);
        let frame = t.on_syn_report();
        assert_eq!(kinds(&frame), vec![TouchCancel]);

        // releases after the cancel stay silent
        t.on_slot(0);
        t.on_tracking_id(-1);
        t.on_slot(1);
        t.on_tracking_id(-1);
        assert!(t.on_syn_report().is_empty());

        // and the next lone finger opens a fresh episode
        t.on_slot(0);
        t.on_tracking_id(3);
        let frame = t.on_syn_report();
        assert_eq!(kinds(&frame), vec![TouchStart]);
    }
}
