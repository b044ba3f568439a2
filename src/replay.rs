//! Offline replay of recorded event traces.
//!
//! A trace is a JSON array of raw events, e.g.
//! `[{"kind":"touch_start","timestamp_ms":0},{"kind":"touch_end","timestamp_ms":50}]`.
//! Replay runs on the trace's own virtual clock, so a recorded session
//! classifies identically no matter how fast it is fed back.

use anyhow::{Context, Result};
use std::fs;

use crate::classifier::{Gesture, GestureClassifier, GestureHandler};
use crate::config::Thresholds;
use crate::events::PointerEvent;
use crate::logging::Scope;

#[derive(Default)]
struct TraceRecorder {
    fired: Vec<(Gesture, u64)>,
}

impl GestureHandler for TraceRecorder {
    fn on_single_click(&mut self, event: &PointerEvent) -> Result<()> {
        self.fired.push((Gesture::SingleClick, event.timestamp_ms));
        Ok(())
    }

    fn on_double_click(&mut self, event: &PointerEvent) -> Result<()> {
        self.fired.push((Gesture::DoubleClick, event.timestamp_ms));
        Ok(())
    }

    fn on_long_press(&mut self, event: &PointerEvent) -> Result<()> {
        self.fired.push((Gesture::LongPress, event.timestamp_ms));
        Ok(())
    }
}

pub fn run_replay(path: &str, th: Thresholds) -> Result<()> {
    let scope = Scope::root().with("trace", path);
    let txt = fs::read_to_string(path).with_context(|| format!("failed to read {path}"))?;
    let events: Vec<PointerEvent> =
        serde_json::from_str(&txt).with_context(|| format!("failed to parse {path}"))?;

    let mut last = 0u64;
    for e in &events {
        if e.timestamp_ms < last {
            scope.warn(format!(
                "trace timestamps go backwards at t={}ms; replaying in file order",
                e.timestamp_ms
            ));
            break;
        }
        last = e.timestamp_ms;
    }

    scope.info(format!("replaying {} event(s)", events.len()));
    let fired = classify_trace(&events, th)?;
    for (gesture, ts) in &fired {
        println!("{} at t={ts}ms", gesture.binding_key());
    }
    println!("{} gesture(s) recognized", fired.len());
    Ok(())
}

fn classify_trace(events: &[PointerEvent], th: Thresholds) -> Result<Vec<(Gesture, u64)>> {
    let mut classifier = GestureClassifier::new(th, TraceRecorder::default());
    for event in events {
        classifier.handle(event)?;
    }
    // drain whatever deadlines the trace left armed
    while let Some(deadline) = classifier.next_deadline() {
        classifier.poll(deadline)?;
    }
    Ok(classifier.into_handler().fired)
}
