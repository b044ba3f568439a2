//! Raw pointer event vocabulary shared by the tracker, classifier, and replay.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointerEventKind {
    TouchStart,
    TouchMove,
    TouchEnd,
    TouchCancel,
    Click,
}

/// One raw input event. `timestamp_ms` is milliseconds since the stream
/// started; sources that have no hardware stamp use receipt time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointerEvent {
    pub kind: PointerEventKind,
    pub timestamp_ms: u64,
}

impl PointerEvent {
    pub fn new(kind: PointerEventKind, timestamp_ms: u64) -> Self {
        Self { kind, timestamp_ms }
    }
}
