use anyhow::{Result, anyhow};
use std::collections::HashMap;
use std::process::Command;

use crate::classifier::Gesture;
use crate::config::Profile;
use crate::events::PointerEvent;
use crate::logging::Scope;

/// Resolves a recognized gesture to its profile binding and executes it.
pub struct ActionSink {
    allow_commands: bool,
    bindings: HashMap<String, String>,
    scope: Scope,
}

impl ActionSink {
    pub fn new(profile: &Profile, scope: Scope) -> Self {
        Self {
            allow_commands: profile.meta.allow_commands,
            bindings: profile.bindings.clone(),
            scope,
        }
    }

    pub fn is_bound(&self, gesture: Gesture) -> bool {
        self.bindings
            .get(gesture.binding_key())
            .is_some_and(|a| !a.is_empty())
    }

    pub fn dispatch(&mut self, gesture: Gesture, event: &PointerEvent) -> Result<()> {
        let key = gesture.binding_key();
        let action = self.bindings.get(key).cloned().unwrap_or_default();
        if action.is_empty() {
            self.scope.debug(format!("{key}: unbound, ignoring"));
            return Ok(());
        }

        if action == "log" {
            self.scope
                .info(format!("{key} at t={}ms", event.timestamp_ms));
            return Ok(());
        }
        if let Some(cmdline) = action.strip_prefix("cmd:") {
            // validation already gates this; re-check in case the profile
            // was assembled programmatically
            if !self.allow_commands {
                return Err(anyhow!("binding '{key}' uses cmd: but commands are disabled"));
            }
            let child = Command::new("sh").arg("-c").arg(cmdline).spawn()?;
            self.scope
                .debug(format!("{key}: spawned '{cmdline}' (pid={})", child.id()));
            return Ok(());
        }

        Err(anyhow!("unknown action mapping for {key} -> '{action}'"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Meta;
    use crate::events::PointerEventKind;

    fn profile(bindings: &[(&str, &str)], allow_commands: bool) -> Profile {
        Profile {
            meta: Meta {
                name: Some("test".into()),
                allow_commands,
            },
            thresholds: Default::default(),
            bindings: bindings
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    fn tap(ts: u64) -> PointerEvent {
        PointerEvent::new(PointerEventKind::TouchEnd, ts)
    }

    #[test]
    fn log_binding_dispatches_cleanly() {
        let p = profile(&[("single_click", "log")], false);
        let mut sink = ActionSink::new(&p, Scope::root());
        assert!(sink.is_bound(Gesture::SingleClick));
        sink.dispatch(Gesture::SingleClick, &tap(42)).unwrap();
    }

    #[test]
    fn unbound_gesture_is_a_no_op() {
        let p = profile(&[], false);
        let mut sink = ActionSink::new(&p, Scope::root());
        assert!(!sink.is_bound(Gesture::LongPress));
        sink.dispatch(Gesture::LongPress, &tap(0)).unwrap();
    }

    #[test]
    fn commands_stay_gated_at_dispatch_time() {
        let p = profile(&[("double_click", "cmd:true")], false);
        let mut sink = ActionSink::new(&p, Scope::root());
        let err = sink.dispatch(Gesture::DoubleClick, &tap(0)).unwrap_err();
        assert!(err.to_string().contains("disabled"));
    }

    #[test]
    fn garbage_action_is_reported() {
        let p = profile(&[("single_click", "teleport")], false);
        let mut sink = ActionSink::new(&p, Scope::root());
        let err = sink.dispatch(Gesture::SingleClick, &tap(0)).unwrap_err();
        assert!(err.to_string().contains("unknown action"));
    }
}
