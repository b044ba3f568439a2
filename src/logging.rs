//! Logger init plus scoped `k=v` prefixes.
//!
//! A [`Scope`] carries an immutable field set fixed at construction; children
//! inherit the parent's fields by value. Two scopes never share mutable
//! state, so a child can never retroactively change what its parent logs.

use std::fmt::Write as _;
use std::sync::Arc;

pub fn init() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();
}

#[derive(Debug, Clone, Default)]
pub struct Scope {
    fields: Arc<[(String, String)]>,
}

impl Scope {
    pub fn root() -> Self {
        Self::default()
    }

    /// New scope inheriting this one's fields plus one more.
    pub fn with(&self, key: &str, value: impl ToString) -> Self {
        let mut fields: Vec<(String, String)> = self.fields.to_vec();
        fields.push((key.to_string(), value.to_string()));
        Self {
            fields: fields.into(),
        }
    }

    fn prefix(&self) -> String {
        let mut out = String::new();
        for (k, v) in self.fields.iter() {
            let _ = write!(out, "{k}={v} ");
        }
        if !out.is_empty() {
            out.push_str("| ");
        }
        out
    }

    pub fn debug(&self, msg: impl AsRef<str>) {
        log::debug!("{}{}", self.prefix(), msg.as_ref());
    }

    pub fn info(&self, msg: impl AsRef<str>) {
        log::info!("{}{}", self.prefix(), msg.as_ref());
    }

    pub fn warn(&self, msg: impl AsRef<str>) {
        log::warn!("{}{}", self.prefix(), msg.as_ref());
    }

    pub fn error(&self, msg: impl AsRef<str>) {
        log::error!("{}{}", self.prefix(), msg.as_ref());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn child_extends_parent_fields_in_order() {
        let root = Scope::root().with("dev", "event3");
        let child = root.with("profile", "default");
        assert_eq!(child.prefix(), "dev=event3 profile=default | ");
        // the parent is untouched
        assert_eq!(root.prefix(), "dev=event3 | ");
    }

    #[test]
    fn empty_scope_has_no_prefix() {
        assert_eq!(Scope::root().prefix(), "");
    }
}
