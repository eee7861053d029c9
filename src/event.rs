//! Event attributes captured from the invocation environment.

use serde::Serialize;
use tracing::debug;

/// Environment variable names and the placeholder used when one is absent.
pub mod vars {
    pub const EVENT_NAME: (&str, &str) = ("EVENT_NAME", "Unknown Event");
    pub const SEVERITY: (&str, &str) = ("SEVERITY", "Unknown Severity");
    pub const TARGET_NAME: (&str, &str) = ("TARGET_NAME", "Unknown Target");
    pub const TARGET_TYPE: (&str, &str) = ("TARGET_TYPE", "Unknown Type");
    pub const LIFECYCLE_STATUS: (&str, &str) = ("LIFECYCLE_STATUS", "Unknown Status");
    pub const MESSAGE: (&str, &str) = ("MESSAGE", "No details provided.");
}

/// Snapshot of the six attributes that drive one notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventContext {
    pub event_name: String,
    pub severity: String,
    pub target_name: String,
    pub target_type: String,
    pub lifecycle_status: String,
    pub message: String,
}

impl EventContext {
    /// Capture from the process environment.
    ///
    /// A value that isn't valid UTF-8 is kept, with invalid bytes replaced.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| {
            std::env::var_os(name).map(|value| value.to_string_lossy().into_owned())
        })
    }

    /// Capture through an arbitrary lookup.
    ///
    /// A variable that is set but empty is kept as-is; only an absent one
    /// falls back to its placeholder.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |(name, fallback): (&str, &str)| {
            lookup(name).unwrap_or_else(|| fallback.to_string())
        };

        let event = Self {
            event_name: read(vars::EVENT_NAME),
            severity: read(vars::SEVERITY),
            target_name: read(vars::TARGET_NAME),
            target_type: read(vars::TARGET_TYPE),
            lifecycle_status: read(vars::LIFECYCLE_STATUS),
            message: read(vars::MESSAGE),
        };

        debug!(
            event_name = %event.event_name,
            severity = %event.severity,
            target_name = %event.target_name,
            target_type = %event.target_type,
            lifecycle_status = %event.lifecycle_status,
            "Captured event"
        );
        event
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn all_absent_uses_placeholders() {
        let event = EventContext::from_lookup(|_| None);
        assert_eq!(event.event_name, "Unknown Event");
        assert_eq!(event.severity, "Unknown Severity");
        assert_eq!(event.target_name, "Unknown Target");
        assert_eq!(event.target_type, "Unknown Type");
        assert_eq!(event.lifecycle_status, "Unknown Status");
        assert_eq!(event.message, "No details provided.");
    }

    #[test]
    fn present_values_used() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("EVENT_NAME", "Tablespace Full"),
            ("SEVERITY", "Critical"),
            ("TARGET_NAME", "db01"),
            ("TARGET_TYPE", "oracle_database"),
            ("LIFECYCLE_STATUS", "Production"),
            ("MESSAGE", "USERS is 98% full"),
        ]);
        let event = EventContext::from_lookup(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(event.event_name, "Tablespace Full");
        assert_eq!(event.target_type, "oracle_database");
        assert_eq!(event.message, "USERS is 98% full");
    }

    #[test]
    fn empty_value_is_not_absent() {
        let event = EventContext::from_lookup(|k| (k == "TARGET_NAME").then(String::new));
        assert_eq!(event.target_name, "");
        assert_eq!(event.target_type, "Unknown Type");
    }

    #[cfg(unix)]
    #[test]
    fn non_utf8_value_kept_lossily() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        // No other test sets TARGET_NAME.
        unsafe { std::env::set_var("TARGET_NAME", OsStr::from_bytes(b"db\xff01")) };
        let event = EventContext::from_env();
        unsafe { std::env::remove_var("TARGET_NAME") };

        assert_eq!(event.target_name, "db\u{FFFD}01");
    }
}
