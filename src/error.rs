//! Error types for the OEM notifier.

use std::num::ParseIntError;
use std::path::PathBuf;
use std::time::Duration;

/// Top-level error type for a notifier run.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Rule evaluation error: {0}")]
    Rule(#[from] RuleError),

    #[error("Delivery error: {0}")]
    Delivery(#[from] DeliveryError),
}

impl Error {
    /// Process exit code for this failure.
    ///
    /// Configuration and rule errors abort before sending (1); delivery
    /// errors happen after a send was attempted (2).
    pub fn exit_code(&self) -> u8 {
        match self {
            Error::Config(_) | Error::Rule(_) => 1,
            Error::Delivery(_) => 2,
        }
    }
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file '{}' not found", .path.display())]
    NotFound { path: PathBuf },

    #[error("Failed to read configuration file '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse configuration file '{}': {message}", .path.display())]
    Parse { path: PathBuf, message: String },

    #[error("Configuration file '{}' is not a mapping at the top level", .path.display())]
    NotAMapping { path: PathBuf },

    #[error("Unsupported configuration format for '{}' (expected .yaml, .yml, .ini, .cfg or .conf)", .path.display())]
    UnsupportedFormat { path: PathBuf },

    #[error("Missing required configuration: {key}")]
    MissingRequired { key: String },

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Errors raised while folding rules into a notification result.
#[derive(Debug, thiserror::Error)]
pub enum RuleError {
    #[error("Rule {rule} has a non-numeric priority '{value}': {source}")]
    InvalidPriority {
        /// 1-based rule index; 0 means the running (default) priority.
        rule: usize,
        value: String,
        #[source]
        source: ParseIntError,
    },
}

/// Mail transport errors.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("Invalid address '{address}': {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("Failed to build email: {0}")]
    Build(String),

    #[error("SMTP connection to {server}:{port} failed: {reason}")]
    Connection {
        server: String,
        port: u16,
        reason: String,
    },

    #[error("SMTP send via {server}:{port} failed: {reason}")]
    SendFailed {
        server: String,
        port: u16,
        reason: String,
    },

    #[error("SMTP send via {server}:{port} timed out after {timeout:?}")]
    TimedOut {
        server: String,
        port: u16,
        timeout: Duration,
    },
}

/// Result type alias for the notifier.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_split_setup_from_delivery() {
        let config: Error = ConfigError::MissingRequired {
            key: "smtp.server".into(),
        }
        .into();
        assert_eq!(config.exit_code(), 1);

        let rule: Error = RuleError::InvalidPriority {
            rule: 2,
            value: "high".into(),
            source: "high".parse::<i64>().unwrap_err(),
        }
        .into();
        assert_eq!(rule.exit_code(), 1);

        let delivery: Error = DeliveryError::Connection {
            server: "mail.example.com".into(),
            port: 25,
            reason: "connection refused".into(),
        }
        .into();
        assert_eq!(delivery.exit_code(), 2);
    }

    #[test]
    fn messages_carry_context() {
        let err = DeliveryError::SendFailed {
            server: "relay.local".into(),
            port: 2525,
            reason: "550 mailbox unavailable".into(),
        };
        let text = err.to_string();
        assert!(text.contains("relay.local:2525"));
        assert!(text.contains("550"));

        let err = ConfigError::NotFound {
            path: PathBuf::from("/etc/oem/missing.yaml"),
        };
        assert!(err.to_string().contains("/etc/oem/missing.yaml"));
    }
}
