//! Format-neutral configuration document and its validation.

use std::path::PathBuf;
use std::time::Duration;

use lettre::message::Mailbox;
use serde::{Deserialize, Serialize};

use super::{
    Action, Condition, ConfigStore, DEFAULT_SMTP_PORT, DEFAULT_SMTP_TIMEOUT, DebugSettings,
    EvaluationMode, Rule, SmtpSettings, TlsMode, parse_level,
};
use crate::error::ConfigError;

/// A scalar config value. YAML hands us typed scalars, INI only strings;
/// both are read back as text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Text(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
}

impl Scalar {
    pub fn into_string(self) -> String {
        match self {
            Scalar::Text(s) => s,
            Scalar::Integer(n) => n.to_string(),
            Scalar::Float(f) => f.to_string(),
            Scalar::Bool(b) => b.to_string(),
        }
    }

    /// Boolean reading with the usual INI spellings (`yes`/`no`, `on`/`off`, `1`/`0`).
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Scalar::Bool(b) => Some(*b),
            Scalar::Integer(0) => Some(false),
            Scalar::Integer(1) => Some(true),
            Scalar::Text(s) => match s.trim().to_lowercase().as_str() {
                "1" | "yes" | "true" | "on" => Some(true),
                "0" | "no" | "false" | "off" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }
}

impl From<&str> for Scalar {
    fn from(s: &str) -> Self {
        Scalar::Text(s.to_string())
    }
}

/// Rule recipients, either a list or a `;`/`,`-delimited string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Recipients {
    List(Vec<String>),
    Delimited(String),
}

impl Recipients {
    pub fn into_vec(self) -> Vec<String> {
        let parts: Vec<String> = match self {
            Recipients::List(list) => list,
            Recipients::Delimited(s) => s.split([';', ',']).map(str::to_string).collect(),
        };
        parts
            .into_iter()
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawConfig {
    #[serde(default)]
    pub smtp: Option<RawSmtp>,
    #[serde(default)]
    pub debug: Option<RawDebug>,
    #[serde(default)]
    pub rules_evaluation: Option<Scalar>,
    #[serde(default)]
    pub rules: Option<Vec<RawRule>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawSmtp {
    #[serde(default)]
    pub server: Option<Scalar>,
    #[serde(default)]
    pub port: Option<Scalar>,
    #[serde(default)]
    pub sender: Option<Scalar>,
    #[serde(default)]
    pub recipient: Option<Scalar>,
    #[serde(default)]
    pub tls: Option<Scalar>,
    #[serde(default)]
    pub timeout_secs: Option<Scalar>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawDebug {
    #[serde(default)]
    pub debug: Option<Scalar>,
    #[serde(default)]
    pub debug_level: Option<Scalar>,
    #[serde(default)]
    pub log_file: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRule {
    #[serde(default)]
    pub condition: Option<RawCondition>,
    #[serde(default)]
    pub action: Option<RawAction>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawCondition {
    #[serde(default)]
    pub target_name: Option<Scalar>,
    #[serde(default)]
    pub target_type: Option<Scalar>,
    #[serde(default)]
    pub lifecycle_status: Option<Scalar>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawAction {
    #[serde(default)]
    pub recipients: Option<Recipients>,
    #[serde(default)]
    pub priority: Option<Scalar>,
}

fn required(value: Option<Scalar>, key: &str) -> Result<String, ConfigError> {
    value
        .map(|v| v.into_string().trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ConfigError::MissingRequired { key: key.into() })
}

/// Reject anything lettre would refuse as a mailbox at send time.
fn mailbox(value: String, key: &str) -> Result<String, ConfigError> {
    match value.parse::<Mailbox>() {
        Ok(_) => Ok(value),
        Err(e) => Err(invalid(key, format!("'{value}' is not an email address: {e}"))),
    }
}

fn invalid(key: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.into(),
        message: message.into(),
    }
}

impl RawConfig {
    /// Validate into a [`ConfigStore`].
    pub fn normalize(self) -> Result<ConfigStore, ConfigError> {
        let smtp = self.smtp.unwrap_or_default().normalize()?;
        let debug = self.debug.unwrap_or_default().normalize()?;

        let evaluation_mode = match self.rules_evaluation {
            Some(mode) => mode
                .into_string()
                .parse()
                .map_err(|e: String| invalid("rules_evaluation", e))?,
            None => EvaluationMode::default(),
        };

        let rules = self
            .rules
            .unwrap_or_default()
            .into_iter()
            .map(RawRule::normalize)
            .collect();

        Ok(ConfigStore {
            smtp,
            debug,
            evaluation_mode,
            rules,
        })
    }
}

impl RawSmtp {
    fn normalize(self) -> Result<SmtpSettings, ConfigError> {
        let server = required(self.server, "smtp.server")?;
        let sender = mailbox(required(self.sender, "smtp.sender")?, "smtp.sender")?;
        let recipient = mailbox(required(self.recipient, "smtp.recipient")?, "smtp.recipient")?;

        let port = match self.port {
            None => DEFAULT_SMTP_PORT,
            Some(Scalar::Integer(n)) => {
                u16::try_from(n).map_err(|_| invalid("smtp.port", format!("{n} is out of range")))?
            }
            Some(other) => {
                let text = other.into_string();
                text.trim()
                    .parse()
                    .map_err(|_| invalid("smtp.port", format!("'{text}' is not a port number")))?
            }
        };

        let tls = match self.tls {
            Some(mode) => mode
                .into_string()
                .parse()
                .map_err(|e: String| invalid("smtp.tls", e))?,
            None => TlsMode::default(),
        };

        let timeout = match self.timeout_secs {
            None => DEFAULT_SMTP_TIMEOUT,
            Some(value) => {
                let text = value.into_string();
                match text.trim().parse::<u64>() {
                    Ok(secs) if secs > 0 => Duration::from_secs(secs),
                    _ => {
                        return Err(invalid(
                            "smtp.timeout_secs",
                            format!("'{text}' is not a positive number of seconds"),
                        ));
                    }
                }
            }
        };

        Ok(SmtpSettings {
            server,
            port,
            sender,
            recipient,
            tls,
            timeout,
        })
    }
}

impl RawDebug {
    fn normalize(self) -> Result<DebugSettings, ConfigError> {
        let debug = match self.debug {
            Some(value) => value
                .as_bool()
                .ok_or_else(|| invalid("debug.debug", format!("{value:?} is not a boolean")))?,
            None => false,
        };

        let level = match self.debug_level {
            Some(value) => {
                let name = value.into_string();
                parse_level(&name)
                    .ok_or_else(|| invalid("debug.debug_level", format!("unknown level '{name}'")))?
            }
            None => tracing::Level::INFO,
        };

        Ok(DebugSettings {
            debug,
            level,
            log_file: self
                .log_file
                .filter(|f| !f.trim().is_empty())
                .map(PathBuf::from),
        })
    }
}

impl RawRule {
    fn normalize(self) -> Rule {
        let condition = self.condition.unwrap_or_default();
        let action = self.action.unwrap_or_default();
        Rule {
            condition: Condition {
                target_name: condition.target_name.map(Scalar::into_string),
                target_type: condition.target_type.map(Scalar::into_string),
                lifecycle_status: condition.lifecycle_status.map(Scalar::into_string),
            },
            action: Action {
                recipients: action.recipients.map(Recipients::into_vec).unwrap_or_default(),
                priority: action.priority.map(Scalar::into_string),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn smtp() -> RawSmtp {
        RawSmtp {
            server: Some("mail.local".into()),
            sender: Some("oem@local".into()),
            recipient: Some("dba@local".into()),
            ..Default::default()
        }
    }

    fn with_smtp(smtp: RawSmtp) -> RawConfig {
        RawConfig {
            smtp: Some(smtp),
            ..Default::default()
        }
    }

    #[test]
    fn defaults_applied() {
        let store = with_smtp(smtp()).normalize().unwrap();
        assert_eq!(store.smtp.port, 25);
        assert_eq!(store.smtp.tls, TlsMode::None);
        assert_eq!(store.smtp.timeout, DEFAULT_SMTP_TIMEOUT);
        assert_eq!(store.evaluation_mode, EvaluationMode::AllMatches);
        assert!(!store.debug.debug);
        assert_eq!(store.debug.level, tracing::Level::INFO);
        assert!(store.rules.is_empty());
    }

    #[test]
    fn missing_smtp_section_names_first_key() {
        let err = RawConfig::default().normalize().unwrap_err();
        match err {
            ConfigError::MissingRequired { key } => assert_eq!(key, "smtp.server"),
            other => panic!("expected MissingRequired, got {other:?}"),
        }
    }

    #[test]
    fn blank_recipient_is_missing() {
        let raw = with_smtp(RawSmtp {
            recipient: Some("   ".into()),
            ..smtp()
        });
        assert!(matches!(
            raw.normalize(),
            Err(ConfigError::MissingRequired { key }) if key == "smtp.recipient"
        ));
    }

    #[test]
    fn malformed_addresses_rejected() {
        for (raw, key) in [
            (RawSmtp { sender: Some("oem at local".into()), ..smtp() }, "smtp.sender"),
            (RawSmtp { recipient: Some("dba@".into()), ..smtp() }, "smtp.recipient"),
        ] {
            match with_smtp(raw).normalize() {
                Err(ConfigError::InvalidValue { key: k, .. }) => assert_eq!(k, key),
                other => panic!("expected InvalidValue for {key}, got {other:?}"),
            }
        }
    }

    #[test]
    fn display_name_address_accepted() {
        let store = with_smtp(RawSmtp {
            sender: Some("OEM Alerts <oem@local>".into()),
            ..smtp()
        })
        .normalize()
        .unwrap();
        assert_eq!(store.smtp.sender, "OEM Alerts <oem@local>");
    }

    #[test]
    fn port_from_integer_or_string() {
        let raw = with_smtp(RawSmtp {
            port: Some(Scalar::Integer(587)),
            ..smtp()
        });
        assert_eq!(raw.normalize().unwrap().smtp.port, 587);

        let raw = with_smtp(RawSmtp {
            port: Some("2525".into()),
            ..smtp()
        });
        assert_eq!(raw.normalize().unwrap().smtp.port, 2525);

        let raw = with_smtp(RawSmtp {
            port: Some(Scalar::Integer(70_000)),
            ..smtp()
        });
        assert!(matches!(
            raw.normalize(),
            Err(ConfigError::InvalidValue { .. })
        ));

        let raw = with_smtp(RawSmtp {
            port: Some("smtp".into()),
            ..smtp()
        });
        assert!(matches!(
            raw.normalize(),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn zero_timeout_rejected() {
        let raw = with_smtp(RawSmtp {
            timeout_secs: Some(Scalar::Integer(0)),
            ..smtp()
        });
        assert!(matches!(
            raw.normalize(),
            Err(ConfigError::InvalidValue { key, .. }) if key == "smtp.timeout_secs"
        ));
    }

    #[test]
    fn unknown_evaluation_mode_rejected() {
        let raw = RawConfig {
            rules_evaluation: Some("sometimes".into()),
            ..with_smtp(smtp())
        };
        assert!(matches!(
            raw.normalize(),
            Err(ConfigError::InvalidValue { key, .. }) if key == "rules_evaluation"
        ));
    }

    #[test]
    fn debug_flags_and_levels() {
        let raw = RawConfig {
            debug: Some(RawDebug {
                debug: Some("yes".into()),
                debug_level: Some("warning".into()),
                log_file: None,
            }),
            ..with_smtp(smtp())
        };
        let store = raw.normalize().unwrap();
        assert!(store.debug.debug);
        assert_eq!(store.debug.level, tracing::Level::WARN);

        let raw = RawConfig {
            debug: Some(RawDebug {
                debug: Some("maybe".into()),
                ..Default::default()
            }),
            ..with_smtp(smtp())
        };
        assert!(raw.normalize().is_err());
    }

    #[test]
    fn recipients_split_and_trimmed() {
        let r = Recipients::Delimited(" a@x.com; b@x.com,,c@x.com ;".into());
        assert_eq!(r.into_vec(), vec!["a@x.com", "b@x.com", "c@x.com"]);

        let r = Recipients::List(vec![" a@x.com ".into(), "".into()]);
        assert_eq!(r.into_vec(), vec!["a@x.com"]);
    }

    #[test]
    fn rule_scalars_become_strings() {
        let rule = RawRule {
            condition: Some(RawCondition {
                target_name: Some(Scalar::Integer(42)),
                target_type: Some("all".into()),
                lifecycle_status: None,
            }),
            action: Some(RawAction {
                recipients: None,
                priority: Some(Scalar::Integer(1)),
            }),
        }
        .normalize();
        assert_eq!(rule.condition.target_name.as_deref(), Some("42"));
        assert_eq!(rule.condition.lifecycle_status, None);
        assert!(rule.action.recipients.is_empty());
        assert_eq!(rule.action.priority.as_deref(), Some("1"));
    }

    #[test]
    fn empty_rule_stays_empty() {
        let rule = RawRule::default().normalize();
        assert_eq!(rule, Rule::default());
    }
}
