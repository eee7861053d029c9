//! Flat key/value (INI) config adapter.
//!
//! Layout:
//!
//! ```ini
//! [SMTP]
//! server = mail.example.com
//! port = 25
//! sender = oem@example.com
//! recipient = dba@example.com
//!
//! [DEBUG]
//! debug = false
//! debug_level = INFO
//!
//! [RULES]
//! evaluation_mode = all_matches
//! rule1.condition.target_name = db01
//! rule1.condition.target_type = oracle_database
//! rule1.action.recipients = a@example.com;b@example.com
//! rule1.action.priority = 1
//! ```
//!
//! Section and key names are case-insensitive. `#` and `;` start a comment
//! only at the beginning of a line, so `;` is free to delimit recipients.

use std::path::Path;

use super::{
    ConfigLoader, RawAction, RawCondition, RawConfig, RawDebug, RawRule, RawSmtp, Recipients,
    Scalar,
};
use crate::error::ConfigError;

#[derive(Debug, Clone, Copy, Default)]
pub struct IniLoader;

/// Parsed sections, names lowercased, entries in file order.
#[derive(Debug, Default)]
struct IniDocument {
    sections: Vec<(String, Vec<(String, String)>)>,
}

impl IniDocument {
    fn parse(path: &Path, contents: &str) -> Result<Self, ConfigError> {
        let mut doc = IniDocument::default();

        for (lineno, line) in contents.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }
            let parse_err = |message: String| ConfigError::Parse {
                path: path.to_path_buf(),
                message: format!("line {}: {message}", lineno + 1),
            };

            if let Some(rest) = line.strip_prefix('[') {
                let name = rest
                    .strip_suffix(']')
                    .ok_or_else(|| parse_err(format!("unterminated section header '{line}'")))?;
                let name = name.trim().to_lowercase();
                if doc.sections.iter().any(|(n, _)| *n == name) {
                    return Err(parse_err(format!("duplicate section [{name}]")));
                }
                doc.sections.push((name, Vec::new()));
                continue;
            }

            let split_at = line
                .find(['=', ':'])
                .ok_or_else(|| parse_err(format!("expected 'key = value', found '{line}'")))?;
            let key = line[..split_at].trim().to_lowercase();
            let value = line[split_at + 1..].trim().to_string();
            if key.is_empty() {
                return Err(parse_err("empty key".into()));
            }

            let (section, entries) = doc
                .sections
                .last_mut()
                .ok_or_else(|| parse_err(format!("'{key}' appears before any [section]")))?;
            if entries.iter().any(|(k, _)| *k == key) {
                return Err(parse_err(format!("duplicate key '{key}' in [{section}]")));
            }
            entries.push((key, value));
        }

        Ok(doc)
    }

    fn section(&self, name: &str) -> Option<&[(String, String)]> {
        self.sections
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, entries)| entries.as_slice())
    }

    fn get(&self, section: &str, key: &str) -> Option<Scalar> {
        self.section(section)?
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| Scalar::Text(v.clone()))
    }
}

/// Highest rule number accepted; gaps below it are filled with empty rules.
pub const MAX_RULE_INDEX: usize = 10_000;

/// Which half of a rule a dotted key addresses.
enum RuleField<'a> {
    Condition(&'a str),
    Action(&'a str),
}

/// Split `rule<N>.condition.<field>` / `rule<N>.action.<field>`.
fn parse_rule_key(key: &str) -> Result<(usize, RuleField<'_>), String> {
    let (id, attr) = key
        .split_once('.')
        .ok_or_else(|| format!("rule key '{key}' has no attribute"))?;
    let index: usize = id
        .strip_prefix("rule")
        .and_then(|n| n.parse().ok())
        .filter(|n| *n > 0)
        .ok_or_else(|| format!("'{id}' is not a rule id (expected rule1, rule2, ...)"))?;
    if index > MAX_RULE_INDEX {
        return Err(format!("rule number {index} exceeds the limit of {MAX_RULE_INDEX}"));
    }

    if let Some(field) = attr.strip_prefix("condition.") {
        Ok((index, RuleField::Condition(field)))
    } else if let Some(field) = attr.strip_prefix("action.") {
        Ok((index, RuleField::Action(field)))
    } else {
        Err(format!(
            "'{key}' must address rule{index}.condition.<field> or rule{index}.action.<field>"
        ))
    }
}

impl ConfigLoader for IniLoader {
    fn name(&self) -> &'static str {
        "ini"
    }

    fn parse(&self, path: &Path, contents: &str) -> Result<RawConfig, ConfigError> {
        let doc = IniDocument::parse(path, contents)?;

        let smtp = RawSmtp {
            server: doc.get("smtp", "server"),
            port: doc.get("smtp", "port"),
            sender: doc.get("smtp", "sender"),
            recipient: doc.get("smtp", "recipient"),
            tls: doc.get("smtp", "tls"),
            timeout_secs: doc.get("smtp", "timeout_secs"),
        };

        let debug = RawDebug {
            debug: doc.get("debug", "debug"),
            debug_level: doc.get("debug", "debug_level"),
            log_file: doc.get("debug", "log_file").map(Scalar::into_string),
        };

        let mut rules: Vec<RawRule> = Vec::new();
        for (key, value) in doc.section("rules").unwrap_or_default() {
            if !key.starts_with("rule") || key == "rules_evaluation" {
                continue;
            }
            let (index, field) = parse_rule_key(key).map_err(|message| ConfigError::InvalidValue {
                key: format!("RULES.{key}"),
                message,
            })?;

            // Gaps stay as empty rules, which never match.
            if rules.len() < index {
                rules.resize_with(index, RawRule::default);
            }
            let rule = &mut rules[index - 1];

            match field {
                RuleField::Condition(name) => {
                    let condition = rule.condition.get_or_insert_with(RawCondition::default);
                    let slot = match name {
                        "target_name" => &mut condition.target_name,
                        "target_type" => &mut condition.target_type,
                        "lifecycle_status" => &mut condition.lifecycle_status,
                        other => {
                            return Err(ConfigError::InvalidValue {
                                key: format!("RULES.{key}"),
                                message: format!("unknown condition field '{other}'"),
                            });
                        }
                    };
                    *slot = Some(Scalar::Text(value.clone()));
                }
                RuleField::Action(name) => {
                    let action = rule.action.get_or_insert_with(RawAction::default);
                    match name {
                        "recipients" => {
                            action.recipients = Some(Recipients::Delimited(value.clone()));
                        }
                        "priority" => action.priority = Some(Scalar::Text(value.clone())),
                        other => {
                            return Err(ConfigError::InvalidValue {
                                key: format!("RULES.{key}"),
                                message: format!("unknown action field '{other}'"),
                            });
                        }
                    }
                }
            }
        }

        Ok(RawConfig {
            smtp: Some(smtp),
            debug: Some(debug),
            rules_evaluation: doc
                .get("rules", "evaluation_mode")
                .or_else(|| doc.get("rules", "rules_evaluation")),
            rules: Some(rules),
        })
    }
}
