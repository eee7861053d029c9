//! Rule engine: decides who gets notified and how urgently.
//!
//! Rules are walked in declaration order. A rule applies when its target
//! name, target type and lifecycle status conditions all match the event
//! (case-insensitively). Each applied rule adds its recipients to the set
//! seeded with the base recipient and may lower the priority number. In
//! `first_match` mode the walk stops at the first applied rule.
//!
//! Matching is deliberately asymmetric: a missing `target_name` or
//! `target_type` condition matches nothing (only the literal `all` is a
//! wildcard), while a missing or empty `lifecycle_status` matches everything.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::num::IntErrorKind;

use serde::Serialize;
use tracing::debug;

use crate::config::{Condition, ConfigStore, EvaluationMode, Rule};
use crate::error::RuleError;

/// Priority when no applied rule sets one.
pub const DEFAULT_PRIORITY: &str = "3";

/// Condition value that matches any target name or type.
pub const MATCH_ALL: &str = "all";

/// Outcome of one evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationResult {
    /// Base recipient plus every applied rule's recipients, de-duplicated.
    pub recipients: BTreeSet<String>,
    /// Integer-as-string; lower is more urgent.
    pub priority: String,
    /// 1-based indices of the rules that applied, in order.
    pub matched: Vec<usize>,
}

fn same(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

/// An integer priority of any magnitude, ordered numerically.
#[derive(Debug, Clone, PartialEq, Eq)]
struct PriorityValue {
    negative: bool,
    /// Decimal digits without leading zeros; empty for zero.
    digits: String,
}

impl Ord for PriorityValue {
    fn cmp(&self, other: &Self) -> Ordering {
        let magnitude = || {
            self.digits
                .len()
                .cmp(&other.digits.len())
                .then_with(|| self.digits.cmp(&other.digits))
        };
        match (self.negative, other.negative) {
            (false, true) => Ordering::Greater,
            (true, false) => Ordering::Less,
            (false, false) => magnitude(),
            (true, true) => magnitude().reverse(),
        }
    }
}

impl PartialOrd for PriorityValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

fn parse_priority(value: &str, rule: usize) -> Result<PriorityValue, RuleError> {
    let text = value.trim();
    // i64 parsing does the syntax check; overflow alone is still a number.
    if let Err(source) = text.parse::<i64>() {
        if !matches!(
            source.kind(),
            IntErrorKind::PosOverflow | IntErrorKind::NegOverflow
        ) {
            return Err(RuleError::InvalidPriority {
                rule,
                value: value.to_string(),
                source,
            });
        }
    }

    let (negative, unsigned) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };
    let digits = unsigned.trim_start_matches('0').to_string();
    Ok(PriorityValue {
        negative: negative && !digits.is_empty(),
        digits,
    })
}

impl Condition {
    /// Whether this condition selects the given target.
    pub fn matches(&self, target_name: &str, target_type: &str, lifecycle_status: &str) -> bool {
        let name = self.target_name.as_deref().unwrap_or_default();
        let kind = self.target_type.as_deref().unwrap_or_default();
        let status = self.lifecycle_status.as_deref().unwrap_or_default();

        let match_name = same(name, MATCH_ALL) || same(name, target_name);
        let match_type = same(kind, MATCH_ALL) || same(kind, target_type);
        let match_lifecycle = status.is_empty() || same(status, lifecycle_status);

        match_name && match_type && match_lifecycle
    }
}

/// Evaluates a rule list against one event's target attributes.
#[derive(Debug, Clone, Copy)]
pub struct RuleEngine<'a> {
    rules: &'a [Rule],
    base_recipient: &'a str,
    mode: EvaluationMode,
}

impl<'a> RuleEngine<'a> {
    /// Engine over the config's rules, base recipient and evaluation mode.
    pub fn new(config: &'a ConfigStore) -> Self {
        Self::with_rules(&config.rules, &config.smtp.recipient, config.evaluation_mode)
    }

    pub fn with_rules(rules: &'a [Rule], base_recipient: &'a str, mode: EvaluationMode) -> Self {
        Self {
            rules,
            base_recipient,
            mode,
        }
    }

    /// Fold every applicable rule into a recipient set and priority.
    ///
    /// Fails if an applied rule carries a priority that isn't an integer.
    pub fn evaluate(
        &self,
        target_name: &str,
        target_type: &str,
        lifecycle_status: &str,
    ) -> Result<NotificationResult, RuleError> {
        let mut recipients = BTreeSet::from([self.base_recipient.to_string()]);
        let mut priority = DEFAULT_PRIORITY.to_string();
        let mut current = parse_priority(&priority, 0)?;
        let mut matched = Vec::new();

        for (i, rule) in self.rules.iter().enumerate() {
            let index = i + 1;
            if !rule
                .condition
                .matches(target_name, target_type, lifecycle_status)
            {
                continue;
            }

            recipients.extend(rule.action.recipients.iter().cloned());

            if let Some(candidate) = rule.action.priority.as_deref() {
                let value = parse_priority(candidate, index)?;
                // Ties keep the running value.
                if value < current {
                    current = value;
                    priority = candidate.trim().to_string();
                }
            }

            debug!(
                rule = index,
                condition = ?rule.condition,
                recipients = ?rule.action.recipients,
                priority = %priority,
                "Rule applied"
            );
            matched.push(index);

            if self.mode == EvaluationMode::FirstMatch {
                break;
            }
        }

        Ok(NotificationResult {
            recipients,
            priority,
            matched,
        })
    }
}
