//! Notification payload: subject, body and priority headers.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::event::EventContext;

/// Priority value that switches the headers to high importance.
pub const URGENT_PRIORITY: &str = "1";

/// The three priority-related mail headers.
///
/// Only priority `"1"` is special; every other value, including `"2"`,
/// gets `Importance: Normal` and `Priority: normal`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PriorityHeaders {
    #[serde(rename = "X-Priority")]
    pub x_priority: String,
    #[serde(rename = "Importance")]
    pub importance: &'static str,
    #[serde(rename = "Priority")]
    pub priority: &'static str,
}

impl PriorityHeaders {
    pub fn for_priority(priority: &str) -> Self {
        let urgent = priority == URGENT_PRIORITY;
        Self {
            x_priority: priority.to_string(),
            importance: if urgent { "High" } else { "Normal" },
            priority: if urgent { "urgent" } else { "normal" },
        }
    }

    /// Header name/value pairs in the order they are written.
    pub fn entries(&self) -> [(&'static str, &str); 3] {
        [
            ("X-Priority", self.x_priority.as_str()),
            ("Importance", self.importance),
            ("Priority", self.priority),
        ]
    }
}

/// A fully rendered notification, ready for a transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub recipients: BTreeSet<String>,
    pub subject: String,
    pub body: String,
    pub headers: PriorityHeaders,
}

impl Notification {
    /// Recipients as a `To:` header value.
    pub fn recipient_list(&self) -> String {
        self.recipients
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Renders events into notifications.
#[derive(Debug, Clone, Copy, Default)]
pub struct NotificationBuilder;

impl NotificationBuilder {
    pub fn subject(event: &EventContext) -> String {
        format!(
            "OEM Alert: {} - {} on {} ({})",
            event.event_name, event.severity, event.target_name, event.lifecycle_status
        )
    }

    pub fn body(event: &EventContext) -> String {
        format!(
            "Oracle Enterprise Manager Event Notification\n\
             \n\
             Event Name: {}\n\
             Severity: {}\n\
             Target: {}\n\
             Target Type: {}\n\
             Lifecycle Status: {}\n\
             \n\
             Details:\n\
             {}\n\
             \n\
             Please address this issue promptly.\n",
            event.event_name,
            event.severity,
            event.target_name,
            event.target_type,
            event.lifecycle_status,
            event.message,
        )
    }

    /// Build the payload for `event`, sent to `recipients` at `priority`.
    pub fn build(
        event: &EventContext,
        recipients: BTreeSet<String>,
        priority: &str,
    ) -> Notification {
        Notification {
            recipients,
            subject: Self::subject(event),
            body: Self::body(event),
            headers: PriorityHeaders::for_priority(priority),
        }
    }
}
