//! Mail transport abstraction.

pub mod smtp;

use async_trait::async_trait;
use serde::Serialize;
use tracing::info;

use crate::error::DeliveryError;
use crate::notification::Notification;

pub use smtp::SmtpMailer;

/// Delivers one rendered notification.
///
/// Failures are reported, never retried.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Send `notification` from `sender`.
    async fn send(&self, sender: &str, notification: &Notification) -> Result<(), DeliveryError>;
}

/// Transport that validates and prints the message instead of sending it.
#[derive(Debug, Clone, Copy, Default)]
pub struct DryRunTransport;

#[derive(Serialize)]
struct DryRunOutput<'a> {
    sender: &'a str,
    #[serde(flatten)]
    notification: &'a Notification,
}

impl DryRunTransport {
    /// JSON rendering of what would have been sent.
    pub fn render(sender: &str, notification: &Notification) -> Result<String, DeliveryError> {
        // Same address checks the SMTP path applies.
        smtp::build_message(sender, notification)?;
        serde_json::to_string_pretty(&DryRunOutput {
            sender,
            notification,
        })
        .map_err(|e| DeliveryError::Build(e.to_string()))
    }
}

#[async_trait]
impl Transport for DryRunTransport {
    fn name(&self) -> &str {
        "dry-run"
    }

    async fn send(&self, sender: &str, notification: &Notification) -> Result<(), DeliveryError> {
        let rendered = Self::render(sender, notification)?;
        println!("{rendered}");
        info!(
            recipients = %notification.recipient_list(),
            "Dry run: notification not sent"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::event::EventContext;
    use crate::notification::NotificationBuilder;

    fn notification(recipients: &[&str], priority: &str) -> Notification {
        let recipients: BTreeSet<String> = recipients.iter().map(|s| s.to_string()).collect();
        NotificationBuilder::build(&EventContext::from_lookup(|_| None), recipients, priority)
    }

    #[test]
    fn dry_run_renders_json() {
        let n = notification(&["dba@x.com", "a@x.com"], "1");
        let out = DryRunTransport::render("oem@x.com", &n).unwrap();
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["sender"], "oem@x.com");
        assert_eq!(value["recipients"][0], "a@x.com");
        assert_eq!(value["headers"]["Importance"], "High");
        assert_eq!(value["headers"]["X-Priority"], "1");
    }

    #[test]
    fn dry_run_rejects_bad_address() {
        let n = notification(&["not an address"], "3");
        let err = DryRunTransport::render("oem@x.com", &n).unwrap_err();
        assert!(matches!(err, DeliveryError::InvalidAddress { .. }));
    }

    #[tokio::test]
    async fn dry_run_send_succeeds() {
        let n = notification(&["dba@x.com"], "3");
        DryRunTransport.send("oem@x.com", &n).await.unwrap();
        assert_eq!(DryRunTransport.name(), "dry-run");
    }
}
