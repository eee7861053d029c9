//! One notification run: evaluate rules, render, deliver.

use tracing::{error, info};

use crate::config::ConfigStore;
use crate::error::Result;
use crate::event::EventContext;
use crate::notification::{Notification, NotificationBuilder};
use crate::rules::RuleEngine;
use crate::transport::Transport;

/// Ties a loaded config to a transport.
pub struct Notifier<'a> {
    config: &'a ConfigStore,
    transport: &'a dyn Transport,
}

impl<'a> Notifier<'a> {
    pub fn new(config: &'a ConfigStore, transport: &'a dyn Transport) -> Self {
        Self { config, transport }
    }

    /// Evaluate and render without sending.
    pub fn prepare(&self, event: &EventContext) -> Result<Notification> {
        let result = RuleEngine::new(self.config)
            .evaluate(&event.target_name, &event.target_type, &event.lifecycle_status)
            .inspect_err(|e| {
                error!(
                    target_name = %event.target_name,
                    target_type = %event.target_type,
                    lifecycle_status = %event.lifecycle_status,
                    "Rule evaluation failed: {e}"
                )
            })?;

        info!(
            mode = %self.config.evaluation_mode,
            matched = ?result.matched,
            priority = %result.priority,
            "Rules evaluated"
        );

        Ok(NotificationBuilder::build(
            event,
            result.recipients,
            &result.priority,
        ))
    }

    /// Evaluate, render and make exactly one delivery attempt.
    pub async fn notify(&self, event: &EventContext) -> Result<Notification> {
        let notification = self.prepare(event)?;
        let sender = self.config.smtp.sender.as_str();

        if let Err(e) = self.transport.send(sender, &notification).await {
            error!(
                transport = self.transport.name(),
                server = %self.config.smtp.server,
                port = self.config.smtp.port,
                recipients = %notification.recipient_list(),
                "Error sending email: {e}"
            );
            return Err(e.into());
        }

        Ok(notification)
    }
}
