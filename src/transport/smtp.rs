//! SMTP delivery via lettre.
//!
//! lettre's `SmtpTransport` is blocking, so sends run on
//! `spawn_blocking`. Every socket operation is bounded by
//! `SmtpSettings::timeout`, and the whole conversation by a multiple of it.

use std::time::Duration;

use async_trait::async_trait;
use lettre::message::header::{ContentType, Header, HeaderName, HeaderValue};
use lettre::message::Mailbox;
use lettre::{Message, SmtpTransport, Transport as _};
use tracing::{debug, info};

use super::Transport;
use crate::config::{SmtpSettings, TlsMode};
use crate::error::DeliveryError;
use crate::notification::Notification;

/// Upper bound on a full send, in multiples of the per-operation timeout.
const SEND_DEADLINE_FACTOR: u32 = 4;

// ── Priority headers ────────────────────────────────────────────────

macro_rules! text_header {
    ($ty:ident, $name:literal) => {
        #[derive(Debug, Clone, PartialEq, Eq)]
        struct $ty(String);

        impl Header for $ty {
            fn name() -> HeaderName {
                HeaderName::new_from_ascii_str($name)
            }

            fn parse(s: &str) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
                Ok(Self(s.to_owned()))
            }

            fn display(&self) -> HeaderValue {
                HeaderValue::new(Self::name(), self.0.clone())
            }
        }
    };
}

text_header!(XPriority, "X-Priority");
text_header!(Importance, "Importance");
text_header!(PriorityHeader, "Priority");

fn mailbox(address: &str) -> Result<Mailbox, DeliveryError> {
    address
        .parse()
        .map_err(|e: lettre::address::AddressError| DeliveryError::InvalidAddress {
            address: address.to_string(),
            reason: e.to_string(),
        })
}

/// Build the MIME message for `notification`.
pub fn build_message(sender: &str, notification: &Notification) -> Result<Message, DeliveryError> {
    let mut builder = Message::builder()
        .from(mailbox(sender)?)
        .subject(notification.subject.as_str())
        .header(ContentType::TEXT_PLAIN)
        .header(XPriority(notification.headers.x_priority.clone()))
        .header(Importance(notification.headers.importance.to_string()))
        .header(PriorityHeader(notification.headers.priority.to_string()));

    for recipient in &notification.recipients {
        builder = builder.to(mailbox(recipient)?);
    }

    builder
        .body(notification.body.clone())
        .map_err(|e| DeliveryError::Build(e.to_string()))
}

// ── Mailer ──────────────────────────────────────────────────────────

/// Sends notifications through the configured SMTP relay.
#[derive(Debug, Clone)]
pub struct SmtpMailer {
    settings: SmtpSettings,
}

impl SmtpMailer {
    pub fn new(settings: SmtpSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &SmtpSettings {
        &self.settings
    }

    fn connection_error(&self, reason: impl ToString) -> DeliveryError {
        DeliveryError::Connection {
            server: self.settings.server.clone(),
            port: self.settings.port,
            reason: reason.to_string(),
        }
    }

    fn transport(&self) -> Result<SmtpTransport, DeliveryError> {
        let server = self.settings.server.as_str();
        let builder = match self.settings.tls {
            TlsMode::None => SmtpTransport::builder_dangerous(server),
            TlsMode::Starttls => SmtpTransport::starttls_relay(server)
                .map_err(|e| self.connection_error(format!("STARTTLS setup: {e}")))?,
            TlsMode::Tls => SmtpTransport::relay(server)
                .map_err(|e| self.connection_error(format!("TLS setup: {e}")))?,
        };
        Ok(builder
            .port(self.settings.port)
            .timeout(Some(self.settings.timeout))
            .build())
    }

    /// Deadline for one complete send.
    pub fn deadline(&self) -> Duration {
        self.settings.timeout.saturating_mul(SEND_DEADLINE_FACTOR)
    }
}

#[async_trait]
impl Transport for SmtpMailer {
    fn name(&self) -> &str {
        "smtp"
    }

    async fn send(&self, sender: &str, notification: &Notification) -> Result<(), DeliveryError> {
        let email = build_message(sender, notification)?;
        let transport = self.transport()?;
        let (server, port) = (self.settings.server.clone(), self.settings.port);

        debug!(
            server = %server,
            port,
            tls = ?self.settings.tls,
            "Connecting to SMTP server"
        );

        let task = tokio::task::spawn_blocking(move || transport.send(&email));
        let outcome = tokio::time::timeout(self.deadline(), task)
            .await
            .map_err(|_| DeliveryError::TimedOut {
                server: server.clone(),
                port,
                timeout: self.deadline(),
            })?
            .map_err(|e| self.connection_error(format!("send task failed: {e}")))?;

        match outcome {
            Ok(response) => {
                info!(
                    server = %server,
                    port,
                    recipients = %notification.recipient_list(),
                    code = %response.code(),
                    "Email successfully sent"
                );
                Ok(())
            }
            // A reply code means the relay was reached and refused the mail.
            Err(e) if e.is_permanent() || e.is_transient() => Err(DeliveryError::SendFailed {
                server,
                port,
                reason: e.to_string(),
            }),
            Err(e) => Err(self.connection_error(e)),
        }
    }
}
