//! OEM Notify — rule-driven email notifications for Enterprise Manager events.

pub mod config;
pub mod error;
pub mod event;
pub mod logging;
pub mod notification;
pub mod notifier;
pub mod rules;
pub mod runtime;
pub mod transport;
