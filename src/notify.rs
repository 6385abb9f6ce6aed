//! Outbound customer notifications.
//!
//! The delivery channel (SMS, voice) lives outside this crate; helpdesk only
//! decides when to notify and with what.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::NotifierConfig;
use crate::error::Result;

/// A message owed to a customer after their question was answered.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Notification {
    /// Customer to notify.
    pub recipient_id: String,
    /// The question they asked.
    pub question_text: String,
    /// The supervisor's answer.
    pub answer_text: String,
}

impl Notification {
    /// The customer-facing text.
    pub fn message(&self) -> String {
        format!(
            "Regarding your question '{}', the answer is: {}",
            self.question_text, self.answer_text
        )
    }
}

/// Delivers notifications to customers.
pub trait Notifier: Send + Sync {
    /// Send one notification.
    fn notify(&self, notification: &Notification) -> Result<()>;

    /// Get the notifier name for logging.
    fn name(&self) -> &'static str;
}

impl<T: Notifier + ?Sized> Notifier for Arc<T> {
    fn notify(&self, notification: &Notification) -> Result<()> {
        (**self).notify(notification)
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

/// Notifier that simulates delivery by logging the message.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notification: &Notification) -> Result<()> {
        tracing::info!(
            recipient = %notification.recipient_id,
            "simulating text back to {}: \"{}\"",
            notification.recipient_id,
            notification.message()
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        "log"
    }
}

/// Notifier that drops every notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentNotifier;

impl Notifier for SilentNotifier {
    fn notify(&self, _notification: &Notification) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &'static str {
        "none"
    }
}

/// Create the notifier named by configuration.
///
/// Unknown kinds fall back to `LogNotifier` with a warning.
pub fn notifier_from_config(config: &NotifierConfig) -> Arc<dyn Notifier> {
    match config.kind.as_str() {
        "none" => Arc::new(SilentNotifier),
        "log" => Arc::new(LogNotifier),
        other => {
            tracing::warn!(kind = other, "unknown notifier kind, using log");
            Arc::new(LogNotifier)
        }
    }
}
