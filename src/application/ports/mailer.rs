//! Outbound email port
//!
//! Services never talk to a mail transport directly. They hand a template
//! and its parameters to a [`Notifier`], which forwards to the configured
//! [`Mailer`] and swallows delivery failures after logging them.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::EmailConfig;

pub type EmailParams = BTreeMap<String, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmailTemplate {
    RegistrationReceived,
    RegistrationApproved,
    RegistrationRejected,
    PasswordReset,
    AllocationCreated,
    AllocationUpdated,
    UatRecorded,
}

impl EmailTemplate {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmailTemplate::RegistrationReceived => "registration_received",
            EmailTemplate::RegistrationApproved => "registration_approved",
            EmailTemplate::RegistrationRejected => "registration_rejected",
            EmailTemplate::PasswordReset => "password_reset",
            EmailTemplate::AllocationCreated => "allocation_created",
            EmailTemplate::AllocationUpdated => "allocation_updated",
            EmailTemplate::UatRecorded => "uat_recorded",
        }
    }

    /// Subject line, filled from `params` where the template uses them.
    pub fn subject(&self, params: &EmailParams) -> String {
        let get = |key: &str| params.get(key).map(String::as_str).unwrap_or("N/A");
        match self {
            EmailTemplate::RegistrationReceived => {
                format!("New registration awaiting review: {}", get("username"))
            }
            EmailTemplate::RegistrationApproved => "Your registration was approved".to_string(),
            EmailTemplate::RegistrationRejected => "Your registration was rejected".to_string(),
            EmailTemplate::PasswordReset => "Password reset requested".to_string(),
            EmailTemplate::AllocationCreated => format!("Allocation Created: {}", get("trial_id")),
            EmailTemplate::AllocationUpdated => format!("Allocation Updated: {}", get("trial_id")),
            EmailTemplate::UatRecorded => format!("UAT Round {} Recorded: {}", get("round"), get("trial_id")),
        }
    }
}

#[derive(Debug, Error)]
pub enum MailError {
    #[error("Mail transport error: {0}")]
    Transport(String),

    #[error("Invalid recipient: {0}")]
    InvalidRecipient(String),
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_email(
        &self,
        recipient: &str,
        template: EmailTemplate,
        params: &EmailParams,
    ) -> Result<(), MailError>;
}

/// Build an [`EmailParams`] map from key/value pairs.
pub fn params<const N: usize>(pairs: [(&str, String); N]) -> EmailParams {
    pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
}

/// Fire-and-forget delivery on top of a [`Mailer`].
#[derive(Clone)]
pub struct Notifier {
    mailer: Arc<dyn Mailer>,
    settings: EmailConfig,
}

impl Notifier {
    pub fn new(mailer: Arc<dyn Mailer>, settings: EmailConfig) -> Self {
        Self { mailer, settings }
    }

    pub fn settings(&self) -> &EmailConfig {
        &self.settings
    }

    /// Deliver one email. Failures are logged and dropped.
    pub async fn notify(&self, recipient: &str, template: EmailTemplate, params: EmailParams) {
        match self.mailer.send_email(recipient, template, &params).await {
            Ok(()) => {
                debug!(recipient, template = template.as_str(), "Email handed to mailer");
                metrics::counter!("portal_emails_total", "template" => template.as_str(), "outcome" => "sent")
                    .increment(1);
            }
            Err(e) => {
                warn!(recipient, template = template.as_str(), error = %e, "Email delivery failed");
                metrics::counter!("portal_emails_total", "template" => template.as_str(), "outcome" => "failed")
                    .increment(1);
            }
        }
    }

    pub async fn notify_admin(&self, template: EmailTemplate, params: EmailParams) {
        let admin = self.settings.admin_email.clone();
        self.notify(&admin, template, params).await;
    }
}
