//! Logging mailer
//!
//! Writes every email to the log instead of delivering it. Real transports
//! plug in behind the same [`Mailer`] trait.

use async_trait::async_trait;
use tracing::info;

use crate::application::ports::{EmailParams, EmailTemplate, MailError, Mailer};
use crate::shared::validations::validate_email;

pub struct LogMailer {
    enabled: bool,
}

impl LogMailer {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }
}

#[async_trait]
impl Mailer for LogMailer {
    async fn send_email(
        &self,
        recipient: &str,
        template: EmailTemplate,
        params: &EmailParams,
    ) -> Result<(), MailError> {
        if !self.enabled {
            return Ok(());
        }
        validate_email(recipient).map_err(|_| MailError::InvalidRecipient(recipient.to_string()))?;

        // never log the reset token itself
        let keys: Vec<&str> = params.keys().map(String::as_str).collect();
        info!(
            recipient,
            template = template.as_str(),
            subject = %template.subject(params),
            params = ?keys,
            "📧 Email"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn disabled_mailer_accepts_anything() {
        let mailer = LogMailer::new(false);
        assert!(mailer
            .send_email("not-an-address", EmailTemplate::PasswordReset, &EmailParams::new())
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn enabled_mailer_checks_recipient() {
        let mailer = LogMailer::new(true);
        assert!(mailer
            .send_email("qa@example.com", EmailTemplate::UatRecorded, &EmailParams::new())
            .await
            .is_ok());
        assert!(matches!(
            mailer
                .send_email("nobody", EmailTemplate::UatRecorded, &EmailParams::new())
                .await,
            Err(MailError::InvalidRecipient(_))
        ));
    }
}
