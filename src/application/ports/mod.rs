//! Outbound ports (hexagonal architecture boundaries)

pub mod mailer;

pub use mailer::{params, EmailParams, EmailTemplate, MailError, Mailer, Notifier};
