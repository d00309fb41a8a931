use async_trait::async_trait;
use lettre::{
    message::Mailbox, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use std::sync::Arc;

use crate::config::MailConfig;
use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Copy)]
pub enum MailPurpose {
    Signup,
    PasswordReset,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    /// Deliver a one-time verification code.
    async fn send_verification(
        &self,
        to: &str,
        name: &str,
        code: &str,
        purpose: MailPurpose,
    ) -> AppResult<()>;
}

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(smtp_url: &str, from: &str) -> AppResult<Self> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::from_url(smtp_url)
            .map_err(|e| AppError::ConfigurationError(format!("invalid SMTP url: {}", e)))?
            .build();
        let from = from
            .parse()
            .map_err(|e| AppError::ConfigurationError(format!("invalid MAIL_FROM: {}", e)))?;
        Ok(Self { transport, from })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send_verification(
        &self,
        to: &str,
        name: &str,
        code: &str,
        purpose: MailPurpose,
    ) -> AppResult<()> {
        let (subject, intro) = match purpose {
            MailPurpose::Signup => ("Verify your DrifNet account", "finish signing up"),
            MailPurpose::PasswordReset => ("Reset your DrifNet password", "reset your password"),
        };

        let to: Mailbox = to
            .parse()
            .map_err(|e| AppError::Validation(format!("invalid recipient address: {}", e)))?;

        let body = format!(
            "Hi {},\n\nUse this code to {}: {}\n\nThe code expires in 15 minutes.\n",
            name, intro, code
        );

        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(subject)
            .body(body)
            .map_err(|e| AppError::Internal(format!("failed to build mail: {}", e)))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| AppError::Upstream(format!("mail delivery failed: {}", e)))?;
        Ok(())
    }
}

/// Dev/test mailer: the code goes to the log instead of a mailbox.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send_verification(
        &self,
        to: &str,
        _name: &str,
        code: &str,
        purpose: MailPurpose,
    ) -> AppResult<()> {
        tracing::info!(?purpose, %to, %code, "verification mail (log-only mailer)");
        Ok(())
    }
}

pub fn from_config(config: &MailConfig) -> AppResult<Arc<dyn Mailer>> {
    match &config.smtp_url {
        Some(url) => Ok(Arc::new(SmtpMailer::new(url, &config.from)?)),
        None => {
            tracing::warn!("SMTP_URL not set, using log-only mailer");
            Ok(Arc::new(LogMailer))
        }
    }
}
