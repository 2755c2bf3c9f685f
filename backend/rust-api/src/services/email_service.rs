use async_trait::async_trait;
use lettre::{
    message::Mailbox, transport::smtp::authentication::Credentials, AsyncSmtpTransport,
    AsyncTransport, Message, Tokio1Executor,
};

use crate::{
    config::SmtpConfig, error::SinkError, models::Submission, services::result_sink::ResultSink,
};

pub const RESULTS_EMAIL_SUBJECT: &str = "Your AI Coding Interview Results";

/// Mails each submission's question, code and feedback to the candidate.
pub struct EmailService {
    settings: SmtpConfig,
}

impl EmailService {
    pub fn new(settings: SmtpConfig) -> Self {
        Self { settings }
    }

    pub fn compose_body(submission: &Submission) -> String {
        format!(
            "Coding Challenge:\n{}\n\nYour Code:\n{}\n\nAI Feedback:\n{}\n",
            submission.question, submission.user_code, submission.feedback
        )
    }

    pub fn build_message(
        &self,
        submission: &Submission,
        recipient: &str,
    ) -> Result<Message, SinkError> {
        let sender = self
            .settings
            .sender_email
            .as_deref()
            .ok_or(SinkError::ConfigMissing("SENDER_EMAIL"))?;

        let from_address: Mailbox = sender
            .parse()
            .map_err(|e| SinkError::Email(format!("Invalid sender email address: {}", e)))?;
        let to_address: Mailbox = recipient
            .parse()
            .map_err(|e| SinkError::Email(format!("Invalid recipient email address: {}", e)))?;

        Message::builder()
            .from(from_address)
            .to(to_address)
            .subject(RESULTS_EMAIL_SUBJECT)
            .body(Self::compose_body(submission))
            .map_err(|e| SinkError::Email(format!("Failed to build email message: {}", e)))
    }

    fn build_mailer(&self) -> Result<AsyncSmtpTransport<Tokio1Executor>, SinkError> {
        let login = self
            .settings
            .sender_email
            .clone()
            .ok_or(SinkError::ConfigMissing("SENDER_EMAIL"))?;
        let password = self
            .settings
            .sender_password
            .clone()
            .ok_or(SinkError::ConfigMissing("SENDER_PASSWORD"))?;
        let creds = Credentials::new(login, password);

        let builder = if !self.settings.use_tls {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&self.settings.server)
        } else if self.settings.port == 465 {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&self.settings.server)
                .map_err(|e| SinkError::Email(format!("Invalid SMTP server for TLS: {}", e)))?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.settings.server)
                .map_err(|e| SinkError::Email(format!("Invalid SMTP server for STARTTLS: {}", e)))?
        }
        .port(self.settings.port)
        .credentials(creds);

        Ok(builder.build())
    }
}

#[async_trait]
impl ResultSink for EmailService {
    fn name(&self) -> &'static str {
        "email"
    }

    async fn record(&self, submission: &Submission) -> Result<(), SinkError> {
        let Some(recipient) = submission.email.as_deref() else {
            tracing::debug!("Submission {} has no email address; skipping", submission.id);
            return Ok(());
        };

        let email = self.build_message(submission, recipient)?;
        let mailer = self.build_mailer()?;
        mailer
            .send(email)
            .await
            .map_err(|e| SinkError::Email(e.to_string()))?;

        tracing::info!("Results emailed for submission {}", submission.id);
        Ok(())
    }
}
