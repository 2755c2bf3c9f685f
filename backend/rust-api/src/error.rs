use thiserror::Error;
use uuid::Uuid;

/// Message surfaced to the candidate when the provider has no credential.
pub const MISSING_CREDENTIAL_MESSAGE: &str =
    "AI feedback is unavailable: API_KEY is not configured.";

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("{}", MISSING_CREDENTIAL_MESSAGE)]
    MissingCredential,

    #[error("AI provider request failed: {0}")]
    Request(String),

    #[error("AI provider returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("AI provider did not respond within {0}s")]
    Timeout(u64),

    #[error("AI provider returned a malformed response: {0}")]
    MalformedResponse(String),
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        ProviderError::Request(err.to_string())
    }
}

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("{0} is not configured")]
    ConfigMissing(&'static str),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Email delivery failed: {0}")]
    Email(String),

    #[error("PDF export failed: {0}")]
    Pdf(String),
}

#[derive(Debug, Error)]
pub enum InterviewError {
    /// A required credential is absent; the named capability is degraded, not the service.
    #[error("AI feedback is unavailable: {0} is not configured.")]
    ConfigMissing(&'static str),

    #[error("Please enter some code before submitting.")]
    EmptySubmission,

    #[error("An email address is required to submit a solution.")]
    MissingEmail,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Session time is up. Start a new session to continue.")]
    SessionExpired,

    #[error("Session {0} not found")]
    SessionNotFound(Uuid),

    #[error(transparent)]
    ProviderUnavailable(ProviderError),
}

impl From<ProviderError> for InterviewError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::MissingCredential => InterviewError::ConfigMissing("API_KEY"),
            other => InterviewError::ProviderUnavailable(other),
        }
    }
}
