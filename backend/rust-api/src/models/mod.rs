use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

pub mod timer;

/// Longest time budget a session may carry (one year).
pub const MAX_TIME_LIMIT_SECONDS: u64 = 365 * 24 * 3600;

/// One bounded practice attempt: a start time, a time budget and the active question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    pub started_at: DateTime<Utc>,
    pub question: String,
    pub time_limit_seconds: u64,
}

impl Session {
    pub fn new(started_at: DateTime<Utc>, question: String, time_limit_seconds: u64) -> Self {
        Self {
            id: Uuid::new_v4(),
            started_at,
            question,
            time_limit_seconds,
        }
    }

    pub fn time_limit(&self) -> Duration {
        Duration::seconds(self.time_limit_seconds.min(MAX_TIME_LIMIT_SECONDS) as i64)
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.started_at + self.time_limit()
    }

    /// Elapsed/remaining budget as observed at `now`. Pure; never mutates the session.
    pub fn status_at(&self, now: DateTime<Utc>) -> SessionStatus {
        let elapsed = (now - self.started_at).max(Duration::zero());
        let remaining = (self.time_limit() - elapsed).max(Duration::zero());
        let state = if remaining.is_zero() {
            SessionState::Expired
        } else {
            SessionState::Active
        };

        SessionStatus {
            elapsed,
            remaining,
            time_limit: self.time_limit(),
            state,
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.status_at(now).state == SessionState::Expired
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Fresh,
    Active,
    Expired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionStatus {
    pub elapsed: Duration,
    pub remaining: Duration,
    pub time_limit: Duration,
    pub state: SessionState,
}

impl SessionStatus {
    /// Status reported before any session exists.
    pub fn fresh(time_limit: Duration) -> Self {
        Self {
            elapsed: Duration::zero(),
            remaining: time_limit,
            time_limit,
            state: SessionState::Fresh,
        }
    }

    pub fn elapsed_seconds(&self) -> i64 {
        self.elapsed.num_seconds()
    }

    /// Rounded up, so an active session never reports zero seconds left.
    pub fn remaining_seconds(&self) -> i64 {
        let whole = self.remaining.num_seconds();
        if self.remaining > Duration::seconds(whole) {
            whole + 1
        } else {
            whole
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusView {
    pub state: SessionState,
    pub elapsed_seconds: i64,
    pub remaining_seconds: i64,
    pub time_limit_seconds: i64,
}

impl From<SessionStatus> for StatusView {
    fn from(status: SessionStatus) -> Self {
        Self {
            state: status.state,
            elapsed_seconds: status.elapsed_seconds(),
            remaining_seconds: status.remaining_seconds(),
            time_limit_seconds: status.time_limit.num_seconds(),
        }
    }
}

/// A candidate's code plus the feedback produced for it. Immutable once built.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Submission {
    pub id: Uuid,
    pub session_id: Uuid,
    /// Copy of the question that was active when the code was submitted.
    pub question: String,
    pub user_code: String,
    pub feedback: String,
    /// False when `feedback` carries a provider error message instead of an evaluation.
    pub feedback_available: bool,
    pub email: Option<String>,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SubmitCodeRequest {
    #[validate(length(max = 100000, message = "Code must be at most 100000 characters"))]
    pub code: String,

    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
}

impl SubmitCodeRequest {
    /// Blank email fields from the form are treated as "no email".
    pub fn normalized_email(&self) -> Option<String> {
        self.email
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .map(str::to_string)
    }
}

#[derive(Debug, Serialize)]
pub struct SessionView {
    pub session_id: Uuid,
    pub question: String,
    pub started_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub status: StatusView,
}

impl SessionView {
    pub fn new(session: &Session, status: SessionStatus) -> Self {
        Self {
            session_id: session.id,
            question: session.question.clone(),
            started_at: session.started_at,
            expires_at: session.expires_at(),
            status: status.into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct QuestionResponse {
    pub question: String,
    pub status: StatusView,
}
