use chrono::Duration;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    error::InterviewError,
    metrics::{SESSIONS_TOTAL, SUBMISSIONS_TOTAL},
    models::{Session, SessionState, SessionStatus, Submission, MAX_TIME_LIMIT_SECONDS},
    services::{
        llm_service::QuestionProvider,
        result_sink::{self, ResultSink, SinkReport},
    },
    utils::time::Clock,
};

/// Drives the session lifecycle: FRESH -> ACTIVE -> EXPIRED.
///
/// Sessions are plain values owned by the caller; the controller never keeps
/// per-user state of its own, so one instance serves every user.
pub struct SessionService {
    provider: Arc<dyn QuestionProvider>,
    sinks: Vec<Arc<dyn ResultSink>>,
    clock: Arc<dyn Clock>,
    time_limit_seconds: u64,
    require_email: bool,
}

impl SessionService {
    pub fn new(
        provider: Arc<dyn QuestionProvider>,
        sinks: Vec<Arc<dyn ResultSink>>,
        clock: Arc<dyn Clock>,
        time_limit_seconds: u64,
    ) -> Self {
        Self {
            provider,
            sinks,
            clock,
            time_limit_seconds,
            require_email: false,
        }
    }

    pub fn with_required_email(mut self, require_email: bool) -> Self {
        self.require_email = require_email;
        self
    }

    pub fn sink_names(&self) -> Vec<&'static str> {
        self.sinks.iter().map(|sink| sink.name()).collect()
    }

    pub fn time_limit(&self) -> Duration {
        Duration::seconds(self.time_limit_seconds.min(MAX_TIME_LIMIT_SECONDS) as i64)
    }

    /// FRESH -> ACTIVE: stamps the start time and fetches the opening question.
    pub async fn start_session(&self) -> Result<Session, InterviewError> {
        let question = self.provider.generate_question(false, None).await?;
        let session = Session::new(self.clock.now(), question, self.time_limit_seconds);

        SESSIONS_TOTAL.with_label_values(&["started"]).inc();
        tracing::info!(
            "Session started: {} (time limit {}s)",
            session.id,
            self.time_limit_seconds
        );

        Ok(session)
    }

    pub fn status(&self, session: &Session) -> SessionStatus {
        session.status_at(self.clock.now())
    }

    /// Status for an optional session; `None` reports FRESH.
    pub fn status_of(&self, session: Option<&Session>) -> SessionStatus {
        match session {
            Some(session) => self.status(session),
            None => SessionStatus::fresh(self.time_limit()),
        }
    }

    /// Swaps in a different question. The time budget keeps running from the original start.
    pub async fn request_new_question(
        &self,
        session: &mut Session,
    ) -> Result<String, InterviewError> {
        self.ensure_active(session)?;

        let question = self
            .provider
            .generate_question(true, Some(&session.question))
            .await
            .map_err(|e| {
                tracing::warn!("New question for session {} failed: {}", session.id, e);
                InterviewError::from(e)
            })?;

        session.question = question.clone();
        tracing::info!("Session {} switched to a new question", session.id);
        Ok(question)
    }

    /// Evaluates `user_code` against the session's current question.
    ///
    /// Validation happens before any external call. A provider failure is not
    /// an error here: its message becomes the submission's feedback. Sinks run
    /// only for evaluated submissions and their failures are only logged.
    pub async fn submit(
        &self,
        session: &Session,
        user_code: &str,
        email: Option<&str>,
    ) -> Result<Submission, InterviewError> {
        self.ensure_active(session)?;

        if user_code.trim().is_empty() {
            SUBMISSIONS_TOTAL.with_label_values(&["rejected"]).inc();
            return Err(InterviewError::EmptySubmission);
        }

        let email = email.map(str::trim).filter(|e| !e.is_empty());
        if self.require_email && email.is_none() {
            SUBMISSIONS_TOTAL.with_label_values(&["rejected"]).inc();
            return Err(InterviewError::MissingEmail);
        }

        // Snapshot before the provider call so later question changes cannot leak in
        let question = session.question.clone();

        let (feedback, feedback_available) =
            match self.provider.evaluate(user_code, &question).await {
                Ok(feedback) => (feedback, true),
                Err(e) => {
                    tracing::warn!("Evaluation failed for session {}: {}", session.id, e);
                    (e.to_string(), false)
                }
            };

        let submission = Submission {
            id: Uuid::new_v4(),
            session_id: session.id,
            question,
            user_code: user_code.to_string(),
            feedback,
            feedback_available,
            email: email.map(str::to_string),
            submitted_at: self.clock.now(),
        };

        if feedback_available {
            SUBMISSIONS_TOTAL.with_label_values(&["evaluated"]).inc();
            let reports = self.record(&submission).await;
            let failed = reports.iter().filter(|r| !r.is_ok()).count();
            if failed > 0 && failed == reports.len() {
                // The submission stands even when every sink failed
                tracing::warn!(
                    "Every result sink failed for submission {}",
                    submission.id
                );
            }
        } else {
            SUBMISSIONS_TOTAL.with_label_values(&["provider_unavailable"]).inc();
        }

        Ok(submission)
    }

    async fn record(&self, submission: &Submission) -> Vec<SinkReport> {
        result_sink::dispatch(&self.sinks, submission).await
    }

    fn ensure_active(&self, session: &Session) -> Result<(), InterviewError> {
        if self.status(session).state == SessionState::Expired {
            SESSIONS_TOTAL.with_label_values(&["expired_request"]).inc();
            tracing::info!("Rejected request on expired session {}", session.id);
            return Err(InterviewError::SessionExpired);
        }
        Ok(())
    }
}
