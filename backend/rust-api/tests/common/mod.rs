#![allow(dead_code)]

use async_trait::async_trait;
use axum::{body::to_bytes, response::Response, Router};
use chrono::{DateTime, TimeZone, Utc};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;
use uuid::Uuid;

use interview_sim_api::{
    config::Config,
    create_router,
    error::{ProviderError, SinkError},
    models::Submission,
    services::{
        llm_service::{QuestionProvider, DEFAULT_QUESTION},
        result_sink::ResultSink,
        AppState,
    },
    utils::time::ManualClock,
};

pub const FAKE_FEEDBACK: &str = "Correct, runs in O(n).";

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 3, 10, 0, 0).unwrap()
}

pub fn temp_path(prefix: &str) -> PathBuf {
    std::env::temp_dir().join(format!("{}-{}", prefix, Uuid::new_v4()))
}

/// Config with every side-effecting sink switched off.
pub fn quiet_config() -> Config {
    let mut config = Config::default();
    config.results_log_path = None;
    config.smtp.send_disabled = true;
    config
}

/// Scripted provider: numbered questions, canned feedback, optional failures.
#[derive(Default)]
pub struct FakeProvider {
    pub generate_calls: AtomicUsize,
    pub evaluate_calls: AtomicUsize,
    pub evaluated_questions: Mutex<Vec<String>>,
    pub fail_generate: bool,
    pub fail_evaluate: bool,
}

impl FakeProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_evaluation() -> Self {
        Self {
            fail_evaluate: true,
            ..Self::default()
        }
    }

    pub fn failing_generation() -> Self {
        Self {
            fail_generate: true,
            ..Self::default()
        }
    }

    pub fn evaluations(&self) -> usize {
        self.evaluate_calls.load(Ordering::SeqCst)
    }

    pub fn generations(&self) -> usize {
        self.generate_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl QuestionProvider for FakeProvider {
    async fn generate_question(
        &self,
        force_new: bool,
        _current: Option<&str>,
    ) -> Result<String, ProviderError> {
        if !force_new {
            return Ok(DEFAULT_QUESTION.to_string());
        }
        let n = self.generate_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_generate {
            return Err(ProviderError::Status {
                status: 503,
                body: "overloaded".into(),
            });
        }
        Ok(format!("Generated question #{}", n))
    }

    async fn evaluate(&self, _code: &str, question: &str) -> Result<String, ProviderError> {
        self.evaluate_calls.fetch_add(1, Ordering::SeqCst);
        self.evaluated_questions
            .lock()
            .unwrap()
            .push(question.to_string());
        if self.fail_evaluate {
            return Err(ProviderError::MissingCredential);
        }
        Ok(FAKE_FEEDBACK.to_string())
    }
}

/// Provider whose evaluation blocks until the test releases it.
#[derive(Default)]
pub struct GatedProvider {
    pub entered: Notify,
    pub release: Notify,
}

#[async_trait]
impl QuestionProvider for GatedProvider {
    async fn generate_question(
        &self,
        _force_new: bool,
        _current: Option<&str>,
    ) -> Result<String, ProviderError> {
        Ok(DEFAULT_QUESTION.to_string())
    }

    async fn evaluate(&self, _code: &str, _question: &str) -> Result<String, ProviderError> {
        self.entered.notify_one();
        self.release.notified().await;
        Ok(FAKE_FEEDBACK.to_string())
    }
}

/// Sink that keeps every submission it sees.
#[derive(Default)]
pub struct RecordingSink {
    pub records: Mutex<Vec<Submission>>,
}

impl RecordingSink {
    pub fn count(&self) -> usize {
        self.records.lock().unwrap().len()
    }
}

#[async_trait]
impl ResultSink for RecordingSink {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn record(&self, submission: &Submission) -> Result<(), SinkError> {
        self.records.lock().unwrap().push(submission.clone());
        Ok(())
    }
}

/// Sink that always fails, like an unreachable SMTP relay.
pub struct FailingSink;

#[async_trait]
impl ResultSink for FailingSink {
    fn name(&self) -> &'static str {
        "failing"
    }

    async fn record(&self, _submission: &Submission) -> Result<(), SinkError> {
        Err(SinkError::Email("connection refused".into()))
    }
}

pub struct TestHarness {
    pub state: Arc<AppState>,
    pub provider: Arc<FakeProvider>,
    pub clock: Arc<ManualClock>,
}

impl TestHarness {
    pub fn new(config: Config, provider: FakeProvider, sinks: Vec<Arc<dyn ResultSink>>) -> Self {
        init_tracing();
        let provider = Arc::new(provider);
        let clock = Arc::new(ManualClock::new(start_time()));
        let state = Arc::new(AppState::with_parts(
            config,
            provider.clone(),
            sinks,
            clock.clone(),
        ));
        Self {
            state,
            provider,
            clock,
        }
    }

    pub fn quiet() -> Self {
        Self::new(quiet_config(), FakeProvider::new(), Vec::new())
    }

    pub fn router(&self) -> Router {
        create_router(self.state.clone())
    }
}

pub async fn read_json(response: Response) -> serde_json::Value {
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&body).unwrap_or_else(|e| {
        panic!(
            "response is not JSON ({}): {}",
            e,
            String::from_utf8_lossy(&body)
        )
    })
}
