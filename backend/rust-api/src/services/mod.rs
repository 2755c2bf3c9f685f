use std::sync::Arc;

use crate::config::Config;
use crate::utils::time::{Clock, SystemClock};

pub mod email_service;
pub mod llm_service;
pub mod pdf_export;
pub mod result_sink;
pub mod results_log;
pub mod session_service;
pub mod session_store;

use email_service::EmailService;
use llm_service::{ChatCompletionProvider, QuestionProvider};
use pdf_export::PdfExporter;
use result_sink::ResultSink;
use results_log::ResultsLog;
use session_service::SessionService;
use session_store::SessionStore;

pub struct AppState {
    pub config: Config,
    pub sessions: SessionService,
    pub store: SessionStore,
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let provider: Arc<dyn QuestionProvider> =
            Arc::new(ChatCompletionProvider::new(&config.llm));
        let sinks = Self::build_sinks(&config);
        Self::with_parts(config, provider, sinks, Arc::new(SystemClock))
    }

    /// Assembles state around an explicit provider, sink list and clock.
    pub fn with_parts(
        config: Config,
        provider: Arc<dyn QuestionProvider>,
        sinks: Vec<Arc<dyn ResultSink>>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let sessions = SessionService::new(
            provider,
            sinks,
            clock.clone(),
            config.session_duration_seconds,
        )
        .with_required_email(config.require_email);

        tracing::info!(
            "Session service ready: time limit {}s, sinks {:?}",
            config.session_duration_seconds,
            sessions.sink_names()
        );

        Self {
            config,
            sessions,
            store: SessionStore::new(),
            clock,
        }
    }

    /// Result sinks enabled by configuration, in dispatch order.
    pub fn build_sinks(config: &Config) -> Vec<Arc<dyn ResultSink>> {
        let mut sinks: Vec<Arc<dyn ResultSink>> = Vec::new();

        if let Some(path) = &config.results_log_path {
            sinks.push(Arc::new(ResultsLog::new(path.clone())));
        }

        if config.email_enabled() {
            if config.smtp.sender_email.is_none() || config.smtp.sender_password.is_none() {
                tracing::warn!(
                    "SENDER_EMAIL/SENDER_PASSWORD not set; result emails will fail until configured"
                );
            }
            sinks.push(Arc::new(EmailService::new(config.smtp.clone())));
        }

        if let Some(dir) = &config.pdf_export_dir {
            sinks.push(Arc::new(PdfExporter::new(dir.clone())));
        }

        sinks
    }
}
