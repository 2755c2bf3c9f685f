use async_trait::async_trait;
use futures::future::join_all;
use std::sync::Arc;

use crate::{error::SinkError, metrics::record_sink_outcome, models::Submission};

/// Somewhere a finished submission is recorded or forwarded.
#[async_trait]
pub trait ResultSink: Send + Sync {
    fn name(&self) -> &'static str;

    async fn record(&self, submission: &Submission) -> Result<(), SinkError>;
}

/// Outcome of one sink for one submission.
#[derive(Debug, Clone)]
pub struct SinkReport {
    pub sink: &'static str,
    pub error: Option<String>,
}

impl SinkReport {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Forwards `submission` to every sink concurrently. Failures are logged and reported, never raised.
pub async fn dispatch(sinks: &[Arc<dyn ResultSink>], submission: &Submission) -> Vec<SinkReport> {
    let writes = sinks.iter().map(|sink| async move {
        let name = sink.name();
        let error = match sink.record(submission).await {
            Ok(()) => {
                tracing::debug!("Submission {} recorded by sink {}", submission.id, name);
                None
            }
            Err(e) => {
                tracing::warn!(
                    "Result sink {} failed for submission {}: {}",
                    name,
                    submission.id,
                    e
                );
                Some(e.to_string())
            }
        };
        record_sink_outcome(name, error.is_none());
        SinkReport { sink: name, error }
    });

    join_all(writes).await
}
