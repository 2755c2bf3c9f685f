use async_trait::async_trait;
use std::path::PathBuf;
use tokio::{fs::OpenOptions, io::AsyncWriteExt, sync::Mutex};

use crate::{
    error::SinkError, models::Submission, services::result_sink::ResultSink,
    utils::time::format_timestamp,
};

pub const RESULTS_LOG_HEADER: &str = "Timestamp,Email,Question,User Code,AI Feedback";

/// Escapes CSV field to prevent formula injection attacks.
/// Prefixes dangerous characters (=, +, @, -, tab, newline) with a tab to neutralize them.
/// Also wraps fields containing special characters in quotes.
pub fn escape_csv_field(value: &str) -> String {
    let sanitized = if value.starts_with(['=', '+', '@', '-', '\t', '\r', '\n']) {
        format!("\t{}", value)
    } else {
        value.to_string()
    };

    if sanitized.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", sanitized.replace('"', "\"\""))
    } else {
        sanitized
    }
}

/// Append-only CSV file with one row per submission.
pub struct ResultsLog {
    path: PathBuf,
    // Serialises header check + append so rows from concurrent sessions never interleave
    write_lock: Mutex<()>,
}

impl ResultsLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn format_row(submission: &Submission) -> String {
        let fields = [
            format_timestamp(&submission.submitted_at),
            submission.email.clone().unwrap_or_default(),
            submission.question.clone(),
            submission.user_code.clone(),
            submission.feedback.clone(),
        ];

        let mut row = fields
            .iter()
            .map(|field| escape_csv_field(field))
            .collect::<Vec<_>>()
            .join(",");
        row.push('\n');
        row
    }

    pub async fn append(&self, submission: &Submission) -> Result<(), SinkError> {
        let row = Self::format_row(submission);
        let _guard = self.write_lock.lock().await;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let needs_header = match tokio::fs::metadata(&self.path).await {
            Ok(meta) => meta.len() == 0,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => true,
            Err(e) => return Err(e.into()),
        };

        let mut chunk = String::with_capacity(row.len() + RESULTS_LOG_HEADER.len() + 1);
        if needs_header {
            chunk.push_str(RESULTS_LOG_HEADER);
            chunk.push('\n');
        }
        chunk.push_str(&row);

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(chunk.as_bytes()).await?;
        file.flush().await?;

        Ok(())
    }
}

#[async_trait]
impl ResultSink for ResultsLog {
    fn name(&self) -> &'static str {
        "results_log"
    }

    async fn record(&self, submission: &Submission) -> Result<(), SinkError> {
        self.append(submission).await
    }
}
