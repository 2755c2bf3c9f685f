use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::{config::LlmConfig, error::ProviderError, metrics::track_provider_call};

/// Opening challenge handed out when a session starts.
pub const DEFAULT_QUESTION: &str =
    "Write a function that finds the longest palindrome in a given string.";

const EVALUATION_SYSTEM_PROMPT: &str = "You are an AI coding interviewer evaluating a candidate's code for efficiency and correctness.";

const QUESTION_SYSTEM_PROMPT: &str = "You are an AI coding interviewer. You write short, self-contained coding interview problems that can be solved in a single function.";

/// Generates interview questions and evaluates candidate code.
#[async_trait]
pub trait QuestionProvider: Send + Sync {
    /// With `force_new` the provider must return a question distinct from `current`.
    async fn generate_question(
        &self,
        force_new: bool,
        current: Option<&str>,
    ) -> Result<String, ProviderError>;

    async fn evaluate(&self, code: &str, question: &str) -> Result<String, ProviderError>;
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

/// OpenAI-compatible chat-completion client.
pub struct ChatCompletionProvider {
    http_client: Client,
    api_key: Option<String>,
    api_base_url: String,
    model: String,
    timeout: Option<Duration>,
}

impl ChatCompletionProvider {
    pub fn new(config: &LlmConfig) -> Self {
        Self {
            http_client: Client::new(),
            api_key: config.api_key.clone(),
            api_base_url: config.api_base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            timeout: config.timeout_seconds.map(Duration::from_secs),
        }
    }

    async fn chat(&self, system_prompt: &str, user_message: &str) -> Result<String, ProviderError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(ProviderError::MissingCredential)?;

        let url = format!("{}/chat/completions", self.api_base_url);
        let payload = ChatCompletionRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: user_message,
                },
            ],
        };

        tracing::debug!("Calling chat-completion API: {} model={}", url, self.model);

        let mut request = self.http_client.post(&url).bearer_auth(api_key).json(&payload);
        if let Some(timeout) = self.timeout {
            request = request.timeout(timeout);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                ProviderError::Timeout(self.timeout.map(|t| t.as_secs()).unwrap_or_default())
            } else {
                ProviderError::from(e)
            }
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::MalformedResponse(e.to_string()))?;

        completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or_else(|| {
                ProviderError::MalformedResponse("response contained no message content".into())
            })
    }
}

#[async_trait]
impl QuestionProvider for ChatCompletionProvider {
    async fn generate_question(
        &self,
        force_new: bool,
        current: Option<&str>,
    ) -> Result<String, ProviderError> {
        if !force_new {
            return Ok(DEFAULT_QUESTION.to_string());
        }

        let prompt = question_prompt(current);
        let question = track_provider_call(
            "generate_question",
            self.chat(QUESTION_SYSTEM_PROMPT, &prompt),
        )
        .await?;

        tracing::info!("Generated new interview question ({} chars)", question.len());
        Ok(question)
    }

    async fn evaluate(&self, code: &str, question: &str) -> Result<String, ProviderError> {
        let prompt = evaluation_prompt(code, question);
        track_provider_call("evaluate", self.chat(EVALUATION_SYSTEM_PROMPT, &prompt)).await
    }
}

fn evaluation_prompt(code: &str, question: &str) -> String {
    format!(
        "Here is the coding challenge:\n{}\n\nHere is the candidate's code:\n{}\n\nHow well does it solve the problem?",
        question, code
    )
}

fn question_prompt(current: Option<&str>) -> String {
    let mut prompt = String::from(
        "Write one new coding interview question. Reply with the problem statement only.",
    );
    if let Some(current) = current {
        prompt.push_str("\nIt must be a different problem from this one:\n");
        prompt.push_str(current);
    }
    prompt
}
