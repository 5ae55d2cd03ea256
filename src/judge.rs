//! Delegated answer judgment
//!
//! Free-response answers can be judged by a generative language model.
//! The model is asked a yes/no question embedding both the expected and
//! the given answer; the verifier reads the first word of its reply.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::constants::judge::ENDPOINT;

/// Errors raised while asking for a judgment
#[derive(Debug, Error)]
pub enum JudgeError {
    /// The request failed or the reply was not JSON
    ///
    /// The request URL carries the API key, so it is stripped from the
    /// wrapped error.
    #[error("judgment request failed: {0}")]
    Transport(#[source] reqwest::Error),
    /// The service answered with a non-success status
    #[error("judgment service returned status {0}")]
    Status(u16),
    /// The reply did not contain any text
    #[error("judgment reply carried no text")]
    MalformedReply,
}

impl From<reqwest::Error> for JudgeError {
    fn from(error: reqwest::Error) -> Self {
        Self::Transport(error.without_url())
    }
}

/// A service deciding whether a free-text answer matches the expected one
#[async_trait]
pub trait Judge: Send + Sync {
    /// Returns the service's raw textual reply
    async fn judge(&self, user_answer: &str, correct_answer: &str) -> Result<String, JudgeError>;
}

/// Whether a judgment reply accepts the answer
pub fn is_affirmative(reply: &str) -> bool {
    reply.trim().to_lowercase().starts_with("yes")
}

/// Prompt sent to the language model
pub fn judgment_prompt(user_answer: &str, correct_answer: &str) -> String {
    format!(
        "The user was asked a question. Correct answer: \"{correct_answer}\" User answer: \"{user_answer}\" Is the user's answer correct? Only reply \"Yes\" or \"No\"."
    )
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
}

impl GenerateContentRequest {
    fn from_prompt(prompt: String) -> Self {
        Self {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part { text: Some(prompt) }],
            }],
        }
    }
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

impl GenerateContentResponse {
    /// Text of the first part of the first candidate
    fn reply_text(self) -> Option<String> {
        self.candidates
            .into_iter()
            .next()?
            .content?
            .parts
            .into_iter()
            .next()?
            .text
            .map(|text| text.trim().to_string())
    }
}

/// Judge backed by the Gemini `generateContent` endpoint
#[derive(Clone)]
pub struct GeminiJudge {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl GeminiJudge {
    /// Creates a judge for the default endpoint
    pub fn new(client: reqwest::Client, api_key: impl Into<String>) -> Self {
        Self::with_endpoint(client, ENDPOINT, api_key)
    }

    /// Creates a judge for a custom endpoint
    pub fn with_endpoint(
        client: reqwest::Client,
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            api_key: api_key.into(),
        }
    }
}

impl std::fmt::Debug for GeminiJudge {
    /// Keeps the API key out of logs
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiJudge")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Judge for GeminiJudge {
    async fn judge(&self, user_answer: &str, correct_answer: &str) -> Result<String, JudgeError> {
        let request =
            GenerateContentRequest::from_prompt(judgment_prompt(user_answer, correct_answer));

        let response = self
            .client
            .post(&self.endpoint)
            .query(&[("key", &self.api_key)])
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(JudgeError::Status(status.as_u16()));
        }

        let reply = response
            .json::<GenerateContentResponse>()
            .await?
            .reply_text()
            .filter(|text| !text.is_empty())
            .ok_or(JudgeError::MalformedReply)?;

        debug!(%reply, "judgment received");

        Ok(reply)
    }
}
