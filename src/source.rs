//! Remote question bank retrieval

use tracing::{debug, info};

use crate::question::{LoadError, QuestionBank};

/// Fetches and parses the question bank published at `url`
///
/// The bank is requested once; there is no retry.
///
/// # Errors
///
/// Returns [`LoadError::Transport`] if the request fails,
/// [`LoadError::Status`] on a non-success status, and
/// [`LoadError::Format`] if the body is not a question bank.
pub async fn fetch_bank(client: &reqwest::Client, url: &str) -> Result<QuestionBank, LoadError> {
    debug!(url, "requesting question bank");

    let response = client.get(url).send().await?;

    let status = response.status();
    if !status.is_success() {
        return Err(LoadError::Status(status.as_u16()));
    }

    let body = response.text().await?;
    let bank = QuestionBank::from_json(&body)?;

    info!(questions = bank.len(), "question bank loaded");

    Ok(bank)
}
