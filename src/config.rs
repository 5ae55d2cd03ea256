//! Round timing and service configuration
//!
//! [`Options`] gathers everything a session can tune: the reveal speed,
//! the two countdown lengths, and the locations of the question bank and
//! the judgment service. Options are validated with `garde` before a game
//! is built from them.

use garde::Validate;
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use thiserror::Error;
use web_time::Duration;

use crate::constants::{answer_window, buzz_window, judge, reveal, source};

/// Configuration that failed validation
#[derive(Debug, Error)]
#[error("invalid options: {0}")]
pub struct ConfigError(#[from] garde::Report);

/// Validation result type for duration validation
type ValidationResult = garde::Result;

/// Validates that a duration lasts at least `MIN_MILLIS`
fn validate_min_millis<const MIN_MILLIS: u64>(val: &Duration, _ctx: &()) -> ValidationResult {
    if val.as_millis() >= u128::from(MIN_MILLIS) {
        Ok(())
    } else {
        Err(garde::Error::new(format!("shorter than {MIN_MILLIS}ms")))
    }
}

/// Validates that a duration in whole seconds falls within `[MIN_SECONDS, MAX_SECONDS]`
fn validate_seconds<const MIN_SECONDS: u64, const MAX_SECONDS: u64>(
    val: &Duration,
    _ctx: &(),
) -> ValidationResult {
    if (MIN_SECONDS..=MAX_SECONDS).contains(&val.as_secs()) {
        Ok(())
    } else {
        Err(garde::Error::new(format!(
            "outside of bounds [{MIN_SECONDS},{MAX_SECONDS}]",
        )))
    }
}

fn default_reveal_interval() -> Duration {
    Duration::from_millis(reveal::DEFAULT_INTERVAL_MS)
}

fn default_buzz_window() -> Duration {
    Duration::from_secs(buzz_window::DEFAULT_SECONDS)
}

fn default_answer_window() -> Duration {
    Duration::from_secs(answer_window::DEFAULT_SECONDS)
}

fn default_bank_url() -> String {
    source::QUESTION_URL.to_string()
}

fn default_judge_endpoint() -> String {
    judge::ENDPOINT.to_string()
}

/// Reads a user-entered reveal speed in milliseconds per character
///
/// Only the leading digits count, so `"20ms"` reads as 20 and `"1.5"` as 1.
/// Input without leading digits, or below one millisecond, falls back to
/// the default speed.
pub fn parse_reveal_interval(input: &str) -> Duration {
    let input = input.trim_start();
    let digits = input
        .find(|c: char| !c.is_ascii_digit())
        .map_or(input, |end| &input[..end]);

    digits
        .parse::<u64>()
        .ok()
        .filter(|millis| *millis >= reveal::MIN_INTERVAL_MS)
        .map_or_else(default_reveal_interval, Duration::from_millis)
}

/// Session options
#[serde_with::serde_as]
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct Options {
    /// Delay between two revealed characters
    #[garde(custom(validate_min_millis::<{ reveal::MIN_INTERVAL_MS }>))]
    #[serde_as(as = "serde_with::DurationMilliSeconds<u64>")]
    #[serde(default = "default_reveal_interval")]
    pub reveal_interval: Duration,
    /// Time to buzz in once the question is fully shown
    #[garde(custom(validate_seconds::<{ buzz_window::MIN_SECONDS }, { buzz_window::MAX_SECONDS }>))]
    #[serde_as(as = "serde_with::DurationSeconds<u64>")]
    #[serde(default = "default_buzz_window")]
    pub buzz_window: Duration,
    /// Time to answer once buzzed in
    #[garde(custom(validate_seconds::<{ answer_window::MIN_SECONDS }, { answer_window::MAX_SECONDS }>))]
    #[serde_as(as = "serde_with::DurationSeconds<u64>")]
    #[serde(default = "default_answer_window")]
    pub answer_window: Duration,
    /// Where the question bank is published
    #[garde(length(min = 1))]
    #[serde(default = "default_bank_url")]
    pub bank_url: String,
    /// Judgment service endpoint, used only when a key is supplied
    #[garde(length(min = 1))]
    #[serde(default = "default_judge_endpoint")]
    pub judge_endpoint: String,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            reveal_interval: default_reveal_interval(),
            buzz_window: default_buzz_window(),
            answer_window: default_answer_window(),
            bank_url: default_bank_url(),
            judge_endpoint: default_judge_endpoint(),
        }
    }
}

impl Options {
    /// Sets the reveal delay
    #[must_use]
    pub fn with_reveal_interval(mut self, interval: Duration) -> Self {
        self.reveal_interval = interval;
        self
    }

    /// Sets the buzz window length
    #[must_use]
    pub fn with_buzz_window(mut self, window: Duration) -> Self {
        self.buzz_window = window;
        self
    }

    /// Sets the answer window length
    #[must_use]
    pub fn with_answer_window(mut self, window: Duration) -> Self {
        self.answer_window = window;
        self
    }

    /// Checks every bound and returns the options unchanged when they hold
    pub fn validated(self) -> Result<Self, ConfigError> {
        self.validate()?;
        Ok(self)
    }
}
