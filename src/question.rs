//! Question bank loading, filtering and random selection
//!
//! The bank is parsed from a JSON document of the form
//! `{"questions": [...]}`. Bonus questions are dropped on load and never
//! take part in category listing or draws.

use std::collections::BTreeSet;

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::source::UNKNOWN_LABEL;

/// Errors raised while loading the question bank
#[derive(Debug, Error)]
pub enum LoadError {
    /// The request never produced a response
    #[error("question bank request failed: {0}")]
    Transport(#[from] reqwest::Error),
    /// The server answered with a non-success status
    #[error("question bank request returned status {0}")]
    Status(u16),
    /// The payload is not a `questions` array of question records
    #[error("invalid question file format: {0}")]
    Format(#[from] serde_json::Error),
}

/// No question matches the current category selection
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("no questions in selected categories")]
pub struct EmptyPoolError;

/// A single question as published in the bank
///
/// Questions are immutable once loaded. A missing category or type reads
/// as `"Unknown"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    #[serde(default)]
    category: Option<String>,
    #[serde(rename = "type", default)]
    kind: Option<String>,
    parsed_question: String,
    parsed_answer: String,
    #[serde(default)]
    bonus: Option<bool>,
}

impl Question {
    /// Creates a question from its parts
    pub fn new(
        category: impl Into<String>,
        kind: impl Into<String>,
        parsed_question: impl Into<String>,
        parsed_answer: impl Into<String>,
        bonus: bool,
    ) -> Self {
        Self {
            category: Some(category.into()),
            kind: Some(kind.into()),
            parsed_question: parsed_question.into(),
            parsed_answer: parsed_answer.into(),
            bonus: Some(bonus),
        }
    }

    /// Category name, `"Unknown"` when the record has none
    pub fn category(&self) -> &str {
        self.category.as_deref().unwrap_or(UNKNOWN_LABEL)
    }

    /// Question type as written in the bank, e.g. `"Multiple Choice"`
    pub fn kind(&self) -> &str {
        self.kind.as_deref().unwrap_or(UNKNOWN_LABEL)
    }

    /// The question text
    pub fn text(&self) -> &str {
        &self.parsed_question
    }

    /// The expected answer
    pub fn answer(&self) -> &str {
        &self.parsed_answer
    }

    /// Whether the question is a multiple choice one
    pub fn is_multiple_choice(&self) -> bool {
        self.kind().to_lowercase().contains("multiple")
    }

    /// Only records explicitly flagged `bonus: false` belong to the tossup pool
    fn is_tossup(&self) -> bool {
        self.bonus == Some(false)
    }

    /// Text revealed to the player: type and category header, then the question
    pub fn display_text(&self) -> String {
        format!(
            "TYPE: {}\nCATEGORY: {}\n\n{}",
            self.kind(),
            self.category(),
            self.parsed_question
        )
    }
}

#[derive(Deserialize)]
struct BankFile {
    questions: Vec<Question>,
}

/// The tossup questions of a loaded bank
#[derive(Debug, Clone, Default)]
pub struct QuestionBank {
    questions: Vec<Question>,
}

impl QuestionBank {
    /// Builds a bank, dropping every question not flagged as a tossup
    pub fn from_questions<I: IntoIterator<Item = Question>>(questions: I) -> Self {
        Self {
            questions: questions.into_iter().filter(Question::is_tossup).collect(),
        }
    }

    /// Parses a bank from its JSON document
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::Format`] when the document has no `questions`
    /// array or one of its records lacks the question or answer text.
    pub fn from_json(json: &str) -> Result<Self, LoadError> {
        let file: BankFile = serde_json::from_str(json)?;
        Ok(Self::from_questions(file.questions))
    }

    /// Number of questions in the pool
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    /// Whether the pool has no questions at all
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// Question at `index`, as returned by [`QuestionBank::draw_index_with`]
    pub fn get(&self, index: usize) -> Option<&Question> {
        self.questions.get(index)
    }

    /// Sorted, distinct category names
    pub fn categories(&self) -> Vec<String> {
        self.questions
            .iter()
            .map(Question::category)
            .unique()
            .sorted()
            .map(ToOwned::to_owned)
            .collect_vec()
    }

    /// Draws a uniformly random question from the selected categories
    ///
    /// # Errors
    ///
    /// Returns [`EmptyPoolError`] if `selected` is empty or no question
    /// belongs to it.
    pub fn draw(&self, selected: &BTreeSet<String>) -> Result<&Question, EmptyPoolError> {
        self.draw_with(&mut fastrand::Rng::new(), selected)
    }

    /// Same as [`QuestionBank::draw`] with an explicit random source
    ///
    /// # Errors
    ///
    /// Returns [`EmptyPoolError`] if no question matches.
    pub fn draw_with(
        &self,
        rng: &mut fastrand::Rng,
        selected: &BTreeSet<String>,
    ) -> Result<&Question, EmptyPoolError> {
        let index = self.draw_index_with(rng, selected)?;
        self.questions.get(index).ok_or(EmptyPoolError)
    }

    /// Draws the index of a random question from the selected categories
    ///
    /// # Errors
    ///
    /// Returns [`EmptyPoolError`] if no question matches.
    pub fn draw_index_with(
        &self,
        rng: &mut fastrand::Rng,
        selected: &BTreeSet<String>,
    ) -> Result<usize, EmptyPoolError> {
        let pool = self
            .questions
            .iter()
            .positions(|question| selected.contains(question.category()))
            .collect_vec();

        if pool.is_empty() {
            return Err(EmptyPoolError);
        }

        Ok(pool[rng.usize(..pool.len())])
    }
}
