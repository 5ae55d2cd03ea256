//! Per-category score keeping
//!
//! This module tracks how many questions of each category were answered
//! correctly or wrongly during the session. Entries are created on the
//! first resolved question of a category and only ever grow.

use std::{collections::BTreeMap, fmt};

use enum_map::{Enum, EnumMap};
use serde::{Deserialize, Serialize};

/// How a resolved question ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Enum, Serialize, Deserialize)]
pub enum Outcome {
    /// The answer was accepted
    Correct,
    /// The answer was rejected, or left empty
    Wrong,
}

impl From<bool> for Outcome {
    fn from(correct: bool) -> Self {
        if correct { Self::Correct } else { Self::Wrong }
    }
}

/// Correct and wrong counts of one category
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tally(EnumMap<Outcome, u32>);

impl Tally {
    /// Number of accepted answers
    pub fn correct(&self) -> u32 {
        self.0[Outcome::Correct]
    }

    /// Number of rejected answers
    pub fn wrong(&self) -> u32 {
        self.0[Outcome::Wrong]
    }

    /// Number of resolved questions
    pub fn total(&self) -> u32 {
        self.0.values().sum()
    }

    fn add(&mut self, outcome: Outcome) {
        self.0[outcome] += 1;
    }
}

/// Session score board, keyed by category
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreBoard {
    tallies: BTreeMap<String, Tally>,
}

impl ScoreBoard {
    /// Records one resolved question
    ///
    /// # Arguments
    ///
    /// * `category` - Category of the question
    /// * `correct` - Whether the answer was accepted
    pub fn record(&mut self, category: &str, correct: bool) {
        self.tallies
            .entry(category.to_string())
            .or_default()
            .add(correct.into());
    }

    /// Read-only view of every category's tally
    pub fn snapshot(&self) -> &BTreeMap<String, Tally> {
        &self.tallies
    }

    /// Tally of one category, if any question of it was resolved
    pub fn tally(&self, category: &str) -> Option<Tally> {
        self.tallies.get(category).copied()
    }

    /// Whether no question has been resolved yet
    pub fn is_empty(&self) -> bool {
        self.tallies.is_empty()
    }
}

impl fmt::Display for ScoreBoard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Scores by Category")?;
        for (category, tally) in &self.tallies {
            write!(f, "\n{category}: ✅ {} | ❌ {}", tally.correct(), tally.wrong())?;
        }
        Ok(())
    }
}
