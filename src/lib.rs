//! # buzzbowl
//!
//! Core of a buzz-in trivia round: a question bank with category filtering,
//! a character-by-character question reveal, buzz and answer countdowns,
//! answer verification (direct or delegated to a language model) and
//! per-category score keeping, sequenced by a single lifecycle controller.
//!
//! Rendering goes through the [`surface::Surface`] trait and timing through
//! the [`scheduler::Scheduler`] trait, so the controller runs the same way
//! against a terminal, a browser front end, or a virtual clock in tests.

#![cfg_attr(all(coverage_nightly, test), feature(coverage_attribute))]
#![deny(missing_docs)]
#![deny(rustdoc::missing_crate_level_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::missing_errors_doc)]
use serde::{Deserialize, Serialize};

pub mod config;
pub mod constants;
pub mod countdown;
pub mod game;
pub mod judge;
pub mod question;
pub mod reveal;
pub mod scheduler;
pub mod scoreboard;
pub mod source;
pub mod surface;
pub mod verifier;

/// Identifies one question's lifecycle
///
/// Every alarm carries the round it was scheduled for. Starting a new
/// question advances the round, so ticks left over from an earlier
/// question are recognised and dropped.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
    derive_more::Display,
)]
pub struct Round(u64);

impl Round {
    /// The round following this one
    #[must_use]
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

/// Alarm messages for timed events
///
/// Alarms are produced by a [`scheduler::Scheduler`] at a fixed period and
/// fed back to [`game::Game::receive_alarm`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::From, Serialize, Deserialize)]
pub enum AlarmMessage {
    /// Question reveal alarms
    Reveal(reveal::AlarmMessage),
    /// Buzz and answer window alarms
    Countdown(countdown::AlarmMessage),
}

impl AlarmMessage {
    /// Round the alarm was scheduled for
    pub fn round(&self) -> Round {
        match self {
            Self::Reveal(reveal::AlarmMessage::Tick { round })
            | Self::Countdown(countdown::AlarmMessage::Tick { round, .. }) => *round,
        }
    }
}
