//! Character-by-character question reveal
//!
//! The reveal clears the question text and then appends one character per
//! tick until the whole text is shown.

use serde::{Deserialize, Serialize};
use web_time::Duration;

use crate::{
    Round,
    scheduler::{Scheduler, TimerHandle},
    surface::Surface,
};

/// Phases of a reveal
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RevealState {
    /// Nothing has been revealed yet
    #[default]
    Idle,
    /// Characters are being appended
    Revealing,
    /// The full text is shown
    Done,
}

/// Messages used to drive a reveal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlarmMessage {
    /// Append the next character
    Tick {
        /// Round the reveal belongs to
        round: Round,
    },
}

/// Progressive display of a question's text
#[derive(Debug, Default)]
pub struct Reveal {
    text: Vec<char>,
    position: usize,
    state: RevealState,
    handle: Option<TimerHandle>,
}

impl Reveal {
    /// Current phase
    pub fn state(&self) -> RevealState {
        self.state
    }

    /// Number of characters shown so far
    pub fn revealed(&self) -> usize {
        self.position
    }

    fn change_state(&mut self, before: RevealState, after: RevealState) -> bool {
        if self.state == before {
            self.state = after;
            true
        } else {
            false
        }
    }

    /// Starts revealing `text`, one character every `interval`
    ///
    /// Any reveal still running is cancelled first, so two reveals never
    /// tick against the same surface.
    pub fn start<S: Scheduler, D: Surface>(
        &mut self,
        text: &str,
        interval: Duration,
        round: Round,
        scheduler: &mut S,
        surface: &D,
    ) {
        self.cancel(scheduler);

        self.text = text.chars().collect();
        self.position = 0;
        self.state = RevealState::Revealing;

        surface.set_question_text("");

        self.handle =
            Some(scheduler.schedule_repeating(AlarmMessage::Tick { round }.into(), interval));
    }

    /// Appends the next character
    ///
    /// # Returns
    ///
    /// `true` on the tick that completes the reveal, `false` otherwise
    /// (including ticks arriving after completion or cancellation).
    pub fn tick<S: Scheduler, D: Surface>(&mut self, scheduler: &mut S, surface: &D) -> bool {
        if self.state != RevealState::Revealing {
            return false;
        }

        if let Some(character) = self.text.get(self.position) {
            surface.append_question_char(*character);
            self.position += 1;
        }

        if self.position < self.text.len() {
            return false;
        }

        self.stop_timer(scheduler);
        self.change_state(RevealState::Revealing, RevealState::Done)
    }

    /// Stops the reveal where it is
    pub fn cancel<S: Scheduler>(&mut self, scheduler: &mut S) {
        self.stop_timer(scheduler);
        self.change_state(RevealState::Revealing, RevealState::Idle);
    }

    fn stop_timer<S: Scheduler>(&mut self, scheduler: &mut S) {
        if let Some(handle) = self.handle.take() {
            scheduler.cancel(handle);
        }
    }
}
