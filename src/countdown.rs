//! Buzz and answer window countdowns
//!
//! Both windows are whole-second countdowns that tick once per second and
//! show the remaining time on the surface. They differ only in what the
//! controller does when they stop or expire, so one type serves both.

use serde::{Deserialize, Serialize};
use web_time::Duration;

use crate::{
    Round,
    constants::countdown::TICK_MS,
    scheduler::{Scheduler, TimerHandle},
    surface::Surface,
};

/// Which window a countdown measures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Window {
    /// Time to buzz in after the reveal
    Buzz,
    /// Time to type an answer after buzzing
    Answer,
}

/// Phases of a countdown
///
/// `Stopped` is `Buzzed` for the buzz window and `Submitted` for the
/// answer window.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CountdownState {
    /// Not started
    #[default]
    Idle,
    /// Counting down
    Running,
    /// Stopped by the player before reaching zero
    Stopped,
    /// Reached zero
    Expired,
}

/// Messages used to drive countdowns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlarmMessage {
    /// One second elapsed
    Tick {
        /// Round the countdown belongs to
        round: Round,
        /// Window the tick belongs to
        window: Window,
    },
}

/// Text shown for `seconds` remaining
pub fn timer_text(seconds: u64) -> String {
    format!("⏱ {seconds}")
}

/// A one-second-resolution countdown
#[derive(Debug)]
pub struct Countdown {
    window: Window,
    remaining: u64,
    state: CountdownState,
    handle: Option<TimerHandle>,
}

impl Countdown {
    /// Creates an idle countdown for `window`
    pub fn new(window: Window) -> Self {
        Self {
            window,
            remaining: 0,
            state: CountdownState::Idle,
            handle: None,
        }
    }

    /// Window this countdown measures
    pub fn window(&self) -> Window {
        self.window
    }

    /// Current phase
    pub fn state(&self) -> CountdownState {
        self.state
    }

    /// Whole seconds left
    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    fn change_state(&mut self, before: CountdownState, after: CountdownState) -> bool {
        if self.state == before {
            self.state = after;
            true
        } else {
            false
        }
    }

    /// Starts counting down from `length`, rounded down to whole seconds
    ///
    /// A countdown left running from an earlier start is cancelled first.
    pub fn start<S: Scheduler, D: Surface>(
        &mut self,
        length: Duration,
        round: Round,
        scheduler: &mut S,
        surface: &D,
    ) {
        self.stop_timer(scheduler);

        self.remaining = length.as_secs();
        self.state = CountdownState::Running;
        surface.set_timer_text(&timer_text(self.remaining));

        self.handle = Some(scheduler.schedule_repeating(
            AlarmMessage::Tick {
                round,
                window: self.window,
            }
            .into(),
            Duration::from_millis(TICK_MS),
        ));
    }

    /// Counts one second down
    ///
    /// # Returns
    ///
    /// `true` on the tick that reaches zero. Ticks arriving while the
    /// countdown is not running are ignored and return `false`.
    pub fn tick<S: Scheduler, D: Surface>(&mut self, scheduler: &mut S, surface: &D) -> bool {
        if self.state != CountdownState::Running {
            return false;
        }

        self.remaining = self.remaining.saturating_sub(1);
        surface.set_timer_text(&timer_text(self.remaining));

        if self.remaining > 0 {
            return false;
        }

        self.stop_timer(scheduler);
        self.change_state(CountdownState::Running, CountdownState::Expired)
    }

    /// Stops a running countdown before it expires
    ///
    /// # Returns
    ///
    /// `true` if the countdown was running.
    pub fn stop<S: Scheduler>(&mut self, scheduler: &mut S) -> bool {
        self.stop_timer(scheduler);
        self.change_state(CountdownState::Running, CountdownState::Stopped)
    }

    /// Cancels the countdown whatever its phase and returns it to idle
    pub fn reset<S: Scheduler>(&mut self, scheduler: &mut S) {
        self.stop_timer(scheduler);
        self.remaining = 0;
        self.state = CountdownState::Idle;
    }

    fn stop_timer<S: Scheduler>(&mut self, scheduler: &mut S) {
        if let Some(handle) = self.handle.take() {
            scheduler.cancel(handle);
        }
    }
}
