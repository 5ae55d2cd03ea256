//! Round lifecycle controller
//!
//! This module sequences one question at a time: draw from the bank,
//! reveal it, open the buzz window, open the answer window after a buzz,
//! verify and score the answer, then wait for the player to move on.
//! Every timed step arrives as an [`AlarmMessage`] through
//! [`Game::receive_alarm`]; alarms scheduled for an earlier round are
//! dropped.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{
    AlarmMessage, Round,
    config::Options,
    countdown::{self, Countdown, Window},
    question::{EmptyPoolError, Question, QuestionBank},
    reveal::Reveal,
    scheduler::Scheduler,
    scoreboard::ScoreBoard,
    surface::Surface,
    verifier::{Verdict, Verifier},
};

/// Result text shown when the buzz window runs out
pub const NO_BUZZ_TEXT: &str = "Time up! You did not buzz.";

/// Question text shown when the selection matches no question
pub const EMPTY_POOL_TEXT: &str = "No questions in selected categories!";

/// Phases of a round
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum State {
    /// No question is in play
    #[default]
    Idle,
    /// The question text is being revealed
    Revealing,
    /// The buzz window is running
    AwaitingBuzz,
    /// The player buzzed and the answer window is running
    AwaitingAnswer,
    /// The answer is being verified
    Resolving,
    /// The round is over; the next buzz starts a new one
    WaitingForNext,
}

/// What a buzz signal did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BuzzOutcome {
    /// The player buzzed in and may now answer
    Buzzed,
    /// The round was over and a new question was started
    Advanced,
    /// The signal had no meaning in the current phase
    Ignored,
}

/// Result text for a resolved question
pub fn result_text(question: &Question, user_answer: &str, correct: bool) -> String {
    let user_answer = if user_answer.is_empty() {
        "(none)"
    } else {
        user_answer
    };
    let verdict = if correct { "✅ Correct!" } else { "❌ Wrong!" };

    format!(
        "Q: {}\nCorrect: {}\nYour Answer: {user_answer}\n{verdict}",
        question.text(),
        question.answer()
    )
}

/// A single-player session
#[derive(Debug)]
pub struct Game {
    bank: QuestionBank,
    options: Options,
    verifier: Verifier,
    scores: ScoreBoard,
    selection: BTreeSet<String>,
    rng: fastrand::Rng,

    state: State,
    round: Round,
    current: Option<usize>,
    answer_text: String,

    reveal: Reveal,
    buzz_window: Countdown,
    answer_window: Countdown,
}

impl Game {
    /// Creates an idle session with every category of `bank` selected
    pub fn new(bank: QuestionBank, options: Options, verifier: Verifier) -> Self {
        let selection = bank.categories().into_iter().collect();

        Self {
            bank,
            options,
            verifier,
            scores: ScoreBoard::default(),
            selection,
            rng: fastrand::Rng::new(),
            state: State::Idle,
            round: Round::default(),
            current: None,
            answer_text: String::new(),
            reveal: Reveal::default(),
            buzz_window: Countdown::new(Window::Buzz),
            answer_window: Countdown::new(Window::Answer),
        }
    }

    /// Uses `rng` for question draws
    #[must_use]
    pub fn with_rng(mut self, rng: fastrand::Rng) -> Self {
        self.rng = rng;
        self
    }

    /// Replaces the category selection used by the next draws
    pub fn select_categories<I: IntoIterator<Item = String>>(&mut self, categories: I) {
        self.selection = categories.into_iter().collect();
    }

    /// Sorted, distinct categories of the bank
    pub fn categories(&self) -> Vec<String> {
        self.bank.categories()
    }

    /// Categories draws are taken from
    pub fn selection(&self) -> &BTreeSet<String> {
        &self.selection
    }

    /// Current phase
    pub fn state(&self) -> State {
        self.state
    }

    /// Current round; advances on every start
    pub fn round(&self) -> Round {
        self.round
    }

    /// Scores of the session so far
    pub fn scores(&self) -> &ScoreBoard {
        &self.scores
    }

    /// Question in play, if any
    pub fn current_question(&self) -> Option<&Question> {
        self.current.and_then(|index| self.bank.get(index))
    }

    /// Options the session runs with
    pub fn options(&self) -> &Options {
        &self.options
    }

    fn change_state(&mut self, before: State, after: State) -> bool {
        if self.state == before {
            debug!(?before, ?after, round = %self.round, "state change");
            self.state = after;
            true
        } else {
            false
        }
    }

    fn cancel_timers<S: Scheduler>(&mut self, scheduler: &mut S) {
        self.reveal.cancel(scheduler);
        self.buzz_window.reset(scheduler);
        self.answer_window.reset(scheduler);
    }

    /// Starts a new round with a question drawn from the selection
    ///
    /// Allowed from any phase: whatever was running is cancelled.
    ///
    /// # Errors
    ///
    /// Returns [`EmptyPoolError`] if the selection matches no question. The
    /// session is then idle and the surface shows a warning.
    pub fn start<S: Scheduler, D: Surface>(
        &mut self,
        scheduler: &mut S,
        surface: &D,
    ) -> Result<(), EmptyPoolError> {
        self.cancel_timers(scheduler);
        self.round = self.round.next();
        self.answer_text.clear();

        surface.set_result_text("");
        surface.set_answer_input_enabled(false);

        let drawn = self
            .bank
            .draw_index_with(&mut self.rng, &self.selection)
            .and_then(|index| {
                self.bank
                    .get(index)
                    .map(|question| (index, question.display_text()))
                    .ok_or(EmptyPoolError)
            });

        match drawn {
            Ok((index, text)) => {
                self.current = Some(index);
                self.state = State::Revealing;
                debug!(round = %self.round, index, "question drawn");

                self.reveal.start(
                    &text,
                    self.options.reveal_interval,
                    self.round,
                    scheduler,
                    surface,
                );
                Ok(())
            }
            Err(error) => {
                self.current = None;
                self.state = State::Idle;
                warn!(selection = ?self.selection, "no questions in selected categories");

                surface.set_question_text(EMPTY_POOL_TEXT);
                surface.show_warning(EMPTY_POOL_TEXT);
                Err(error)
            }
        }
    }

    /// Handles the buzz signal
    ///
    /// While the buzz window runs this buzzes in. Once a round is over the
    /// same signal starts the next one.
    ///
    /// # Errors
    ///
    /// Returns [`EmptyPoolError`] if advancing found no question.
    pub fn buzz<S: Scheduler, D: Surface>(
        &mut self,
        scheduler: &mut S,
        surface: &D,
    ) -> Result<BuzzOutcome, EmptyPoolError> {
        match self.state {
            State::AwaitingBuzz => {
                self.buzz_window.stop(scheduler);
                self.change_state(State::AwaitingBuzz, State::AwaitingAnswer);
                self.answer_text.clear();

                surface.set_answer_input_enabled(true);
                surface.focus_answer_input();

                self.answer_window.start(
                    self.options.answer_window,
                    self.round,
                    scheduler,
                    surface,
                );
                Ok(BuzzOutcome::Buzzed)
            }
            State::WaitingForNext => self
                .start(scheduler, surface)
                .map(|()| BuzzOutcome::Advanced),
            _ => Ok(BuzzOutcome::Ignored),
        }
    }

    /// Mirrors the answer input while the answer window runs
    ///
    /// The last text set here is what gets submitted when the window
    /// expires.
    pub fn set_answer_text(&mut self, text: &str) {
        if self.state == State::AwaitingAnswer {
            text.clone_into(&mut self.answer_text);
        }
    }

    /// Submits `answer` for the question in play
    ///
    /// # Returns
    ///
    /// The verdict, or `None` if no answer was expected.
    pub async fn submit<S: Scheduler, D: Surface>(
        &mut self,
        answer: &str,
        scheduler: &mut S,
        surface: &D,
    ) -> Option<Verdict> {
        if self.state != State::AwaitingAnswer {
            return None;
        }

        answer.clone_into(&mut self.answer_text);
        self.resolve(scheduler, surface).await
    }

    async fn resolve<S: Scheduler, D: Surface>(
        &mut self,
        scheduler: &mut S,
        surface: &D,
    ) -> Option<Verdict> {
        if !self.change_state(State::AwaitingAnswer, State::Resolving) {
            return None;
        }
        self.answer_window.stop(scheduler);

        let answer = std::mem::take(&mut self.answer_text);
        let Some(question) = self.current.and_then(|index| self.bank.get(index)) else {
            self.state = State::Idle;
            return None;
        };

        let verdict = self.verifier.verify(question, &answer).await;
        self.scores.record(question.category(), verdict.correct);

        info!(
            category = question.category(),
            correct = verdict.correct,
            delegated = verdict.used_delegated_judgment,
            "answer resolved"
        );

        surface.set_scoreboard_text(&self.scores.to_string());
        surface.set_result_text(&result_text(question, answer.trim(), verdict.correct));
        surface.set_answer_input_enabled(false);

        self.change_state(State::Resolving, State::WaitingForNext);

        Some(verdict)
    }

    /// Processes a scheduled alarm
    ///
    /// Alarms of an earlier round, or of a timer whose phase is over, do
    /// nothing.
    ///
    /// # Returns
    ///
    /// The verdict when the alarm expired the answer window and caused an
    /// automatic submission.
    pub async fn receive_alarm<S: Scheduler, D: Surface>(
        &mut self,
        alarm: AlarmMessage,
        scheduler: &mut S,
        surface: &D,
    ) -> Option<Verdict> {
        if alarm.round() != self.round {
            debug!(alarm = %alarm.round(), current = %self.round, "stale alarm dropped");
            return None;
        }

        match alarm {
            AlarmMessage::Reveal(_) => {
                if self.state == State::Revealing
                    && self.reveal.tick(scheduler, surface)
                    && self.change_state(State::Revealing, State::AwaitingBuzz)
                {
                    self.buzz_window.start(
                        self.options.buzz_window,
                        self.round,
                        scheduler,
                        surface,
                    );
                }
                None
            }
            AlarmMessage::Countdown(countdown::AlarmMessage::Tick {
                window: Window::Buzz,
                ..
            }) => {
                if self.state == State::AwaitingBuzz
                    && self.buzz_window.tick(scheduler, surface)
                    && self.change_state(State::AwaitingBuzz, State::WaitingForNext)
                {
                    surface.set_result_text(NO_BUZZ_TEXT);
                }
                None
            }
            AlarmMessage::Countdown(countdown::AlarmMessage::Tick {
                window: Window::Answer,
                ..
            }) => {
                if self.state == State::AwaitingAnswer && self.answer_window.tick(scheduler, surface)
                {
                    return self.resolve(scheduler, surface).await;
                }
                None
            }
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::sync::atomic::Ordering;

    use web_time::Duration;

    use super::*;
    use crate::{
        judge::mocks::StubJudge, reveal, scheduler::ManualScheduler,
        surface::mocks::RecordingSurface,
    };

    struct Harness {
        game: Game,
        scheduler: ManualScheduler,
        surface: RecordingSurface,
    }

    impl Harness {
        fn new(questions: Vec<Question>, verifier: Verifier) -> Self {
            let options = Options::default().with_reveal_interval(Duration::from_millis(1));
            Self {
                game: Game::new(QuestionBank::from_questions(questions), options, verifier)
                    .with_rng(fastrand::Rng::with_seed(7)),
                scheduler: ManualScheduler::new(),
                surface: RecordingSurface::default(),
            }
        }

        fn bio() -> Self {
            Self::new(
                vec![Question::new("Bio", "Multiple Choice", "Q1", "B) Mitochondria", false)],
                Verifier::new(),
            )
        }

        fn start(&mut self) {
            self.game.start(&mut self.scheduler, &self.surface).unwrap();
        }

        fn buzz(&mut self) -> BuzzOutcome {
            self.game.buzz(&mut self.scheduler, &self.surface).unwrap()
        }

        async fn submit(&mut self, answer: &str) -> Option<Verdict> {
            self.game
                .submit(answer, &mut self.scheduler, &self.surface)
                .await
        }

        /// Delivers every alarm due within `duration` and collects the
        /// verdicts they produced
        async fn run_for(&mut self, duration: Duration) -> Vec<Verdict> {
            let deadline = self.scheduler.now() + duration;
            let mut verdicts = Vec::new();

            while let Some(alarm) = self.scheduler.pop_due(deadline) {
                if let Some(verdict) = self
                    .game
                    .receive_alarm(alarm, &mut self.scheduler, &self.surface)
                    .await
                {
                    verdicts.push(verdict);
                }
            }
            self.scheduler.advance_to(deadline);

            verdicts
        }

        /// Starts a round and runs it until the buzz window opens
        async fn reach_buzz_window(&mut self) {
            self.start();
            self.run_for(Duration::from_millis(500)).await;
            assert_eq!(self.game.state(), State::AwaitingBuzz);
        }
    }

    #[tokio::test]
    async fn test_reveal_then_buzz_window() {
        let mut harness = Harness::bio();
        assert_eq!(harness.game.state(), State::Idle);

        harness.start();
        assert_eq!(harness.game.state(), State::Revealing);
        assert_eq!(harness.surface.snapshot().question, "");

        harness.run_for(Duration::from_millis(500)).await;

        let recorded = harness.surface.snapshot();
        assert_eq!(harness.game.state(), State::AwaitingBuzz);
        assert_eq!(recorded.question, "TYPE: Multiple Choice\nCATEGORY: Bio\n\nQ1");
        assert_eq!(recorded.timer, "⏱ 5");
        assert_eq!(harness.scheduler.active_timers(), 1);
    }

    #[tokio::test]
    async fn test_buzz_ignored_while_revealing() {
        let mut harness = Harness::bio();
        harness.start();
        harness.run_for(Duration::from_millis(3)).await;

        assert_eq!(harness.buzz(), BuzzOutcome::Ignored);
        assert_eq!(harness.game.state(), State::Revealing);
        assert!(!harness.surface.snapshot().answer_enabled);
    }

    #[tokio::test]
    async fn test_buzz_ignored_when_idle() {
        let mut harness = Harness::bio();

        assert_eq!(harness.buzz(), BuzzOutcome::Ignored);
        assert_eq!(harness.game.state(), State::Idle);
    }

    #[tokio::test]
    async fn test_correct_letter_answer() {
        let mut harness = Harness::bio();
        harness.reach_buzz_window().await;

        assert_eq!(harness.buzz(), BuzzOutcome::Buzzed);
        assert_eq!(harness.game.state(), State::AwaitingAnswer);

        let recorded = harness.surface.snapshot();
        assert!(recorded.answer_enabled);
        assert_eq!(recorded.focus_count, 1);
        assert_eq!(recorded.timer, "⏱ 8");

        let verdict = harness.submit("b").await.unwrap();
        assert!(verdict.correct);
        assert!(!verdict.used_delegated_judgment);

        let tally = harness.game.scores().tally("Bio").unwrap();
        assert_eq!((tally.correct(), tally.wrong()), (1, 0));

        let recorded = harness.surface.snapshot();
        assert_eq!(harness.game.state(), State::WaitingForNext);
        assert!(!recorded.answer_enabled);
        assert_eq!(
            recorded.result,
            "Q: Q1\nCorrect: B) Mitochondria\nYour Answer: b\n✅ Correct!"
        );
        assert_eq!(recorded.scoreboard, "Scores by Category\nBio: ✅ 1 | ❌ 0");
        assert_eq!(harness.scheduler.active_timers(), 0);
    }

    #[tokio::test]
    async fn test_wrong_letter_answer() {
        let mut harness = Harness::bio();
        harness.reach_buzz_window().await;
        harness.buzz();

        let verdict = harness.submit("A").await.unwrap();
        assert!(!verdict.correct);

        let tally = harness.game.scores().tally("Bio").unwrap();
        assert_eq!((tally.correct(), tally.wrong()), (0, 1));
        assert!(harness.surface.snapshot().result.ends_with("❌ Wrong!"));
    }

    #[tokio::test]
    async fn test_buzz_window_expires() {
        let mut harness = Harness::bio();
        harness.reach_buzz_window().await;

        let verdicts = harness.run_for(Duration::from_secs(10)).await;

        assert!(verdicts.is_empty());
        assert_eq!(harness.game.state(), State::WaitingForNext);
        assert_eq!(harness.surface.snapshot().result, NO_BUZZ_TEXT);
        assert!(harness.game.scores().is_empty());
        assert_eq!(harness.scheduler.active_timers(), 0);
    }

    #[tokio::test]
    async fn test_answer_window_expiry_submits_once() {
        let mut harness = Harness::bio();
        harness.reach_buzz_window().await;
        harness.buzz();

        harness.game.set_answer_text("mitochondria");
        let verdicts = harness.run_for(Duration::from_secs(30)).await;

        assert_eq!(verdicts.len(), 1);
        assert!(verdicts[0].correct);
        assert_eq!(harness.game.state(), State::WaitingForNext);
        assert_eq!(harness.game.scores().tally("Bio").unwrap().total(), 1);
        assert!(
            harness
                .surface
                .snapshot()
                .result
                .contains("Your Answer: mitochondria")
        );
    }

    #[tokio::test]
    async fn test_answer_window_expiry_with_empty_answer() {
        let mut harness = Harness::bio();
        harness.reach_buzz_window().await;
        harness.buzz();

        let verdicts = harness.run_for(Duration::from_secs(30)).await;

        assert_eq!(verdicts, vec![Verdict::default()]);
        assert!(harness.surface.snapshot().result.contains("Your Answer: (none)"));
        assert_eq!(harness.game.scores().tally("Bio").unwrap().wrong(), 1);
    }

    #[tokio::test]
    async fn test_submit_outside_answer_window() {
        let mut harness = Harness::bio();
        assert_eq!(harness.submit("b").await, None);

        harness.reach_buzz_window().await;
        assert_eq!(harness.submit("b").await, None);

        harness.buzz();
        assert!(harness.submit("b").await.is_some());
        assert_eq!(harness.submit("b").await, None);
        assert_eq!(harness.game.scores().tally("Bio").unwrap().total(), 1);
    }

    #[tokio::test]
    async fn test_set_answer_text_ignored_outside_answer_window() {
        let mut harness = Harness::bio();
        harness.reach_buzz_window().await;
        harness.game.set_answer_text("B");
        harness.buzz();

        let verdicts = harness.run_for(Duration::from_secs(30)).await;
        assert_eq!(verdicts, vec![Verdict::default()]);
    }

    #[tokio::test]
    async fn test_stale_alarm_ignored() {
        let mut harness = Harness::bio();
        harness.start();
        let old_round = harness.game.round();

        harness.start();
        assert_eq!(harness.scheduler.active_timers(), 1);

        let stale = reveal::AlarmMessage::Tick { round: old_round }.into();
        let verdict = harness
            .game
            .receive_alarm(stale, &mut harness.scheduler, &harness.surface)
            .await;

        assert_eq!(verdict, None);
        assert_eq!(harness.surface.snapshot().question, "");
    }

    #[tokio::test]
    async fn test_alarm_for_finished_phase_ignored() {
        let mut harness = Harness::bio();
        harness.reach_buzz_window().await;
        harness.buzz();

        let late_buzz_tick = countdown::AlarmMessage::Tick {
            round: harness.game.round(),
            window: Window::Buzz,
        }
        .into();
        harness
            .game
            .receive_alarm(late_buzz_tick, &mut harness.scheduler, &harness.surface)
            .await;

        assert_eq!(harness.game.state(), State::AwaitingAnswer);
        assert_eq!(harness.surface.snapshot().result, "");
    }

    #[tokio::test]
    async fn test_buzz_after_round_advances() {
        let mut harness = Harness::bio();
        harness.reach_buzz_window().await;
        harness.buzz();
        harness.submit("b").await;
        let finished_round = harness.game.round();

        assert_eq!(harness.buzz(), BuzzOutcome::Advanced);

        let recorded = harness.surface.snapshot();
        assert_eq!(harness.game.state(), State::Revealing);
        assert!(harness.game.round() > finished_round);
        assert_eq!(recorded.result, "");
        assert_eq!(recorded.question, "");
        assert!(!recorded.answer_enabled);
    }

    #[tokio::test]
    async fn test_empty_selection_goes_idle() {
        let mut harness = Harness::bio();
        harness.game.select_categories(["Physics".to_string()]);

        let result = harness.game.start(&mut harness.scheduler, &harness.surface);

        let recorded = harness.surface.snapshot();
        assert_eq!(result, Err(EmptyPoolError));
        assert_eq!(harness.game.state(), State::Idle);
        assert_eq!(harness.game.current_question(), None);
        assert_eq!(recorded.question, EMPTY_POOL_TEXT);
        assert_eq!(recorded.warnings, vec![EMPTY_POOL_TEXT]);
        assert_eq!(harness.scheduler.active_timers(), 0);
    }

    #[tokio::test]
    async fn test_new_selection_after_empty_pool() {
        let mut harness = Harness::bio();
        harness.game.select_categories(["Physics".to_string()]);
        assert!(harness.game.start(&mut harness.scheduler, &harness.surface).is_err());

        harness.game.select_categories(harness.game.categories());
        harness.start();

        assert_eq!(harness.game.categories(), vec!["Bio"]);
        assert_eq!(harness.game.state(), State::Revealing);
        assert_eq!(harness.game.current_question().unwrap().category(), "Bio");
    }

    #[tokio::test]
    async fn test_empty_selection_while_advancing() {
        let mut harness = Harness::bio();
        harness.reach_buzz_window().await;
        harness.run_for(Duration::from_secs(10)).await;
        assert_eq!(harness.game.state(), State::WaitingForNext);

        harness.game.select_categories(std::iter::empty());
        let outcome = harness.game.buzz(&mut harness.scheduler, &harness.surface);

        assert_eq!(outcome, Err(EmptyPoolError));
        assert_eq!(harness.game.state(), State::Idle);
    }

    #[tokio::test]
    async fn test_draws_stay_in_selection() {
        let mut harness = Harness::new(
            vec![
                Question::new("Bio", "Short Answer", "Q1", "Cell", false),
                Question::new("Physics", "Short Answer", "Q2", "Newton", false),
                Question::new("Chemistry", "Short Answer", "Q3", "Argon", false),
            ],
            Verifier::new(),
        );
        assert_eq!(harness.game.selection().len(), 3);

        harness.game.select_categories(["Physics".to_string()]);
        for _ in 0..20 {
            harness.start();
            assert_eq!(harness.game.current_question().unwrap().category(), "Physics");
        }
    }

    #[tokio::test]
    async fn test_scores_are_conserved() {
        let mut harness = Harness::bio();
        let answers = ["b", "A", "mitochondria", "", "C"];

        for answer in answers {
            harness.reach_buzz_window().await;
            harness.buzz();
            harness.submit(answer).await.unwrap();
        }

        let tally = harness.game.scores().tally("Bio").unwrap();
        assert_eq!(tally.total() as usize, answers.len());
        assert_eq!((tally.correct(), tally.wrong()), (2, 3));
    }

    #[tokio::test]
    async fn test_delegated_judgment() {
        let judge = StubJudge::replying("Yes");
        let calls = judge.calls.clone();
        let mut harness = Harness::new(
            vec![Question::new("Physics", "Short Answer", "Who?", "Isaac Newton", false)],
            Verifier::with_judge(judge),
        );
        harness.reach_buzz_window().await;
        harness.buzz();

        let verdict = harness.submit("newton").await.unwrap();

        assert!(verdict.correct);
        assert!(verdict.used_delegated_judgment);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_judge_failure_scores_wrong() {
        let mut harness = Harness::new(
            vec![Question::new("Physics", "Short Answer", "Who?", "Isaac Newton", false)],
            Verifier::with_judge(StubJudge::failing()),
        );
        harness.reach_buzz_window().await;
        harness.buzz();

        let verdict = harness.submit("Isaac Newton").await.unwrap();

        assert!(!verdict.correct);
        assert_eq!(harness.game.state(), State::WaitingForNext);
        let tally = harness.game.scores().tally("Physics").unwrap();
        assert_eq!((tally.correct(), tally.wrong()), (0, 1));
    }

    #[test]
    fn test_result_text() {
        let question = Question::new("Bio", "Multiple Choice", "Q1", "B) Mitochondria", false);

        assert_eq!(
            result_text(&question, "", false),
            "Q: Q1\nCorrect: B) Mitochondria\nYour Answer: (none)\n❌ Wrong!"
        );
    }
}
