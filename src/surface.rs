//! Display surface abstraction
//!
//! This module defines the trait the controller renders through. A
//! surface might be a terminal, a web page, or a recorder in tests; the
//! controller only ever calls these operations and never reads back.

/// Trait for presenting the game to the player
///
/// All methods take `&self`; implementations that keep state use
/// interior mutability.
pub trait Surface {
    /// Replaces the question text; an empty string clears it
    fn set_question_text(&self, text: &str);

    /// Appends one revealed character to the question text
    fn append_question_char(&self, character: char);

    /// Shows the remaining time of the running countdown
    fn set_timer_text(&self, text: &str);

    /// Shows the outcome of the current question; empty clears it
    fn set_result_text(&self, text: &str);

    /// Shows the rendered score board
    fn set_scoreboard_text(&self, text: &str);

    /// Enables or disables the answer input
    fn set_answer_input_enabled(&self, enabled: bool);

    /// Moves input focus to the answer input
    fn focus_answer_input(&self);

    /// Surfaces a warning the player has to act on, such as an empty
    /// category selection or a failed load
    fn show_warning(&self, message: &str);
}
