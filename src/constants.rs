//! Configuration constants for the buzzbowl round controller
//!
//! This module contains the default timings, the accepted bounds for
//! user-configured timings, and the fixed endpoints of the two external
//! services the game consumes.

/// Character-by-character question reveal
pub mod reveal {
    /// Delay between two revealed characters when nothing else is configured
    pub const DEFAULT_INTERVAL_MS: u64 = 50;
    /// Smallest accepted reveal delay in milliseconds; there is no upper bound
    pub const MIN_INTERVAL_MS: u64 = 1;
}

/// Buzz window countdown, started once the reveal completes
pub mod buzz_window {
    /// Seconds the player has to buzz in
    pub const DEFAULT_SECONDS: u64 = 5;
    /// Shortest accepted buzz window in seconds
    pub const MIN_SECONDS: u64 = 1;
    /// Longest accepted buzz window in seconds
    pub const MAX_SECONDS: u64 = 60;
}

/// Answer window countdown, started on buzz
pub mod answer_window {
    /// Seconds the player has to type an answer
    pub const DEFAULT_SECONDS: u64 = 8;
    /// Shortest accepted answer window in seconds
    pub const MIN_SECONDS: u64 = 1;
    /// Longest accepted answer window in seconds
    pub const MAX_SECONDS: u64 = 120;
}

/// Countdown ticking
pub mod countdown {
    /// Period of a countdown tick in milliseconds
    pub const TICK_MS: u64 = 1000;
}

/// Remote question bank
pub mod source {
    /// Default location of the question bank
    pub const QUESTION_URL: &str = "https://raw.githubusercontent.com/tornadofury0/National-Science-Bowl-Questions/refs/heads/main/all_questions.json";
    /// Label used for a question without a category or type
    pub const UNKNOWN_LABEL: &str = "Unknown";
}

/// Delegated answer judgment
pub mod judge {
    /// Default generative-language endpoint, authenticated with a `key` query parameter
    pub const ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta/models/gemini-1.5-flash:generateContent";
}
