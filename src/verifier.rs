//! Answer verification
//!
//! Multiple choice answers are checked against the option letter and the
//! option text. Free-response answers go to the configured [`Judge`] when
//! there is one, and are otherwise compared case-insensitively with the
//! expected answer.

use serde::Serialize;
use tracing::warn;

use crate::{
    judge::{Judge, is_affirmative},
    question::Question,
};

/// Outcome of a verification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Verdict {
    /// Whether the answer was accepted
    pub correct: bool,
    /// Whether the decision came from the delegated judge
    pub used_delegated_judgment: bool,
}

/// Normalizes an answer string for comparison
fn clean_answer(answer: &str) -> String {
    answer.trim().to_uppercase()
}

/// Expected option of a multiple choice answer such as `"B) Mitochondria"`
#[derive(Debug, Clone, PartialEq, Eq)]
struct ChoiceKey {
    /// Option letter, present when the answer opens with an `X)` marker
    letter: Option<char>,
    /// Option text after the marker, trimmed and uppercased
    text: String,
}

impl ChoiceKey {
    fn parse(answer: &str) -> Self {
        let mut chars = answer.chars();
        match (chars.next(), chars.next()) {
            (Some(letter), Some(')')) if letter.is_ascii_uppercase() => Self {
                letter: Some(letter),
                text: clean_answer(chars.as_str()),
            },
            _ => Self {
                letter: None,
                text: clean_answer(answer),
            },
        }
    }

    fn accepts(&self, user_answer: &str) -> bool {
        let user_answer = clean_answer(user_answer);
        if user_answer.is_empty() {
            return false;
        }

        self.letter.is_some_and(|letter| user_answer.starts_with(letter)) || user_answer == self.text
    }
}

/// Decides whether an answer is correct
///
/// One verifier serves both question kinds; whether free responses are
/// judged or matched exactly depends only on whether a judge is set.
#[derive(Default)]
pub struct Verifier {
    judge: Option<Box<dyn Judge>>,
}

impl std::fmt::Debug for Verifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Verifier")
            .field("delegated", &self.judge.is_some())
            .finish()
    }
}

impl Verifier {
    /// Verifier matching free responses exactly
    pub fn new() -> Self {
        Self::default()
    }

    /// Verifier delegating free responses to `judge`
    pub fn with_judge(judge: impl Judge + 'static) -> Self {
        Self {
            judge: Some(Box::new(judge)),
        }
    }

    /// Whether free responses are delegated
    pub fn has_judge(&self) -> bool {
        self.judge.is_some()
    }

    /// Checks `user_answer` against `question`
    ///
    /// Never fails: an unreachable or unintelligible judge yields an
    /// incorrect verdict, and an empty answer is always incorrect.
    pub async fn verify(&self, question: &Question, user_answer: &str) -> Verdict {
        let user_answer = user_answer.trim();

        if question.is_multiple_choice() {
            return Verdict {
                correct: ChoiceKey::parse(question.answer()).accepts(user_answer),
                used_delegated_judgment: false,
            };
        }

        if user_answer.is_empty() {
            return Verdict::default();
        }

        match &self.judge {
            Some(judge) => {
                let correct = match judge.judge(user_answer, question.answer()).await {
                    Ok(reply) => is_affirmative(&reply),
                    Err(error) => {
                        warn!(%error, "judgment failed, scoring answer as wrong");
                        false
                    }
                };
                Verdict {
                    correct,
                    used_delegated_judgment: true,
                }
            }
            None => Verdict {
                correct: clean_answer(user_answer) == clean_answer(question.answer()),
                used_delegated_judgment: false,
            },
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::sync::atomic::Ordering;

    use super::*;
    use crate::{
        judge::{GeminiJudge, mocks::StubJudge},
        source::mocks::{direct_client, serve_canned},
    };

    fn multiple_choice() -> Question {
        Question::new("Bio", "Multiple Choice", "Q1", "B) Mitochondria", false)
    }

    fn short_answer() -> Question {
        Question::new("Physics", "Short Answer", "Q2", "Isaac Newton", false)
    }

    #[test]
    fn test_choice_key_parse() {
        assert_eq!(
            ChoiceKey::parse("B) Mitochondria"),
            ChoiceKey {
                letter: Some('B'),
                text: "MITOCHONDRIA".to_string()
            }
        );
        assert_eq!(
            ChoiceKey::parse("Mitochondria"),
            ChoiceKey {
                letter: None,
                text: "MITOCHONDRIA".to_string()
            }
        );
        assert_eq!(ChoiceKey::parse("b) lower").letter, None);
        assert_eq!(ChoiceKey::parse("").text, "");
    }

    #[tokio::test]
    async fn test_multiple_choice_accepts_letter_and_text() {
        let verifier = Verifier::new();
        let question = multiple_choice();

        for answer in ["b", "B", "B)", "b) mitochondria", "mitochondria", " MITOCHONDRIA "] {
            let verdict = verifier.verify(&question, answer).await;
            assert!(verdict.correct, "{answer}");
            assert!(!verdict.used_delegated_judgment);
        }
    }

    #[tokio::test]
    async fn test_multiple_choice_rejects_others() {
        let verifier = Verifier::new();
        let question = multiple_choice();

        for answer in ["A", "a) mitochondria", "mitochondrion", "", "   ", "W"] {
            assert!(!verifier.verify(&question, answer).await.correct, "{answer}");
        }
    }

    #[tokio::test]
    async fn test_multiple_choice_never_delegated() {
        let judge = StubJudge::replying("Yes");
        let calls = judge.calls.clone();
        let verifier = Verifier::with_judge(judge);

        let verdict = verifier.verify(&multiple_choice(), "A").await;

        assert!(!verdict.correct);
        assert!(!verdict.used_delegated_judgment);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_free_response_exact_match() {
        let verifier = Verifier::new();
        let question = short_answer();

        assert!(verifier.verify(&question, "Isaac Newton").await.correct);
        assert!(verifier.verify(&question, "isaac newton").await.correct);
        assert!(verifier.verify(&question, "  ISAAC NEWTON ").await.correct);
        assert!(!verifier.verify(&question, "Newton").await.correct);
        assert!(!verifier.verify(&question, "").await.correct);
    }

    #[tokio::test]
    async fn test_free_response_delegated() {
        let verifier = Verifier::with_judge(StubJudge::replying("Yes."));
        let verdict = verifier.verify(&short_answer(), "Newton").await;

        assert_eq!(
            verdict,
            Verdict {
                correct: true,
                used_delegated_judgment: true
            }
        );

        let verifier = Verifier::with_judge(StubJudge::replying("No"));
        assert!(!verifier.verify(&short_answer(), "Leibniz").await.correct);
    }

    #[tokio::test]
    async fn test_free_response_judge_failure_is_wrong() {
        let verifier = Verifier::with_judge(StubJudge::failing());
        let verdict = verifier.verify(&short_answer(), "Isaac Newton").await;

        assert!(!verdict.correct);
        assert!(verdict.used_delegated_judgment);
    }

    #[tokio::test]
    async fn test_free_response_empty_answer_skips_judge() {
        let judge = StubJudge::replying("Yes");
        let calls = judge.calls.clone();
        let verifier = Verifier::with_judge(judge);

        assert_eq!(verifier.verify(&short_answer(), "  ").await, Verdict::default());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unknown_type_is_free_response() {
        let verifier = Verifier::new();
        let question = Question::new("Math", "Unknown", "Q", "42", false);

        assert!(verifier.verify(&question, "42").await.correct);
        assert!(!verifier.verify(&question, "41").await.correct);
    }

    #[tokio::test]
    async fn test_judge_service_failures_are_wrong() {
        for (status, body) in [
            (500, r#"{"error": "internal"}"#),
            (200, "not json"),
            (200, r#"{"candidates": []}"#),
        ] {
            let url = serve_canned(status, body).await;
            let verifier = Verifier::with_judge(GeminiJudge::with_endpoint(
                direct_client(),
                format!("{url}/v1beta/models/test:generateContent"),
                "key",
            ));

            let verdict = verifier.verify(&short_answer(), "Isaac Newton").await;

            assert_eq!(
                verdict,
                Verdict {
                    correct: false,
                    used_delegated_judgment: true
                },
                "{status} {body}"
            );
        }
    }
}
