use serde::Deserialize;

//
// ─── ANSWER TYPES ──────────────────────────────────────────────────────────────
//

/// What the learner submitted for a question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnswerInput {
    /// Index of the picked option.
    Choice(usize),
    /// Free text, as typed.
    FreeText(String),
}

/// Verdict for a single answer.
///
/// Choice questions are graded locally with an empty `feedback`; free-input
/// questions are graded by the content provider, which also supplies one
/// sentence of encouragement.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerReview {
    pub is_correct: bool,
    #[serde(default)]
    pub feedback: String,
}

impl AnswerReview {
    /// Builds a locally graded verdict with no feedback text.
    #[must_use]
    pub fn local(is_correct: bool) -> Self {
        Self {
            is_correct,
            feedback: String::new(),
        }
    }
}

/// The one accepted attempt for a question. A question only ever has a single
/// record; repeat submissions are rejected upstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerRecord {
    pub input: AnswerInput,
    pub review: AnswerReview,
    /// Points the attempt earned: the question's value if correct, else zero.
    pub points_awarded: u32,
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_review_has_no_feedback() {
        let review = AnswerReview::local(true);
        assert!(review.is_correct);
        assert!(review.feedback.is_empty());
    }

    #[test]
    fn review_deserializes_provider_payload() {
        let review: AnswerReview =
            serde_json::from_str(r#"{"isCorrect": true, "feedback": "Great job!"}"#).unwrap();
        assert!(review.is_correct);
        assert_eq!(review.feedback, "Great job!");
    }

    #[test]
    fn review_feedback_defaults_to_empty() {
        let review: AnswerReview = serde_json::from_str(r#"{"isCorrect": false}"#).unwrap();
        assert!(!review.is_correct);
        assert!(review.feedback.is_empty());
    }
}
