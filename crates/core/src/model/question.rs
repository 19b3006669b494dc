use serde::Deserialize;
use thiserror::Error;

use crate::model::ids::QuestionId;

//
// ─── QUESTION TYPES ────────────────────────────────────────────────────────────
//

/// How the learner answers a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum QuestionKind {
    /// Multiple choice with exactly one correct option.
    #[serde(rename = "choice")]
    Choice,
    /// Free-form text graded by the content provider.
    #[serde(rename = "input")]
    FreeInput,
}

/// Raw question payload as the content provider emits it.
///
/// Field names mirror the provider's JSON schema; [`QuestionDraft::validate`]
/// turns a draft into a [`Question`] or rejects it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionDraft {
    #[serde(rename = "type")]
    pub kind: QuestionKind,
    pub text: String,
    #[serde(default)]
    pub options: Option<Vec<String>>,
    #[serde(default)]
    pub correct_index: Option<usize>,
    pub points: u32,
    pub explanation: String,
    pub visual_prompt: String,
    #[serde(default)]
    pub sample_answer: Option<String>,
}

impl QuestionDraft {
    /// Validates the draft and attaches the client-side identifier.
    ///
    /// # Errors
    ///
    /// Returns a [`QuestionValidationError`] when the payload is structurally
    /// unusable: blank text, zero points, or choice metadata that is missing,
    /// inconsistent, or out of range.
    pub fn validate(self, id: QuestionId) -> Result<Question, QuestionValidationError> {
        if self.text.trim().is_empty() {
            return Err(QuestionValidationError::EmptyText);
        }
        if self.points == 0 {
            return Err(QuestionValidationError::ZeroPoints);
        }

        let (options, correct_index) = match self.kind {
            QuestionKind::Choice => {
                let options = self.options.unwrap_or_default();
                if options.len() < 2 {
                    return Err(QuestionValidationError::NotEnoughOptions {
                        found: options.len(),
                    });
                }
                if let Some(index) = options.iter().position(|o| o.trim().is_empty()) {
                    return Err(QuestionValidationError::BlankOption { index });
                }
                let correct = self
                    .correct_index
                    .ok_or(QuestionValidationError::MissingCorrectIndex)?;
                if correct >= options.len() {
                    return Err(QuestionValidationError::CorrectIndexOutOfRange {
                        index: correct,
                        options: options.len(),
                    });
                }
                (options, Some(correct))
            }
            QuestionKind::FreeInput => {
                if self.options.as_ref().is_some_and(|o| !o.is_empty()) {
                    return Err(QuestionValidationError::UnexpectedOptions);
                }
                (Vec::new(), None)
            }
        };

        Ok(Question {
            id,
            kind: self.kind,
            text: self.text,
            options,
            correct_index,
            points: self.points,
            explanation: self.explanation,
            visual_prompt: self.visual_prompt,
            sample_answer: self.sample_answer,
            illustration: None,
        })
    }
}

/// A validated quiz question ready to be shown to the learner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    id: QuestionId,
    kind: QuestionKind,
    text: String,
    options: Vec<String>,
    correct_index: Option<usize>,
    points: u32,
    explanation: String,
    visual_prompt: String,
    sample_answer: Option<String>,
    illustration: Option<Illustration>,
}

impl Question {
    #[must_use]
    pub fn id(&self) -> QuestionId {
        self.id
    }

    #[must_use]
    pub fn kind(&self) -> QuestionKind {
        self.kind
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Answer options. Empty for free-input questions.
    #[must_use]
    pub fn options(&self) -> &[String] {
        &self.options
    }

    /// Index of the correct option. `None` for free-input questions.
    #[must_use]
    pub fn correct_index(&self) -> Option<usize> {
        self.correct_index
    }

    #[must_use]
    pub fn points(&self) -> u32 {
        self.points
    }

    /// Kid-friendly explanation revealed after the question is answered.
    #[must_use]
    pub fn explanation(&self) -> &str {
        &self.explanation
    }

    /// Scene description the illustration is generated from.
    #[must_use]
    pub fn visual_prompt(&self) -> &str {
        &self.visual_prompt
    }

    /// Reference answer used when grading free-input questions.
    #[must_use]
    pub fn sample_answer(&self) -> Option<&str> {
        self.sample_answer.as_deref()
    }

    #[must_use]
    pub fn illustration(&self) -> Option<&Illustration> {
        self.illustration.as_ref()
    }

    /// Attaches the best-effort illustration produced for this question.
    pub fn set_illustration(&mut self, illustration: Illustration) {
        self.illustration = Some(illustration);
    }

    /// Whether picking option `index` answers this question correctly.
    ///
    /// Always `false` for free-input questions.
    #[must_use]
    pub fn is_correct_choice(&self, index: usize) -> bool {
        self.correct_index == Some(index)
    }
}

/// Where to find the picture for a question: a remote URL or a `data:` URL
/// built from inline image bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Illustration(String);

impl Illustration {
    #[must_use]
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

//
// ─── QUESTION VALIDATION ERRORS ────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QuestionValidationError {
    #[error("question text is empty")]
    EmptyText,

    #[error("question is worth zero points")]
    ZeroPoints,

    #[error("choice question needs at least 2 options, got {found}")]
    NotEnoughOptions { found: usize },

    #[error("option {index} is blank")]
    BlankOption { index: usize },

    #[error("choice question has no correct index")]
    MissingCorrectIndex,

    #[error("correct index {index} is out of range for {options} options")]
    CorrectIndexOutOfRange { index: usize, options: usize },

    #[error("free-input question carries answer options")]
    UnexpectedOptions,
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
