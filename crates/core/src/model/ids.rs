use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Unique identifier for a Question.
///
/// The content provider returns questions without identifiers, so the
/// adapter mints one for every question it hands over.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QuestionId(Uuid);

impl QuestionId {
    /// Mints a fresh random identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying UUID value.
    #[must_use]
    pub fn value(&self) -> Uuid {
        self.0
    }
}

impl Default for QuestionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for QuestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "QuestionId({})", self.0)
    }
}

impl fmt::Display for QuestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Error type for parsing an ID from a string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIdError {
    kind: String,
}

impl fmt::Display for ParseIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to parse {} from string", self.kind)
    }
}

impl std::error::Error for ParseIdError {}

impl FromStr for QuestionId {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<Uuid>()
            .map(QuestionId)
            .map_err(|_| ParseIdError {
                kind: "QuestionId".to_string(),
            })
    }
}

// ─── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_question_id_is_unique() {
        assert_ne!(QuestionId::new(), QuestionId::new());
    }

    #[test]
    fn test_question_id_roundtrip() {
        let original = QuestionId::new();
        let deserialized: QuestionId = original.to_string().parse().unwrap();
        assert_eq!(original, deserialized);
    }

    #[test]
    fn test_question_id_from_str_invalid() {
        let result = "not-a-uuid".parse::<QuestionId>();
        assert!(result.is_err());
    }
}
