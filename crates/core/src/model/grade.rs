use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors for school grade validation.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum GradeError {
    #[error("school grade must be between 1 and 6, got {0}")]
    OutOfRange(u8),
}

/// Primary-school grade the learner is enrolled in, years 1 through 6.
///
/// Question difficulty prompts are pitched at this grade, so the range is
/// enforced at construction and again when a persisted profile is loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct SchoolGrade(u8);

impl SchoolGrade {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 6;

    /// All grades, lowest first.
    pub const ALL: [SchoolGrade; 6] = [
        SchoolGrade(1),
        SchoolGrade(2),
        SchoolGrade(3),
        SchoolGrade(4),
        SchoolGrade(5),
        SchoolGrade(6),
    ];

    /// Creates a grade, rejecting values outside 1..=6.
    ///
    /// # Errors
    ///
    /// Returns [`GradeError::OutOfRange`] if `value` is not a valid grade.
    pub fn new(value: u8) -> Result<Self, GradeError> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Ok(Self(value))
        } else {
            Err(GradeError::OutOfRange(value))
        }
    }

    /// Returns the grade number.
    #[must_use]
    pub fn value(&self) -> u8 {
        self.0
    }
}

impl fmt::Display for SchoolGrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Grade {}", self.0)
    }
}

impl<'de> Deserialize<'de> for SchoolGrade {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = u8::deserialize(deserializer)?;
        SchoolGrade::new(raw).map_err(serde::de::Error::custom)
    }
}

// ─── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grade_accepts_valid_range() {
        for value in 1..=6 {
            assert!(SchoolGrade::new(value).is_ok());
        }
    }

    #[test]
    fn test_grade_rejects_out_of_range() {
        assert_eq!(SchoolGrade::new(0), Err(GradeError::OutOfRange(0)));
        assert_eq!(SchoolGrade::new(7), Err(GradeError::OutOfRange(7)));
    }

    #[test]
    fn test_grade_deserialize_enforces_range() {
        let ok: SchoolGrade = serde_json::from_str("3").unwrap();
        assert_eq!(ok.value(), 3);
        assert!(serde_json::from_str::<SchoolGrade>("9").is_err());
    }

    #[test]
    fn test_grade_display() {
        assert_eq!(SchoolGrade::new(2).unwrap().to_string(), "Grade 2");
    }
}
