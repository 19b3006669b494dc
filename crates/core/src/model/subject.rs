use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// School subject a question set is generated for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Subject {
    Math,
    Chinese,
    English,
}

impl Subject {
    /// All subjects, in dashboard order.
    pub const ALL: [Subject; 3] = [Subject::Math, Subject::Chinese, Subject::English];

    /// Canonical name used in prompts and in the persisted profile.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Subject::Math => "Math",
            Subject::Chinese => "Chinese",
            Subject::English => "English",
        }
    }

    /// Short blurb shown under the subject name on the dashboard.
    #[must_use]
    pub fn tagline(&self) -> &'static str {
        match self {
            Subject::Math => "Numbers & Logic",
            Subject::Chinese => "Reading & Poetry",
            Subject::English => "ABC & Speaking",
        }
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error type for parsing a [`Subject`] from a string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseSubjectError {
    raw: String,
}

impl fmt::Display for ParseSubjectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown subject: {}", self.raw)
    }
}

impl std::error::Error for ParseSubjectError {}

impl FromStr for Subject {
    type Err = ParseSubjectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "math" => Ok(Subject::Math),
            "chinese" => Ok(Subject::Chinese),
            "english" => Ok(Subject::English),
            _ => Err(ParseSubjectError { raw: s.to_string() }),
        }
    }
}

// ─── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subject_from_str_is_case_insensitive() {
        assert_eq!("Math".parse::<Subject>().unwrap(), Subject::Math);
        assert_eq!("english".parse::<Subject>().unwrap(), Subject::English);
        assert_eq!(" CHINESE ".parse::<Subject>().unwrap(), Subject::Chinese);
    }

    #[test]
    fn test_subject_from_str_rejects_unknown() {
        assert!("history".parse::<Subject>().is_err());
    }

    #[test]
    fn test_subject_serde_uses_canonical_names() {
        let json = serde_json::to_string(&Subject::Math).unwrap();
        assert_eq!(json, "\"Math\"");
        let back: Subject = serde_json::from_str("\"English\"").unwrap();
        assert_eq!(back, Subject::English);
    }
}
