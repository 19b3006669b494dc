use std::fmt;
use std::str::FromStr;

/// Which of the two shipped editions is running.
///
/// Both editions share the same engine; the edition only changes the default
/// profile, prompt wording, and whether the landing screen is shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Variant {
    /// Full primary-school edition.
    #[default]
    Standard,
    /// Early-years edition with simpler wording and no landing screen.
    Junior,
}

impl Variant {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Variant::Standard => "standard",
            Variant::Junior => "junior",
        }
    }

    /// Placeholder name a brand-new profile starts with. A profile still
    /// carrying this name is treated as a first visit.
    #[must_use]
    pub fn default_name(&self) -> &'static str {
        match self {
            Variant::Standard => "New Explorer",
            Variant::Junior => "Little Star",
        }
    }

    /// Whether the landing screen is skipped on launch.
    #[must_use]
    pub fn skip_landing(&self) -> bool {
        matches!(self, Variant::Junior)
    }

    /// Extra instruction appended to generation prompts, if any.
    #[must_use]
    pub fn prompt_flavor(&self) -> Option<&'static str> {
        match self {
            Variant::Standard => None,
            Variant::Junior => {
                Some("Use very short sentences and words a five-year-old beginner knows.")
            }
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error type for parsing a [`Variant`] from a string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseVariantError {
    raw: String,
}

impl fmt::Display for ParseVariantError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown edition: {}", self.raw)
    }
}

impl std::error::Error for ParseVariantError {}

impl FromStr for Variant {
    type Err = ParseVariantError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "standard" => Ok(Variant::Standard),
            "junior" => Ok(Variant::Junior),
            _ => Err(ParseVariantError { raw: s.to_string() }),
        }
    }
}

// ─── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variant_from_str() {
        assert_eq!("standard".parse::<Variant>().unwrap(), Variant::Standard);
        assert_eq!("Junior".parse::<Variant>().unwrap(), Variant::Junior);
        assert!("pro".parse::<Variant>().is_err());
    }

    #[test]
    fn test_only_junior_skips_landing() {
        assert!(!Variant::Standard.skip_landing());
        assert!(Variant::Junior.skip_landing());
    }

    #[test]
    fn test_only_junior_flavors_prompts() {
        assert!(Variant::Standard.prompt_flavor().is_none());
        assert!(Variant::Junior.prompt_flavor().is_some());
    }
}
