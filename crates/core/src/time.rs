use chrono::{DateTime, Utc};

/// Time source for everything that stamps or measures wall-clock time.
///
/// Production code uses [`Clock::Default`]; tests pin the clock with
/// [`Clock::Fixed`] so timing-dependent assertions stay deterministic.
#[derive(Debug, Clone, Copy, Default)]
pub enum Clock {
    #[default]
    Default,
    Fixed(DateTime<Utc>),
}

impl Clock {
    /// Returns a clock that reads the system time.
    #[must_use]
    pub fn default_clock() -> Self {
        Self::Default
    }

    /// Returns a clock frozen at the given instant.
    #[must_use]
    pub fn fixed(at: DateTime<Utc>) -> Self {
        Self::Fixed(at)
    }

    /// Returns the current time according to the clock.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        match self {
            Clock::Default => Utc::now(),
            Clock::Fixed(t) => *t,
        }
    }
}

/// Deterministic timestamp for tests (2024-09-01T00:00:00Z).
pub const FIXED_TEST_TIMESTAMP: i64 = 1_725_148_800;

/// Returns a deterministic `DateTime<Utc>` for tests and doc examples.
///
/// # Panics
///
/// Panics if the fixed timestamp cannot be represented.
#[must_use]
pub fn fixed_now() -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(FIXED_TEST_TIMESTAMP, 0)
        .expect("fixed timestamp should be valid")
}

/// Returns a `Clock` frozen at the deterministic test timestamp.
#[must_use]
pub fn fixed_clock() -> Clock {
    Clock::fixed(fixed_now())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_clock_reports_the_pinned_instant() {
        let clock = fixed_clock();
        assert_eq!(clock.now(), fixed_now());
        assert_eq!(clock.now(), clock.now());
    }

    #[test]
    fn default_clock_tracks_system_time() {
        let before = Utc::now();
        let observed = Clock::default_clock().now();
        assert!(observed >= before);
    }
}
