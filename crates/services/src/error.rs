//! Shared error types for the services crate.

use thiserror::Error;

use smartkids_core::model::ProfileError;
use storage::repository::StorageError;

/// User-facing failure categories for provider errors.
///
/// Presentation code keys its banner text and retry affordance off this
/// category; the underlying [`ProviderError`] stays richer for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    NotConfigured,
    RateLimited,
    QuotaExhausted,
    Unknown,
}

impl ErrorCategory {
    /// Whether the retry affordance is offered for this category.
    ///
    /// Only a hard quota cap suppresses retry; waiting within the session
    /// never helps there.
    #[must_use]
    pub fn allows_retry(&self) -> bool {
        !matches!(self, ErrorCategory::QuotaExhausted)
    }

    /// Short learner-facing guidance for this category.
    #[must_use]
    pub fn guidance(&self) -> &'static str {
        match self {
            ErrorCategory::NotConfigured => {
                "The magic key is missing. Ask a grown-up to set SMARTKIDS_API_KEY."
            }
            ErrorCategory::RateLimited => {
                "Too many questions at once! Wait a few seconds and try again."
            }
            ErrorCategory::QuotaExhausted => {
                "Today's energy is used up. Come back for a new adventure tomorrow!"
            }
            ErrorCategory::Unknown => "The magic signal wobbled. Tap retry to try again.",
        }
    }
}

/// Errors emitted by the content provider adapter.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ProviderError {
    #[error("content provider is not configured")]
    NotConfigured,

    #[error("content provider is rate limited")]
    RateLimited,

    #[error("content provider quota is exhausted for today")]
    QuotaExhausted,

    #[error("content provider returned a malformed response: {0}")]
    MalformedResponse(String),

    #[error("content provider unavailable: {0}")]
    Unavailable(String),
}

impl ProviderError {
    /// Collapses the error into the closed user-facing taxonomy.
    ///
    /// Malformed responses read as `Unknown` to the learner; the distinction
    /// only matters for diagnostics.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            ProviderError::NotConfigured => ErrorCategory::NotConfigured,
            ProviderError::RateLimited => ErrorCategory::RateLimited,
            ProviderError::QuotaExhausted => ErrorCategory::QuotaExhausted,
            ProviderError::MalformedResponse(_) | ProviderError::Unavailable(_) => {
                ErrorCategory::Unknown
            }
        }
    }
}

/// Errors emitted by the quiz session state machine and its orchestrator.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("no question is awaiting an answer")]
    NotAwaitingAnswer,

    #[error("the current question already has a verdict")]
    AlreadyAnswered,

    #[error("answer text is empty")]
    EmptyAnswer,

    #[error("option {index} does not exist")]
    InvalidOption { index: usize },

    #[error("the current question expects a picked option")]
    ExpectedChoice,

    #[error("the current question expects typed text")]
    ExpectedFreeText,

    #[error("the current question has no verdict yet")]
    NotAnswered,

    #[error("session is already complete")]
    Completed,

    #[error("nothing failed, so there is nothing to retry")]
    NoFailedRequest,

    #[error("retry is not available for this failure")]
    RetryNotAllowed,

    #[error(transparent)]
    Provider(#[from] ProviderError),
}

/// Errors emitted by `ProfileService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProfileServiceError {
    #[error(transparent)]
    Profile(#[from] ProfileError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by the app flow controller.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FlowError {
    #[error("event is not valid on the current screen")]
    UnexpectedEvent,

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Profile(#[from] ProfileServiceError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_quota_exhaustion_suppresses_retry() {
        assert!(ErrorCategory::NotConfigured.allows_retry());
        assert!(ErrorCategory::RateLimited.allows_retry());
        assert!(ErrorCategory::Unknown.allows_retry());
        assert!(!ErrorCategory::QuotaExhausted.allows_retry());
    }

    #[test]
    fn malformed_responses_read_as_unknown() {
        let err = ProviderError::MalformedResponse("missing field `text`".into());
        assert_eq!(err.category(), ErrorCategory::Unknown);
        assert_eq!(
            ProviderError::Unavailable("connection reset".into()).category(),
            ErrorCategory::Unknown
        );
    }

    #[test]
    fn configuration_and_throttling_map_one_to_one() {
        assert_eq!(
            ProviderError::NotConfigured.category(),
            ErrorCategory::NotConfigured
        );
        assert_eq!(
            ProviderError::RateLimited.category(),
            ErrorCategory::RateLimited
        );
        assert_eq!(
            ProviderError::QuotaExhausted.category(),
            ErrorCategory::QuotaExhausted
        );
    }
}
