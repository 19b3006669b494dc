#![forbid(unsafe_code)]

pub mod app_services;
pub mod error;
pub mod flow;
pub mod narration;
pub mod profile_service;
pub mod provider;
pub mod sessions;

pub use smartkids_core::Clock;

pub use app_services::{bootstrap, bootstrap_with};
pub use error::{ErrorCategory, FlowError, ProfileServiceError, ProviderError, SessionError};
pub use flow::{AppFlow, FlowController, FlowEvent};
pub use narration::{NarrationSink, Narrator};
pub use profile_service::ProfileService;
pub use provider::{ContentProvider, GeminiConfig, GeminiProvider, SpeechClip};
pub use sessions::{
    AdvanceOutcome, QUESTIONS_PER_SET, QuizLoopService, QuizProgress, QuizSession, RetryTarget,
    SessionPhase,
};
