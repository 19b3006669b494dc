use std::sync::Arc;

use smartkids_core::model::Variant;
use storage::repository::Storage;

use crate::Clock;
use crate::error::ProfileServiceError;
use crate::flow::FlowController;
use crate::narration::{NarrationSink, Narrator};
use crate::profile_service::ProfileService;
use crate::provider::{ContentProvider, GeminiProvider};
use crate::sessions::QuizLoopService;

/// Wires storage, the Gemini-backed provider, and a narration sink into a
/// ready [`FlowController`] sitting on the splash screen.
///
/// # Errors
///
/// Returns `ProfileServiceError` when the saved profile cannot be read.
pub async fn bootstrap(
    storage: &Storage,
    variant: Variant,
    sink: Arc<dyn NarrationSink>,
) -> Result<FlowController, ProfileServiceError> {
    let provider: Arc<dyn ContentProvider> = Arc::new(GeminiProvider::from_env(variant));
    bootstrap_with(storage, variant, sink, Clock::default_clock(), provider).await
}

/// Same assembly with the clock and provider injected, for tests and
/// alternative backends.
///
/// # Errors
///
/// Returns `ProfileServiceError` when the saved profile cannot be read.
pub async fn bootstrap_with(
    storage: &Storage,
    variant: Variant,
    sink: Arc<dyn NarrationSink>,
    clock: Clock,
    provider: Arc<dyn ContentProvider>,
) -> Result<FlowController, ProfileServiceError> {
    let profiles = ProfileService::load(Arc::clone(&storage.profiles), variant).await?;
    let quiz = QuizLoopService::new(clock, Arc::clone(&provider));
    let narrator = Narrator::new(provider, sink);
    Ok(FlowController::new(quiz, profiles, narrator))
}
