use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::provider::{ContentProvider, SpeechClip};

/// Plays one synthesized clip. Implementations should stop early when the
/// token fires; the narrator stops waiting on cancellation regardless.
#[async_trait]
pub trait NarrationSink: Send + Sync {
    async fn play(&self, clip: SpeechClip, cancel: CancellationToken);
}

#[derive(Default)]
struct NarrationState {
    generation: u64,
    current: Option<CancellationToken>,
}

/// Reads question text aloud, one utterance at a time.
///
/// Starting a new utterance cancels the one in flight, and the voice lock
/// keeps playback exclusive: a successor cannot reach the sink until the
/// prior clip has fully wound down, so no two clips ever sound at once.
/// Speech synthesis is best-effort; when the provider returns nothing the
/// narrator simply stays silent.
#[derive(Clone)]
pub struct Narrator {
    provider: Arc<dyn ContentProvider>,
    sink: Arc<dyn NarrationSink>,
    voice: Arc<tokio::sync::Mutex<()>>,
    state: Arc<Mutex<NarrationState>>,
}

impl Narrator {
    #[must_use]
    pub fn new(provider: Arc<dyn ContentProvider>, sink: Arc<dyn NarrationSink>) -> Self {
        Self {
            provider,
            sink,
            voice: Arc::new(tokio::sync::Mutex::new(())),
            state: Arc::new(Mutex::new(NarrationState::default())),
        }
    }

    /// Starts narrating `text`, replacing any utterance already in flight.
    ///
    /// Returns the utterance task so callers that need determinism (tests,
    /// shutdown) can await it; ignoring it is fine.
    pub fn speak(&self, text: &str) -> JoinHandle<()> {
        let (generation, token) = {
            let mut state = self.lock_state();
            if let Some(prior) = state.current.take() {
                prior.cancel();
            }
            state.generation += 1;
            let token = CancellationToken::new();
            state.current = Some(token.clone());
            (state.generation, token)
        };

        let narrator = self.clone();
        let text = text.to_string();
        tokio::spawn(async move {
            narrator.run_utterance(generation, token, text).await;
        })
    }

    /// Cancels the current utterance, if any.
    pub fn stop(&self) {
        let mut state = self.lock_state();
        if let Some(token) = state.current.take() {
            token.cancel();
        }
    }

    /// Whether an utterance is being fetched or played right now.
    #[must_use]
    pub fn is_speaking(&self) -> bool {
        self.lock_state().current.is_some()
    }

    async fn run_utterance(&self, generation: u64, token: CancellationToken, text: String) {
        let clip = tokio::select! {
            clip = self.provider.generate_speech(&text) => clip,
            () = token.cancelled() => None,
        };

        if let Some(clip) = clip {
            let _voice = self.voice.lock().await;
            if !token.is_cancelled() {
                tokio::select! {
                    () = self.sink.play(clip, token.clone()) => {}
                    () = token.cancelled() => {}
                }
            }
        } else {
            debug!("narration unavailable, staying silent");
        }

        self.clear_if_current(generation);
    }

    // A stale utterance must not clear its successor's token.
    fn clear_if_current(&self, generation: u64) {
        let mut state = self.lock_state();
        if state.generation == generation {
            state.current = None;
        }
    }

    // Narration state stays usable even if an utterance task panicked.
    fn lock_state(&self) -> MutexGuard<'_, NarrationState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
