use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{info, warn};

use smartkids_core::Clock;
use smartkids_core::model::{AnswerRecord, Question, SchoolGrade, Subject};

use super::session::{AdvanceStep, QuizSession, RetryTarget};
use crate::error::{ProviderError, SessionError};
use crate::provider::ContentProvider;

/// How an ordinal advance was satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvanceOutcome {
    /// The buffered question became current with no wait.
    BufferHit,
    /// The buffer was empty; the question was fetched in the foreground.
    Loaded,
    /// The foreground fetch failed; the session is parked in the failed phase.
    LoadFailed,
    /// The set is finished; finalizing the profile is the caller's next step.
    Completed,
}

/// Orchestrates a quiz session against the content provider.
///
/// Owns the single background prefetch task. A refill is spawned when the
/// buffer is seeded at session start and whenever an advance drains it, never
/// while one is already outstanding, so at most one background request is in
/// flight at any time. Prefetch failures are logged and dropped; the next
/// empty-buffer advance simply loads in the foreground.
pub struct QuizLoopService {
    clock: Clock,
    provider: Arc<dyn ContentProvider>,
    prefetch: Option<JoinHandle<Result<Question, ProviderError>>>,
}

impl QuizLoopService {
    #[must_use]
    pub fn new(clock: Clock, provider: Arc<dyn ContentProvider>) -> Self {
        Self {
            clock,
            provider,
            prefetch: None,
        }
    }

    /// Starts a session and loads its first question in the foreground.
    ///
    /// On a failed first load the session comes back parked in the failed
    /// phase at ordinal 0 with a retry target, not as an error; the caller
    /// renders the failure from the session itself.
    pub async fn start_session(
        &mut self,
        grade: SchoolGrade,
        subject: Subject,
        topic: Option<String>,
    ) -> QuizSession {
        self.cancel_prefetch();
        let mut session = QuizSession::new(grade, subject, topic, self.clock.now());

        let topic = session.topic().map(str::to_string);
        let first =
            fetch_question(self.provider.as_ref(), grade, subject, topic.as_deref()).await;
        match first {
            Ok(question) => {
                info!(%subject, grade = grade.value(), "session started");
                session.install_question(question);
                self.spawn_refill(&session);
            }
            Err(err) => {
                warn!(%err, "first question failed to load");
                session.fail(err.category(), RetryTarget::FirstQuestion);
            }
        }
        session
    }

    /// Submits a free-text answer for grading.
    ///
    /// Returns the verdict record on success and `None` when the provider
    /// failed and the session was parked for retry.
    ///
    /// # Errors
    ///
    /// Propagates the session's own rejections: empty text, wrong question
    /// kind, or a submission outside the awaiting phase.
    pub async fn submit_free_text(
        &self,
        session: &mut QuizSession,
        text: &str,
    ) -> Result<Option<AnswerRecord>, SessionError> {
        let (question_text, answer, sample) = session.prepare_free_text(text)?;
        match self
            .provider
            .verify_answer(&question_text, &answer, &sample)
            .await
        {
            Ok(review) => {
                let record = session.record_free_text(answer, review)?;
                Ok(Some(record.clone()))
            }
            Err(err) => {
                warn!(ordinal = session.ordinal(), %err, "answer verification failed");
                session.fail(err.category(), RetryTarget::Verification { answer });
                Ok(None)
            }
        }
    }

    /// Advances past an answered question.
    ///
    /// A finished background prefetch is folded into the buffer first, then
    /// the session advances: buffer hit, foreground load, or completion.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotAnswered` before a verdict exists and
    /// `SessionError::Completed` once the set is over.
    pub async fn advance(
        &mut self,
        session: &mut QuizSession,
    ) -> Result<AdvanceOutcome, SessionError> {
        self.ingest_finished_prefetch(session).await;

        match session.advance_ordinal(self.clock.now())? {
            AdvanceStep::Completed => {
                self.cancel_prefetch();
                info!(
                    points = session.session_points(),
                    started_at = %session.started_at(),
                    "question set completed"
                );
                Ok(AdvanceOutcome::Completed)
            }
            AdvanceStep::FromBuffer => {
                self.spawn_refill(session);
                Ok(AdvanceOutcome::BufferHit)
            }
            AdvanceStep::NeedsLoad => {
                if self.load_current(session).await {
                    Ok(AdvanceOutcome::Loaded)
                } else {
                    Ok(AdvanceOutcome::LoadFailed)
                }
            }
        }
    }

    /// Re-issues the exact request that parked the session.
    ///
    /// Returns the verdict record when a verification retry produced one;
    /// `None` otherwise. The session phase tells the rest of the story.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NoFailedRequest` when nothing failed and
    /// `SessionError::RetryNotAllowed` when the failure category rules a
    /// retry out.
    pub async fn retry(
        &mut self,
        session: &mut QuizSession,
    ) -> Result<Option<AnswerRecord>, SessionError> {
        match session.take_retry()? {
            target @ (RetryTarget::FirstQuestion | RetryTarget::NextQuestion) => {
                let grade = session.grade();
                let subject = session.subject();
                let topic = session.topic().map(str::to_string);
                let fetched =
                    fetch_question(self.provider.as_ref(), grade, subject, topic.as_deref()).await;
                match fetched {
                    Ok(question) => session.install_question(question),
                    Err(err) => {
                        warn!(ordinal = session.ordinal(), %err, "retried load failed");
                        session.fail(err.category(), target);
                    }
                }
                Ok(None)
            }
            RetryTarget::Verification { answer } => {
                self.submit_free_text(session, &answer).await
            }
        }
    }

    /// Aborts the outstanding background prefetch, if any. Called when a
    /// session ends so a stale question cannot leak into the next one.
    pub fn cancel_prefetch(&mut self) {
        if let Some(handle) = self.prefetch.take() {
            handle.abort();
        }
    }

    /// Whether a background prefetch is still outstanding.
    #[must_use]
    pub fn prefetch_outstanding(&self) -> bool {
        self.prefetch.is_some()
    }

    async fn ingest_finished_prefetch(&mut self, session: &mut QuizSession) {
        let finished = self
            .prefetch
            .as_ref()
            .is_some_and(|handle| handle.is_finished());
        if !finished {
            return;
        }
        let Some(handle) = self.prefetch.take() else {
            return;
        };
        match handle.await {
            Ok(Ok(question)) => {
                if !session.accept_prefetched(question) {
                    warn!("prefetched question dropped, buffer already full");
                }
            }
            Ok(Err(err)) => {
                warn!(%err, "background prefetch failed, next advance loads in the foreground");
            }
            Err(err) => warn!(%err, "background prefetch task died"),
        }
    }

    fn spawn_refill(&mut self, session: &QuizSession) {
        // One outstanding request, spawned only once the slot is free.
        if self.prefetch.is_some() {
            return;
        }
        let provider = Arc::clone(&self.provider);
        let grade = session.grade();
        let subject = session.subject();
        let topic = session.topic().map(str::to_string);
        self.prefetch = Some(tokio::spawn(async move {
            fetch_question(provider.as_ref(), grade, subject, topic.as_deref()).await
        }));
    }

    async fn load_current(&self, session: &mut QuizSession) -> bool {
        let grade = session.grade();
        let subject = session.subject();
        let topic = session.topic().map(str::to_string);
        let fetched =
            fetch_question(self.provider.as_ref(), grade, subject, topic.as_deref()).await;
        match fetched {
            Ok(question) => {
                session.install_question(question);
                true
            }
            Err(err) => {
                warn!(ordinal = session.ordinal(), %err, "question load failed");
                session.fail(err.category(), RetryTarget::NextQuestion);
                false
            }
        }
    }
}

/// Fetches one question and attaches its best-effort illustration. Used by
/// foreground loads and the background prefetch alike.
async fn fetch_question(
    provider: &dyn ContentProvider,
    grade: SchoolGrade,
    subject: Subject,
    topic: Option<&str>,
) -> Result<Question, ProviderError> {
    let mut question = provider.generate_question(grade, subject, topic).await?;
    if let Some(illustration) = provider.generate_illustration(question.visual_prompt()).await {
        question.set_illustration(illustration);
    }
    Ok(question)
}
