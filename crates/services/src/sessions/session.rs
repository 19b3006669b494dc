use chrono::{DateTime, Utc};
use std::fmt;

use smartkids_core::model::{
    AnswerInput, AnswerRecord, AnswerReview, Question, QuestionKind, SchoolGrade, Subject,
};

use super::progress::QuizProgress;
use crate::error::{ErrorCategory, SessionError};

/// Fixed number of questions in one set.
pub const QUESTIONS_PER_SET: usize = 10;

//
// ─── PHASE AND RETRY TARGET ────────────────────────────────────────────────────
//

/// Where the session currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// A question request is running in the foreground; nothing to answer yet.
    Loading,
    /// The current question is shown and accepts exactly one answer.
    AwaitingAnswer,
    /// A verdict exists; the only move left is advancing.
    Answered,
    /// A provider request failed. The ordinal is unchanged and retry re-issues
    /// the failed request, unless the category forbids retrying.
    Failed { category: ErrorCategory },
    /// All questions are done; the point total is final.
    Complete,
}

/// The exact request that failed, kept so retry re-issues it verbatim instead
/// of inventing a fresh one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryTarget {
    /// The load that seeds the session at ordinal 0.
    FirstQuestion,
    /// A mid-set foreground load after an empty-buffer advance.
    NextQuestion,
    /// Grading of a free-text answer; the submitted text is kept as-is.
    Verification { answer: String },
}

/// How an ordinal advance resolved, before any foreground load runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AdvanceStep {
    Completed,
    FromBuffer,
    NeedsLoad,
}

//
// ─── PREFETCH BUFFER ───────────────────────────────────────────────────────────
//

/// Holds at most one question fetched ahead of need.
#[derive(Debug, Default)]
struct PrefetchBuffer {
    slot: Option<Question>,
}

impl PrefetchBuffer {
    /// Stores the question unless the slot is already taken. Returns whether
    /// it was stored.
    fn offer(&mut self, question: Question) -> bool {
        if self.slot.is_some() {
            return false;
        }
        self.slot = Some(question);
        true
    }

    fn take(&mut self) -> Option<Question> {
        self.slot.take()
    }

    fn len(&self) -> usize {
        usize::from(self.slot.is_some())
    }
}

//
// ─── QUIZ SESSION ──────────────────────────────────────────────────────────────
//

/// One run through a fixed-length question set for a single subject.
///
/// The session owns the current question, the one-slot prefetch buffer, and
/// the running point total. It never talks to the provider itself; the
/// orchestrator feeds questions and verdicts in through the crate-private
/// mutators, so every transition below is the only way state can move.
pub struct QuizSession {
    grade: SchoolGrade,
    subject: Subject,
    topic: Option<String>,
    ordinal: usize,
    session_points: u32,
    phase: SessionPhase,
    current: Option<Question>,
    last_answer: Option<AnswerRecord>,
    buffer: PrefetchBuffer,
    retry: Option<RetryTarget>,
    started_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

impl QuizSession {
    /// Creates a session in the loading phase at ordinal 0 with nothing
    /// loaded yet. `started_at` should come from the services layer clock.
    pub(crate) fn new(
        grade: SchoolGrade,
        subject: Subject,
        topic: Option<String>,
        started_at: DateTime<Utc>,
    ) -> Self {
        let topic = topic.filter(|t| !t.trim().is_empty());
        Self {
            grade,
            subject,
            topic,
            ordinal: 0,
            session_points: 0,
            phase: SessionPhase::Loading,
            current: None,
            last_answer: None,
            buffer: PrefetchBuffer::default(),
            retry: None,
            started_at,
            completed_at: None,
        }
    }

    #[must_use]
    pub fn grade(&self) -> SchoolGrade {
        self.grade
    }

    #[must_use]
    pub fn subject(&self) -> Subject {
        self.subject
    }

    #[must_use]
    pub fn topic(&self) -> Option<&str> {
        self.topic.as_deref()
    }

    /// Zero-based position in the set. Strictly increases 0..N-1; a failed
    /// request never moves it.
    #[must_use]
    pub fn ordinal(&self) -> usize {
        self.ordinal
    }

    #[must_use]
    pub fn session_points(&self) -> u32 {
        self.session_points
    }

    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        self.current.as_ref()
    }

    /// The verdict for the current question, once one exists.
    #[must_use]
    pub fn last_answer(&self) -> Option<&AnswerRecord> {
        self.last_answer.as_ref()
    }

    /// Number of questions waiting in the prefetch buffer, 0 or 1.
    #[must_use]
    pub fn buffered_questions(&self) -> usize {
        self.buffer.len()
    }

    /// The request retry would re-issue, when the session is failed.
    #[must_use]
    pub fn retry_target(&self) -> Option<&RetryTarget> {
        self.retry.as_ref()
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        matches!(self.phase, SessionPhase::Complete)
    }

    /// Returns a summary of the current session progress.
    #[must_use]
    pub fn progress(&self) -> QuizProgress {
        let answered = match self.phase {
            SessionPhase::Complete => QUESTIONS_PER_SET,
            SessionPhase::Answered => self.ordinal + 1,
            _ => self.ordinal,
        };
        QuizProgress {
            total: QUESTIONS_PER_SET,
            answered,
            remaining: QUESTIONS_PER_SET - answered,
            points: self.session_points,
            is_complete: self.is_complete(),
        }
    }

    /// Submits a picked option for the current choice question.
    ///
    /// Grading is a local index comparison, so this never issues a request
    /// and cannot fail for provider reasons.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::AlreadyAnswered` if a verdict already exists;
    /// the session state is left untouched so no points are awarded twice.
    /// Also rejects submissions outside the awaiting phase, against the wrong
    /// question kind, or naming an option that does not exist.
    pub fn submit_choice(&mut self, index: usize) -> Result<&AnswerRecord, SessionError> {
        match self.phase {
            SessionPhase::AwaitingAnswer => {}
            SessionPhase::Answered => return Err(SessionError::AlreadyAnswered),
            SessionPhase::Complete => return Err(SessionError::Completed),
            _ => return Err(SessionError::NotAwaitingAnswer),
        }
        let question = self.current.as_ref().ok_or(SessionError::NotAwaitingAnswer)?;
        if question.kind() != QuestionKind::Choice {
            return Err(SessionError::ExpectedFreeText);
        }
        if index >= question.options().len() {
            return Err(SessionError::InvalidOption { index });
        }

        let review = AnswerReview::local(question.is_correct_choice(index));
        let points_awarded = if review.is_correct { question.points() } else { 0 };
        self.session_points += points_awarded;
        self.last_answer = Some(AnswerRecord {
            input: AnswerInput::Choice(index),
            review,
            points_awarded,
        });
        self.retry = None;
        self.phase = SessionPhase::Answered;
        self.last_answer.as_ref().ok_or(SessionError::NotAnswered)
    }

    /// Validates a free-text submission and hands back the strings the
    /// grading request needs: question text, trimmed answer, sample answer.
    ///
    /// # Errors
    ///
    /// Rejects empty text before any request is issued, plus the same phase
    /// and kind misuses as [`QuizSession::submit_choice`].
    pub(crate) fn prepare_free_text(
        &self,
        text: &str,
    ) -> Result<(String, String, String), SessionError> {
        match self.phase {
            SessionPhase::AwaitingAnswer => {}
            SessionPhase::Answered => return Err(SessionError::AlreadyAnswered),
            SessionPhase::Complete => return Err(SessionError::Completed),
            _ => return Err(SessionError::NotAwaitingAnswer),
        }
        let question = self.current.as_ref().ok_or(SessionError::NotAwaitingAnswer)?;
        if question.kind() != QuestionKind::FreeInput {
            return Err(SessionError::ExpectedChoice);
        }
        let answer = text.trim();
        if answer.is_empty() {
            return Err(SessionError::EmptyAnswer);
        }
        Ok((
            question.text().to_string(),
            answer.to_string(),
            question.sample_answer().unwrap_or("").to_string(),
        ))
    }

    /// Records the provider's verdict for a free-text answer.
    pub(crate) fn record_free_text(
        &mut self,
        answer: String,
        review: AnswerReview,
    ) -> Result<&AnswerRecord, SessionError> {
        if self.phase != SessionPhase::AwaitingAnswer {
            return Err(SessionError::NotAwaitingAnswer);
        }
        let question = self.current.as_ref().ok_or(SessionError::NotAwaitingAnswer)?;

        let points_awarded = if review.is_correct { question.points() } else { 0 };
        self.session_points += points_awarded;
        self.last_answer = Some(AnswerRecord {
            input: AnswerInput::FreeText(answer),
            review,
            points_awarded,
        });
        self.retry = None;
        self.phase = SessionPhase::Answered;
        self.last_answer.as_ref().ok_or(SessionError::NotAnswered)
    }

    /// Moves past an answered question.
    ///
    /// At the last ordinal the session completes and `now` becomes its
    /// completion stamp. Otherwise the ordinal increments and the buffered
    /// question becomes current when one is waiting; an empty buffer reports
    /// `NeedsLoad` and leaves the session in the loading phase.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotAnswered` before a verdict exists and
    /// `SessionError::Completed` once the set is over.
    pub(crate) fn advance_ordinal(
        &mut self,
        now: DateTime<Utc>,
    ) -> Result<AdvanceStep, SessionError> {
        match self.phase {
            SessionPhase::Answered => {}
            SessionPhase::Complete => return Err(SessionError::Completed),
            _ => return Err(SessionError::NotAnswered),
        }

        if self.ordinal + 1 >= QUESTIONS_PER_SET {
            self.phase = SessionPhase::Complete;
            self.completed_at = Some(now);
            self.current = None;
            return Ok(AdvanceStep::Completed);
        }

        self.ordinal += 1;
        self.last_answer = None;
        if let Some(question) = self.buffer.take() {
            self.current = Some(question);
            self.phase = SessionPhase::AwaitingAnswer;
            Ok(AdvanceStep::FromBuffer)
        } else {
            self.current = None;
            self.phase = SessionPhase::Loading;
            Ok(AdvanceStep::NeedsLoad)
        }
    }

    /// Makes a freshly loaded question the current one.
    pub(crate) fn install_question(&mut self, question: Question) {
        self.current = Some(question);
        self.last_answer = None;
        self.retry = None;
        self.phase = SessionPhase::AwaitingAnswer;
    }

    /// Stores a prefetched question in the buffer. Returns whether it was
    /// kept; a full buffer drops the offer.
    pub(crate) fn accept_prefetched(&mut self, question: Question) -> bool {
        self.buffer.offer(question)
    }

    /// Parks the session after a failed provider request. The ordinal and any
    /// buffered question are untouched.
    pub(crate) fn fail(&mut self, category: ErrorCategory, target: RetryTarget) {
        self.retry = Some(target);
        self.phase = SessionPhase::Failed { category };
    }

    /// Takes the failed request out for re-issue and restores the phase the
    /// retry runs under.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NoFailedRequest` when nothing failed and
    /// `SessionError::RetryNotAllowed` when the failure category rules a
    /// retry out.
    pub(crate) fn take_retry(&mut self) -> Result<RetryTarget, SessionError> {
        let SessionPhase::Failed { category } = self.phase else {
            return Err(SessionError::NoFailedRequest);
        };
        if !category.allows_retry() {
            return Err(SessionError::RetryNotAllowed);
        }
        let target = self.retry.take().ok_or(SessionError::NoFailedRequest)?;
        self.phase = match target {
            RetryTarget::Verification { .. } => SessionPhase::AwaitingAnswer,
            _ => SessionPhase::Loading,
        };
        Ok(target)
    }
}

impl fmt::Debug for QuizSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuizSession")
            .field("subject", &self.subject)
            .field("ordinal", &self.ordinal)
            .field("phase", &self.phase)
            .field("session_points", &self.session_points)
            .field("buffered", &self.buffer.len())
            .field("started_at", &self.started_at)
            .field("completed_at", &self.completed_at)
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
