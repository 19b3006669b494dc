use smartkids_core::model::{
    DEFAULT_AVATARS, Profile, SchoolGrade, SessionOutcome, Subject, Variant,
};

use crate::error::FlowError;
use crate::narration::Narrator;
use crate::profile_service::ProfileService;
use crate::sessions::{AdvanceOutcome, QuizLoopService, QuizSession};

//
// ─── VIEW STATE ────────────────────────────────────────────────────────────────
//

/// The one screen being shown, with the data that screen needs and nothing
/// else. Transitions go through [`FlowController::apply`] exhaustively, so an
/// event that makes no sense on the current screen is rejected instead of
/// silently rerouting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppFlow {
    Splash,
    Landing,
    NameEntry,
    GradeSelect,
    Dashboard,
    TopicSelect { subject: Subject },
    Quiz,
    Result { outcome: SessionOutcome },
    ProfileView,
}

/// A navigation press, as the UI reports it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowEvent {
    SplashDone,
    StartPressed,
    NameSubmitted(String),
    GradePicked(SchoolGrade),
    SubjectChosen(Subject),
    TopicConfirmed(Option<String>),
    TopicCancelled,
    QuizExited,
    ResultAcknowledged,
    ProfileOpened,
    ProfileClosed,
    GradeEditRequested,
    ProfileRenamed(String),
    AvatarPicked(usize),
}

//
// ─── FLOW CONTROLLER ───────────────────────────────────────────────────────────
//

/// Drives the whole app: screen transitions, the running quiz session, the
/// learner profile, and narration.
///
/// The quiz session lives here and only here. Exiting mid-set drops it
/// without touching the profile; only an advance off the last question
/// finalizes rewards and moves to the result screen.
pub struct FlowController {
    flow: AppFlow,
    session: Option<QuizSession>,
    quiz: QuizLoopService,
    profiles: ProfileService,
    narrator: Narrator,
}

impl FlowController {
    #[must_use]
    pub fn new(quiz: QuizLoopService, profiles: ProfileService, narrator: Narrator) -> Self {
        Self {
            flow: AppFlow::Splash,
            session: None,
            quiz,
            profiles,
            narrator,
        }
    }

    #[must_use]
    pub fn flow(&self) -> AppFlow {
        self.flow
    }

    #[must_use]
    pub fn session(&self) -> Option<&QuizSession> {
        self.session.as_ref()
    }

    #[must_use]
    pub fn profile(&self) -> &Profile {
        self.profiles.profile()
    }

    #[must_use]
    pub fn variant(&self) -> Variant {
        self.profiles.variant()
    }

    #[must_use]
    pub fn narrator(&self) -> &Narrator {
        &self.narrator
    }

    /// Applies a navigation event to the current screen.
    ///
    /// # Errors
    ///
    /// Returns `FlowError::UnexpectedEvent` when the event does not belong to
    /// the current screen; profile mutations propagate their own failures.
    pub async fn apply(&mut self, event: FlowEvent) -> Result<(), FlowError> {
        match (self.flow, event) {
            (AppFlow::Splash, FlowEvent::SplashDone) => {
                self.flow = if self.variant().skip_landing() {
                    self.post_landing_screen()
                } else {
                    AppFlow::Landing
                };
            }
            (AppFlow::Landing, FlowEvent::StartPressed) => {
                self.flow = self.post_landing_screen();
            }
            (AppFlow::NameEntry, FlowEvent::NameSubmitted(name)) => {
                self.profiles.rename(&name).await?;
                self.flow = AppFlow::GradeSelect;
            }
            (AppFlow::GradeSelect, FlowEvent::GradePicked(grade)) => {
                self.profiles.set_grade(grade).await?;
                self.flow = AppFlow::Dashboard;
            }
            (AppFlow::Dashboard, FlowEvent::SubjectChosen(subject)) => {
                self.flow = AppFlow::TopicSelect { subject };
            }
            (AppFlow::Dashboard, FlowEvent::ProfileOpened) => {
                self.flow = AppFlow::ProfileView;
            }
            (AppFlow::TopicSelect { subject }, FlowEvent::TopicConfirmed(topic)) => {
                let grade = self.profiles.profile().grade();
                let session = self.quiz.start_session(grade, subject, topic).await;
                self.session = Some(session);
                self.flow = AppFlow::Quiz;
            }
            (AppFlow::TopicSelect { .. }, FlowEvent::TopicCancelled) => {
                self.flow = AppFlow::Dashboard;
            }
            (AppFlow::Quiz, FlowEvent::QuizExited) => {
                self.abandon_session();
                self.flow = AppFlow::Dashboard;
            }
            (AppFlow::Result { .. }, FlowEvent::ResultAcknowledged) => {
                self.flow = AppFlow::Dashboard;
            }
            (AppFlow::ProfileView, FlowEvent::ProfileClosed) => {
                self.flow = AppFlow::Dashboard;
            }
            (AppFlow::ProfileView, FlowEvent::GradeEditRequested) => {
                self.flow = AppFlow::GradeSelect;
            }
            (AppFlow::ProfileView, FlowEvent::ProfileRenamed(name)) => {
                self.profiles.rename(&name).await?;
            }
            (AppFlow::ProfileView, FlowEvent::AvatarPicked(index)) => {
                let url = DEFAULT_AVATARS
                    .get(index)
                    .ok_or(FlowError::UnexpectedEvent)?;
                self.profiles.set_avatar(url).await?;
            }
            _ => return Err(FlowError::UnexpectedEvent),
        }
        Ok(())
    }

    /// Submits a picked option. Local grading, so this never waits.
    ///
    /// # Errors
    ///
    /// Rejects the call off the quiz screen and propagates the session's own
    /// rejections.
    pub fn submit_choice(&mut self, index: usize) -> Result<(), FlowError> {
        if !matches!(self.flow, AppFlow::Quiz) {
            return Err(FlowError::UnexpectedEvent);
        }
        let session = self.session.as_mut().ok_or(FlowError::UnexpectedEvent)?;
        session.submit_choice(index)?;
        Ok(())
    }

    /// Submits typed text for grading. A provider failure parks the session
    /// with a retry affordance rather than erroring here.
    ///
    /// # Errors
    ///
    /// Rejects the call off the quiz screen, empty text, and kind mismatches.
    pub async fn submit_free_text(&mut self, text: &str) -> Result<(), FlowError> {
        if !matches!(self.flow, AppFlow::Quiz) {
            return Err(FlowError::UnexpectedEvent);
        }
        let session = self.session.as_mut().ok_or(FlowError::UnexpectedEvent)?;
        self.quiz.submit_free_text(session, text).await?;
        Ok(())
    }

    /// Moves to the next question, or finalizes the set from the last one.
    ///
    /// Completing the set applies rewards to the profile, persists it, and
    /// lands on the result screen in one step, so a learner can never see a
    /// finished set without its rewards.
    ///
    /// # Errors
    ///
    /// Rejects the call off the quiz screen or before a verdict exists;
    /// propagates persistence failures.
    pub async fn advance_quiz(&mut self) -> Result<(), FlowError> {
        if !matches!(self.flow, AppFlow::Quiz) {
            return Err(FlowError::UnexpectedEvent);
        }
        self.narrator.stop();
        let session = self.session.as_mut().ok_or(FlowError::UnexpectedEvent)?;
        let outcome = self.quiz.advance(session).await?;
        if outcome == AdvanceOutcome::Completed {
            let subject = session.subject();
            let points = session.session_points();
            let result = self.profiles.finalize_session(subject, points).await?;
            self.session = None;
            self.flow = AppFlow::Result { outcome: result };
        }
        Ok(())
    }

    /// Re-issues the request that parked the session.
    ///
    /// # Errors
    ///
    /// Rejects the call off the quiz screen, when nothing failed, or when the
    /// failure category forbids retrying.
    pub async fn retry_quiz(&mut self) -> Result<(), FlowError> {
        if !matches!(self.flow, AppFlow::Quiz) {
            return Err(FlowError::UnexpectedEvent);
        }
        let session = self.session.as_mut().ok_or(FlowError::UnexpectedEvent)?;
        self.quiz.retry(session).await?;
        Ok(())
    }

    /// Reads the current question aloud, replacing any narration in flight.
    ///
    /// # Errors
    ///
    /// Rejects the call when no question is on screen.
    pub fn speak_current(&self) -> Result<(), FlowError> {
        if !matches!(self.flow, AppFlow::Quiz) {
            return Err(FlowError::UnexpectedEvent);
        }
        let text = self
            .session
            .as_ref()
            .and_then(QuizSession::current_question)
            .map(|question| question.text().to_string())
            .ok_or(FlowError::UnexpectedEvent)?;
        self.narrator.speak(&text);
        Ok(())
    }

    fn post_landing_screen(&self) -> AppFlow {
        if self.profiles.is_returning() {
            AppFlow::Dashboard
        } else {
            AppFlow::NameEntry
        }
    }

    // Mid-run exit records nothing; only a completed set touches the profile.
    fn abandon_session(&mut self) {
        self.narrator.stop();
        self.quiz.cancel_prefetch();
        self.session = None;
    }
}
