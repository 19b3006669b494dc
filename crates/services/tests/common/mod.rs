#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use services::{
    ContentProvider, FlowController, FlowEvent, NarrationSink, ProviderError, SpeechClip,
    bootstrap_with,
};
use smartkids_core::model::{
    AnswerReview, Illustration, Question, QuestionDraft, QuestionId, QuestionKind, SchoolGrade,
    Subject, Variant,
};
use smartkids_core::time::fixed_clock;
use storage::repository::Storage;
use tokio_util::sync::CancellationToken;

/// One captured `verify_answer` call, in argument order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyRequest {
    pub question_text: String,
    pub learner_answer: String,
    pub sample_answer: String,
}

/// Provider that replays scripted results in order and counts every call.
///
/// A drained script answers with `Unavailable` so an unplanned extra request
/// shows up as a failed step and a wrong call count instead of a hang.
pub struct ScriptedProvider {
    questions: Mutex<VecDeque<Result<Question, ProviderError>>>,
    verdicts: Mutex<VecDeque<Result<AnswerReview, ProviderError>>>,
    verify_requests: Mutex<Vec<VerifyRequest>>,
    question_calls: AtomicUsize,
    verify_calls: AtomicUsize,
    speech: bool,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self {
            questions: Mutex::new(VecDeque::new()),
            verdicts: Mutex::new(VecDeque::new()),
            verify_requests: Mutex::new(Vec::new()),
            question_calls: AtomicUsize::new(0),
            verify_calls: AtomicUsize::new(0),
            speech: false,
        }
    }

    pub fn with_speech() -> Self {
        Self {
            speech: true,
            ..Self::new()
        }
    }

    pub fn push_question(&self, question: Question) {
        self.questions.lock().unwrap().push_back(Ok(question));
    }

    pub fn push_question_failure(&self, error: ProviderError) {
        self.questions.lock().unwrap().push_back(Err(error));
    }

    pub fn push_verdict(&self, review: AnswerReview) {
        self.verdicts.lock().unwrap().push_back(Ok(review));
    }

    pub fn push_verdict_failure(&self, error: ProviderError) {
        self.verdicts.lock().unwrap().push_back(Err(error));
    }

    pub fn question_calls(&self) -> usize {
        self.question_calls.load(Ordering::SeqCst)
    }

    pub fn verify_calls(&self) -> usize {
        self.verify_calls.load(Ordering::SeqCst)
    }

    pub fn verify_requests(&self) -> Vec<VerifyRequest> {
        self.verify_requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ContentProvider for ScriptedProvider {
    async fn generate_question(
        &self,
        _grade: SchoolGrade,
        _subject: Subject,
        _topic: Option<&str>,
    ) -> Result<Question, ProviderError> {
        self.question_calls.fetch_add(1, Ordering::SeqCst);
        self.questions
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ProviderError::Unavailable("script exhausted".into())))
    }

    async fn verify_answer(
        &self,
        question_text: &str,
        learner_answer: &str,
        sample_answer: &str,
    ) -> Result<AnswerReview, ProviderError> {
        self.verify_calls.fetch_add(1, Ordering::SeqCst);
        self.verify_requests.lock().unwrap().push(VerifyRequest {
            question_text: question_text.to_string(),
            learner_answer: learner_answer.to_string(),
            sample_answer: sample_answer.to_string(),
        });
        self.verdicts
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ProviderError::Unavailable("script exhausted".into())))
    }

    async fn generate_illustration(&self, _prompt: &str) -> Option<Illustration> {
        None
    }

    async fn generate_speech(&self, _text: &str) -> Option<SpeechClip> {
        if self.speech {
            Some(SpeechClip {
                pcm: vec![0; 4_800],
                sample_rate_hz: 24_000,
                channels: 1,
            })
        } else {
            None
        }
    }
}

/// Sink that swallows clips, for tests that never assert on narration.
pub struct SilentSink;

#[async_trait]
impl NarrationSink for SilentSink {
    async fn play(&self, _clip: SpeechClip, _cancel: CancellationToken) {}
}

/// Sink that counts playbacks and tracks how many run at once.
pub struct CountingSink {
    hold_until_cancelled: bool,
    plays: AtomicUsize,
    active: AtomicUsize,
    max_active: AtomicUsize,
}

impl CountingSink {
    pub fn new() -> Self {
        Self {
            hold_until_cancelled: false,
            plays: AtomicUsize::new(0),
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
        }
    }

    pub fn holding() -> Self {
        Self {
            hold_until_cancelled: true,
            ..Self::new()
        }
    }

    pub fn plays(&self) -> usize {
        self.plays.load(Ordering::SeqCst)
    }

    pub fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    pub fn max_active(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }
}

// Decrements on drop so a playback cancelled mid-await still counts down.
struct ActiveGuard<'a>(&'a AtomicUsize);

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl NarrationSink for CountingSink {
    async fn play(&self, _clip: SpeechClip, cancel: CancellationToken) {
        self.plays.fetch_add(1, Ordering::SeqCst);
        let running = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(running, Ordering::SeqCst);
        let _guard = ActiveGuard(&self.active);
        if self.hold_until_cancelled {
            cancel.cancelled().await;
        }
    }
}

/// Lets every spawned task run to completion on the test runtime.
pub async fn settle() {
    for _ in 0..32 {
        tokio::task::yield_now().await;
    }
}

/// Yields until `check` passes, panicking if it never does.
pub async fn wait_until(mut check: impl FnMut() -> bool) {
    for _ in 0..1_000 {
        if check() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("condition was not reached");
}

pub fn choice_question(points: u32, correct_index: usize) -> Question {
    QuestionDraft {
        kind: QuestionKind::Choice,
        text: "What is 2 + 3?".to_string(),
        options: Some(vec![
            "4".to_string(),
            "5".to_string(),
            "6".to_string(),
            "7".to_string(),
        ]),
        correct_index: Some(correct_index),
        points,
        explanation: "Count up three from two.".to_string(),
        visual_prompt: "five shiny apples".to_string(),
        sample_answer: None,
    }
    .validate(QuestionId::new())
    .unwrap()
}

pub fn input_question(points: u32) -> Question {
    QuestionDraft {
        kind: QuestionKind::FreeInput,
        text: "Name an animal that says moo.".to_string(),
        options: None,
        correct_index: None,
        points,
        explanation: "Cows say moo.".to_string(),
        visual_prompt: "a friendly cow in a meadow".to_string(),
        sample_answer: Some("cow".to_string()),
    }
    .validate(QuestionId::new())
    .unwrap()
}

/// Boots a controller over the given storage with the fixed clock.
pub async fn fresh_controller(
    storage: &Storage,
    variant: Variant,
    provider: Arc<ScriptedProvider>,
    sink: Arc<dyn NarrationSink>,
) -> FlowController {
    bootstrap_with(storage, variant, sink, fixed_clock(), provider)
        .await
        .expect("bootstrap controller")
}

/// Walks a first-run learner from the splash screen to the dashboard.
pub async fn reach_dashboard(controller: &mut FlowController) {
    controller
        .apply(FlowEvent::SplashDone)
        .await
        .expect("leave splash");
    controller
        .apply(FlowEvent::StartPressed)
        .await
        .expect("leave landing");
    controller
        .apply(FlowEvent::NameSubmitted("Mia".to_string()))
        .await
        .expect("submit name");
    controller
        .apply(FlowEvent::GradePicked(SchoolGrade::new(3).unwrap()))
        .await
        .expect("pick grade");
}

/// Continues from the dashboard into a math quiz with no focus topic.
pub async fn start_math_quiz(controller: &mut FlowController) {
    controller
        .apply(FlowEvent::SubjectChosen(Subject::Math))
        .await
        .expect("choose subject");
    controller
        .apply(FlowEvent::TopicConfirmed(None))
        .await
        .expect("confirm topic");
}
