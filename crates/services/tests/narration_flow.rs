mod common;

use std::sync::Arc;

use common::{
    CountingSink, ScriptedProvider, choice_question, fresh_controller, reach_dashboard,
    start_math_quiz, wait_until,
};
use services::{FlowError, FlowEvent, NarrationSink};
use smartkids_core::model::Variant;
use storage::repository::Storage;

#[tokio::test]
async fn speak_current_reads_the_question_aloud() {
    let storage = Storage::in_memory();
    let provider = Arc::new(ScriptedProvider::with_speech());
    provider.push_question(choice_question(5, 2));
    provider.push_question(choice_question(5, 2));
    let sink = Arc::new(CountingSink::new());
    let mut controller = fresh_controller(
        &storage,
        Variant::Standard,
        Arc::clone(&provider),
        Arc::clone(&sink) as Arc<dyn NarrationSink>,
    )
    .await;
    reach_dashboard(&mut controller).await;
    start_math_quiz(&mut controller).await;

    controller.speak_current().expect("narrate the question");
    wait_until(|| sink.plays() == 1).await;
    assert_eq!(sink.active(), 0);
}

#[tokio::test]
async fn advancing_stops_the_narration() {
    let storage = Storage::in_memory();
    let provider = Arc::new(ScriptedProvider::with_speech());
    for _ in 0..3 {
        provider.push_question(choice_question(5, 2));
    }
    let sink = Arc::new(CountingSink::holding());
    let mut controller = fresh_controller(
        &storage,
        Variant::Standard,
        Arc::clone(&provider),
        Arc::clone(&sink) as Arc<dyn NarrationSink>,
    )
    .await;
    reach_dashboard(&mut controller).await;
    start_math_quiz(&mut controller).await;

    controller.speak_current().expect("narrate the question");
    wait_until(|| sink.active() == 1).await;

    controller.submit_choice(2).expect("answer");
    controller.advance_quiz().await.expect("advance");
    wait_until(|| sink.active() == 0).await;
    assert_eq!(sink.plays(), 1);
}

#[tokio::test]
async fn a_new_utterance_replaces_the_running_one() {
    let storage = Storage::in_memory();
    let provider = Arc::new(ScriptedProvider::with_speech());
    provider.push_question(choice_question(5, 2));
    provider.push_question(choice_question(5, 2));
    let sink = Arc::new(CountingSink::holding());
    let mut controller = fresh_controller(
        &storage,
        Variant::Standard,
        Arc::clone(&provider),
        Arc::clone(&sink) as Arc<dyn NarrationSink>,
    )
    .await;
    reach_dashboard(&mut controller).await;
    start_math_quiz(&mut controller).await;

    controller.speak_current().expect("first narration");
    wait_until(|| sink.active() == 1).await;

    controller.speak_current().expect("second narration");
    wait_until(|| sink.plays() == 2).await;
    assert_eq!(sink.max_active(), 1);
    assert_eq!(sink.active(), 1);

    // Walking out of the quiz silences whatever is still playing.
    controller
        .apply(FlowEvent::QuizExited)
        .await
        .expect("exit quiz");
    wait_until(|| sink.active() == 0).await;
}

#[tokio::test]
async fn speaking_off_the_quiz_screen_is_rejected() {
    let storage = Storage::in_memory();
    let provider = Arc::new(ScriptedProvider::with_speech());
    let sink = Arc::new(CountingSink::new());
    let mut controller = fresh_controller(
        &storage,
        Variant::Standard,
        Arc::clone(&provider),
        Arc::clone(&sink) as Arc<dyn NarrationSink>,
    )
    .await;

    let err = controller
        .speak_current()
        .expect_err("narration outside a quiz");
    assert!(matches!(err, FlowError::UnexpectedEvent));

    reach_dashboard(&mut controller).await;
    let err = controller
        .speak_current()
        .expect_err("narration on the dashboard");
    assert!(matches!(err, FlowError::UnexpectedEvent));
    assert_eq!(sink.plays(), 0);
}
