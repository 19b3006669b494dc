use std::fmt;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use services::{
    AppFlow, FlowController, FlowError, FlowEvent, NarrationSink, QUESTIONS_PER_SET, SessionPhase,
    SpeechClip, bootstrap,
};
use smartkids_core::model::{QuestionKind, SchoolGrade, Subject, Variant};
use storage::repository::Storage;
use tokio::io::AsyncBufReadExt;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidVariant { raw: String },
    InvalidProfilePath { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidVariant { raw } => write!(f, "invalid --variant value: {raw}"),
            ArgsError::InvalidProfilePath { raw } => write!(f, "invalid --profile value: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

/// Narration without an audio device: announces the clip, then holds the
/// floor for its duration so cancellation behaves like real playback.
struct TerminalNarrator;

#[async_trait]
impl NarrationSink for TerminalNarrator {
    async fn play(&self, clip: SpeechClip, cancel: CancellationToken) {
        let seconds = clip.duration_secs();
        println!("  (reading aloud, {seconds:.1}s)");
        tokio::select! {
            () = tokio::time::sleep(Duration::from_secs_f32(seconds)) => {}
            () = cancel.cancelled() => {}
        }
    }
}

struct Args {
    profile_path: String,
    variant: Variant,
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- [--profile <path>] [--variant <standard|junior>]");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --profile smartkids-profile.json");
    eprintln!("  --variant standard");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  SMARTKIDS_PROFILE_PATH, SMARTKIDS_VARIANT, SMARTKIDS_LOG");
    eprintln!("  SMARTKIDS_API_KEY enables live question generation.");
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut profile_path = std::env::var("SMARTKIDS_PROFILE_PATH")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| "smartkids-profile.json".to_string());
        let mut variant = std::env::var("SMARTKIDS_VARIANT")
            .ok()
            .and_then(|value| value.parse::<Variant>().ok())
            .unwrap_or(Variant::Standard);

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--profile" => {
                    let value = require_value(args, "--profile")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidProfilePath { raw: value });
                    }
                    profile_path = value;
                }
                "--variant" => {
                    let value = require_value(args, "--variant")?;
                    variant = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidVariant { raw: value.clone() })?;
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            profile_path,
            variant,
        })
    }
}

fn init_tracing() {
    let filter = std::env::var("SMARTKIDS_LOG").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(filter))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let parsed = Args::parse(&mut args).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    init_tracing();

    // The profile lives in one JSON file next to wherever the app runs.
    let storage = Storage::json_file(&parsed.profile_path);
    let mut controller = bootstrap(&storage, parsed.variant, Arc::new(TerminalNarrator)).await?;

    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    render(&controller);
    loop {
        print!("> ");
        std::io::stdout().flush()?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        match step(&mut controller, line.trim()).await {
            Step::Continue => render(&controller),
            Step::Quit => break,
        }
    }
    Ok(())
}

enum Step {
    Continue,
    Quit,
}

async fn step(controller: &mut FlowController, line: &str) -> Step {
    match dispatch(controller, line).await {
        Ok(step) => step,
        Err(err) => {
            println!("! {err}");
            Step::Continue
        }
    }
}

async fn dispatch(controller: &mut FlowController, line: &str) -> Result<Step, FlowError> {
    match controller.flow() {
        AppFlow::Splash => controller.apply(FlowEvent::SplashDone).await?,
        AppFlow::Landing => controller.apply(FlowEvent::StartPressed).await?,
        AppFlow::NameEntry => {
            if line.is_empty() {
                println!("Please type a name.");
            } else {
                controller
                    .apply(FlowEvent::NameSubmitted(line.to_string()))
                    .await?;
            }
        }
        AppFlow::GradeSelect => {
            match line.parse::<u8>().ok().and_then(|n| SchoolGrade::new(n).ok()) {
                Some(grade) => controller.apply(FlowEvent::GradePicked(grade)).await?,
                None => println!("Pick a grade from 1 to 6."),
            }
        }
        AppFlow::Dashboard => return dashboard_command(controller, line).await,
        AppFlow::TopicSelect { .. } => match line {
            "back" => controller.apply(FlowEvent::TopicCancelled).await?,
            "" => controller.apply(FlowEvent::TopicConfirmed(None)).await?,
            topic => {
                controller
                    .apply(FlowEvent::TopicConfirmed(Some(topic.to_string())))
                    .await?;
            }
        },
        AppFlow::Quiz => return quiz_command(controller, line).await,
        AppFlow::Result { .. } => controller.apply(FlowEvent::ResultAcknowledged).await?,
        AppFlow::ProfileView => return profile_command(controller, line).await,
    }
    Ok(Step::Continue)
}

async fn dashboard_command(
    controller: &mut FlowController,
    line: &str,
) -> Result<Step, FlowError> {
    match line {
        "quit" => return Ok(Step::Quit),
        "profile" => controller.apply(FlowEvent::ProfileOpened).await?,
        other => match other.parse::<Subject>() {
            Ok(subject) => controller.apply(FlowEvent::SubjectChosen(subject)).await?,
            Err(_) => println!("Try: math, chinese, english, profile or quit."),
        },
    }
    Ok(Step::Continue)
}

async fn quiz_command(controller: &mut FlowController, line: &str) -> Result<Step, FlowError> {
    if line == "exit" {
        controller.apply(FlowEvent::QuizExited).await?;
        return Ok(Step::Continue);
    }
    let phase = match controller.session() {
        Some(session) => session.phase(),
        None => {
            controller.apply(FlowEvent::QuizExited).await?;
            return Ok(Step::Continue);
        }
    };
    match phase {
        SessionPhase::AwaitingAnswer => {
            if line == "say" {
                controller.speak_current()?;
            } else {
                submit_answer(controller, line).await?;
            }
        }
        SessionPhase::Answered => controller.advance_quiz().await?,
        SessionPhase::Failed { category } => {
            if line == "retry" && category.allows_retry() {
                controller.retry_quiz().await?;
            } else {
                controller.apply(FlowEvent::QuizExited).await?;
            }
        }
        SessionPhase::Loading | SessionPhase::Complete => {}
    }
    Ok(Step::Continue)
}

async fn submit_answer(controller: &mut FlowController, line: &str) -> Result<(), FlowError> {
    let kind = controller
        .session()
        .and_then(|session| session.current_question())
        .map(|question| question.kind());
    match kind {
        Some(QuestionKind::Choice) => match line.parse::<usize>() {
            Ok(pick) if pick >= 1 => controller.submit_choice(pick - 1)?,
            _ => println!("Answer with the option number."),
        },
        Some(QuestionKind::FreeInput) => {
            if line.is_empty() {
                println!("Type your answer first.");
            } else {
                controller.submit_free_text(line).await?;
            }
        }
        None => {}
    }
    Ok(())
}

async fn profile_command(controller: &mut FlowController, line: &str) -> Result<Step, FlowError> {
    if let Some(rest) = line.strip_prefix("name ") {
        controller
            .apply(FlowEvent::ProfileRenamed(rest.trim().to_string()))
            .await?;
    } else if let Some(rest) = line.strip_prefix("avatar ") {
        match rest.trim().parse::<usize>() {
            Ok(pick) if pick >= 1 => controller.apply(FlowEvent::AvatarPicked(pick - 1)).await?,
            _ => println!("Pick an avatar from 1 to 6."),
        }
    } else {
        match line {
            "grade" => controller.apply(FlowEvent::GradeEditRequested).await?,
            "back" => controller.apply(FlowEvent::ProfileClosed).await?,
            _ => println!("Try: name <new name>, avatar <1-6>, grade or back."),
        }
    }
    Ok(Step::Continue)
}

fn render(controller: &FlowController) {
    match controller.flow() {
        AppFlow::Splash => {
            println!();
            println!("*** SmartKids ***");
            println!("Press enter to begin.");
        }
        AppFlow::Landing => println!("Welcome back to SmartKids! Press enter to start."),
        AppFlow::NameEntry => println!("What should we call you?"),
        AppFlow::GradeSelect => println!("Which grade are you in? (1-6)"),
        AppFlow::Dashboard => render_dashboard(controller),
        AppFlow::TopicSelect { subject } => {
            println!("{subject}: type a focus topic, press enter to skip, or 'back'.");
        }
        AppFlow::Quiz => render_quiz(controller),
        AppFlow::Result { outcome } => {
            println!();
            println!("Set finished! You scored {} points.", outcome.session_points);
            println!("Coins earned: {}", outcome.coins_earned);
            if outcome.trophy_earned {
                println!("A new trophy joins your shelf!");
            }
            println!(
                "Totals: {} points, {} coins.",
                outcome.total_points, outcome.total_coins
            );
            println!("Press enter to go back.");
        }
        AppFlow::ProfileView => render_profile(controller),
    }
}

fn render_dashboard(controller: &FlowController) {
    let profile = controller.profile();
    println!();
    println!(
        "Hi {}! Grade {} | {} points | {} coins | {} trophies",
        profile.name(),
        profile.grade().value(),
        profile.points(),
        profile.coins(),
        profile.trophies()
    );
    println!("Choose a subject: math, chinese, english. Or: profile, quit.");
}

fn render_quiz(controller: &FlowController) {
    let Some(session) = controller.session() else {
        return;
    };
    match session.phase() {
        SessionPhase::AwaitingAnswer => {
            let Some(question) = session.current_question() else {
                return;
            };
            println!();
            println!(
                "Question {} of {} (+{} points)",
                session.ordinal() + 1,
                QUESTIONS_PER_SET,
                question.points()
            );
            println!("{}", question.text());
            if question.illustration().is_some() {
                println!("  (picture ready)");
            }
            match question.kind() {
                QuestionKind::Choice => {
                    for (index, option) in question.options().iter().enumerate() {
                        println!("  {}. {option}", index + 1);
                    }
                    println!("Answer with a number. Also: say, exit.");
                }
                QuestionKind::FreeInput => println!("Type your answer. Also: say, exit."),
            }
        }
        SessionPhase::Answered => {
            let Some(record) = session.last_answer() else {
                return;
            };
            if record.review.is_correct {
                println!("Correct! +{} points", record.points_awarded);
            } else {
                println!("Not this time.");
            }
            if !record.review.feedback.is_empty() {
                println!("{}", record.review.feedback);
            }
            if let Some(question) = session.current_question() {
                println!("{}", question.explanation());
            }
            println!(
                "Score so far: {}. Press enter for the next question.",
                session.session_points()
            );
        }
        SessionPhase::Failed { category } => {
            println!("{}", category.guidance());
            if category.allows_retry() {
                println!("Type 'retry' to try again, or 'exit' to go back.");
            } else {
                println!("Press enter to go back.");
            }
        }
        SessionPhase::Loading => println!("Loading..."),
        SessionPhase::Complete => {}
    }
}

fn render_profile(controller: &FlowController) {
    let profile = controller.profile();
    println!();
    println!("Name: {}", profile.name());
    println!("Grade: {}", profile.grade().value());
    if let Some(url) = profile.avatar_url() {
        println!("Avatar: {url}");
    }
    println!(
        "{} points | {} coins | {} trophies",
        profile.points(),
        profile.coins(),
        profile.trophies()
    );
    println!("Commands: name <new name>, avatar <1-6>, grade, back.");
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
