//! Prompt templates and response schemas for the generative backend.
//!
//! Every template keeps the learner's age front and centre; the schemas pin
//! the JSON shape so a drifting model cannot hand back prose.

use serde_json::{Value, json};
use smartkids_core::model::{SchoolGrade, Subject, Variant};

/// Style line prepended to every illustration request.
pub(crate) const ILLUSTRATION_STYLE: &str = "High quality 3D cartoon style character or object";

/// Framing for the narration request so the voice reads, not answers.
pub(crate) const NARRATION_FRAMING: &str =
    "Read this quiz question aloud in a warm, gentle voice for a young child";

/// Per-subject guardrails. Models love to drift into a neighbouring subject,
/// so each rule names what is fair game and what is off limits.
fn subject_rules(subject: Subject) -> &'static str {
    match subject {
        Subject::Math => {
            "This is a MATH question. Cover: arithmetic, applied logic, shapes. \
             Strictly off limits: poetry, English vocabulary."
        }
        Subject::Chinese => {
            "This is a CHINESE question. Cover: characters and words, classic poems, \
             sentence building. Strictly off limits: pure arithmetic, long English passages."
        }
        Subject::English => {
            "This is an ENGLISH question. Cover: word choice, grammar, simple translation. \
             Strictly off limits: math equations, classical Chinese texts."
        }
    }
}

/// Builds the question-generation prompt.
pub(crate) fn question_prompt(
    grade: SchoolGrade,
    subject: Subject,
    topic: Option<&str>,
    variant: Variant,
) -> String {
    let mut prompt = format!(
        "You are an experienced primary-school teacher. Write one {subject} question \
         for a grade {grade_level} pupil. {rules}",
        subject = subject.as_str(),
        grade_level = grade.value(),
        rules = subject_rules(subject),
    );
    if let Some(topic) = topic {
        let topic = topic.trim();
        if !topic.is_empty() {
            prompt.push_str(&format!(
                " FOCUS TOPIC: {topic} (blend it naturally into the subject)."
            ));
        }
    }
    if let Some(flavor) = variant.prompt_flavor() {
        prompt.push(' ');
        prompt.push_str(flavor);
    }
    prompt.push_str(
        " Reply as JSON with: type ('choice' or 'input'), text, options (array), \
         correctIndex (number), points (3, 5 or 7), explanation, visualPrompt, sampleAnswer.",
    );
    prompt
}

/// Builds the free-text grading prompt.
pub(crate) fn verification_prompt(
    question_text: &str,
    learner_answer: &str,
    sample_answer: &str,
) -> String {
    format!(
        "Question: {question_text} Reference answer: {sample_answer} \
         Pupil's answer: {learner_answer}. Judge whether the pupil is right and give \
         one short, encouraging sentence of feedback. \
         Reply as JSON: {{isCorrect: boolean, feedback: string}}"
    )
}

/// Builds the full illustration prompt from a question's visual cue.
pub(crate) fn illustration_prompt(visual_prompt: &str) -> String {
    format!("{ILLUSTRATION_STYLE}: {visual_prompt}")
}

/// Builds the narration text handed to the speech model.
pub(crate) fn narration_prompt(text: &str) -> String {
    format!("{NARRATION_FRAMING}: {text}")
}

/// Structured-output schema for question generation.
///
/// `options`, `correctIndex` and `sampleAnswer` are nullable because only one
/// of the two question kinds uses each; draft validation enforces the pairing.
pub(crate) fn question_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "type": { "type": "STRING" },
            "text": { "type": "STRING" },
            "options": { "type": "ARRAY", "items": { "type": "STRING" }, "nullable": true },
            "correctIndex": { "type": "NUMBER", "nullable": true },
            "sampleAnswer": { "type": "STRING", "nullable": true },
            "points": { "type": "NUMBER" },
            "explanation": { "type": "STRING" },
            "visualPrompt": { "type": "STRING" }
        },
        "required": ["type", "text", "points", "explanation", "visualPrompt"]
    })
}

/// Structured-output schema for answer verification.
pub(crate) fn verdict_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "isCorrect": { "type": "BOOLEAN" },
            "feedback": { "type": "STRING" }
        },
        "required": ["isCorrect", "feedback"]
    })
}

// ─── Tests ─────────────────────────────────────────────────────────────────────
