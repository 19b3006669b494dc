use std::env;
use std::fmt;

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use smartkids_core::model::{
    AnswerReview, Illustration, Question, QuestionDraft, QuestionId, SchoolGrade, Subject, Variant,
};
use tracing::{debug, error, warn};

use crate::error::ProviderError;
use crate::provider::prompts;
use crate::provider::{ContentProvider, SpeechClip};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_TEXT_MODEL: &str = "gemini-3-flash-preview";
const DEFAULT_IMAGE_MODEL: &str = "gemini-2.5-flash-image";
const DEFAULT_SPEECH_MODEL: &str = "gemini-2.5-flash-preview-tts";

const NARRATION_VOICE: &str = "Kore";
const ILLUSTRATION_ASPECT_RATIO: &str = "1:1";

/// Speech clips come back as raw PCM at this rate, mono, 16-bit.
const SPEECH_SAMPLE_RATE_HZ: u32 = 24_000;

#[derive(Clone, Debug)]
pub struct GeminiConfig {
    pub base_url: String,
    pub api_key: String,
    pub text_model: String,
    pub image_model: String,
    pub speech_model: String,
}

impl GeminiConfig {
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let api_key = env::var("SMARTKIDS_API_KEY").ok()?;
        if api_key.trim().is_empty() {
            return None;
        }
        let base_url =
            env::var("SMARTKIDS_API_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.into());
        let text_model =
            env::var("SMARTKIDS_TEXT_MODEL").unwrap_or_else(|_| DEFAULT_TEXT_MODEL.into());
        let image_model =
            env::var("SMARTKIDS_IMAGE_MODEL").unwrap_or_else(|_| DEFAULT_IMAGE_MODEL.into());
        let speech_model =
            env::var("SMARTKIDS_TTS_MODEL").unwrap_or_else(|_| DEFAULT_SPEECH_MODEL.into());
        Some(Self {
            base_url,
            api_key,
            text_model,
            image_model,
            speech_model,
        })
    }
}

/// REST client for the Gemini `generateContent` family of endpoints.
///
/// Runs with `config: None` when no API key is set: question generation and
/// verification then fail with [`ProviderError::NotConfigured`], while the
/// best-effort illustration and speech calls quietly return `None`.
#[derive(Clone)]
pub struct GeminiProvider {
    client: Client,
    config: Option<GeminiConfig>,
    variant: Variant,
}

impl GeminiProvider {
    #[must_use]
    pub fn from_env(variant: Variant) -> Self {
        Self::new(GeminiConfig::from_env(), variant)
    }

    #[must_use]
    pub fn new(config: Option<GeminiConfig>, variant: Variant) -> Self {
        Self {
            client: Client::new(),
            config,
            variant,
        }
    }

    #[must_use]
    pub fn enabled(&self) -> bool {
        self.config.is_some()
    }

    fn config(&self) -> Result<&GeminiConfig, ProviderError> {
        self.config.as_ref().ok_or(ProviderError::NotConfigured)
    }

    async fn generate(
        &self,
        model: &str,
        payload: &GenerateRequest,
    ) -> Result<GenerateResponse, ProviderError> {
        let config = self.config()?;
        let url = format!(
            "{}/models/{}:generateContent",
            config.base_url.trim_end_matches('/'),
            model
        );

        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", &config.api_key)
            .json(payload)
            .send()
            .await
            .map_err(|err| ProviderError::Unavailable(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_failure(status, &body));
        }

        response
            .json::<GenerateResponse>()
            .await
            .map_err(|err| malformed("response envelope", err))
    }
}

#[async_trait]
impl ContentProvider for GeminiProvider {
    async fn generate_question(
        &self,
        grade: SchoolGrade,
        subject: Subject,
        topic: Option<&str>,
    ) -> Result<Question, ProviderError> {
        let config = self.config()?;
        let prompt = prompts::question_prompt(grade, subject, topic, self.variant);
        let payload = text_request(prompt, Some(json_config(prompts::question_schema())));

        let model = config.text_model.clone();
        let response = self.generate(&model, &payload).await?;
        let text = extract_text(&response)?;
        let draft: QuestionDraft =
            serde_json::from_str(&text).map_err(|err| malformed("question payload", err))?;
        draft
            .validate(QuestionId::new())
            .map_err(|err| malformed("question draft", err))
    }

    async fn verify_answer(
        &self,
        question_text: &str,
        learner_answer: &str,
        sample_answer: &str,
    ) -> Result<AnswerReview, ProviderError> {
        let config = self.config()?;
        let prompt = prompts::verification_prompt(question_text, learner_answer, sample_answer);
        let payload = text_request(prompt, Some(json_config(prompts::verdict_schema())));

        let model = config.text_model.clone();
        let response = self.generate(&model, &payload).await?;
        let text = extract_text(&response)?;
        serde_json::from_str(&text).map_err(|err| malformed("verdict payload", err))
    }

    async fn generate_illustration(&self, prompt: &str) -> Option<Illustration> {
        let Some(config) = self.config.as_ref() else {
            debug!("illustration skipped, provider not configured");
            return None;
        };
        let payload = text_request(
            prompts::illustration_prompt(prompt),
            Some(GenerationConfig {
                image_config: Some(ImageConfig {
                    aspect_ratio: ILLUSTRATION_ASPECT_RATIO.to_string(),
                }),
                ..GenerationConfig::default()
            }),
        );

        let model = config.image_model.clone();
        let response = match self.generate(&model, &payload).await {
            Ok(response) => response,
            Err(err) => {
                warn!(%err, "illustration generation failed, using fallback");
                return None;
            }
        };
        let inline = find_inline_data(&response)?;
        let mime = inline.mime_type.as_deref().unwrap_or("image/png");
        Some(Illustration::new(format!(
            "data:{mime};base64,{}",
            inline.data
        )))
    }

    async fn generate_speech(&self, text: &str) -> Option<SpeechClip> {
        let Some(config) = self.config.as_ref() else {
            debug!("speech skipped, provider not configured");
            return None;
        };
        let payload = text_request(
            prompts::narration_prompt(text),
            Some(GenerationConfig {
                response_modalities: Some(vec!["AUDIO".to_string()]),
                speech_config: Some(SpeechConfig {
                    voice_config: VoiceConfig {
                        prebuilt_voice_config: PrebuiltVoiceConfig {
                            voice_name: NARRATION_VOICE.to_string(),
                        },
                    },
                }),
                ..GenerationConfig::default()
            }),
        );

        let model = config.speech_model.clone();
        let response = match self.generate(&model, &payload).await {
            Ok(response) => response,
            Err(err) => {
                warn!(%err, "speech generation failed");
                return None;
            }
        };
        let inline = find_inline_data(&response)?;
        let pcm = match general_purpose::STANDARD.decode(&inline.data) {
            Ok(pcm) => pcm,
            Err(err) => {
                warn!(%err, "speech payload is not valid base64");
                return None;
            }
        };
        Some(SpeechClip {
            pcm,
            sample_rate_hz: SPEECH_SAMPLE_RATE_HZ,
            channels: 1,
        })
    }
}

/// Maps a non-success HTTP reply onto the closed error taxonomy.
///
/// Throttling shows up either as status 429 or as "quota" wording in the
/// body; the daily-cap flavour additionally mentions "daily" or "exhausted".
fn classify_failure(status: StatusCode, body: &str) -> ProviderError {
    let haystack = format!("{} {}", status.as_u16(), body.to_ascii_lowercase());
    if haystack.contains("429") || haystack.contains("quota") {
        if haystack.contains("daily") || haystack.contains("exhausted") {
            return ProviderError::QuotaExhausted;
        }
        return ProviderError::RateLimited;
    }
    ProviderError::Unavailable(format!("http {status}"))
}

// Schema drift gets its own log line so it is never mistaken for an outage.
fn malformed(stage: &str, detail: impl fmt::Display) -> ProviderError {
    error!(stage, %detail, "unusable provider payload");
    ProviderError::MalformedResponse(format!("{stage}: {detail}"))
}

fn extract_text(response: &GenerateResponse) -> Result<String, ProviderError> {
    response
        .candidates
        .iter()
        .filter_map(|candidate| candidate.content.as_ref())
        .flat_map(|content| content.parts.iter())
        .find_map(|part| part.text.clone())
        .ok_or_else(|| malformed("response text", "no text part in any candidate"))
}

fn find_inline_data(response: &GenerateResponse) -> Option<&InlineData> {
    response
        .candidates
        .iter()
        .filter_map(|candidate| candidate.content.as_ref())
        .flat_map(|content| content.parts.iter())
        .find_map(|part| part.inline_data.as_ref())
}

fn text_request(prompt: String, generation_config: Option<GenerationConfig>) -> GenerateRequest {
    GenerateRequest {
        contents: vec![Content {
            parts: vec![Part { text: prompt }],
        }],
        generation_config,
    }
}

fn json_config(schema: Value) -> GenerationConfig {
    GenerationConfig {
        response_mime_type: Some("application/json".to_string()),
        response_schema: Some(schema),
        ..GenerationConfig::default()
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_schema: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    image_config: Option<ImageConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_modalities: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    speech_config: Option<SpeechConfig>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ImageConfig {
    aspect_ratio: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SpeechConfig {
    voice_config: VoiceConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VoiceConfig {
    prebuilt_voice_config: PrebuiltVoiceConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PrebuiltVoiceConfig {
    voice_name: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<ResponseContent>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponsePart {
    text: Option<String>,
    inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: Option<String>,
    data: String,
}

// ─── Tests ─────────────────────────────────────────────────────────────────────
