mod gemini;
mod prompts;

use async_trait::async_trait;
use smartkids_core::model::{AnswerReview, Illustration, Question, SchoolGrade, Subject};

use crate::error::ProviderError;

pub use gemini::{GeminiConfig, GeminiProvider};

/// One narration clip of raw 16-bit little-endian PCM samples.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechClip {
    pub pcm: Vec<u8>,
    pub sample_rate_hz: u32,
    pub channels: u16,
}

impl SpeechClip {
    /// Playback length in seconds.
    #[must_use]
    pub fn duration_secs(&self) -> f32 {
        let bytes_per_second = f64::from(self.sample_rate_hz) * f64::from(self.channels) * 2.0;
        if bytes_per_second == 0.0 {
            return 0.0;
        }
        (self.pcm.len() as f64 / bytes_per_second) as f32
    }
}

/// Boundary to the external generative content service.
///
/// Question generation and answer verification report failures through the
/// closed [`ProviderError`] taxonomy; illustrations and speech are soft
/// enhancements, so those calls swallow failures and return `None` instead.
#[async_trait]
pub trait ContentProvider: Send + Sync {
    /// Produces one fresh question for the given grade and subject, with a
    /// client-side identifier already attached.
    ///
    /// # Errors
    ///
    /// Returns a [`ProviderError`] when the provider cannot be reached, is
    /// throttled or capped, or hands back an unusable payload.
    async fn generate_question(
        &self,
        grade: SchoolGrade,
        subject: Subject,
        topic: Option<&str>,
    ) -> Result<Question, ProviderError>;

    /// Grades a free-text answer against the question's reference answer.
    ///
    /// # Errors
    ///
    /// Returns a [`ProviderError`]; verification failures block progression,
    /// so they are never swallowed here.
    async fn verify_answer(
        &self,
        question_text: &str,
        learner_answer: &str,
        sample_answer: &str,
    ) -> Result<AnswerReview, ProviderError>;

    /// Best-effort illustration for a question's visual prompt. Any failure
    /// yields `None`; callers fall back to a placeholder.
    async fn generate_illustration(&self, prompt: &str) -> Option<Illustration>;

    /// Best-effort narration audio for a question's text. Any failure yields
    /// `None`; callers simply leave the speaking indicator off.
    async fn generate_speech(&self, text: &str) -> Option<SpeechClip>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clip_duration_counts_pcm_frames() {
        let clip = SpeechClip {
            pcm: vec![0; 48_000],
            sample_rate_hz: 24_000,
            channels: 1,
        };
        assert!((clip.duration_secs() - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn empty_clip_has_zero_duration() {
        let clip = SpeechClip {
            pcm: Vec::new(),
            sample_rate_hz: 24_000,
            channels: 1,
        };
        assert_eq!(clip.duration_secs(), 0.0);
    }
}
