//! Speech-to-text (STT) processing

use crate::config::SttProvider;
use crate::{Error, Result};

const WHISPER_URL: &str = "https://api.openai.com/v1/audio/transcriptions";
const DEEPGRAM_URL: &str = "https://api.deepgram.com/v1/listen";

/// Response from OpenAI Whisper transcription API (`verbose_json`)
#[derive(serde::Deserialize)]
struct WhisperResponse {
    text: String,
    #[serde(default)]
    segments: Vec<WhisperSegment>,
}

#[derive(serde::Deserialize)]
struct WhisperSegment {
    avg_logprob: f64,
}

/// Response from Deepgram transcription API
#[derive(serde::Deserialize)]
struct DeepgramResponse {
    results: DeepgramResults,
}

#[derive(serde::Deserialize)]
struct DeepgramResults {
    channels: Vec<DeepgramChannel>,
}

#[derive(serde::Deserialize)]
struct DeepgramChannel {
    alternatives: Vec<DeepgramAlternative>,
}

#[derive(serde::Deserialize)]
struct DeepgramAlternative {
    transcript: String,
    #[serde(default)]
    confidence: Option<f32>,
}

/// A recognized utterance
#[derive(Debug, Clone, PartialEq)]
pub struct Transcription {
    pub text: String,
    /// Recognizer confidence in `[0, 1]`
    pub confidence: f32,
}

/// Transcribes speech to text
pub struct SpeechToText {
    client: reqwest::Client,
    api_key: String,
    model: String,
    language: String,
    provider: SttProvider,
    endpoint: String,
}

impl SpeechToText {
    /// Create a new STT instance
    ///
    /// `language` is a BCP-47 tag such as `ur-PK`; only the primary subtag
    /// is sent to the provider.
    ///
    /// # Errors
    ///
    /// Returns error if API key is missing
    pub fn new(provider: SttProvider, api_key: String, model: String, language: &str) -> Result<Self> {
        if api_key.is_empty() {
            return Err(Error::Config(format!("{provider} API key required for STT")));
        }

        let endpoint = match provider {
            SttProvider::Whisper => WHISPER_URL,
            SttProvider::Deepgram => DEEPGRAM_URL,
        };

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            model,
            language: primary_language(language),
            provider,
            endpoint: endpoint.to_string(),
        })
    }

    /// Send requests to a different endpoint (self-hosted or test servers)
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    #[must_use]
    pub const fn provider(&self) -> SttProvider {
        self.provider
    }

    /// Transcribe audio to text
    ///
    /// # Arguments
    ///
    /// * `audio` - WAV audio bytes
    ///
    /// # Errors
    ///
    /// Returns error if transcription fails
    pub async fn transcribe(&self, audio: &[u8]) -> Result<Transcription> {
        match self.provider {
            SttProvider::Whisper => self.transcribe_whisper(audio).await,
            SttProvider::Deepgram => self.transcribe_deepgram(audio).await,
        }
    }

    /// Transcribe using OpenAI Whisper
    async fn transcribe_whisper(&self, audio: &[u8]) -> Result<Transcription> {
        tracing::debug!(audio_bytes = audio.len(), "starting Whisper transcription");

        let form = reqwest::multipart::Form::new()
            .part(
                "file",
                reqwest::multipart::Part::bytes(audio.to_vec())
                    .file_name("audio.wav")
                    .mime_str("audio/wav")
                    .map_err(|e| Error::Stt(e.to_string()))?,
            )
            .text("model", self.model.clone())
            .text("language", self.language.clone())
            .text("response_format", "verbose_json");

        let response = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Whisper request failed");
                e
            })?;

        let status = response.status();
        tracing::debug!(status = %status, "received response");

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Whisper API error");
            return Err(Error::Stt(format!("Whisper API error {status}: {body}")));
        }

        let result: WhisperResponse = response.json().await.map_err(|e| {
            tracing::error!(error = %e, "failed to parse response");
            e
        })?;

        let confidence = whisper_confidence(&result.segments);
        tracing::info!(transcript = %result.text, confidence, "transcription complete");

        Ok(Transcription {
            text: result.text.trim().to_string(),
            confidence,
        })
    }

    /// Transcribe using Deepgram
    async fn transcribe_deepgram(&self, audio: &[u8]) -> Result<Transcription> {
        tracing::debug!(audio_bytes = audio.len(), "starting Deepgram transcription");

        let url = format!(
            "{}?model={}&language={}&punctuate=true",
            self.endpoint, self.model, self.language
        );

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Token {}", self.api_key))
            .header("Content-Type", "audio/wav")
            .body(audio.to_vec())
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Deepgram request failed");
                e
            })?;

        let status = response.status();
        tracing::debug!(status = %status, "received response");

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Deepgram API error");
            return Err(Error::Stt(format!("Deepgram API error {status}: {body}")));
        }

        let result: DeepgramResponse = response.json().await.map_err(|e| {
            tracing::error!(error = %e, "failed to parse Deepgram response");
            e
        })?;

        let transcription = result
            .results
            .channels
            .first()
            .and_then(|c| c.alternatives.first())
            .map(|a| Transcription {
                text: a.transcript.trim().to_string(),
                confidence: a.confidence.unwrap_or(1.0).clamp(0.0, 1.0),
            })
            .unwrap_or(Transcription {
                text: String::new(),
                confidence: 0.0,
            });

        tracing::info!(
            transcript = %transcription.text,
            confidence = transcription.confidence,
            "transcription complete"
        );
        Ok(transcription)
    }
}

/// Mean per-segment probability; Whisper reports log-probabilities
///
/// Without segments there is nothing to score, so the result is 1.0.
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn whisper_confidence(segments: &[WhisperSegment]) -> f32 {
    if segments.is_empty() {
        return 1.0;
    }

    let sum: f64 = segments.iter().map(|s| s.avg_logprob.exp()).sum();
    ((sum / segments.len() as f64) as f32).clamp(0.0, 1.0)
}

/// `ur-PK` -> `ur`
fn primary_language(tag: &str) -> String {
    tag.split(['-', '_'])
        .next()
        .unwrap_or(tag)
        .trim()
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primary_language() {
        assert_eq!(primary_language("ur-PK"), "ur");
        assert_eq!(primary_language("en_US"), "en");
        assert_eq!(primary_language("ur"), "ur");
    }

    #[test]
    fn test_whisper_confidence() {
        assert!((whisper_confidence(&[]) - 1.0).abs() < f32::EPSILON);

        let certain = [WhisperSegment { avg_logprob: 0.0 }];
        assert!((whisper_confidence(&certain) - 1.0).abs() < 1e-6);

        let mixed = [
            WhisperSegment { avg_logprob: 0.0 },
            WhisperSegment {
                avg_logprob: (0.5f64).ln(),
            },
        ];
        assert!((whisper_confidence(&mixed) - 0.75).abs() < 1e-6);
    }

    #[test]
    fn test_missing_key_is_config_error() {
        let result = SpeechToText::new(
            SttProvider::Whisper,
            String::new(),
            "whisper-1".to_string(),
            "ur-PK",
        );
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
