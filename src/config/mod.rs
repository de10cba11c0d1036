//! Configuration management for the voice client

pub mod file;

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::i18n::Locale;
use crate::voice::EndpointConfig;
use crate::{Error, Result};

use file::VoiceClientConfigFile;

/// Default command service address
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Default request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Voice client configuration
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Command service settings
    pub api: ApiConfig,

    /// Voice configuration
    pub voice: VoiceConfig,

    /// API keys
    pub api_keys: ApiKeys,

    /// UI language
    pub locale: Locale,
}

/// Command service configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Base URL, without trailing slash
    pub base_url: String,

    /// Bound on every request
    pub timeout: Duration,

    /// Language hint forwarded with each command
    pub language: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            language: "auto".to_string(),
        }
    }
}

/// Speech-to-text backend
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SttProvider {
    #[default]
    Whisper,
    Deepgram,
}

impl SttProvider {
    /// Model used when none is configured
    #[must_use]
    pub const fn default_model(self) -> &'static str {
        match self {
            Self::Whisper => "whisper-1",
            Self::Deepgram => "nova-2",
        }
    }
}

impl fmt::Display for SttProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Whisper => write!(f, "whisper"),
            Self::Deepgram => write!(f, "deepgram"),
        }
    }
}

impl FromStr for SttProvider {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "whisper" | "openai" => Ok(Self::Whisper),
            "deepgram" => Ok(Self::Deepgram),
            other => Err(Error::Config(format!("unknown STT provider: {other}"))),
        }
    }
}

/// Voice processing configuration
#[derive(Debug, Clone)]
pub struct VoiceConfig {
    /// Enable voice input
    pub enabled: bool,

    /// Play audio replies
    pub playback: bool,

    /// Recognition language tag
    pub language: String,

    pub stt_provider: SttProvider,

    /// STT model (e.g. "whisper-1", "nova-2")
    pub stt_model: String,

    pub no_speech_timeout: Duration,

    pub max_utterance: Duration,

    pub trailing_silence: Duration,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            playback: true,
            language: "ur-PK".to_string(),
            stt_provider: SttProvider::Whisper,
            stt_model: SttProvider::Whisper.default_model().to_string(),
            no_speech_timeout: Duration::from_secs(8),
            max_utterance: Duration::from_secs(15),
            trailing_silence: Duration::from_millis(800),
        }
    }
}

impl VoiceConfig {
    /// Endpoint detector thresholds for these timings
    #[must_use]
    pub fn endpoint(&self) -> EndpointConfig {
        EndpointConfig::from_durations(
            self.trailing_silence,
            self.no_speech_timeout,
            self.max_utterance,
        )
    }
}

/// API keys for external services
#[derive(Clone, Default)]
pub struct ApiKeys {
    /// `OpenAI` API key (for Whisper)
    pub openai: Option<String>,

    /// `Deepgram` API key
    pub deepgram: Option<String>,
}

impl ApiKeys {
    /// Key for the given STT provider, if configured and non-empty
    #[must_use]
    pub fn for_provider(&self, provider: SttProvider) -> Option<&str> {
        let key = match provider {
            SttProvider::Whisper => self.openai.as_deref(),
            SttProvider::Deepgram => self.deepgram.as_deref(),
        };
        key.filter(|k| !k.trim().is_empty())
    }
}

impl fmt::Debug for ApiKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiKeys")
            .field("openai", &self.openai.as_ref().map(|_| "[redacted]"))
            .field("deepgram", &self.deepgram.as_ref().map(|_| "[redacted]"))
            .finish()
    }
}

impl Config {
    /// Load configuration from the environment and config file
    ///
    /// # Errors
    ///
    /// Returns error if the resulting base URL is not an http(s) URL
    pub fn load() -> Result<Self> {
        Self::load_with_options(false)
    }

    /// Load configuration with explicit voice disable option
    ///
    /// # Errors
    ///
    /// Returns error if the resulting base URL is not an http(s) URL
    pub fn load_with_options(disable_voice: bool) -> Result<Self> {
        // env > toml > default
        let fc = file::load_config_file();
        let mut config = Self::from_sources(fc, |key| std::env::var(key).ok())?;

        if disable_voice {
            tracing::info!("voice explicitly disabled via --disable-voice");
            config.voice.enabled = false;
        }

        Ok(config)
    }

    /// Point the client at another service, as `--api-url` does
    ///
    /// # Errors
    ///
    /// Returns error if `url` is not an http(s) URL
    pub fn set_base_url(&mut self, url: &str) -> Result<()> {
        self.api.base_url = normalize_base_url(url)?;
        Ok(())
    }

    /// Merge a parsed config file with values from `env`
    ///
    /// # Errors
    ///
    /// Returns error if the resulting base URL is not an http(s) URL
    pub fn from_sources<F>(fc: VoiceClientConfigFile, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_url = normalize_base_url(
            &env("URDU_VOICE_API_URL")
                .or(fc.api.base_url)
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        )?;

        let timeout = env("URDU_VOICE_API_TIMEOUT")
            .and_then(|s| s.parse().ok())
            .or(fc.api.timeout_secs)
            .filter(|&secs| secs > 0)
            .map_or(DEFAULT_TIMEOUT, Duration::from_secs);

        let api = ApiConfig {
            base_url,
            timeout,
            language: env("URDU_VOICE_LANGUAGE")
                .or(fc.api.language)
                .unwrap_or_else(|| "auto".to_string()),
        };

        let locale = env("URDU_VOICE_LOCALE")
            .or(fc.locale)
            .and_then(|s| match s.parse::<Locale>() {
                Ok(locale) => Some(locale),
                Err(e) => {
                    tracing::warn!(error = %e, "ignoring locale setting");
                    None
                }
            })
            .unwrap_or_default();

        let stt_provider = env("URDU_VOICE_STT_PROVIDER")
            .or(fc.voice.stt_provider)
            .and_then(|s| match s.parse::<SttProvider>() {
                Ok(provider) => Some(provider),
                Err(e) => {
                    tracing::warn!(error = %e, "ignoring STT provider setting");
                    None
                }
            })
            .unwrap_or_default();

        let defaults = VoiceConfig::default();
        let voice = VoiceConfig {
            enabled: fc.voice.enabled.unwrap_or(true),
            playback: fc.voice.playback.unwrap_or(true),
            language: fc.voice.language.unwrap_or(defaults.language),
            stt_provider,
            stt_model: env("URDU_VOICE_STT_MODEL")
                .or(fc.voice.stt_model)
                .unwrap_or_else(|| stt_provider.default_model().to_string()),
            no_speech_timeout: fc
                .voice
                .no_speech_timeout_secs
                .map_or(defaults.no_speech_timeout, Duration::from_secs),
            max_utterance: fc
                .voice
                .max_utterance_secs
                .map_or(defaults.max_utterance, Duration::from_secs),
            trailing_silence: fc
                .voice
                .trailing_silence_ms
                .map_or(defaults.trailing_silence, Duration::from_millis),
        };

        // env > toml > None
        let api_keys = ApiKeys {
            openai: env("OPENAI_API_KEY").or(fc.api_keys.openai),
            deepgram: env("DEEPGRAM_API_KEY").or(fc.api_keys.deepgram),
        };

        tracing::debug!(
            base_url = %api.base_url,
            timeout_secs = api.timeout.as_secs(),
            ?locale,
            voice_enabled = voice.enabled,
            stt_provider = %voice.stt_provider,
            "configuration loaded"
        );

        Ok(Self {
            api,
            voice,
            api_keys,
            locale,
        })
    }
}

/// Trim a service URL and require an http(s) scheme
fn normalize_base_url(raw: &str) -> Result<String> {
    let base_url = raw.trim().trim_end_matches('/');

    if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
        return Err(Error::Config(format!(
            "API URL must start with http:// or https://, got {base_url:?}"
        )));
    }

    Ok(base_url.to_string())
}
