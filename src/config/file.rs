//! TOML configuration file loading
//!
//! Supports `~/.config/urdu-voice/config.toml` as a persistent config source.
//! All fields are optional; the file is a partial overlay on top of defaults.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::Result;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct VoiceClientConfigFile {
    /// UI language ("ur" or "en")
    #[serde(default)]
    pub locale: Option<String>,

    /// Command service configuration
    #[serde(default)]
    pub api: ApiFileConfig,

    /// Voice/audio configuration
    #[serde(default)]
    pub voice: VoiceFileConfig,

    /// API keys for external services
    #[serde(default)]
    pub api_keys: ApiKeysFileConfig,
}

/// Command service configuration
#[derive(Debug, Default, Deserialize)]
pub struct ApiFileConfig {
    /// Base URL of the command service
    pub base_url: Option<String>,

    /// Request timeout in seconds
    pub timeout_secs: Option<u64>,

    /// Language hint sent with each command ("auto", "ur", "en")
    pub language: Option<String>,
}

/// Voice processing configuration
#[derive(Debug, Default, Deserialize)]
pub struct VoiceFileConfig {
    /// Enable voice input
    pub enabled: Option<bool>,

    /// Play audio replies
    pub playback: Option<bool>,

    /// Recognition language tag (e.g. "ur-PK")
    pub language: Option<String>,

    /// STT provider ("whisper" or "deepgram")
    pub stt_provider: Option<String>,

    /// STT model (e.g. "whisper-1")
    pub stt_model: Option<String>,

    /// Give up when nothing is said for this long
    pub no_speech_timeout_secs: Option<u64>,

    /// Longest utterance to record
    pub max_utterance_secs: Option<u64>,

    /// Silence that ends an utterance
    pub trailing_silence_ms: Option<u64>,
}

/// API keys configuration
#[derive(Debug, Default, Deserialize)]
pub struct ApiKeysFileConfig {
    pub openai: Option<String>,
    pub deepgram: Option<String>,
}

/// Parse config file contents
///
/// # Errors
///
/// Returns error if the TOML is malformed
pub fn parse(content: &str) -> Result<VoiceClientConfigFile> {
    Ok(toml::from_str(content)?)
}

/// Load the TOML config file from the standard path
///
/// Returns `VoiceClientConfigFile::default()` if the file doesn't exist or can't be parsed.
pub fn load_config_file() -> VoiceClientConfigFile {
    config_file_path().map_or_else(VoiceClientConfigFile::default, |path| load_from(&path))
}

/// Load a config file from an explicit path, falling back to defaults
pub fn load_from(path: &Path) -> VoiceClientConfigFile {
    if !path.exists() {
        return VoiceClientConfigFile::default();
    }

    match std::fs::read_to_string(path) {
        Ok(content) => match parse(&content) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "loaded config file");
                config
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config file, using defaults"
                );
                VoiceClientConfigFile::default()
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to read config file"
            );
            VoiceClientConfigFile::default()
        }
    }
}

/// Return the config file path: `~/.config/urdu-voice/config.toml`
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("urdu-voice").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_partial_file() {
        let fc = parse(
            r#"
locale = "en"

[api]
base_url = "http://assistant.local:8000"

[voice]
stt_provider = "deepgram"
"#,
        )
        .unwrap();

        assert_eq!(fc.locale.as_deref(), Some("en"));
        assert_eq!(fc.api.base_url.as_deref(), Some("http://assistant.local:8000"));
        assert!(fc.api.timeout_secs.is_none());
        assert_eq!(fc.voice.stt_provider.as_deref(), Some("deepgram"));
        assert!(fc.api_keys.openai.is_none());
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let fc = load_from(&dir.path().join("absent.toml"));
        assert!(fc.api.base_url.is_none());
    }

    #[test]
    fn test_malformed_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[api\nbase_url = ").unwrap();

        let fc = load_from(&path);
        assert!(fc.api.base_url.is_none());
    }

    #[test]
    fn test_file_on_disk_is_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[api]\ntimeout_secs = 5\n").unwrap();

        let fc = load_from(&path);
        assert_eq!(fc.api.timeout_secs, Some(5));
    }
}
