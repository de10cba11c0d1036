//! Remote command client
//!
//! One HTTP request per utterance to the command service. Nothing here
//! retries; failures are classified as [`Error::Network`] (no response) or
//! [`Error::Service`] (non-success status) and handed back to the caller.

mod types;

use std::time::Duration;

use async_trait::async_trait;

pub use types::{CommandInfo, CommandList, CommandResponse};
use types::{CommandReply, CommandRequest};

use crate::config::ApiConfig;
use crate::{Error, Result};

/// Path of the command endpoint
pub const PROCESS_COMMAND_PATH: &str = "/api/v1/process-command";

/// Path prefix for synthesized audio
pub const AUDIO_PATH: &str = "/api/v1/audio";

/// Path of the command discovery endpoint
pub const COMMANDS_PATH: &str = "/api/v1/commands";

/// Path of the liveness probe
pub const HEALTH_PATH: &str = "/health";

/// Longest command text the service accepts
pub const MAX_COMMAND_CHARS: usize = 500;

/// Seam between the conversation and the command service
#[async_trait]
pub trait CommandService: Send + Sync {
    /// Send one command and return the typed reply
    async fn process_command(&self, text: &str) -> Result<CommandResponse>;

    /// Resolve an audio reference to a fetchable URL (no network call)
    fn audio_url(&self, audio_ref: &str) -> String;

    /// Liveness probe; any 2xx is success
    async fn health_check(&self) -> Result<()>;
}

/// Build the URL for an audio reference
///
/// Bare file names are placed under [`AUDIO_PATH`]; absolute URLs are kept
/// and rooted paths are joined to the base.
#[must_use]
pub fn audio_url(base_url: &str, audio_ref: &str) -> String {
    let base = base_url.trim_end_matches('/');

    if audio_ref.starts_with("http://") || audio_ref.starts_with("https://") {
        audio_ref.to_string()
    } else if audio_ref.starts_with('/') {
        format!("{base}{audio_ref}")
    } else {
        format!("{base}{AUDIO_PATH}/{}", urlencoding::encode(audio_ref))
    }
}

/// HTTP implementation of [`CommandService`]
#[derive(Clone)]
pub struct HttpCommandClient {
    base_url: String,
    language: String,
    user_id: String,
    client: reqwest::Client,
}

impl HttpCommandClient {
    /// Create a client for the configured service
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.timeout.min(Duration::from_secs(10)))
            .build()?;

        let user_id = format!("cli_user_{}", uuid::Uuid::new_v4().simple());
        tracing::debug!(base_url = %config.base_url, %user_id, "command client initialized");

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            language: config.language.clone(),
            user_id,
            client,
        })
    }

    /// Per-session user token sent with every command
    #[must_use]
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// List the commands the service understands
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the body cannot be parsed
    pub async fn list_commands(&self) -> Result<CommandList> {
        let url = format!("{}{COMMANDS_PATH}", self.base_url);
        tracing::debug!(%url, "fetching command list");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(Error::from_transport)?;
        let response = check_status(response)?;

        let list: CommandList = response.json().await?;
        tracing::debug!(total = list.total, "command list received");
        Ok(list)
    }
}

#[async_trait]
impl CommandService for HttpCommandClient {
    async fn process_command(&self, text: &str) -> Result<CommandResponse> {
        let text = text.trim();
        if text.is_empty() || text.chars().count() > MAX_COMMAND_CHARS {
            tracing::warn!(chars = text.chars().count(), "command text rejected");
            return Err(Error::Service { status: 400 });
        }

        let url = format!("{}{PROCESS_COMMAND_PATH}", self.base_url);
        tracing::info!(%url, text, "sending command");

        let response = self
            .client
            .post(&url)
            .json(&CommandRequest {
                text,
                language: &self.language,
                user_id: &self.user_id,
            })
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "command request failed");
                Error::from_transport(e)
            })?;

        let response = check_status(response)?;
        let reply: CommandReply = response.json().await.map_err(|e| {
            tracing::error!(error = %e, "failed to parse command reply");
            Error::from_transport(e)
        })?;

        tracing::info!(
            intent = reply.intent.as_deref().unwrap_or("unknown"),
            confidence = reply.confidence.unwrap_or_default(),
            language = reply.language.as_deref().unwrap_or("unknown"),
            audio = reply.audio_file.is_some(),
            "command processed"
        );

        Ok(reply.into())
    }

    fn audio_url(&self, audio_ref: &str) -> String {
        audio_url(&self.base_url, audio_ref)
    }

    async fn health_check(&self) -> Result<()> {
        let url = format!("{}{HEALTH_PATH}", self.base_url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(Error::from_transport)?;
        check_status(response)?;

        tracing::debug!(%url, "health check passed");
        Ok(())
    }
}

/// Map a non-success status to [`Error::Service`]
fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        tracing::error!(status = %status, url = %response.url(), "command service error");
        Err(Error::Service {
            status: status.as_u16(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audio_url_for_file_name() {
        let url = audio_url("http://localhost:8000", "hi.mp3");
        assert_eq!(url, "http://localhost:8000/api/v1/audio/hi.mp3");
    }

    #[test]
    fn test_audio_url_trims_base_slash() {
        let url = audio_url("http://localhost:8000/", "speech_20251025_120000_123456.mp3");
        assert_eq!(
            url,
            "http://localhost:8000/api/v1/audio/speech_20251025_120000_123456.mp3"
        );
    }

    #[test]
    fn test_audio_url_for_rooted_path() {
        let url = audio_url("http://host:8000", "/api/v1/audio/response_123.mp3");
        assert_eq!(url, "http://host:8000/api/v1/audio/response_123.mp3");
    }

    #[test]
    fn test_audio_url_keeps_absolute_url() {
        let url = audio_url("http://host:8000", "https://cdn.example.com/a.mp3");
        assert_eq!(url, "https://cdn.example.com/a.mp3");
    }

    #[test]
    fn test_audio_url_escapes_file_name() {
        let url = audio_url("http://host", "my reply.mp3");
        assert_eq!(url, "http://host/api/v1/audio/my%20reply.mp3");
    }
}
