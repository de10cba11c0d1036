//! Wire types for the command service

use serde::{Deserialize, Serialize};

/// Body of `POST /api/v1/process-command`
#[derive(Debug, Serialize)]
pub(super) struct CommandRequest<'a> {
    pub text: &'a str,
    pub language: &'a str,
    pub user_id: &'a str,
}

/// Reply from `POST /api/v1/process-command`
///
/// Only `response_text` is required; the service also reports the detected
/// intent and language, which are logged but not surfaced.
#[derive(Debug, Deserialize)]
pub(super) struct CommandReply {
    pub response_text: String,
    #[serde(default)]
    pub audio_file: Option<String>,
    #[serde(default)]
    pub intent: Option<String>,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub language: Option<String>,
}

/// Typed result of one processed command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResponse {
    /// Text to show as the assistant message
    pub reply_text: String,
    /// Opaque audio reference, resolved with [`super::audio_url`]
    pub audio_ref: Option<String>,
}

impl From<CommandReply> for CommandResponse {
    fn from(reply: CommandReply) -> Self {
        Self {
            reply_text: reply.response_text,
            audio_ref: reply
                .audio_file
                .map(|f| f.trim().to_string())
                .filter(|f| !f.is_empty()),
        }
    }
}

/// One entry of `GET /api/v1/commands`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CommandInfo {
    pub category: String,
    #[serde(default)]
    pub examples: Vec<String>,
    #[serde(default)]
    pub description: String,
}

/// Response of `GET /api/v1/commands`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CommandList {
    pub commands: Vec<CommandInfo>,
    #[serde(default)]
    pub total: usize,
}
