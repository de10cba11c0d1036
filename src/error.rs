//! Error types for the voice client

use thiserror::Error;

/// Result type alias for voice client operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the voice client
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Speech recognition is not available on this host
    #[error("speech recognition unavailable: {0}")]
    CapabilityUnavailable(String),

    /// Microphone access was refused or the device could not be opened
    #[error("microphone permission denied: {0}")]
    PermissionDenied(String),

    /// Recognition finished without hearing any speech
    #[error("no speech detected")]
    NoSpeechDetected,

    /// The command service could not be reached or did not answer in time
    #[error("network error: {0}")]
    Network(String),

    /// The command service answered with a non-success status
    #[error("service error: status {status}")]
    Service {
        /// HTTP status code returned by the service
        status: u16,
    },

    /// Audio reply could not be fetched, decoded or played
    #[error("playback error: {0}")]
    Playback(String),

    /// Audio device error
    #[error("audio error: {0}")]
    Audio(String),

    /// Speech-to-text error
    #[error("STT error: {0}")]
    Stt(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error that is neither a connectivity failure nor a status error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl Error {
    /// Classify a transport error from the command service
    ///
    /// Requests that never produced a response (connect failures, timeouts)
    /// become [`Error::Network`]; status errors become [`Error::Service`].
    #[must_use]
    pub fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() || err.is_request() {
            Self::Network(err.to_string())
        } else if let Some(status) = err.status() {
            Self::Service {
                status: status.as_u16(),
            }
        } else {
            Self::Http(err)
        }
    }
}
