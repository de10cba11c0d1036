//! Urdu Voice - terminal client for a bilingual voice assistant
//!
//! The client captures a spoken (or typed) command, sends it to a remote
//! command service, shows the reply and plays its audio.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                    Front end                         │
//! │        Terminal view  │  Input reader  │  CLI        │
//! └────────────────────┬────────────────────────────────┘
//!                      │ intents / view effects
//! ┌────────────────────▼────────────────────────────────┐
//! │                    Assistant                         │
//! │   Event loop  │  Conversation state machine         │
//! └───────┬──────────────────┬──────────────────┬───────┘
//!         │                  │                  │
//! ┌───────▼───────┐  ┌───────▼───────┐  ┌───────▼───────┐
//! │  Recognizer   │  │ Command client │  │    Player     │
//! │  mic + STT    │  │  HTTP service  │  │  MP3 output   │
//! └───────────────┘  └────────────────┘  └───────────────┘
//! ```

pub mod assistant;
pub mod client;
pub mod config;
pub mod conversation;
pub mod error;
pub mod i18n;
pub mod quick;
pub mod terminal;
pub mod voice;

pub use assistant::{Assistant, Intent, View};
pub use client::{CommandResponse, CommandService, HttpCommandClient};
pub use config::Config;
pub use conversation::{Conversation, Effect, Event, Message, Role, Status};
pub use error::{Error, Result};
pub use i18n::Locale;
