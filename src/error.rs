//! Error type shared by the analysis and keyframe stages.
//!
//! The binary wraps these in `anyhow` at the edge; library code propagates
//! them with `?`.

use symphonia::core::errors::Error as SymphoniaError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Failed to open audio file '{path}': {source}")]
    AudioOpen {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to decode '{path}': {source}")]
    Decode {
        path: String,
        #[source]
        source: SymphoniaError,
    },
    #[error("No audio tracks found in '{path}'")]
    NoAudioTrack { path: String },
    #[error("Unknown sample rate in '{path}'")]
    MissingSampleRate { path: String },
    #[error("Failed to access analysis record '{path}': {source}")]
    RecordIo {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Malformed analysis record '{path}': {source}")]
    RecordFormat {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("Invalid {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },
    #[error("Rendering host has no animatable target bound to channel '{0}'")]
    MissingChannel(String),
    #[error("Channel '{channel}' targets unknown object '{target}'")]
    UnknownTarget { channel: String, target: String },
    #[error("Target '{target}' has no animatable property '{property}'")]
    MissingProperty { target: String, property: String },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        Error::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}
