//! Error types for the notification panel.

use std::fmt;
use thiserror::Error;

/// Which submit input failed validation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubmitField {
    TableNo,
    Message,
}

impl fmt::Display for SubmitField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmitField::TableNo => write!(f, "table number"),
            SubmitField::Message => write!(f, "message"),
        }
    }
}

/// Rejection of a user submission before anything is sent.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{0} is required")]
    Empty(SubmitField),
}

/// Main error type for panel operations.
#[derive(Debug, Error)]
pub enum PanelError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Channel closed")]
    ChannelClosed,

    #[error("Channel not connected")]
    NotConnected,

    #[error("Storage directory is locked by another process")]
    Locked,

    #[error("Invalid storage key: {0:?}")]
    InvalidKey(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

// Encoding failures are mapped to `Serialization` at the call site; what
// reaches this conversion is decoding.
impl From<serde_json::Error> for PanelError {
    fn from(e: serde_json::Error) -> Self {
        if e.is_data() || e.is_syntax() || e.is_eof() {
            PanelError::Deserialization(e.to_string())
        } else {
            PanelError::Serialization(e.to_string())
        }
    }
}

/// Result type for panel operations.
pub type Result<T> = std::result::Result<T, PanelError>;
