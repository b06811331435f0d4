//! Error types for the environment link.

use std::time::Duration;

use drops_navigation::NavigationError;
use thiserror::Error;

/// A required payload field is absent, mistyped or out of range.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("missing field `{0}`")]
    Missing(String),

    #[error("field `{field}` has the wrong type, expected {expected}")]
    WrongType {
        field: String,
        expected: &'static str,
    },

    #[error("field `{field}` is out of range: {value}")]
    OutOfRange { field: String, value: i64 },
}

/// The fetch collaborator could not produce a payload.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("i/o failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("payload is not valid JSON: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("no payload available")]
    Exhausted,
}

/// Why an update cycle ended without publishing.
#[derive(Error, Debug)]
pub enum UpdateError {
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("fetch timed out after {0:?}")]
    Timeout(Duration),

    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("grid error: {0}")]
    Grid(#[from] NavigationError),

    #[error("an update cycle is already in flight")]
    InFlight,
}

/// Coarse classification of a failed cycle, as reported to observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    Transport,
    Schema,
    Busy,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureKind::Transport => write!(f, "transport"),
            FailureKind::Schema => write!(f, "schema"),
            FailureKind::Busy => write!(f, "busy"),
        }
    }
}

impl UpdateError {
    pub fn kind(&self) -> FailureKind {
        match self {
            UpdateError::Transport(_) | UpdateError::Timeout(_) => FailureKind::Transport,
            UpdateError::Schema(_) | UpdateError::Grid(_) => FailureKind::Schema,
            UpdateError::InFlight => FailureKind::Busy,
        }
    }
}

/// A line of the constants file that could not be applied.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigParseError {
    #[error("line {line}: expected `key=value`, got `{text}`")]
    MalformedLine { line: usize, text: String },

    #[error("line {line}: unknown key `{key}`")]
    UnknownKey { line: usize, key: String },

    #[error("line {line}: invalid value `{value}` for `{key}`")]
    InvalidValue {
        line: usize,
        key: String,
        value: String,
    },
}

/// Environment data was requested before any cycle published it.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateError {
    #[error("no environment data has been published yet")]
    NotReady,
}

/// Runtime settings could not be loaded.
#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("invalid inflation settings: {0}")]
    Inflation(#[from] NavigationError),
}
