use std::path::PathBuf;

use thiserror::Error;

/// The configuration file could not be read, written or understood.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to replace {}: {source}", .path.display())]
    Rename {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{}:{line}: expected `[section]` or `key = value`", .path.display())]
    Syntax { path: PathBuf, line: usize },

    #[error("cannot store {what} {value:?}: {reason}")]
    Unrepresentable {
        what: &'static str,
        value: String,
        reason: &'static str,
    },
}

/// A stored color scheme string is malformed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("expected 4 colors, found {found}")]
    TokenCount { found: usize },

    #[error("invalid color token '{token}' (expected 6 hex digits)")]
    InvalidToken { token: String },
}

/// The emulation core refused a program.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("failed to load {}: {reason}", .path.display())]
pub struct LoadError {
    pub path: PathBuf,
    pub reason: String,
}

impl LoadError {
    pub fn new(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Error returned by [`crate::controller::RuntimeController`] operations.
#[derive(Debug, Error)]
pub enum ControlError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("unsupported sample rate {0} Hz")]
    UnsupportedSampleRate(u32),

    #[error("volume {0}% is out of range (0..=100)")]
    VolumeOutOfRange(u8),
}
