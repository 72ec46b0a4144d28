//! Error types shared across Clipline crates.

use std::path::PathBuf;

/// Top-level error type for Clipline operations.
#[derive(Debug, thiserror::Error)]
pub enum ClipError {
    #[error("Duration resolution error: {message}")]
    Resolution { message: String },

    #[error("Playback error: {message}")]
    Playback { message: String },

    #[error("Capture error: {message}")]
    Capture { message: String },

    #[error("Recorder error: {message}")]
    Record { message: String },

    #[error("Export error: {message}")]
    Export { message: String },

    #[error("Scene error: {message}")]
    Scene { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Unsupported operation: {message}")]
    Unsupported { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using ClipError.
pub type ClipResult<T> = Result<T, ClipError>;

impl ClipError {
    pub fn resolution(msg: impl Into<String>) -> Self {
        Self::Resolution {
            message: msg.into(),
        }
    }

    pub fn playback(msg: impl Into<String>) -> Self {
        Self::Playback {
            message: msg.into(),
        }
    }

    pub fn capture(msg: impl Into<String>) -> Self {
        Self::Capture {
            message: msg.into(),
        }
    }

    pub fn record(msg: impl Into<String>) -> Self {
        Self::Record {
            message: msg.into(),
        }
    }

    pub fn export(msg: impl Into<String>) -> Self {
        Self::Export {
            message: msg.into(),
        }
    }

    pub fn scene(msg: impl Into<String>) -> Self {
        Self::Scene {
            message: msg.into(),
        }
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported {
            message: msg.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_message() {
        let err = ClipError::scene("unknown clip clipZ");
        assert_eq!(err.to_string(), "Scene error: unknown clip clipZ");
    }
}
