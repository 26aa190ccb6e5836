//! Error types for the srcset derivative pipeline.
//!
//! Errors are split by concern: configuration problems and fatal run errors
//! surface as [`SrcsetError`], while everything that can go wrong with a single
//! source image is a [`PipelineError`] that the generator catches, logs, and
//! turns into a per-file outcome.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for srcset operations.
///
/// Only errors that abort the whole run end up here.
#[derive(Error, Debug)]
pub enum SrcsetError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The source root could not be enumerated
    #[error("Cannot scan source directory {path}: {message}")]
    Discovery { path: PathBuf, message: String },

    /// The aggregate manifest could not be written
    #[error("Failed to write manifest {path}: {source}")]
    ManifestWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// General I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Configuration values are invalid
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Per-source failures, organized by pipeline stage.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The source file could not be read
    #[error("Cannot read {path}: {message}")]
    SourceUnreadable { path: PathBuf, message: String },

    /// Image decoding failed
    #[error("Decode error for {path}: {message}")]
    Decode { path: PathBuf, message: String },

    /// File exceeds size limit
    #[error("File too large: {path} ({size_mb}MB > {max_mb}MB)")]
    FileTooLarge {
        path: PathBuf,
        size_mb: u64,
        max_mb: u64,
    },

    /// Image dimensions exceed limit
    #[error("Image too large: {path} ({width}x{height} > {max_dim})")]
    ImageTooLarge {
        path: PathBuf,
        width: u32,
        height: u32,
        max_dim: u32,
    },

    /// The codec rejected a resize/encode request
    #[error("Encode error for {path} ({format} @ {width}px): {message}")]
    Encode {
        path: PathBuf,
        format: String,
        width: u32,
        message: String,
    },

    /// A derivative file could not be written
    #[error("Failed to write {path}: {message}")]
    Write { path: PathBuf, message: String },

    /// Another source already claimed this manifest key
    #[error("{path} collides with {other} on manifest key {key:?}")]
    Collision {
        path: PathBuf,
        other: PathBuf,
        key: String,
    },
}

impl PipelineError {
    /// Whether the `on_invalid_source` policy applies to this failure.
    ///
    /// Unreadable, undecodable, oversized and unencodable sources can be
    /// replaced by a placeholder; write failures and collisions cannot.
    pub fn is_invalid_source(&self) -> bool {
        matches!(
            self,
            Self::SourceUnreadable { .. }
                | Self::Decode { .. }
                | Self::FileTooLarge { .. }
                | Self::ImageTooLarge { .. }
                | Self::Encode { .. }
        )
    }
}

/// Failure reported by an [`ImageCodec`](crate::pipeline::ImageCodec).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct CodecError(pub String);

impl From<image::ImageError> for CodecError {
    fn from(e: image::ImageError) -> Self {
        Self(e.to_string())
    }
}

/// Convenience type alias for srcset results.
pub type Result<T> = std::result::Result<T, SrcsetError>;

/// Convenience type alias for pipeline-specific results.
pub type PipelineResult<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_source_classification() {
        let decode = PipelineError::Decode {
            path: PathBuf::from("a.png"),
            message: "truncated".into(),
        };
        assert!(decode.is_invalid_source());

        let write = PipelineError::Write {
            path: PathBuf::from("a.jpg"),
            message: "read-only".into(),
        };
        assert!(!write.is_invalid_source());

        let collision = PipelineError::Collision {
            path: PathBuf::from("a.png"),
            other: PathBuf::from("a.jpg"),
            key: "images/a".into(),
        };
        assert!(!collision.is_invalid_source());
    }

    #[test]
    fn test_error_messages_include_path() {
        let err = PipelineError::Encode {
            path: PathBuf::from("photos/sea.jpg"),
            format: "avif".into(),
            width: 960,
            message: "unsupported".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("photos/sea.jpg"));
        assert!(msg.contains("avif @ 960px"));
    }
}
