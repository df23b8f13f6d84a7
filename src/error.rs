//! Error types for dithering setup.
//!
//! Every error is raised while a call is being set up or while coefficient
//! tables are loaded. The per-pixel scan never fails.

use std::path::PathBuf;

use thiserror::Error;

/// Broad classification of a [`DitherError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed or missing coefficient table. Fatal at startup.
    Config,
    /// Bad call arguments, detected before scanning begins.
    Validation,
}

#[derive(Debug, Error)]
pub enum DitherError {
    /// Coefficient or strength table could not be read.
    #[error("Failed to read table {path}: {source}")]
    TableIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Coefficient or strength table has the wrong shape or bad tokens.
    #[error("Malformed table {origin}: {reason}")]
    MalformedTable { origin: String, reason: String },

    /// Adaptive tables were already initialized for this process.
    #[error("Adaptive tables are already initialized")]
    AlreadyInitialized,

    #[error("Unsupported kernel '{name}'. Supported: {supported}")]
    UnknownKernel { name: String, supported: String },

    #[error("Kernel '{0}' is non-causal (contains dy < 0). Use a causal variant (dy >= 0)")]
    Causality(String),

    #[error("Unsupported image format: {0}")]
    InvalidShape(String),

    #[error("Dimension mismatch: expected {expected} channels, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Palette must contain at least one color")]
    EmptyPalette,

    #[error("levels must be >= 2, got {0}")]
    InvalidLevels(usize),

    #[error("Unknown mode '{0}': expected 'ostromoukhov' or 'zhou_fang'")]
    UnknownMode(String),
}

impl DitherError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DitherError::TableIo { .. }
            | DitherError::MalformedTable { .. }
            | DitherError::AlreadyInitialized => ErrorKind::Config,
            _ => ErrorKind::Validation,
        }
    }

    pub(crate) fn malformed(origin: impl Into<String>, reason: impl Into<String>) -> Self {
        DitherError::MalformedTable {
            origin: origin.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, DitherError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_classification() {
        assert_eq!(DitherError::malformed("x", "bad").kind(), ErrorKind::Config);
        assert_eq!(DitherError::AlreadyInitialized.kind(), ErrorKind::Config);
        assert_eq!(DitherError::Causality("radial".into()).kind(), ErrorKind::Validation);
        assert_eq!(DitherError::InvalidLevels(1).kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_causality_message_names_kernel() {
        let msg = DitherError::Causality("diamond".into()).to_string();
        assert!(msg.contains("'diamond'"));
    }
}
