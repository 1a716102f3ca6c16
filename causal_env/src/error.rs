//! Error types for the causal clock boundary layer.

use thiserror::Error;

/// Errors raised while parsing boundary identifiers from text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// Discipline name is not one of the recognized tags
    #[error("Unknown clock discipline: {0} (expected vector-bss, vector-ses or matrix)")]
    UnknownDiscipline(String),

    /// Process identifier is malformed or zero
    #[error("Invalid process id: {0}")]
    InvalidProcessId(String),
}

impl ParseError {
    /// Creates an unknown-discipline error.
    pub fn discipline(name: impl Into<String>) -> Self {
        Self::UnknownDiscipline(name.into())
    }

    /// Creates an invalid-process-id error.
    pub fn process(raw: impl std::fmt::Display) -> Self {
        Self::InvalidProcessId(raw.to_string())
    }
}
