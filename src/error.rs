//! Custom error types for the audit pipeline
//!
//! This module defines the error taxonomy for change capture using thiserror
//! for ergonomic error definitions. Errors raised inside the per-entity
//! logging path are contained by the aggregator and reported to the
//! diagnostic sink; none of them are fatal to the host process.

use thiserror::Error;

/// The main error type for audit operations
#[derive(Error, Debug)]
pub enum AuditError {
    /// Metadata lookup failures (unknown source, bad registry state)
    #[error("Metadata error: {0}")]
    Metadata(String),

    /// Projection expression parse/evaluation failures
    #[error("Expression error: {0}")]
    Expression(String),

    /// Record store append/readback failures
    #[error("Storage error: {0}")]
    Storage(String),

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(String),
}

impl AuditError {
    /// Check if this is a metadata resolution error
    pub fn is_metadata(&self) -> bool {
        matches!(self, Self::Metadata(_))
    }

    /// Check if this is an expression evaluation error
    pub fn is_expression(&self) -> bool {
        matches!(self, Self::Expression(_))
    }

    /// Check if this is a storage error
    pub fn is_storage(&self) -> bool {
        matches!(self, Self::Storage(_))
    }
}

// Implement From traits for common error types

impl From<std::io::Error> for AuditError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for AuditError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}

/// Result type alias for audit operations
pub type AuditResult<T> = Result<T, AuditError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AuditError::Metadata("unknown class".into());
        assert_eq!(err.to_string(), "Metadata error: unknown class");
    }

    #[test]
    fn test_error_kind_checks() {
        assert!(AuditError::Expression("bad path".into()).is_expression());
        assert!(AuditError::Storage("append failed".into()).is_storage());
        assert!(!AuditError::Storage("append failed".into()).is_metadata());
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let audit_err: AuditError = io_err.into();
        assert!(matches!(audit_err, AuditError::Io(_)));
    }

    #[test]
    fn test_from_json_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let audit_err: AuditError = json_err.into();
        assert!(matches!(audit_err, AuditError::Json(_)));
    }
}
