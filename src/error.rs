use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors surfaced while loading and checking configuration documents.
///
/// The taxonomy is two-tier: [`ComplianceError::MissingFile`] means the
/// environment is simply not present in this checkout and callers should
/// treat the check as inapplicable (a skip). Every other variant is a real
/// defect in the configuration under audit.
#[derive(Debug, Error, Serialize, Deserialize)]
pub enum ComplianceError {
    #[error("file not found: {0}")]
    MissingFile(PathBuf),

    #[error("failed to parse {path}: {message}")]
    ParseError { path: String, message: String },

    #[error("failed to read {path}: {message}")]
    ReadError { path: String, message: String },

    #[error("invalid rule catalog: {0}")]
    CatalogError(String),

    #[error("invalid CIDR block: {0}")]
    InvalidCidr(String),

    #[error("invalid manifest: {0}")]
    ManifestError(String),
}

impl ComplianceError {
    /// Whether this error marks an absent environment rather than a defect.
    ///
    /// Suites running against partial checkouts map this to a skip instead
    /// of a failure.
    pub fn is_skip(&self) -> bool {
        matches!(self, ComplianceError::MissingFile(_))
    }
}

impl From<serde_json::Error> for ComplianceError {
    fn from(err: serde_json::Error) -> Self {
        ComplianceError::CatalogError(err.to_string())
    }
}
