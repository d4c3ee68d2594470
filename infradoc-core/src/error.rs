//! Error kinds shared by every document operation.
//!
//! Callers branch on these: the module helper treats [`DocumentError::NotFound`]
//! and [`DocumentError::StaleVersion`] as recoverable and everything else as
//! fatal.

use std::{io, path::PathBuf};

use thiserror::Error;

use crate::validation::Violations;

#[derive(Error, Debug)]
pub enum DocumentError {
    /// The document file does not exist.
    #[error("document not found: {}", .0.display())]
    NotFound(PathBuf),

    /// The document carries a version other than the current one.
    /// Holds the version that was found.
    #[error("document version {0} is not the current version")]
    StaleVersion(String),

    /// No upgrade path leads from the found version to the current one.
    #[error("unknown version {0}")]
    UnknownVersion(String),

    /// One or more validation rules failed.
    #[error("validation failed:\n{0}")]
    ValidationFailed(Violations),

    /// A backup target is already occupied.
    #[error("file already exists: {}", .0.display())]
    AlreadyExists(PathBuf),

    /// The bytes are not a document shape we can read.
    #[error("malformed input: {0}")]
    MalformedInput(String),

    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

impl DocumentError {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        DocumentError::MalformedInput(reason.into())
    }

    /// The violations carried by a [`DocumentError::ValidationFailed`].
    pub fn violations(&self) -> Option<&Violations> {
        match self {
            DocumentError::ValidationFailed(v) => Some(v),
            _ => None,
        }
    }
}
