//! Error types for loading workflow definitions

use super::ValidationError;
use std::path::PathBuf;
use thiserror::Error;

/// Failure to turn a definition file into a usable [`Definition`](super::Definition)
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("read workflow {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse workflow JSON {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("parse workflow JSON {}: trailing data", path.display())]
    TrailingData { path: PathBuf },

    #[error("{}", join_errors(errors))]
    Invalid { errors: Vec<ValidationError> },
}

impl LoadError {
    /// Validation errors, if this is a validation failure
    #[cfg(test)]
    pub fn validation_errors(&self) -> &[ValidationError] {
        match self {
            LoadError::Invalid { errors } => errors,
            _ => &[],
        }
    }
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}
