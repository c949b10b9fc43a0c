use std::error::Error as StdError;

use thiserror::Error;

/// Errors surfaced while acquiring a connection or loading rows.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error(transparent)]
    Config(#[from] genloader_core::Error),
    #[error("connection '{id}' unavailable: {source}")]
    ConnectionUnavailable {
        id: String,
        #[source]
        source: sqlx::Error,
    },
    /// Logged and recorded in the outcome; never aborts a run.
    #[error("delete-all on {table} failed: {source}")]
    TruncateFailed {
        table: String,
        #[source]
        source: sqlx::Error,
    },
    #[error("insert at step {step} into {table} failed: {source}")]
    InsertFailed {
        table: String,
        step: i64,
        #[source]
        source: sqlx::Error,
    },
    #[error("record generation at step {step} failed: {source}")]
    GenerationUnavailable {
        step: i64,
        #[source]
        source: genloader_core::Error,
    },
}

impl LoadError {
    /// Message of the innermost error in the source chain.
    pub fn root_cause(&self) -> String {
        root_cause(self)
    }
}

/// Message of the innermost error in `err`'s source chain.
pub fn root_cause(err: &(dyn StdError + 'static)) -> String {
    let mut current = err;
    while let Some(next) = current.source() {
        current = next;
    }
    current.to_string()
}
