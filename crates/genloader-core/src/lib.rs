//! Core contracts for genloader.
//!
//! Defines the synthetic record shape, the process-wide identity sequence and
//! the run configuration shared by the loader and the CLI.

pub mod config;
pub mod error;
pub mod identity;
pub mod record;

pub use config::{
    ConnectionConfig, DEFAULT_CONNECTION_ID, DEFAULT_SOURCE, EnvConfig, RunConfig,
};
pub use error::{Error, Result};
pub use identity::IdentitySequence;
pub use record::{COLUMN_NAMES, RecordGenerator, RecordSource, SyntheticRecord};
