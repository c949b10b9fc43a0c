//! Truncate-then-insert loading of synthetic records.
//!
//! The [`Loader`] drives one run over an exclusively owned
//! [`ConnectionHandle`]; [`PgConnectionProvider`] supplies Postgres handles.

pub mod errors;
pub mod handle;
pub mod loader;
pub mod outcome;
pub mod postgres;

pub use errors::{LoadError, root_cause};
pub use handle::{ConnectionHandle, delete_all_statement, insert_statement};
pub use loader::Loader;
pub use outcome::{RunOutcome, RunStatus, TruncateOutcome};
pub use postgres::{PgConnectionProvider, PgHandle, redact_url};
