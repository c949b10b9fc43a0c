use std::time::Duration;

use crate::errors::LoadError;

/// What happened to the optional delete-all step.
#[derive(Debug)]
pub enum TruncateOutcome {
    Skipped,
    Deleted { rows: u64 },
    /// The run continued regardless.
    Failed(LoadError),
}

/// Terminal status of a run.
#[derive(Debug)]
pub enum RunStatus {
    Completed,
    Failed(LoadError),
}

/// Summary reported once the connection has been released.
#[derive(Debug)]
pub struct RunOutcome {
    pub run_id: String,
    pub table: String,
    pub rows_attempted: u64,
    pub rows_inserted: u64,
    pub elapsed: Duration,
    pub truncate: TruncateOutcome,
    pub status: RunStatus,
}

impl RunOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self.status, RunStatus::Completed)
    }

    pub fn error(&self) -> Option<&LoadError> {
        match &self.status {
            RunStatus::Completed => None,
            RunStatus::Failed(err) => Some(err),
        }
    }

    pub fn elapsed_ms(&self) -> u64 {
        u64::try_from(self.elapsed.as_millis()).unwrap_or(u64::MAX)
    }
}
