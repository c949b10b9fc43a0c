use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::task::{JoinError, JoinSet};
use uuid::Uuid;

use genloader_core::{IdentitySequence, RecordGenerator, RecordSource, RunConfig};

use crate::errors::LoadError;
use crate::handle::ConnectionHandle;
use crate::outcome::{RunOutcome, RunStatus, TruncateOutcome};

/// Runs truncate-then-insert against one connection.
///
/// Loaders sharing an [`IdentitySequence`] never hand out the same `empno`,
/// even when they run concurrently.
#[derive(Debug, Clone)]
pub struct Loader {
    identity: Arc<IdentitySequence>,
}

impl Loader {
    pub fn new(identity: Arc<IdentitySequence>) -> Self {
        Self { identity }
    }

    /// Load `config.attempts()` freshly generated records.
    pub async fn run<H>(&self, config: &RunConfig, connection: H) -> RunOutcome
    where
        H: ConnectionHandle,
    {
        let generator = RecordGenerator::new(Arc::clone(&self.identity));
        self.run_with_source(config, connection, generator).await
    }

    /// One run per handle, all inserting concurrently.
    ///
    /// The delete-all, when enabled, is issued once on the first handle
    /// before any run starts inserting; its result is reported on the first
    /// outcome. Outcomes come back in handle order.
    pub async fn run_concurrent<H>(
        &self,
        config: &RunConfig,
        mut handles: Vec<H>,
    ) -> Result<Vec<RunOutcome>, JoinError>
    where
        H: ConnectionHandle + 'static,
    {
        if handles.len() <= 1 {
            let mut outcomes = Vec::with_capacity(1);
            if let Some(handle) = handles.pop() {
                outcomes.push(self.run(config, handle).await);
            }
            return Ok(outcomes);
        }

        let shared_truncate = if config.truncate_before_load {
            let truncate_id = Uuid::new_v4().to_string();
            Some(truncate(&mut handles[0], config, &truncate_id).await)
        } else {
            None
        };
        let insert_only = RunConfig {
            truncate_before_load: false,
            ..config.clone()
        };

        let mut tasks = JoinSet::new();
        for (index, handle) in handles.into_iter().enumerate() {
            let loader = self.clone();
            let config = insert_only.clone();
            tasks.spawn(async move { (index, loader.run(&config, handle).await) });
        }

        let mut outcomes = Vec::with_capacity(tasks.len());
        while let Some(joined) = tasks.join_next().await {
            outcomes.push(joined?);
        }
        outcomes.sort_by_key(|(index, _)| *index);

        let mut outcomes: Vec<RunOutcome> =
            outcomes.into_iter().map(|(_, outcome)| outcome).collect();
        if let (Some(cleared), Some(first)) = (shared_truncate, outcomes.first_mut()) {
            first.truncate = cleared;
        }
        Ok(outcomes)
    }

    /// Same as [`Loader::run`] with a caller-provided record source.
    ///
    /// The connection is released exactly once before the outcome is
    /// returned, whatever happened before.
    pub async fn run_with_source<H, S>(
        &self,
        config: &RunConfig,
        mut connection: H,
        mut source: S,
    ) -> RunOutcome
    where
        H: ConnectionHandle,
        S: RecordSource,
    {
        let run_id = Uuid::new_v4().to_string();
        let timer = Instant::now();

        tracing::info!(
            event = "run_started",
            run_id = %run_id,
            engine = connection.engine(),
            table = %config.table_name,
            iteration = config.iteration_bound,
            counter = config.start_counter,
            attempts = config.attempts()
        );

        let truncate = if config.truncate_before_load {
            truncate(&mut connection, config, &run_id).await
        } else {
            tracing::info!(event = "truncate_skipped", run_id = %run_id);
            TruncateOutcome::Skipped
        };

        let progress = insert_all(&mut connection, config, &mut source, &run_id).await;

        if let Err(err) = connection.release().await {
            tracing::warn!(event = "connection_release_failed", run_id = %run_id, error = %err);
        }

        let elapsed = timer.elapsed();
        let status = match progress.failure {
            None => {
                tracing::info!(
                    event = "run_finished",
                    run_id = %run_id,
                    status = "completed",
                    rows_inserted = progress.inserted,
                    duration_ms = duration_ms(elapsed)
                );
                RunStatus::Completed
            }
            Some(err) => {
                tracing::error!(
                    event = "run_finished",
                    run_id = %run_id,
                    status = "failed",
                    rows_inserted = progress.inserted,
                    duration_ms = duration_ms(elapsed),
                    error = %err,
                    root_cause = %err.root_cause()
                );
                RunStatus::Failed(err)
            }
        };

        RunOutcome {
            run_id,
            table: config.table_name.clone(),
            rows_attempted: progress.attempted,
            rows_inserted: progress.inserted,
            elapsed,
            truncate,
            status,
        }
    }
}

fn duration_ms(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}

struct Progress {
    attempted: u64,
    inserted: u64,
    failure: Option<LoadError>,
}

async fn truncate<H>(connection: &mut H, config: &RunConfig, run_id: &str) -> TruncateOutcome
where
    H: ConnectionHandle,
{
    tracing::info!(event = "truncate_started", run_id = %run_id, table = %config.table_name);
    match connection.delete_all(&config.table_name).await {
        Ok(rows) => {
            tracing::info!(event = "truncate_finished", run_id = %run_id, rows_deleted = rows);
            TruncateOutcome::Deleted { rows }
        }
        Err(source) => {
            let err = LoadError::TruncateFailed {
                table: config.table_name.clone(),
                source,
            };
            tracing::error!(
                event = "truncate_failed",
                run_id = %run_id,
                error = %err,
                root_cause = %err.root_cause()
            );
            TruncateOutcome::Failed(err)
        }
    }
}

/// Stops at the first failure; rows already inserted stay.
async fn insert_all<H, S>(
    connection: &mut H,
    config: &RunConfig,
    source: &mut S,
    run_id: &str,
) -> Progress
where
    H: ConnectionHandle,
    S: RecordSource,
{
    tracing::info!(
        event = "insert_started",
        run_id = %run_id,
        table = %config.table_name,
        rows = config.attempts()
    );

    let mut progress = Progress {
        attempted: 0,
        inserted: 0,
        failure: None,
    };

    for step in config.steps() {
        progress.attempted += 1;

        let record = match source.next_record() {
            Ok(record) => record,
            Err(cause) => {
                progress.failure = Some(LoadError::GenerationUnavailable {
                    step,
                    source: cause,
                });
                break;
            }
        };

        if let Err(cause) = connection.insert(&config.table_name, &record).await {
            progress.failure = Some(LoadError::InsertFailed {
                table: config.table_name.clone(),
                step,
                source: cause,
            });
            break;
        }

        progress.inserted += 1;
        tracing::debug!(event = "row_inserted", run_id = %run_id, step, empno = record.employee_id);
    }

    progress
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_ms_saturates_instead_of_truncating() {
        assert_eq!(duration_ms(Duration::from_millis(1_500)), 1_500);
        assert_eq!(duration_ms(Duration::MAX), u64::MAX);
    }
}
