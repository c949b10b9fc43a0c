mod logging;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use genloader_core::{
    DEFAULT_SOURCE, EnvConfig, Error as CoreError, IdentitySequence, RunConfig,
};
use genloader_load::{
    ConnectionHandle, LoadError, Loader, PgConnectionProvider, RunOutcome, RunStatus, root_cause,
};
use logging::{LoggingError, init_logging};
use thiserror::Error;

#[derive(Debug, Error)]
enum CliError {
    #[error("logging error: {0}")]
    Logging(#[from] LoggingError),
    #[error("{0}")]
    Core(#[from] CoreError),
    #[error("{0}")]
    Load(#[from] LoadError),
    #[error("loader task aborted: {0}")]
    Join(#[from] tokio::task::JoinError),
    #[error("{failed} of {instances} loader run(s) failed: {first}")]
    RunsFailed {
        failed: usize,
        instances: usize,
        #[source]
        first: LoadError,
    },
}

#[derive(Parser, Debug)]
#[command(name = "genloader", version, about = "Load synthetic employee rows into a table")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Optionally clear the configured table, then insert synthetic rows.
    Load(LoadArgs),
}

#[derive(Args, Debug)]
struct LoadArgs {
    /// Environment configuration file (TOML).
    #[arg(long, default_value = "genloader.toml")]
    config: PathBuf,
    /// Logical configuration name holding tableName/iteration/counter.
    #[arg(long, default_value = DEFAULT_SOURCE)]
    source: String,
    /// Connection identifier; overrides `[core].connectionId`.
    #[arg(long, value_name = "ID")]
    connection: Option<String>,
    /// Concurrent loader runs sharing one empno sequence. The table is
    /// cleared once, before any of them inserts.
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u16).range(1..))]
    instances: u16,
    /// Append NDJSON logs to this file.
    #[arg(long)]
    log_file: Option<PathBuf>,
    /// Log filter used when RUST_LOG is unset.
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let cli = Cli::parse();

    match cli.command {
        Command::Load(args) => {
            init_logging(&args.log_level, args.log_file.as_deref())?;
            run_load(args).await.inspect_err(|err| {
                tracing::error!(event = "load_failed", error = %err, root_cause = %root_cause(err));
            })
        }
    }
}

async fn run_load(args: LoadArgs) -> Result<(), CliError> {
    let LoadArgs {
        config,
        source,
        connection,
        instances,
        ..
    } = args;

    let env = EnvConfig::load(&config)?;
    let run_config = RunConfig::resolve(env.connection(&source)?)?;
    let connection_id = connection.unwrap_or_else(|| env.connection_id().to_string());
    let provider = PgConnectionProvider::from_env(&env);

    tracing::info!(
        event = "config_resolved",
        path = %config.display(),
        source = %source,
        connection_id = %connection_id,
        table = %run_config.table_name,
        iteration = run_config.iteration_bound,
        counter = run_config.start_counter,
        truncate_before_load = run_config.truncate_before_load,
        instances = instances
    );

    let mut handles = Vec::with_capacity(usize::from(instances));
    for _ in 0..instances {
        match provider.acquire(&connection_id).await {
            Ok(handle) => handles.push(handle),
            Err(err) => {
                for handle in handles {
                    if let Err(close_err) = handle.release().await {
                        tracing::warn!(event = "connection_release_failed", error = %close_err);
                    }
                }
                return Err(CliError::Load(err));
            }
        }
    }

    let loader = Loader::new(Arc::new(IdentitySequence::new()));
    let outcomes = loader.run_concurrent(&run_config, handles).await?;

    let instances = usize::from(instances);
    let mut failures = Vec::new();
    for outcome in outcomes {
        report(&outcome);
        if let RunStatus::Failed(err) = outcome.status {
            failures.push(err);
        }
    }

    let failed = failures.len();
    match failures.into_iter().next() {
        None => Ok(()),
        Some(first) if instances == 1 => Err(CliError::Load(first)),
        Some(first) => Err(CliError::RunsFailed {
            failed,
            instances,
            first,
        }),
    }
}

fn report(outcome: &RunOutcome) {
    let status = if outcome.is_completed() {
        "completed"
    } else {
        "failed"
    };
    println!(
        "{status}: inserted {} of {} row(s) into {} in {} ms",
        outcome.rows_inserted,
        outcome.rows_attempted,
        outcome.table,
        outcome.elapsed_ms()
    );
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn load_defaults() {
        let cli = Cli::try_parse_from(["genloader", "load"]).expect("parse");
        let Command::Load(args) = cli.command;
        assert_eq!(args.config, PathBuf::from("genloader.toml"));
        assert_eq!(args.source, "source");
        assert_eq!(args.instances, 1);
        assert!(args.connection.is_none());
    }

    #[test]
    fn rejects_zero_instances() {
        assert!(Cli::try_parse_from(["genloader", "load", "--instances", "0"]).is_err());
    }

    #[test]
    fn root_cause_walks_the_chain() {
        let err = CliError::Load(LoadError::GenerationUnavailable {
            step: 4,
            source: CoreError::GenerationUnavailable("name provider offline".to_string()),
        });
        assert_eq!(
            root_cause(&err),
            "synthetic value generation unavailable: name provider offline"
        );
    }
}
