use std::env;
use std::sync::Arc;

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use sqlx::{Connection, PgConnection};

use genloader_core::{IdentitySequence, RunConfig};
use genloader_load::{Loader, PgConnectionProvider, TruncateOutcome};

const TABLE: &str = "genloader_it_emp";

fn database_url() -> Option<String> {
    env::var("TEST_DATABASE_URL").ok()
}

async fn reset_table(url: &str) -> Result<()> {
    let mut conn = PgConnection::connect(url)
        .await
        .context("connecting to Postgres")?;
    sqlx::query(&format!("DROP TABLE IF EXISTS {TABLE}"))
        .execute(&mut conn)
        .await?;
    sqlx::query(&format!(
        "CREATE TABLE {TABLE} (
           empno INTEGER, fname TEXT, lname TEXT, job TEXT, mgr INTEGER,
           hiredate TIMESTAMP, sal DECIMAL(10,2), comm DECIMAL(10,2), dept INTEGER
         )"
    ))
    .execute(&mut conn)
    .await?;
    sqlx::query(&format!(
        "INSERT INTO {TABLE} VALUES (999, 'stale', 'row', 'x', 1, now(), 80000, 6000, 1)"
    ))
    .execute(&mut conn)
    .await?;
    conn.close().await?;
    Ok(())
}

#[tokio::test]
async fn loads_rows_into_postgres() -> Result<()> {
    let Some(url) = database_url() else {
        eprintln!("TEST_DATABASE_URL not set; skipping Postgres load test");
        return Ok(());
    };
    reset_table(&url).await?;

    let provider = PgConnectionProvider::default().with_url("it", url.clone());
    let loader = Loader::new(Arc::new(IdentitySequence::new()));
    let config = RunConfig {
        table_name: TABLE.to_string(),
        iteration_bound: 20,
        start_counter: 1,
        truncate_before_load: true,
    };

    let handle = provider.acquire("it").await?;
    let outcome = loader.run(&config, handle).await;

    assert!(outcome.is_completed(), "{:?}", outcome.error());
    assert!(matches!(outcome.truncate, TruncateOutcome::Deleted { rows: 1 }));
    assert_eq!(outcome.rows_inserted, 20);

    let mut conn = PgConnection::connect(&url).await?;
    let (count, min_id, max_id): (i64, i32, i32) = sqlx::query_as(&format!(
        "SELECT count(*), min(empno), max(empno) FROM {TABLE}"
    ))
    .fetch_one(&mut conn)
    .await?;
    assert_eq!((count, min_id, max_id), (20, 1, 20));

    let (min_sal, max_sal): (Decimal, Decimal) =
        sqlx::query_as(&format!("SELECT min(sal), max(sal) FROM {TABLE}"))
            .fetch_one(&mut conn)
            .await?;
    assert!(min_sal >= Decimal::new(75_000, 0));
    assert!(max_sal < Decimal::new(300_000, 0));

    conn.close().await?;
    Ok(())
}

#[tokio::test]
async fn missing_table_fails_after_truncate_warning() -> Result<()> {
    let Some(url) = database_url() else {
        eprintln!("TEST_DATABASE_URL not set; skipping Postgres failure test");
        return Ok(());
    };

    let provider = PgConnectionProvider::default().with_url("it", url);
    let loader = Loader::new(Arc::new(IdentitySequence::new()));
    let config = RunConfig {
        table_name: "genloader_it_missing".to_string(),
        iteration_bound: 3,
        start_counter: 1,
        truncate_before_load: true,
    };

    let outcome = loader.run(&config, provider.acquire("it").await?).await;

    assert!(matches!(outcome.truncate, TruncateOutcome::Failed(_)));
    assert!(!outcome.is_completed());
    assert_eq!(outcome.rows_attempted, 1);
    assert_eq!(outcome.rows_inserted, 0);
    Ok(())
}
