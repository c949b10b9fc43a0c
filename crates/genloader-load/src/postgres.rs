//! Postgres connection provider and handle.

use std::collections::BTreeMap;

use async_trait::async_trait;
use sqlx::{Connection, PgConnection};

use genloader_core::{EnvConfig, SyntheticRecord};

use crate::errors::LoadError;
use crate::handle::{ConnectionHandle, delete_all_statement, insert_statement};

const URL_KEY: &str = "url";
const FALLBACK_URL_VAR: &str = "DATABASE_URL";

/// Hands out single Postgres connections by connection identifier.
#[derive(Debug, Clone, Default)]
pub struct PgConnectionProvider {
    urls: BTreeMap<String, String>,
    fallback: Option<String>,
}

impl PgConnectionProvider {
    /// Collect the `url` of every `[connections.<id>]` table, with
    /// `DATABASE_URL` as the fallback for ids that have none.
    pub fn from_env(env: &EnvConfig) -> Self {
        Self {
            urls: env
                .connections()
                .filter_map(|(id, settings)| {
                    let url = settings.get(URL_KEY)?.as_str()?;
                    Some((id.to_string(), url.to_string()))
                })
                .collect(),
            fallback: std::env::var(FALLBACK_URL_VAR).ok(),
        }
    }

    pub fn with_url(mut self, id: impl Into<String>, url: impl Into<String>) -> Self {
        self.urls.insert(id.into(), url.into());
        self
    }

    pub async fn acquire(&self, id: &str) -> Result<PgHandle, LoadError> {
        let url = self
            .urls
            .get(id)
            .or(self.fallback.as_ref())
            .ok_or_else(|| LoadError::ConnectionUnavailable {
                id: id.to_string(),
                source: sqlx::Error::Configuration(
                    format!("no {URL_KEY} for connection '{id}' and {FALLBACK_URL_VAR} is unset")
                        .into(),
                ),
            })?;

        tracing::info!(event = "connection_acquiring", connection_id = %id, url = %redact_url(url));

        let conn = PgConnection::connect(url)
            .await
            .map_err(|source| LoadError::ConnectionUnavailable {
                id: id.to_string(),
                source,
            })?;

        tracing::info!(event = "connection_acquired", connection_id = %id);
        Ok(PgHandle { conn })
    }
}

/// One open Postgres connection.
#[derive(Debug)]
pub struct PgHandle {
    conn: PgConnection,
}

#[async_trait]
impl ConnectionHandle for PgHandle {
    fn engine(&self) -> &'static str {
        "postgres"
    }

    async fn delete_all(&mut self, table: &str) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(&delete_all_statement(table))
            .execute(&mut self.conn)
            .await?;
        Ok(result.rows_affected())
    }

    async fn insert(&mut self, table: &str, record: &SyntheticRecord) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(&insert_statement(table))
            .bind(record.employee_id)
            .bind(&record.first_name)
            .bind(&record.last_name)
            .bind(&record.job_title)
            .bind(record.manager_id)
            .bind(record.hire_date)
            .bind(record.salary)
            .bind(record.commission)
            .bind(record.department_id)
            .execute(&mut self.conn)
            .await?;
        Ok(result.rows_affected())
    }

    async fn release(self) -> Result<(), sqlx::Error> {
        self.conn.close().await
    }
}

/// Mask the password in a connection URL, both in the authority and in
/// `password=` query parameters.
pub fn redact_url(url: &str) -> String {
    let mut redacted = url.to_string();

    if let Some(scheme_end) = url.find("://") {
        let authority_start = scheme_end + 3;
        let authority_end = url[authority_start..]
            .find(['/', '?'])
            .map_or(url.len(), |idx| authority_start + idx);
        let authority = &url[authority_start..authority_end];
        if let Some(at_idx) = authority.rfind('@') {
            if let Some(colon_idx) = authority[..at_idx].find(':') {
                let start = authority_start + colon_idx + 1;
                let end = authority_start + at_idx;
                redacted.replace_range(start..end, "***");
            }
        }
    }

    let Some(query_start) = redacted.find('?') else {
        return redacted;
    };
    let (base, query) = redacted.split_at(query_start + 1);
    let params = query
        .split('&')
        .map(|pair| match pair.split_once('=') {
            Some((key, _)) if key.eq_ignore_ascii_case("password") => format!("{key}=***"),
            _ => pair.to_string(),
        })
        .collect::<Vec<_>>()
        .join("&");
    format!("{base}{params}")
}
