//! Run configuration and the TOML document it is resolved from.

use std::collections::BTreeMap;
use std::ops::RangeInclusive;
use std::path::Path;

use serde::Deserialize;
use toml::Value;

use crate::error::{Error, Result};

/// Logical configuration name holding the table settings.
pub const DEFAULT_SOURCE: &str = "source";
/// Connection used when `[core].connectionId` is not set.
pub const DEFAULT_CONNECTION_ID: &str = "source";

const TABLE_NAME_KEY: &str = "tableName";
const ITERATION_KEY: &str = "iteration";
const COUNTER_KEY: &str = "counter";
const TRUNCATE_KEY: &str = "truncateBeforeLoad";

/// Key/value settings for one logical connection.
pub type ConnectionConfig = BTreeMap<String, Value>;

/// Environment configuration file: a `[core]` table plus one table per
/// logical connection under `[connections.<name>]`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EnvConfig {
    #[serde(default)]
    core: CoreSection,
    #[serde(default)]
    connections: BTreeMap<String, ConnectionConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CoreSection {
    connection_id: Option<String>,
}

impl EnvConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Settings for a logical connection name.
    pub fn connection(&self, name: &str) -> Result<&ConnectionConfig> {
        self.connections.get(name).ok_or_else(|| {
            Error::ConfigInvalid(format!("no [connections.{name}] table in configuration"))
        })
    }

    pub fn connections(&self) -> impl Iterator<Item = (&str, &ConnectionConfig)> {
        self.connections
            .iter()
            .map(|(name, settings)| (name.as_str(), settings))
    }

    /// Connection identifier handed to the connection provider.
    pub fn connection_id(&self) -> &str {
        self.core
            .connection_id
            .as_deref()
            .unwrap_or(DEFAULT_CONNECTION_ID)
    }
}

/// Immutable settings for one loader run.
///
/// `start_counter` and `iteration_bound` only decide how many rows are
/// inserted. They do not seed `empno`, which comes from the process-wide
/// [`IdentitySequence`](crate::IdentitySequence).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    pub table_name: String,
    pub iteration_bound: i64,
    pub start_counter: i64,
    pub truncate_before_load: bool,
}

impl RunConfig {
    /// Resolve from a connection's settings, applying defaults for every
    /// optional key.
    pub fn resolve(env: &ConnectionConfig) -> Result<Self> {
        let table_name = match env.get(TABLE_NAME_KEY) {
            None => return Err(invalid(format!("{TABLE_NAME_KEY} is required"))),
            Some(Value::String(name)) => name.trim().to_string(),
            Some(other) => {
                return Err(invalid(format!(
                    "{TABLE_NAME_KEY} must be a string, got {}",
                    other.type_str()
                )));
            }
        };
        if table_name.is_empty() {
            return Err(invalid(format!("{TABLE_NAME_KEY} must not be empty")));
        }
        validate_table_name(&table_name)?;

        Ok(Self {
            table_name,
            iteration_bound: integer_or(env, ITERATION_KEY, 1)?,
            start_counter: integer_or(env, COUNTER_KEY, 1)?,
            truncate_before_load: bool_or(env, TRUNCATE_KEY, true)?,
        })
    }

    /// Inclusive loop range; empty when the bound is below the counter.
    pub fn steps(&self) -> RangeInclusive<i64> {
        self.start_counter..=self.iteration_bound
    }

    /// Number of insert attempts the run will make.
    pub fn attempts(&self) -> u64 {
        let span = i128::from(self.iteration_bound) - i128::from(self.start_counter) + 1;
        u64::try_from(span.max(0)).unwrap_or(u64::MAX)
    }
}

fn integer_or(env: &ConnectionConfig, key: &str, default: i64) -> Result<i64> {
    match env.get(key) {
        None => Ok(default),
        Some(Value::Integer(value)) => Ok(*value),
        Some(other) => Err(invalid(format!(
            "{key} must be an integer, got {}",
            other.type_str()
        ))),
    }
}

fn bool_or(env: &ConnectionConfig, key: &str, default: bool) -> Result<bool> {
    match env.get(key) {
        None => Ok(default),
        Some(Value::Boolean(value)) => Ok(*value),
        Some(other) => Err(invalid(format!(
            "{key} must be a boolean, got {}",
            other.type_str()
        ))),
    }
}

/// Accepts `table` or `schema.table` made of plain SQL identifiers, since the
/// name is spliced into statement text.
fn validate_table_name(name: &str) -> Result<()> {
    let parts: Vec<&str> = name.split('.').collect();
    if parts.len() > 2 || !parts.iter().all(|part| is_identifier(part)) {
        return Err(invalid(format!(
            "{TABLE_NAME_KEY} '{name}' is not a plain or schema-qualified identifier"
        )));
    }
    Ok(())
}

fn is_identifier(part: &str) -> bool {
    let mut chars = part.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

fn invalid(message: String) -> Error {
    Error::ConfigInvalid(message)
}
