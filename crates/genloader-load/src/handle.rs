use async_trait::async_trait;

use genloader_core::{COLUMN_NAMES, SyntheticRecord};

/// An open, authenticated database connection owned by exactly one run.
#[async_trait]
pub trait ConnectionHandle: Send {
    /// Returns the engine identifier (e.g. `postgres`).
    fn engine(&self) -> &'static str;

    /// Remove every row from `table`, returning the number deleted.
    async fn delete_all(&mut self, table: &str) -> Result<u64, sqlx::Error>;

    /// Insert one record, values bound in [`COLUMN_NAMES`] order.
    async fn insert(&mut self, table: &str, record: &SyntheticRecord) -> Result<u64, sqlx::Error>;

    /// Close the connection. Called once, as the last step of a run.
    async fn release(self) -> Result<(), sqlx::Error>;
}

pub fn delete_all_statement(table: &str) -> String {
    format!("DELETE FROM {table}")
}

/// Positional insert without a column list, so the target only needs the
/// nine columns in the documented order.
pub fn insert_statement(table: &str) -> String {
    let placeholders = (1..=COLUMN_NAMES.len())
        .map(|idx| format!("${idx}"))
        .collect::<Vec<_>>()
        .join(", ");
    format!("INSERT INTO {table} VALUES ({placeholders})")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_statements() {
        assert_eq!(delete_all_statement("hr.emp"), "DELETE FROM hr.emp");
        assert_eq!(
            insert_statement("emp"),
            "INSERT INTO emp VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)"
        );
    }
}
