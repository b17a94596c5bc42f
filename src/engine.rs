//! Seams to the database engine.
//!
//! Every operation opens its own connection through [`SqlEngine::connect`]
//! and drops it when done; connections are never shared between
//! provisioning steps or strategies.

use async_trait::async_trait;

use crate::error::DbError;
use crate::rows::RowBuffer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    /// Server-level database used for creating and dropping databases.
    Admin,
    /// The database provisioned for the benchmark.
    Benchmark,
}

#[async_trait]
pub trait SqlEngine: Send + Sync {
    type Connection: SqlConnection;

    async fn connect(&self, endpoint: Endpoint) -> Result<Self::Connection, DbError>;
}

#[async_trait]
pub trait SqlConnection: Send {
    /// Runs one statement and returns the number of affected rows.
    async fn execute(&mut self, sql: &str) -> Result<u64, DbError>;

    /// Runs a query returning a single integer.
    async fn query_scalar(&mut self, sql: &str) -> Result<i64, DbError>;

    /// Transfers the whole buffer into `table` in one round trip.
    async fn bulk_load(&mut self, table: &str, rows: &RowBuffer) -> Result<u64, DbError>;
}

pub fn create_table_sql(table: &str) -> String {
    format!(
        "CREATE TABLE {} (id integer GENERATED ALWAYS AS IDENTITY, name varchar(50), age integer)",
        table
    )
}

pub fn count_rows_sql(table: &str) -> String {
    format!("SELECT COUNT(*) FROM {}", table)
}

pub fn create_database_sql(database: &str) -> String {
    format!("CREATE DATABASE {}", database)
}

/// Drops the database even when clients are still attached.
pub fn drop_database_sql(database: &str) -> String {
    format!("DROP DATABASE IF EXISTS {} WITH (FORCE)", database)
}
