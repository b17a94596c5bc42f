//! The three ways of getting N rows into a table.
//!
//! Each strategy creates its own table first, so their results never mix.
//! Failures propagate straight to the caller; nothing is retried.

use tracing::info;

use crate::engine::{create_table_sql, Endpoint, SqlConnection, SqlEngine};
use crate::error::{BenchError, DbError, Result};
use crate::rows::{RowBuffer, RowGenerator, COLUMNS};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// One INSERT per row: N round trips.
    RowByRow,
    /// Up to `batch_size` value tuples per INSERT: ceil(N / batch_size) round trips.
    Batched { batch_size: usize },
    /// Whole data set buffered in memory, then a single bulk transfer.
    BulkLoad,
}

impl Strategy {
    /// All strategies in the order they are benchmarked.
    pub fn all(batch_size: usize) -> [Strategy; 3] {
        [
            Strategy::RowByRow,
            Strategy::Batched { batch_size },
            Strategy::BulkLoad,
        ]
    }

    pub fn label(&self) -> &'static str {
        match self {
            Strategy::RowByRow => "RowByRow",
            Strategy::Batched { .. } => "Batched",
            Strategy::BulkLoad => "BulkLoad",
        }
    }

    pub fn table(&self) -> &'static str {
        match self {
            Strategy::RowByRow => "row_by_row_insert",
            Strategy::Batched { .. } => "batched_insert",
            Strategy::BulkLoad => "bulk_load_insert",
        }
    }

    /// Creates the strategy's table and inserts `count` generated rows.
    pub async fn execute<E: SqlEngine>(
        &self,
        engine: &E,
        rows: &mut RowGenerator,
        count: usize,
    ) -> Result<()> {
        let outcome = match *self {
            Strategy::RowByRow => row_by_row(engine, self.table(), rows, count).await,
            Strategy::Batched { batch_size } => {
                batched(engine, self.table(), rows, count, batch_size).await
            }
            Strategy::BulkLoad => bulk_load(engine, self.table(), rows, count).await,
        };
        outcome.map_err(|source| BenchError::Execution {
            strategy: self.label().to_string(),
            source,
        })
    }
}

pub fn insert_statement(table: &str, values: &[String]) -> String {
    format!(
        "INSERT INTO {} ({}) VALUES {}",
        table,
        COLUMNS.join(", "),
        values.join(", ")
    )
}

async fn open_table<E: SqlEngine>(engine: &E, table: &str) -> Result<E::Connection, DbError> {
    let mut connection = engine.connect(Endpoint::Benchmark).await?;
    connection.execute(&create_table_sql(table)).await?;
    Ok(connection)
}

async fn row_by_row<E: SqlEngine>(
    engine: &E,
    table: &str,
    rows: &mut RowGenerator,
    count: usize,
) -> Result<(), DbError> {
    let mut connection = open_table(engine, table).await?;

    info!(count, "writing records one at a time");
    for _ in 0..count {
        let values = [rows.next_row().values_clause()];
        connection.execute(&insert_statement(table, &values)).await?;
    }
    Ok(())
}

async fn batched<E: SqlEngine>(
    engine: &E,
    table: &str,
    rows: &mut RowGenerator,
    count: usize,
    batch_size: usize,
) -> Result<(), DbError> {
    let batch_size = batch_size.max(1);
    let mut connection = open_table(engine, table).await?;

    info!(count, batch_size = batch_size.min(count), "writing records in batches");
    let mut remaining = count;
    while remaining > 0 {
        let current = batch_size.min(remaining);
        let values: Vec<String> = (0..current)
            .map(|_| rows.next_row().values_clause())
            .collect();
        connection.execute(&insert_statement(table, &values)).await?;
        remaining -= current;
    }
    Ok(())
}

async fn bulk_load<E: SqlEngine>(
    engine: &E,
    table: &str,
    rows: &mut RowGenerator,
    count: usize,
) -> Result<(), DbError> {
    let mut connection = open_table(engine, table).await?;

    info!(count, "bulk loading records");
    let buffer = RowBuffer::fill(rows, count);
    if !buffer.is_empty() {
        connection.bulk_load(table, &buffer).await?;
    }
    Ok(())
}
