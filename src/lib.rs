//! Compares three ways of loading rows into a table (one INSERT per row,
//! multi-row INSERT batches, and a bulk transfer) against a throwaway
//! database instance that is created for the run and removed afterwards.

pub mod config;
pub mod engine;
pub mod error;
pub mod instance;
pub mod postgres;
pub mod provision;
pub mod report;
pub mod rows;
pub mod runner;
pub mod strategy;
pub mod teardown;

pub use config::BenchConfig;
pub use engine::{Endpoint, SqlConnection, SqlEngine};
pub use error::{BenchError, DbError, Result};
pub use instance::{InstanceCommand, InstanceTool, PgCtl};
pub use postgres::PgEngine;
pub use provision::{EnvironmentHandle, EnvironmentProvisioner};
pub use report::{percentages, report, ReportLine};
pub use rows::{GeneratedRow, RowBuffer, RowGenerator};
pub use runner::{BenchmarkResult, BenchmarkRunner, RunContext};
pub use strategy::Strategy;
pub use teardown::{TeardownAction, TeardownStack};

use tracing::warn;

/// Runs every strategy in order, then reports row counts and relative cost.
///
/// Stops at the first failure. The environment must already be provisioned.
pub async fn run_comparison<E: SqlEngine>(
    engine: &E,
    context: &mut RunContext,
    strategies: &[Strategy],
    rows: usize,
) -> Result<Vec<ReportLine>> {
    let mut results = Vec::with_capacity(strategies.len());
    for strategy in strategies {
        let invocation = strategy.execute(engine, &mut context.rows, rows);
        let result = context
            .runner
            .run(strategy.label(), strategy.table(), invocation)
            .await?;
        results.push(result);
    }

    let lines = report(engine, &results).await?;
    for line in &lines {
        if line.rows != rows as i64 {
            warn!(
                table = %line.table,
                expected = rows,
                actual = line.rows,
                "row count mismatch"
            );
        }
        println!("{}", line);
    }
    Ok(lines)
}
