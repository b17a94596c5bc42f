use std::fmt;
use std::time::Duration;

use crate::engine::{count_rows_sql, Endpoint, SqlConnection, SqlEngine};
use crate::error::{BenchError, DbError, Result};
use crate::runner::BenchmarkResult;

#[derive(Debug, Clone, PartialEq)]
pub struct ReportLine {
    pub table: String,
    pub rows: i64,
    pub elapsed: Duration,
    /// Share of the slowest run, in percent.
    pub percent: f64,
}

impl fmt::Display for ReportLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Table {:<30} has {} rows inserted in {:.2?} [{:>6.2}% of max]",
            format!("'{}'", self.table),
            self.rows,
            self.elapsed,
            self.percent
        )
    }
}

/// Smallest share a line reports, the last digit `{:.2}` shows.
const MIN_PERCENT: f64 = 0.01;

/// `100 * elapsed / max(elapsed)` for each result, in order.
///
/// The slowest result is exactly 100. When every run took zero time they all
/// count as the slowest. Runs too fast to register against the slowest one
/// are clamped to [`MIN_PERCENT`], so every share stays above zero.
pub fn percentages(results: &[BenchmarkResult]) -> Vec<f64> {
    let max = results
        .iter()
        .map(|r| r.elapsed)
        .max()
        .unwrap_or_default();
    if max.is_zero() {
        return vec![100.0; results.len()];
    }
    results
        .iter()
        .map(|r| (100.0 * r.elapsed.as_secs_f64() / max.as_secs_f64()).max(MIN_PERCENT))
        .collect()
}

/// Counts the rows each strategy left behind and pairs them with its timing.
pub async fn report<E: SqlEngine>(engine: &E, results: &[BenchmarkResult]) -> Result<Vec<ReportLine>> {
    if results.is_empty() {
        return Err(BenchError::Reporting {
            table: String::new(),
            source: DbError::new("no benchmark results to report"),
        });
    }

    let mut connection = engine
        .connect(Endpoint::Benchmark)
        .await
        .map_err(|source| BenchError::Reporting {
            table: results[0].table.clone(),
            source,
        })?;

    let mut lines = Vec::with_capacity(results.len());
    for (result, percent) in results.iter().zip(percentages(results)) {
        let rows = connection
            .query_scalar(&count_rows_sql(&result.table))
            .await
            .map_err(|source| BenchError::Reporting {
                table: result.table.clone(),
                source,
            })?;
        lines.push(ReportLine {
            table: result.table.clone(),
            rows,
            elapsed: result.elapsed,
            percent,
        });
    }
    Ok(lines)
}
