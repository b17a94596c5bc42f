use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tracing::info;

use crate::error::Result;
use crate::rows::RowGenerator;

#[derive(Debug, Clone, PartialEq)]
pub struct BenchmarkResult {
    pub label: String,
    pub table: String,
    pub elapsed: Duration,
}

/// Times strategy invocations. Adds no error handling of its own.
#[derive(Debug, Default, Clone, Copy)]
pub struct BenchmarkRunner;

impl BenchmarkRunner {
    pub fn new() -> Self {
        BenchmarkRunner
    }

    /// Awaits `invocation` between two reads of a monotonic clock.
    ///
    /// The future must be lazy (an `async` call that has not been polled yet)
    /// so that none of its work happens before the timer starts.
    pub async fn run<F>(&self, label: &str, table: &str, invocation: F) -> Result<BenchmarkResult>
    where
        F: Future<Output = Result<()>>,
    {
        let started = Instant::now();
        invocation.await?;
        let elapsed = started.elapsed();

        println!("{} insert done in {:.2?}", label, elapsed);
        info!(label, elapsed_ms = elapsed.as_secs_f64() * 1000.0, "strategy finished");

        Ok(BenchmarkResult {
            label: label.to_string(),
            table: table.to_string(),
            elapsed,
        })
    }
}

/// Per-run state handed to benchmarking instead of process-wide singletons.
#[derive(Debug)]
pub struct RunContext {
    pub rows: RowGenerator,
    pub runner: BenchmarkRunner,
}

impl RunContext {
    pub fn new(seed: Option<u64>) -> Self {
        RunContext {
            rows: RowGenerator::new(seed),
            runner: BenchmarkRunner::new(),
        }
    }
}
