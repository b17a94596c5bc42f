use std::time::Duration;
use thiserror::Error;

/// Error raised by a database engine binding.
///
/// Kept separate from [`BenchError`] so each boundary (provisioning, strategy,
/// reporting) can say which phase the engine failure belongs to.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{message}")]
pub struct DbError {
    message: String,
}

impl DbError {
    pub fn new(message: impl Into<String>) -> Self {
        DbError { message: message.into() }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<tokio_postgres::Error> for DbError {
    fn from(error: tokio_postgres::Error) -> Self {
        match error.as_db_error() {
            Some(db) => DbError::new(format!("{}: {}", db.code().code(), db.message())),
            None => DbError::new(error.to_string()),
        }
    }
}

#[derive(Error, Debug)]
pub enum BenchError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("{step} failed: {message}")]
    Provisioning { step: String, message: String },

    /// An instance tool call outlived its wait budget.
    #[error("{action} did not complete within {waited:?}")]
    Timeout { action: String, waited: Duration },

    #[error("{strategy} insert failed: {source}")]
    Execution {
        strategy: String,
        #[source]
        source: DbError,
    },

    #[error("row count for '{table}' failed: {source}")]
    Reporting {
        table: String,
        #[source]
        source: DbError,
    },

    #[error("{} teardown action(s) failed: {}", .0.len(), summarize(.0))]
    Teardown(Vec<BenchError>),
}

impl BenchError {
    pub fn provisioning(step: impl Into<String>, message: impl ToString) -> Self {
        BenchError::Provisioning {
            step: step.into(),
            message: message.to_string(),
        }
    }

    /// True for failures raised while building or tearing down the environment.
    pub fn is_provisioning(&self) -> bool {
        matches!(self, BenchError::Provisioning { .. } | BenchError::Timeout { .. })
    }
}

fn summarize(errors: &[BenchError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

pub type Result<T, E = BenchError> = std::result::Result<T, E>;
