use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{BenchError, Result};

pub const DEFAULT_ROWS: usize = 1000;
pub const DEFAULT_BATCH_SIZE: usize = 1000;
pub const PG_CTL: &str = "pg_ctl";

/// Settings for one benchmark run. Every field has a default, so an empty
/// JSON object (or no file at all) is a valid configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BenchConfig {
    pub instance_name: String,
    pub database_name: String,
    /// Directory holding the instance data directories.
    pub instance_root: PathBuf,
    pub host: String,
    pub port: u16,
    pub user: String,
    /// Explicit path to `pg_ctl`. When absent, `PATH` is searched once.
    pub pg_ctl: Option<PathBuf>,
    pub tool_timeout_secs: u64,
    pub batch_size: usize,
    pub default_rows: usize,
    pub seed: Option<u64>,
}

impl Default for BenchConfig {
    fn default() -> Self {
        BenchConfig {
            instance_name: "insert_comparison".to_string(),
            database_name: "bulk_insert_sample".to_string(),
            instance_root: std::env::temp_dir(),
            host: "127.0.0.1".to_string(),
            port: 54329,
            user: "postgres".to_string(),
            pg_ctl: None,
            tool_timeout_secs: 10,
            batch_size: DEFAULT_BATCH_SIZE,
            default_rows: DEFAULT_ROWS,
            seed: None,
        }
    }
}

impl BenchConfig {
    /// Reads the JSON file at `path`, or returns the defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => {
                let text = std::fs::read_to_string(path).map_err(|e| {
                    BenchError::Config(format!("cannot read '{}': {}", path.display(), e))
                })?;
                Self::from_json(&text)?
            }
            None => BenchConfig::default(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| BenchError::Config(e.to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("instance_name", &self.instance_name),
            ("database_name", &self.database_name),
            ("user", &self.user),
        ] {
            if !is_identifier(value) {
                return Err(BenchError::Config(format!(
                    "{field} '{value}' is not a plain identifier"
                )));
            }
        }
        // ends up inside the server's -o option string
        if self.host.is_empty() || self.host.contains(|c: char| c.is_whitespace() || c == '\'' || c == '"') {
            return Err(BenchError::Config(format!("host '{}' is not a plain address", self.host)));
        }
        if self.batch_size == 0 {
            return Err(BenchError::Config("batch_size must be at least 1".into()));
        }
        if self.tool_timeout_secs == 0 {
            return Err(BenchError::Config("tool_timeout_secs must be at least 1".into()));
        }
        Ok(())
    }

    pub fn tool_timeout(&self) -> Duration {
        Duration::from_secs(self.tool_timeout_secs)
    }

    pub fn admin_connection(&self) -> String {
        self.connection_string("postgres")
    }

    pub fn database_connection(&self) -> String {
        self.connection_string(&self.database_name)
    }

    fn connection_string(&self, dbname: &str) -> String {
        format!(
            "host={} port={} user={} dbname={}",
            self.host, self.port, self.user, dbname
        )
    }
}

/// ASCII letter or underscore first, then letters, digits or underscores.
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Row count from the optional positional argument. Anything that is not a
/// non-negative integer falls back to `default`.
pub fn row_count_from_arg(arg: Option<&str>, default: usize) -> usize {
    arg.and_then(|value| value.trim().parse::<usize>().ok())
        .unwrap_or(default)
}

/// Resolves an executable once: an explicit path must exist, otherwise each
/// directory of `search_path` is tried in order.
pub fn locate_executable(
    configured: Option<&Path>,
    name: &str,
    search_path: Option<&OsStr>,
) -> Result<PathBuf> {
    if let Some(path) = configured {
        return if path.is_file() {
            Ok(path.to_path_buf())
        } else {
            Err(BenchError::Config(format!(
                "configured {} '{}' does not exist",
                name,
                path.display()
            )))
        };
    }

    search_path
        .into_iter()
        .flat_map(std::env::split_paths)
        .map(|dir| dir.join(name))
        .find(|candidate| candidate.is_file())
        .ok_or_else(|| BenchError::Config(format!("{} not found on PATH", name)))
}
