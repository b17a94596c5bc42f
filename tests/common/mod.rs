// In-memory stand-ins for the database engine and the instance tool.
// Both write to one shared journal so tests can check the global order of
// provisioning and teardown steps.
#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use insertbench::{
    BenchConfig, BenchError, DbError, Endpoint, InstanceCommand, InstanceTool, RowBuffer,
    SqlConnection, SqlEngine,
};

pub type Journal = Arc<Mutex<Vec<String>>>;

pub fn journal() -> Journal {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn entries(journal: &Journal) -> Vec<String> {
    journal.lock().unwrap().clone()
}

pub fn config() -> BenchConfig {
    BenchConfig {
        instance_name: "scratch".to_string(),
        database_name: "bench_db".to_string(),
        ..BenchConfig::default()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Table {
    pub rows: Vec<(String, i32)>,
    /// INSERT statements executed against the table.
    pub inserts: usize,
    pub bulk_loads: usize,
}

#[derive(Default)]
struct State {
    databases: HashSet<String>,
    tables: HashMap<String, Table>,
    fail_on: Vec<String>,
    connections: usize,
}

#[derive(Clone)]
pub struct MemoryEngine {
    database: String,
    state: Arc<Mutex<State>>,
    journal: Journal,
}

impl MemoryEngine {
    pub fn new(database: &str, journal: &Journal) -> Self {
        MemoryEngine {
            database: database.to_string(),
            state: Arc::new(Mutex::new(State::default())),
            journal: Arc::clone(journal),
        }
    }

    /// Engine whose benchmark database already exists.
    pub fn ready(database: &str) -> Self {
        let engine = MemoryEngine::new(database, &journal());
        engine.state.lock().unwrap().databases.insert(database.to_string());
        engine
    }

    /// Any statement starting with `prefix` fails.
    pub fn fail_on(self, prefix: &str) -> Self {
        self.state.lock().unwrap().fail_on.push(prefix.to_string());
        self
    }

    pub fn table(&self, name: &str) -> Option<Table> {
        self.state.lock().unwrap().tables.get(name).cloned()
    }

    pub fn has_database(&self) -> bool {
        self.state.lock().unwrap().databases.contains(&self.database)
    }

    pub fn connections(&self) -> usize {
        self.state.lock().unwrap().connections
    }
}

#[async_trait]
impl SqlEngine for MemoryEngine {
    type Connection = MemoryConnection;

    async fn connect(&self, endpoint: Endpoint) -> Result<MemoryConnection, DbError> {
        let mut state = self.state.lock().unwrap();
        if endpoint == Endpoint::Benchmark && !state.databases.contains(&self.database) {
            return Err(DbError::new(format!(
                "database \"{}\" does not exist",
                self.database
            )));
        }
        state.connections += 1;
        Ok(MemoryConnection {
            state: Arc::clone(&self.state),
            journal: Arc::clone(&self.journal),
        })
    }
}

pub struct MemoryConnection {
    state: Arc<Mutex<State>>,
    journal: Journal,
}

impl MemoryConnection {
    fn check(state: &State, statement: &str) -> Result<(), DbError> {
        match state.fail_on.iter().find(|p| statement.starts_with(p.as_str())) {
            Some(prefix) => Err(DbError::new(format!("injected failure on '{}'", prefix))),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl SqlConnection for MemoryConnection {
    async fn execute(&mut self, sql: &str) -> Result<u64, DbError> {
        if !sql.starts_with("INSERT") {
            self.journal.lock().unwrap().push(format!("sql: {}", sql));
        }
        let mut state = self.state.lock().unwrap();
        Self::check(&state, sql)?;

        if let Some(rest) = sql.strip_prefix("CREATE DATABASE ") {
            state.databases.insert(rest.trim().to_string());
            Ok(0)
        } else if let Some(rest) = sql.strip_prefix("DROP DATABASE IF EXISTS ") {
            let name = first_word(rest);
            state.databases.remove(name);
            Ok(0)
        } else if let Some(rest) = sql.strip_prefix("CREATE TABLE ") {
            let name = first_word(rest).to_string();
            if state.tables.contains_key(&name) {
                return Err(DbError::new(format!("relation \"{}\" already exists", name)));
            }
            state.tables.insert(name, Table::default());
            Ok(0)
        } else if let Some(rest) = sql.strip_prefix("INSERT INTO ") {
            let name = first_word(rest);
            let (_, values) = rest
                .split_once("VALUES ")
                .ok_or_else(|| DbError::new("INSERT without VALUES"))?;
            let rows = parse_tuples(values)?;
            let table = state
                .tables
                .get_mut(name)
                .ok_or_else(|| DbError::new(format!("relation \"{}\" does not exist", name)))?;
            table.inserts += 1;
            let inserted = rows.len() as u64;
            table.rows.extend(rows);
            Ok(inserted)
        } else {
            Err(DbError::new(format!("unsupported statement: {}", sql)))
        }
    }

    async fn query_scalar(&mut self, sql: &str) -> Result<i64, DbError> {
        let state = self.state.lock().unwrap();
        Self::check(&state, sql)?;
        let name = sql
            .strip_prefix("SELECT COUNT(*) FROM ")
            .ok_or_else(|| DbError::new(format!("unsupported query: {}", sql)))?;
        state
            .tables
            .get(name.trim())
            .map(|t| t.rows.len() as i64)
            .ok_or_else(|| DbError::new(format!("relation \"{}\" does not exist", name)))
    }

    async fn bulk_load(&mut self, table: &str, rows: &RowBuffer) -> Result<u64, DbError> {
        let mut state = self.state.lock().unwrap();
        Self::check(&state, &format!("COPY {}", table))?;
        let target = state
            .tables
            .get_mut(table)
            .ok_or_else(|| DbError::new(format!("relation \"{}\" does not exist", table)))?;
        target.bulk_loads += 1;
        target
            .rows
            .extend(rows.rows().iter().map(|r| (r.name.clone(), r.age)));
        Ok(rows.len() as u64)
    }
}

fn first_word(text: &str) -> &str {
    text.split_whitespace().next().unwrap_or("")
}

/// Parses `('name', 42), ('other', 43)`.
fn parse_tuples(values: &str) -> Result<Vec<(String, i32)>, DbError> {
    let inner = values
        .trim()
        .strip_prefix('(')
        .and_then(|v| v.strip_suffix(')'))
        .ok_or_else(|| DbError::new(format!("malformed VALUES: {}", values)))?;
    inner
        .split("), (")
        .map(|tuple| {
            let (name, age) = tuple
                .rsplit_once(", ")
                .ok_or_else(|| DbError::new(format!("malformed tuple: {}", tuple)))?;
            let name = name.trim_matches('\'').replace("''", "'");
            let age = age
                .trim()
                .parse()
                .map_err(|_| DbError::new(format!("bad age in: {}", tuple)))?;
            Ok((name, age))
        })
        .collect()
}

/// Instance tool that only journals what it was asked to do.
pub struct ScriptedTool {
    journal: Journal,
    fail_on: Option<InstanceCommand>,
    timeout_on: Option<InstanceCommand>,
}

impl ScriptedTool {
    pub fn new(journal: &Journal) -> Self {
        ScriptedTool {
            journal: Arc::clone(journal),
            fail_on: None,
            timeout_on: None,
        }
    }

    pub fn fail_on(mut self, command: InstanceCommand) -> Self {
        self.fail_on = Some(command);
        self
    }

    pub fn timeout_on(mut self, command: InstanceCommand) -> Self {
        self.timeout_on = Some(command);
        self
    }
}

#[async_trait]
impl InstanceTool for ScriptedTool {
    async fn invoke(
        &self,
        description: &str,
        command: InstanceCommand,
        instance: &str,
    ) -> insertbench::Result<()> {
        self.journal
            .lock()
            .unwrap()
            .push(format!("tool: {} {}", command.code(), instance));
        if self.timeout_on == Some(command) {
            return Err(BenchError::Timeout {
                action: description.to_string(),
                waited: Duration::from_secs(10),
            });
        }
        if self.fail_on == Some(command) {
            return Err(BenchError::provisioning(description, "exit status: 1"));
        }
        Ok(())
    }
}
