//! Lifecycle of the disposable database instance.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info};

use crate::config::{locate_executable, BenchConfig, PG_CTL};
use crate::error::{BenchError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstanceCommand {
    Create,
    Start,
    Stop,
    Delete,
}

impl InstanceCommand {
    /// Short operation code, as lifecycle utilities usually spell them.
    pub fn code(&self) -> &'static str {
        match self {
            InstanceCommand::Create => "c",
            InstanceCommand::Start => "s",
            InstanceCommand::Stop => "p",
            InstanceCommand::Delete => "d",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            InstanceCommand::Create => "Creating new instance",
            InstanceCommand::Start => "Starting instance",
            InstanceCommand::Stop => "Stopping instance",
            InstanceCommand::Delete => "Deleting instance",
        }
    }
}

#[async_trait]
pub trait InstanceTool: Send + Sync {
    /// Runs `command` against `instance`, blocking until it completes or the
    /// tool's wait budget runs out.
    async fn invoke(&self, description: &str, command: InstanceCommand, instance: &str) -> Result<()>;
}

/// Drives a PostgreSQL instance through `pg_ctl`. Each instance is a data
/// directory named after it under `instance_root`.
#[derive(Debug, Clone)]
pub struct PgCtl {
    executable: PathBuf,
    instance_root: PathBuf,
    host: String,
    port: u16,
    user: String,
    timeout: Duration,
}

impl PgCtl {
    pub fn new(executable: PathBuf, config: &BenchConfig) -> Self {
        PgCtl {
            executable,
            instance_root: config.instance_root.clone(),
            host: config.host.clone(),
            port: config.port,
            user: config.user.clone(),
            timeout: config.tool_timeout(),
        }
    }

    /// Resolves `pg_ctl` from the configuration or `PATH`. Fails when it cannot be found.
    pub fn locate(config: &BenchConfig) -> Result<Self> {
        let search_path = std::env::var_os("PATH");
        let executable =
            locate_executable(config.pg_ctl.as_deref(), PG_CTL, search_path.as_deref())?;
        info!(executable = %executable.display(), "using instance tool");
        Ok(PgCtl::new(executable, config))
    }

    pub fn data_dir(&self, instance: &str) -> PathBuf {
        self.instance_root.join(instance)
    }

    /// Seconds `pg_ctl` itself waits for start or stop. Kept under the spawn
    /// budget so pg_ctl gives up and reports before it is killed.
    fn wait_secs(&self) -> String {
        self.timeout.as_secs().saturating_sub(1).max(1).to_string()
    }

    /// `pg_ctl` arguments for a command. `Delete` has none: pg_ctl cannot remove
    /// a cluster, so the data directory is removed directly.
    pub fn arguments(&self, command: InstanceCommand, instance: &str) -> Option<Vec<String>> {
        let data_dir = self.data_dir(instance).display().to_string();
        let args = match command {
            InstanceCommand::Create => vec![
                "init".to_string(),
                "-s".to_string(),
                "-D".to_string(),
                data_dir,
                "-o".to_string(),
                format!("-U {} -A trust", self.user),
            ],
            InstanceCommand::Start => vec![
                "start".to_string(),
                "-w".to_string(),
                "-t".to_string(),
                self.wait_secs(),
                "-s".to_string(),
                "-D".to_string(),
                data_dir.clone(),
                "-l".to_string(),
                format!("{}/server.log", data_dir),
                "-o".to_string(),
                format!(
                    "-p {} -c listen_addresses={} -c unix_socket_directories=''",
                    self.port, self.host
                ),
            ],
            InstanceCommand::Stop => vec![
                "stop".to_string(),
                "-w".to_string(),
                "-t".to_string(),
                self.wait_secs(),
                "-s".to_string(),
                "-D".to_string(),
                data_dir,
                "-m".to_string(),
                "immediate".to_string(),
            ],
            InstanceCommand::Delete => return None,
        };
        Some(args)
    }
}

impl PgCtl {
    /// A start that failed or timed out may still have left a postmaster
    /// behind; it detaches from pg_ctl, so killing pg_ctl does not reach it.
    async fn stop_after_failed_start(&self, instance: &str) {
        let Some(args) = self.arguments(InstanceCommand::Stop, instance) else {
            return;
        };
        let description = InstanceCommand::Stop.description();
        if let Err(e) = run_tool(&self.executable, &args, self.timeout, description).await {
            debug!(instance, error = %e, "nothing to stop after failed start");
        }
    }
}

#[async_trait]
impl InstanceTool for PgCtl {
    async fn invoke(&self, description: &str, command: InstanceCommand, instance: &str) -> Result<()> {
        match self.arguments(command, instance) {
            Some(args) => {
                println!(
                    "{} [{} {}]",
                    description,
                    PG_CTL,
                    args.join(" ")
                );
                let outcome = run_tool(&self.executable, &args, self.timeout, description).await;
                if outcome.is_err() && command == InstanceCommand::Start {
                    self.stop_after_failed_start(instance).await;
                }
                outcome
            }
            None => {
                let data_dir = self.data_dir(instance);
                println!("{} [remove {}]", description, data_dir.display());
                match tokio::time::timeout(self.timeout, tokio::fs::remove_dir_all(&data_dir)).await {
                    Err(_) => Err(BenchError::Timeout {
                        action: description.to_string(),
                        waited: self.timeout,
                    }),
                    Ok(result) => result.map_err(|e| BenchError::provisioning(description, e)),
                }
            }
        }
    }
}

/// Runs an external program and waits at most `wait` for it to exit.
///
/// The program runs in its own process group. When the budget expires the
/// whole group is killed, including anything it forked, and the call fails
/// with [`BenchError::Timeout`]; a non-zero exit is a provisioning failure
/// carrying the program's stderr.
pub async fn run_tool(program: &Path, args: &[String], wait: Duration, description: &str) -> Result<()> {
    debug!(program = %program.display(), ?args, "spawning");
    let mut command = Command::new(program);
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    #[cfg(unix)]
    command.process_group(0);

    let child = command
        .spawn()
        .map_err(|e| BenchError::provisioning(description, format!("cannot spawn {}: {}", program.display(), e)))?;
    let group = child.id();

    match tokio::time::timeout(wait, child.wait_with_output()).await {
        Err(_) => {
            kill_group(group);
            Err(BenchError::Timeout {
                action: description.to_string(),
                waited: wait,
            })
        }
        Ok(Err(e)) => Err(BenchError::provisioning(description, e)),
        Ok(Ok(output)) if !output.status.success() => {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(BenchError::provisioning(
                description,
                format!("{} ({})", output.status, stderr.trim()),
            ))
        }
        Ok(Ok(_)) => Ok(()),
    }
}

#[cfg(unix)]
fn kill_group(leader: Option<u32>) {
    let Some(pid) = leader.and_then(|pid| libc::pid_t::try_from(pid).ok()) else {
        return;
    };
    // SAFETY: kill(2) takes no pointers; a negative pid addresses the group
    // created for this child with process_group(0).
    if unsafe { libc::kill(-pid, libc::SIGKILL) } != 0 {
        debug!(pid, error = %std::io::Error::last_os_error(), "process group already gone");
    }
}

#[cfg(not(unix))]
fn kill_group(_leader: Option<u32>) {}
