//! Builds the disposable environment: instance, then database.

use std::sync::Arc;

use tracing::{error, info};

use crate::config::BenchConfig;
use crate::engine::{create_database_sql, drop_database_sql, Endpoint, SqlConnection, SqlEngine};
use crate::error::{BenchError, Result};
use crate::instance::{InstanceCommand, InstanceTool};
use crate::teardown::{TeardownAction, TeardownStack};

/// `Some` holds the undo actions of a ready environment; `None` means
/// provisioning failed and whatever was built has already been torn down.
pub type EnvironmentHandle = Option<TeardownStack>;

pub struct EnvironmentProvisioner<T, E> {
    tool: Arc<T>,
    engine: Arc<E>,
    instance: String,
    database: String,
}

impl<T, E> EnvironmentProvisioner<T, E>
where
    T: InstanceTool + 'static,
    E: SqlEngine + 'static,
{
    pub fn new(tool: Arc<T>, engine: Arc<E>, config: &BenchConfig) -> Self {
        EnvironmentProvisioner {
            tool,
            engine,
            instance: config.instance_name.clone(),
            database: config.database_name.clone(),
        }
    }

    pub async fn provision(&self) -> EnvironmentHandle {
        let mut stack = TeardownStack::new();
        match self.build(&mut stack).await {
            Ok(()) => {
                info!(
                    instance = %self.instance,
                    database = %self.database,
                    "environment ready"
                );
                Some(stack)
            }
            Err(failure) => {
                error!(error = %failure, "provisioning failed, rolling back");
                println!("{}", failure);
                if let Err(teardown) = stack.dispose_all().await {
                    error!(error = %teardown, "rollback incomplete");
                }
                None
            }
        }
    }

    async fn build(&self, stack: &mut TeardownStack) -> Result<()> {
        self.instance_step(InstanceCommand::Create).await?;
        stack.push(self.instance_action(InstanceCommand::Delete));

        self.instance_step(InstanceCommand::Start).await?;
        stack.push(self.instance_action(InstanceCommand::Stop));

        let create = create_database_sql(&self.database);
        println!("{}", create);
        run_admin(self.engine.as_ref(), &create, "create database").await?;
        stack.push(self.drop_database_action());

        Ok(())
    }

    async fn instance_step(&self, command: InstanceCommand) -> Result<()> {
        self.tool
            .invoke(command.description(), command, &self.instance)
            .await
    }

    fn instance_action(&self, command: InstanceCommand) -> TeardownAction {
        let tool = Arc::clone(&self.tool);
        let instance = self.instance.clone();
        TeardownAction::new(command.description(), move || async move {
            tool.invoke(command.description(), command, &instance).await
        })
    }

    fn drop_database_action(&self) -> TeardownAction {
        let engine = Arc::clone(&self.engine);
        let sql = drop_database_sql(&self.database);
        TeardownAction::new("drop database", move || async move {
            println!("{}", sql);
            run_admin(engine.as_ref(), &sql, "drop database").await
        })
    }
}

/// One statement on its own admin connection.
async fn run_admin<E: SqlEngine>(engine: &E, sql: &str, step: &str) -> Result<()> {
    let mut connection = engine
        .connect(Endpoint::Admin)
        .await
        .map_err(|e| BenchError::provisioning(step, e))?;
    connection
        .execute(sql)
        .await
        .map_err(|e| BenchError::provisioning(step, e))?;
    Ok(())
}
