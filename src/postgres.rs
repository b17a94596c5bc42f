//! PostgreSQL binding of the engine seams.

use async_trait::async_trait;
use tokio_postgres::binary_copy::BinaryCopyInWriter;
use tokio_postgres::types::Type;
use tokio_postgres::{Client, NoTls};
use tracing::{debug, warn};

use crate::config::BenchConfig;
use crate::engine::{Endpoint, SqlConnection, SqlEngine};
use crate::error::DbError;
use crate::rows::RowBuffer;

#[derive(Debug, Clone)]
pub struct PgEngine {
    admin: String,
    benchmark: String,
}

impl PgEngine {
    pub fn new(config: &BenchConfig) -> Self {
        PgEngine {
            admin: config.admin_connection(),
            benchmark: config.database_connection(),
        }
    }
}

#[async_trait]
impl SqlEngine for PgEngine {
    type Connection = PgConnection;

    async fn connect(&self, endpoint: Endpoint) -> Result<PgConnection, DbError> {
        let target = match endpoint {
            Endpoint::Admin => &self.admin,
            Endpoint::Benchmark => &self.benchmark,
        };
        debug!(?endpoint, "opening connection");
        let (client, connection) = tokio_postgres::connect(target, NoTls).await?;
        tokio::spawn(async move {
            if let Err(error) = connection.await {
                warn!(%error, "postgres connection closed with error");
            }
        });
        Ok(PgConnection { client })
    }
}

/// Dropping the client ends the spawned task driving its socket.
pub struct PgConnection {
    client: Client,
}

#[async_trait]
impl SqlConnection for PgConnection {
    async fn execute(&mut self, sql: &str) -> Result<u64, DbError> {
        Ok(self.client.execute(sql, &[]).await?)
    }

    async fn query_scalar(&mut self, sql: &str) -> Result<i64, DbError> {
        let row = self.client.query_one(sql, &[]).await?;
        Ok(row.try_get(0)?)
    }

    async fn bulk_load(&mut self, table: &str, rows: &RowBuffer) -> Result<u64, DbError> {
        let statement = format!(
            "COPY {} ({}) FROM STDIN BINARY",
            table,
            rows.columns().join(", ")
        );
        let sink = self.client.copy_in(statement.as_str()).await?;
        let writer = BinaryCopyInWriter::new(sink, &[Type::VARCHAR, Type::INT4]);
        tokio::pin!(writer);
        for row in rows.rows() {
            writer.as_mut().write(&[&row.name, &row.age]).await?;
        }
        Ok(writer.finish().await?)
    }
}
