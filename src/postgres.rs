//! PostgreSQL sink writing `(name, age, address jsonb, additional_info jsonb)` rows.

use crate::config::{PostgresConfig, MAX_BATCH_SIZE};
use crate::record::NormalizedUser;
use crate::sink::{SinkError, UserSink};
use async_trait::async_trait;
use tokio_postgres::types::{Json, ToSql};
use tokio_postgres::{Client, NoTls};
use tracing::{debug, error};

const COLUMNS_PER_ROW: usize = 4;

/// A single PostgreSQL connection serving one ingestion run.
pub struct PostgresSink {
    client: Client,
    table: String,
}

impl PostgresSink {
    pub async fn connect(config: &PostgresConfig) -> Result<Self, SinkError> {
        let (client, connection) = tokio_postgres::connect(&config.url, NoTls).await?;

        // Drives the socket until the client is dropped.
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                error!("postgres connection error: {e}");
            }
        });

        Ok(Self::new(client, &config.table))
    }

    pub fn new(client: Client, table: &str) -> Self {
        Self {
            client,
            table: quote_table(table),
        }
    }
}

#[async_trait]
impl UserSink for PostgresSink {
    async fn insert_batch(&mut self, rows: Vec<NormalizedUser>) -> Result<u64, SinkError> {
        if rows.is_empty() {
            return Ok(0);
        }
        if rows.len() > MAX_BATCH_SIZE {
            return Err(SinkError::BatchTooLarge {
                rows: rows.len(),
                max: MAX_BATCH_SIZE,
            });
        }

        let sql = insert_statement(&self.table, rows.len());
        let mut params: Vec<Box<dyn ToSql + Sync + Send>> =
            Vec::with_capacity(rows.len() * COLUMNS_PER_ROW);
        for user in rows {
            params.push(Box::new(user.name));
            params.push(Box::new(user.age));
            params.push(Box::new(Json(serde_json::to_value(&user.address)?)));
            params.push(Box::new(
                user.additional_info
                    .map(|info| serde_json::to_value(info).map(Json))
                    .transpose()?,
            ));
        }
        let param_refs: Vec<&(dyn ToSql + Sync)> = params
            .iter()
            .map(|b| b.as_ref() as &(dyn ToSql + Sync))
            .collect();

        let written = self.client.execute(sql.as_str(), &param_refs).await?;
        debug!(rows = written, table = %self.table, "inserted batch");
        Ok(written)
    }

    async fn query_all_ages(&mut self) -> Result<Vec<Option<f64>>, SinkError> {
        let sql = format!("SELECT age::float8 FROM {}", self.table);
        let rows = self.client.query(sql.as_str(), &[]).await?;
        rows.iter()
            .map(|row| row.try_get::<_, Option<f64>>(0).map_err(SinkError::from))
            .collect()
    }
}

/// `INSERT` with one `($n, $n+1, $n+2::jsonb, $n+3::jsonb)` group per row.
fn insert_statement(table: &str, rows: usize) -> String {
    let groups: Vec<String> = (0..rows)
        .map(|i| {
            let base = i * COLUMNS_PER_ROW;
            format!(
                "(${}, ${}, ${}::jsonb, ${}::jsonb)",
                base + 1,
                base + 2,
                base + 3,
                base + 4
            )
        })
        .collect();
    format!(
        "INSERT INTO {table} (name, age, address, additional_info) VALUES {}",
        groups.join(", ")
    )
}

/// Quotes each dot-separated part of `table` as an identifier.
fn quote_table(table: &str) -> String {
    table
        .split('.')
        .map(|part| format!("\"{}\"", part.trim().replace('"', "\"\"")))
        .collect::<Vec<_>>()
        .join(".")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_placeholders_per_row() {
        assert_eq!(
            insert_statement("\"public\".\"users\"", 2),
            "INSERT INTO \"public\".\"users\" (name, age, address, additional_info) VALUES \
             ($1, $2, $3::jsonb, $4::jsonb), ($5, $6, $7::jsonb, $8::jsonb)"
        );
    }

    #[test]
    fn quotes_table_identifiers() {
        assert_eq!(quote_table("public.users"), "\"public\".\"users\"");
        assert_eq!(quote_table("users"), "\"users\"");
        assert_eq!(quote_table("odd\"name"), "\"odd\"\"name\"");
    }
}
