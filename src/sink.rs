use crate::record::NormalizedUser;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error(transparent)]
    Postgres(#[from] tokio_postgres::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("batch of {rows} rows exceeds the limit of {max} rows per insert")]
    BatchTooLarge { rows: usize, max: usize },
    #[error("sink unavailable: {0}")]
    Unavailable(String),
}

/// Storage the pipeline loads users into.
///
/// One sink value serves one ingestion run at a time; concurrent runs need
/// their own sinks.
#[async_trait]
pub trait UserSink: Send {
    /// Stores the whole batch in a single round trip and returns the number of rows written.
    async fn insert_batch(&mut self, rows: Vec<NormalizedUser>) -> Result<u64, SinkError>;

    /// Every stored age, `None` where the stored value is null.
    async fn query_all_ages(&mut self) -> Result<Vec<Option<f64>>, SinkError>;
}

/// Keeps inserted users in memory. Used for dry runs and tests.
#[derive(Debug, Default)]
pub struct MemorySink {
    rows: Vec<NormalizedUser>,
    batch_sizes: Vec<usize>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows(&self) -> &[NormalizedUser] {
        &self.rows
    }

    /// Size of every insert call, in call order.
    pub fn batch_sizes(&self) -> &[usize] {
        &self.batch_sizes
    }
}

#[async_trait]
impl UserSink for MemorySink {
    async fn insert_batch(&mut self, rows: Vec<NormalizedUser>) -> Result<u64, SinkError> {
        let written = rows.len();
        self.batch_sizes.push(written);
        self.rows.extend(rows);
        Ok(written as u64)
    }

    async fn query_all_ages(&mut self) -> Result<Vec<Option<f64>>, SinkError> {
        Ok(self.rows.iter().map(|u| Some(f64::from(u.age))).collect())
    }
}
