use crate::record::NormalizedUser;
use crate::sink::UserSink;
use crate::{IngestError, IngestResult};
use std::mem;
use tracing::debug;

/// Totals reported once the loader has flushed its remainder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadStats {
    pub inserted: u64,
    pub batches: u64,
}

/// Accumulates users and writes them to the sink `threshold` at a time.
///
/// A flush is awaited inline, so at most one batch is held in memory.
/// A failed insert ends the run; batches written before it stay committed.
pub struct BatchLoader<'a, S: UserSink + ?Sized> {
    sink: &'a mut S,
    batch: Vec<NormalizedUser>,
    threshold: usize,
    stats: LoadStats,
}

impl<'a, S: UserSink + ?Sized> BatchLoader<'a, S> {
    /// `threshold` is clamped to at least one record.
    pub fn new(sink: &'a mut S, threshold: usize) -> Self {
        let threshold = threshold.max(1);
        Self {
            sink,
            batch: Vec::with_capacity(threshold),
            threshold,
            stats: LoadStats::default(),
        }
    }

    pub async fn append(&mut self, user: NormalizedUser) -> IngestResult<()> {
        self.batch.push(user);
        if self.batch.len() >= self.threshold {
            self.flush().await?;
        }
        Ok(())
    }

    /// Flushes whatever is left, even below the threshold.
    pub async fn finish(mut self) -> IngestResult<LoadStats> {
        if !self.batch.is_empty() {
            self.flush().await?;
        }
        Ok(self.stats)
    }

    /// Records buffered and not yet written.
    pub fn pending(&self) -> usize {
        self.batch.len()
    }

    async fn flush(&mut self) -> IngestResult<()> {
        let rows = mem::replace(&mut self.batch, Vec::with_capacity(self.threshold));
        let size = rows.len();
        self.sink
            .insert_batch(rows)
            .await
            .map_err(|source| IngestError::Sink {
                inserted: self.stats.inserted,
                source,
            })?;

        self.stats.inserted += size as u64;
        self.stats.batches += 1;
        debug!(
            batch = self.stats.batches,
            size,
            inserted = self.stats.inserted,
            "flushed batch"
        );
        Ok(())
    }
}
