//! Streaming CSV ingestion of person records into a relational store.
//!
//! - Input: any `AsyncRead` (local files, gzip/zstd, non-UTF-8 charsets).
//! - Pipeline: chunks → logical lines → fields → records → batches → sink.
//! - After the load, an age distribution is computed from the stored rows.
//!
//! Data shape:
//! - `IngestSummary { records_inserted, records_seen, batches, distribution }`
//! - Stored rows: `NormalizedUser { name, age, address, additional_info }`
#![cfg_attr(docsrs, feature(doc_cfg))]
//
mod aggregate;
mod codec;
mod config;
mod fields;
mod io;
mod loader;
mod pipeline;
mod postgres;
mod record;
mod sink;
mod tokenizer;

pub use crate::aggregate::{AgeBucket, AgeDistribution, BucketShare};
pub use crate::codec::Transcoder;
pub use crate::config::{load_config, AppConfig, IngestConfig, PostgresConfig, MAX_BATCH_SIZE};
pub use crate::fields::{parse_fields, FieldList};
pub use crate::io::{build_source_reader, chunk_stream, reader_from_path, SourceMeta};
pub use crate::loader::{BatchLoader, LoadStats};
pub use crate::pipeline::{ingest, ingest_path, ingest_reader, RecordReader};
pub use crate::postgres::PostgresSink;
pub use crate::record::{
    map_row, normalize, Address, Normalized, NormalizedUser, RawRecord, SkipReason,
};
pub use crate::sink::{MemorySink, SinkError, UserSink};
pub use crate::tokenizer::{LineTokenizer, Lines};

use serde::Serialize;
use thiserror::Error;

/// Result of one ingestion run.
#[derive(Debug, Clone, Serialize)]
pub struct IngestSummary {
    pub records_inserted: u64,
    /// Data rows read, including skipped ones.
    pub records_seen: u64,
    pub batches: u64,
    pub distribution: AgeDistribution,
}

/// Error type returned by this crate when not using `anyhow`.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("failed to read input: {0}")]
    Io(#[from] std::io::Error),
    #[error("batch insert failed after {inserted} records were committed: {source}")]
    Sink {
        inserted: u64,
        #[source]
        source: SinkError,
    },
}

pub type IngestResult<T> = std::result::Result<T, IngestError>;
