use crate::{IngestError, IngestResult};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

/// Largest batch a single multi-row insert can carry: PostgreSQL allows
/// 65535 bind parameters and every row binds four.
pub const MAX_BATCH_SIZE: usize = 65_535 / 4;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    #[serde(default)]
    pub ingest: IngestConfig,
    #[serde(default)]
    pub postgres: PostgresConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IngestConfig {
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Any WHATWG encoding label, e.g. `utf-8` or `latin1`.
    #[serde(default = "default_charset")]
    pub charset: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PostgresConfig {
    #[serde(default = "default_pg_url")]
    pub url: String,
    #[serde(default = "default_pg_table")]
    pub table: String,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            charset: default_charset(),
        }
    }
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            url: default_pg_url(),
            table: default_pg_table(),
        }
    }
}

impl IngestConfig {
    pub fn with_batch_size(batch_size: usize) -> Self {
        Self {
            batch_size,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> IngestResult<()> {
        if self.batch_size == 0 {
            return Err(IngestError::Config("batch_size must be positive".into()));
        }
        if self.batch_size > MAX_BATCH_SIZE {
            return Err(IngestError::Config(format!(
                "batch_size {} exceeds the maximum of {MAX_BATCH_SIZE}",
                self.batch_size
            )));
        }
        self.encoding()?;
        Ok(())
    }

    pub fn encoding(&self) -> IngestResult<&'static encoding_rs::Encoding> {
        encoding_rs::Encoding::for_label(self.charset.trim().as_bytes()).ok_or_else(|| {
            IngestError::Config(format!("unknown charset label '{}'", self.charset))
        })
    }
}

fn default_batch_size() -> usize {
    500
}

fn default_charset() -> String {
    "utf-8".to_string()
}

fn default_pg_url() -> String {
    "postgres://postgres@localhost:5432/postgres".to_string()
}

fn default_pg_table() -> String {
    "public.users".to_string()
}

pub fn load_config(path: impl AsRef<Path>) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path.as_ref())
        .with_context(|| format!("failed to read config {}", path.as_ref().display()))?;
    let cfg: AppConfig = toml::from_str(&content).context("failed to parse TOML config")?;
    cfg.ingest.validate()?;
    Ok(cfg)
}
