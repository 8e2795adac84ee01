use crate::aggregate::AgeDistribution;
use crate::config::IngestConfig;
use crate::fields::{parse_fields, FieldList};
use crate::io::{build_source_reader, chunk_stream, reader_from_path, SourceMeta};
use crate::loader::BatchLoader;
use crate::record::{map_row, normalize, Normalized, RawRecord};
use crate::sink::UserSink;
use crate::tokenizer::LineTokenizer;
use crate::{IngestResult, IngestSummary};
use futures::{Stream, StreamExt};
use std::collections::VecDeque;
use std::io;
use std::path::Path;
use tokio::io::AsyncRead;
use tracing::{debug, info, warn};

/// Pulls text chunks on demand and yields header-mapped records.
///
/// The first logical line is the header and is never yielded as data.
pub struct RecordReader<S> {
    chunks: S,
    tokenizer: LineTokenizer,
    lines: VecDeque<String>,
    headers: Option<FieldList>,
    seq: u64,
    exhausted: bool,
}

impl<S> RecordReader<S>
where
    S: Stream<Item = io::Result<String>> + Unpin,
{
    pub fn new(chunks: S) -> Self {
        Self {
            chunks,
            tokenizer: LineTokenizer::new(),
            lines: VecDeque::new(),
            headers: None,
            seq: 0,
            exhausted: false,
        }
    }

    pub fn headers(&self) -> Option<&FieldList> {
        self.headers.as_ref()
    }

    /// Next data row with its 1-based sequence number, `None` at end of input.
    pub async fn next_record(&mut self) -> io::Result<Option<(u64, RawRecord)>> {
        loop {
            while let Some(line) = self.lines.pop_front() {
                let fields = parse_fields(&line);
                match &self.headers {
                    None => self.headers = Some(fields),
                    Some(headers) => {
                        self.seq += 1;
                        return Ok(Some((self.seq, map_row(headers, fields))));
                    }
                }
            }

            if self.exhausted {
                return Ok(None);
            }
            match self.chunks.next().await {
                Some(chunk) => {
                    let chunk = chunk?;
                    self.lines.extend(self.tokenizer.feed(&chunk));
                }
                None => {
                    self.exhausted = true;
                    self.lines.extend(self.tokenizer.finish());
                }
            }
        }
    }
}

/// Runs one ingestion pass: every chunk of `chunks` is tokenized, mapped and
/// normalized, kept users are loaded into `sink` in batches, and the age
/// distribution is computed from the sink afterwards.
///
/// Invalid records are skipped. Read errors and failed inserts end the run.
pub async fn ingest<S, K>(
    chunks: S,
    sink: &mut K,
    config: &IngestConfig,
) -> IngestResult<IngestSummary>
where
    S: Stream<Item = io::Result<String>> + Unpin,
    K: UserSink + ?Sized,
{
    config.validate()?;
    info!(batch_size = config.batch_size, "starting ingestion run");

    let mut reader = RecordReader::new(chunks);
    let mut loader = BatchLoader::new(&mut *sink, config.batch_size);
    let mut seen = 0u64;
    let mut skipped = 0u64;
    let mut rejected = 0u64;

    while let Some((seq, record)) = reader.next_record().await? {
        seen = seq;
        match normalize(&record) {
            Normalized::Kept(user) => loader.append(user).await?,
            Normalized::Skipped(reason) if reason.is_validation() => {
                skipped += 1;
                debug!(record = seq, %reason, "skipping record");
            }
            Normalized::Skipped(reason) => {
                rejected += 1;
                warn!("error processing record #{seq}: {reason}");
            }
        }
    }

    let stats = loader.finish().await?;
    info!(
        records = seen,
        skipped,
        rejected,
        batches = stats.batches,
        "Successfully processed {} records.",
        stats.inserted
    );

    let distribution = AgeDistribution::compute(sink).await;
    Ok(IngestSummary {
        records_inserted: stats.inserted,
        records_seen: seen,
        batches: stats.batches,
        distribution,
    })
}

/// [`ingest`] over any byte reader, decompressed per `meta`.
///
/// A non-UTF-8 `meta.charset` wins; otherwise the configured charset applies.
pub async fn ingest_reader<R, K>(
    reader: R,
    mut meta: SourceMeta,
    sink: &mut K,
    config: &IngestConfig,
) -> IngestResult<IngestSummary>
where
    R: AsyncRead + Unpin + Send + 'static,
    K: UserSink + ?Sized,
{
    if meta.charset == encoding_rs::UTF_8 {
        meta.charset = config.encoding()?;
    }
    let (source, meta) = build_source_reader(reader, meta);
    ingest(chunk_stream(source, meta.charset), sink, config).await
}

/// [`ingest`] over a local file, honoring `.gz`/`.zst` and the configured charset.
pub async fn ingest_path<K>(
    path: &Path,
    sink: &mut K,
    config: &IngestConfig,
) -> IngestResult<IngestSummary>
where
    K: UserSink + ?Sized,
{
    let (source, meta) = reader_from_path(path, config.encoding()?).await?;
    info!(path = %path.display(), content_type = %meta.content_type, "reading source");
    ingest(chunk_stream(source, meta.charset), sink, config).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    fn chunks(parts: &[&str]) -> impl Stream<Item = io::Result<String>> + Unpin {
        stream::iter(
            parts
                .iter()
                .map(|p| Ok(p.to_string()))
                .collect::<Vec<_>>(),
        )
    }

    #[tokio::test]
    async fn header_is_not_a_record() {
        let mut reader = RecordReader::new(chunks(&["a,b\n1,2\n", "3"]));
        let (seq, first) = reader.next_record().await.unwrap().unwrap();
        assert_eq!(seq, 1);
        assert_eq!(first.get("a"), Some("1"));
        assert_eq!(
            reader.headers(),
            Some(&vec!["a".to_string(), "b".to_string()])
        );

        let (seq, second) = reader.next_record().await.unwrap().unwrap();
        assert_eq!(seq, 2);
        assert_eq!(second.get("a"), Some("3"));
        assert_eq!(second.get("b"), Some(""));
        assert!(reader.next_record().await.unwrap().is_none());
        assert!(reader.next_record().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn header_only_input_has_no_records() {
        let mut reader = RecordReader::new(chunks(&["a,b"]));
        assert!(reader.next_record().await.unwrap().is_none());
        assert_eq!(reader.headers().map(Vec::len), Some(2));
    }

    #[tokio::test]
    async fn empty_input_has_no_header() {
        let mut reader = RecordReader::new(chunks(&[]));
        assert!(reader.next_record().await.unwrap().is_none());
        assert!(reader.headers().is_none());
    }

    #[tokio::test]
    async fn read_error_surfaces() {
        let source = stream::iter(vec![
            Ok("a,b\n1,".to_string()),
            Err(io::Error::new(io::ErrorKind::UnexpectedEof, "truncated")),
        ]);
        let mut reader = RecordReader::new(source);
        let err = reader.next_record().await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }
}
