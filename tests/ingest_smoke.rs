use async_compression::tokio::write::GzipEncoder;
use csv_user_ingest::{ingest_path, IngestConfig, MemorySink};
use std::{fs::File, io::Write};
use tokio::io::AsyncWriteExt;

#[tokio::test]
async fn loads_gzip_file_in_batches() -> anyhow::Result<()> {
    // Create small CSV
    let dir = tempfile::tempdir()?;
    let csv_path = dir.path().join("users.csv");
    let mut f = File::create(&csv_path)?;
    writeln!(f, "name.firstName,name.lastName,age,address.city,tier")?;
    for i in 0..10_000 {
        // every 10th row has no name and must be skipped
        if i % 10 == 0 {
            writeln!(f, ",,{},Pune,gold", i % 80)?;
        } else {
            writeln!(f, "User,\"No. {i}, Esq.\",{},Pune,gold", i % 80)?;
        }
    }
    drop(f);

    // gzip it
    let gz_path = dir.path().join("users.csv.gz");
    let mut encoder = GzipEncoder::new(tokio::fs::File::create(&gz_path).await?);
    encoder.write_all(&std::fs::read(&csv_path)?).await?;
    encoder.shutdown().await?;

    let mut sink = MemorySink::new();
    let summary = ingest_path(&gz_path, &mut sink, &IngestConfig::with_batch_size(500)).await?;

    assert_eq!(summary.records_seen, 10_000);
    assert_eq!(summary.records_inserted, 9_000);
    assert_eq!(summary.batches, 18);
    assert!(sink.batch_sizes().iter().all(|&n| n == 500));
    assert_eq!(summary.distribution.total, 9_000);

    let first = &sink.rows()[0];
    assert_eq!(first.name, "User No. 1, Esq.");
    assert_eq!(first.age, 1);
    assert_eq!(first.address.city.as_deref(), Some("Pune"));
    assert_eq!(first.address.line1, None);
    assert_eq!(
        first
            .additional_info
            .as_ref()
            .and_then(|m| m.get("tier"))
            .map(String::as_str),
        Some("gold")
    );
    Ok(())
}

#[tokio::test]
async fn decodes_latin1_source() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("latin1.csv");
    std::fs::write(&path, b"name.firstName,age\r\nJos\xe9,41\r\n")?;

    let config = IngestConfig {
        charset: "latin1".into(),
        ..Default::default()
    };
    let mut sink = MemorySink::new();
    let summary = ingest_path(&path, &mut sink, &config).await?;

    assert_eq!(summary.records_inserted, 1);
    assert_eq!(sink.rows()[0].name, "José");
    Ok(())
}

#[tokio::test]
async fn missing_file_is_an_io_error() {
    let mut sink = MemorySink::new();
    let err = ingest_path(
        std::path::Path::new("/nonexistent/users.csv"),
        &mut sink,
        &IngestConfig::default(),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, csv_user_ingest::IngestError::Io(_)));
}
