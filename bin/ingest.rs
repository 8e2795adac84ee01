use anyhow::Context;
use clap::{Arg, ArgAction, Command};
use csv_user_ingest::{
    ingest_path, load_config, AppConfig, IngestSummary, MemorySink, PostgresSink, UserSink,
};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;
use tracing::error;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    match run().await {
        Ok(summary) => {
            println!("Successfully inserted {} records.", summary.records_inserted);
            match serde_json::to_string_pretty(&summary) {
                Ok(json) => println!("{json}"),
                Err(e) => error!("failed to render summary: {e}"),
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("CSV processing failed: {e:#}");
            eprintln!("error: CSV processing failed");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> anyhow::Result<IngestSummary> {
    let matches = Command::new("ingest")
        .about("Load a CSV of users into PostgreSQL and report the age distribution")
        .arg(Arg::new("path").long("path").required(true).value_parser(clap::value_parser!(PathBuf)))
        .arg(Arg::new("config").long("config").help("TOML config file").value_parser(clap::value_parser!(PathBuf)))
        .arg(Arg::new("batch-size").long("batch-size").help("Records per insert (default 500)").value_parser(clap::value_parser!(usize)))
        .arg(Arg::new("charset").long("charset").help("Source encoding label, e.g. utf-8 or latin1"))
        .arg(Arg::new("database-url").long("database-url").help("PostgreSQL connection string"))
        .arg(Arg::new("table").long("table").help("Target table (default public.users)"))
        .arg(Arg::new("dry-run").long("dry-run").help("Parse and validate without a database").action(ArgAction::SetTrue))
        .get_matches();

    let mut config = match matches.get_one::<PathBuf>("config") {
        Some(path) => load_config(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => AppConfig::default(),
    };
    if let Some(&batch_size) = matches.get_one::<usize>("batch-size") {
        config.ingest.batch_size = batch_size;
    }
    if let Some(charset) = matches.get_one::<String>("charset") {
        config.ingest.charset = charset.clone();
    }
    if let Some(url) = matches.get_one::<String>("database-url") {
        config.postgres.url = url.clone();
    }
    if let Some(table) = matches.get_one::<String>("table") {
        config.postgres.table = table.clone();
    }
    config.ingest.validate()?;

    let path = matches
        .get_one::<PathBuf>("path")
        .context("--path is required")?;

    let mut sink: Box<dyn UserSink> = if matches.get_flag("dry-run") {
        Box::new(MemorySink::new())
    } else {
        let sink = PostgresSink::connect(&config.postgres)
            .await
            .context("Database connection failed")?;
        Box::new(sink)
    };

    let start = Instant::now();
    let summary = ingest_path(path, sink.as_mut(), &config.ingest).await?;
    tracing::info!(
        elapsed_secs = start.elapsed().as_secs_f64(),
        source = %path.display(),
        "ingestion finished"
    );
    Ok(summary)
}
