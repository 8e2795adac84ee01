use clap::{Arg, Command};
use csv_async::AsyncWriterBuilder;

const FIRST_NAMES: [&str; 6] = ["Asha", "Ben", "Chloé", "Dev", "", "Farah"];
const LAST_NAMES: [&str; 5] = ["Iyer", "O'Neil", "", "Smith, Jr.", "Zhou"];
const CITIES: [&str; 4] = ["Pune", "Austin", "Lyon", "Osaka"];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let matches = Command::new("gen")
        .about("Write a synthetic users CSV to stdout")
        .arg(
            Arg::new("rows")
                .long("rows")
                .value_parser(clap::value_parser!(u64))
                .required(true),
        )
        .arg(
            Arg::new("extra_cols")
                .long("extra-cols")
                .help("Columns beyond the fixed schema, stored as additional_info")
                .value_parser(clap::value_parser!(usize))
                .default_value("1"),
        )
        .get_matches();

    let rows: u64 = *matches.get_one("rows").unwrap();
    let extra_cols: usize = *matches.get_one("extra_cols").unwrap();

    let mut out = AsyncWriterBuilder::new()
        .buffer_capacity(1 << 20)
        .create_writer(tokio::io::stdout());

    let mut header = vec![
        "name.firstName".to_string(),
        "name.lastName".to_string(),
        "age".to_string(),
        "address.line1".to_string(),
        "address.line2".to_string(),
        "address.city".to_string(),
        "address.state".to_string(),
    ];
    header.extend((0..extra_cols).map(|c| format!("extra{c}")));
    out.write_record(&header).await?;

    // Deterministic data; every 97th row has a bad age, every 89th a quoted note.
    for i in 0..rows {
        let idx = i as usize;
        let age = if i % 97 == 96 {
            "unknown".to_string()
        } else {
            (i % 85).to_string()
        };
        let mut row = vec![
            FIRST_NAMES[idx % FIRST_NAMES.len()].to_string(),
            LAST_NAMES[idx % LAST_NAMES.len()].to_string(),
            age,
            format!("{} Main St", i + 1),
            String::new(),
            CITIES[idx % CITIES.len()].to_string(),
            "XX".to_string(),
        ];
        row.extend((0..extra_cols).map(|c| {
            if i % 89 == 0 {
                format!("said \"hi\", col {c}")
            } else {
                format!("v{c}_{i}")
            }
        }));
        out.write_record(&row).await?;
    }

    out.flush().await?;
    Ok(())
}
