use clap::{Arg, ArgAction, Command};
use csv_async::AsyncWriterBuilder;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let matches = Command::new("gen")
        .about("Write a synthetic CSV file to stdout")
        .arg(
            Arg::new("rows")
                .long("rows")
                .value_parser(clap::value_parser!(u64))
                .required(true),
        )
        .arg(
            Arg::new("with_header")
                .long("with-header")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("cols")
                .long("cols")
                .value_parser(clap::value_parser!(usize))
                .default_value("3"),
        )
        .arg(Arg::new("delim").long("delim").default_value(","))
        .arg(
            Arg::new("malformed_every")
                .long("malformed-every")
                .help("Drop the last field of every Nth row")
                .value_parser(clap::value_parser!(u64)),
        )
        .get_matches();

    let rows: u64 = *matches.get_one("rows").unwrap();
    let with_header = matches.get_flag("with_header");
    let cols: usize = (*matches.get_one::<usize>("cols").unwrap()).max(2);
    let delim = matches.get_one::<String>("delim").unwrap();
    let delim = match delim.as_bytes() {
        [b] if b.is_ascii() => *b,
        _ => anyhow::bail!("--delim must be a single ASCII character"),
    };
    let malformed_every = matches.get_one::<u64>("malformed_every").copied();

    let mut out = AsyncWriterBuilder::new()
        .delimiter(delim)
        .flexible(true)
        .create_writer(tokio::io::stdout());

    if with_header {
        let mut header = vec!["sku".to_string(), "name".to_string()];
        header.extend((2..cols).map(|c| format!("col{c}")));
        out.write_record(&header).await?;
    }

    // Deterministic data: sku, a name holding the delimiter (forces quoting), col2..
    let name_sep = char::from(delim);
    for i in 0..rows {
        let mut record = vec![
            format!("SKU{i:010}"),
            format!("Item {}{name_sep} size {}", i % 97, i % 5),
        ];
        record.extend((2..cols).map(|c| format!("v{c}_{i}")));
        if malformed_every.is_some_and(|n| n > 0 && i % n == n - 1) {
            record.pop();
        }
        out.write_record(&record).await?;
    }

    out.flush().await?;
    Ok(())
}
