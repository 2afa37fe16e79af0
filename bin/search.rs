use clap::{Arg, ArgAction, Command};
use csv_search::{CsvSession, HeaderMatch, ParseOptions, SearchRequest};
use std::path::PathBuf;
use std::time::Instant;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let matches = Command::new("search")
        .about("Search a CSV file for rows containing a term")
        .arg(Arg::new("path").long("path").value_parser(clap::value_parser!(PathBuf)).required(true))
        .arg(Arg::new("query").long("query").required(true))
        .arg(Arg::new("column").long("column").help("Column index or header name to restrict the search to"))
        .arg(Arg::new("no-headers").long("no-headers").help("Treat the first line as data").action(ArgAction::SetTrue))
        .arg(Arg::new("ignore-case").long("ignore-case").help("Match header names case-insensitively").action(ArgAction::SetTrue))
        .arg(Arg::new("delim").long("delim").default_value(","))
        .get_matches();

    let path = matches.get_one::<PathBuf>("path").unwrap();
    let mut delim_chars = matches.get_one::<String>("delim").unwrap().chars();
    let delim = match (delim_chars.next(), delim_chars.next()) {
        (Some(c), None) => c,
        _ => anyhow::bail!("--delim must be a single character"),
    };
    let options = ParseOptions::default()
        .with_headers(!matches.get_flag("no-headers"))
        .with_delimiter(delim);

    let mut request = SearchRequest::new(matches.get_one::<String>("query").unwrap().as_str());
    if let Some(column) = matches.get_one::<String>("column") {
        request = request.in_column(column.as_str());
    }
    if matches.get_flag("ignore-case") {
        request = request.with_header_match(HeaderMatch::IgnoreCase);
    }

    let start = Instant::now();
    let mut session = CsvSession::new();
    session.load(path, options).await?;
    let results = session.search(&request)?;
    let elapsed = start.elapsed().as_secs_f64();

    let sep = delim.to_string();
    for row in &results.rows {
        println!("{}", row.join(&sep));
    }

    let table = session.table()?;
    if results.is_empty() {
        if results.column_specified() {
            eprintln!("No matches were found in the specified column");
        } else {
            eprintln!("No matches were found");
        }
    }
    eprintln!(
        "source={} rows={} matches={} malformed={}\nelapsed={:.3}s",
        path.display(),
        table.len(),
        results.len(),
        table.malformed_rows().len(),
        elapsed
    );
    Ok(())
}
