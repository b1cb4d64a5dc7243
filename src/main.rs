use std::path::PathBuf;

use anyhow::{Context, Result, bail};

use billing_dash::config::SessionConfig;
use billing_dash::data::aggregate::GroupKey;
use billing_dash::data::loader::load_file;
use billing_dash::data::model::Dimension;
use billing_dash::report::render_table;

const USAGE: &str = "usage: billing-dash <DATA_FILE> [--config FILE] [--group-by item|DIM] \
[--filter DIM=V1,V2 ...] [--tables N]";

struct Args {
    data: PathBuf,
    config: Option<PathBuf>,
    group_by: Option<GroupKey>,
    filters: Vec<(Dimension, Vec<String>)>,
    tables: Option<usize>,
}

fn parse_args() -> Result<Args> {
    let mut data = None;
    let mut config = None;
    let mut group_by = None;
    let mut filters = Vec::new();
    let mut tables = None;

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                let value = args.next().context("--config requires a file path")?;
                config = Some(PathBuf::from(value));
            }
            "--group-by" => {
                let value = args.next().context("--group-by requires item or a dimension")?;
                group_by = Some(value.parse::<GroupKey>()?);
            }
            "--filter" => {
                let value = args.next().context("--filter requires DIM=V1,V2")?;
                let (dim, values) = value
                    .split_once('=')
                    .with_context(|| format!("malformed filter '{value}', expected DIM=V1,V2"))?;
                let values = values
                    .split(',')
                    .map(str::trim)
                    .filter(|v| !v.is_empty())
                    .map(str::to_string)
                    .collect();
                filters.push((dim.parse::<Dimension>()?, values));
            }
            "--tables" => {
                let value = args.next().context("--tables requires a count")?;
                tables = Some(
                    value
                        .parse::<usize>()
                        .with_context(|| format!("invalid table count '{value}'"))?,
                );
            }
            "-h" | "--help" => {
                println!("{USAGE}");
                std::process::exit(0);
            }
            other if other.starts_with("--") => bail!("unknown option {other}\n{USAGE}"),
            other => {
                if data.is_some() {
                    bail!("unexpected argument {other}\n{USAGE}");
                }
                data = Some(PathBuf::from(other));
            }
        }
    }

    Ok(Args {
        data: data.context(USAGE)?,
        config,
        group_by,
        filters,
        tables,
    })
}

fn run() -> Result<()> {
    let args = parse_args()?;

    let mut config = match &args.config {
        Some(path) => SessionConfig::load(path)?,
        None => SessionConfig::default(),
    };
    if let Some(key) = args.group_by {
        config.group_by = key;
    }
    if let Some(n) = args.tables {
        config.tables.resize_with(n, Default::default);
    }
    // Command-line filters apply to every table.
    for table in &mut config.tables {
        for (dim, values) in &args.filters {
            table.insert(*dim, values.iter().cloned().collect());
        }
    }

    let store = load_file(&args.data)
        .with_context(|| format!("loading {}", args.data.display()))?;
    let session = config.apply(store)?;

    for (i, table) in session.tables().iter().enumerate() {
        let label = format!("Table {}", i + 1);
        println!("{}", render_table(&label, table.group_key(), table.view()));
    }
    Ok(())
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        log::error!("{e:#}");
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}
