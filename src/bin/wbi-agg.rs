use anyhow::{Result, bail};
use clap::{Args, Parser, Subcommand};
use num_format::{Locale, ToFormattedString};
use std::path::PathBuf;
use wbi_agg::config::{CATALOG_ENV, DATA_DIR_ENV, DEFAULT_DATA_DIR};
use wbi_agg::{AggregateQuery, DataLayout, cache, methodology, stats, storage};

#[derive(Parser, Debug)]
#[command(
    name = "wbi-agg",
    version,
    about = "Aggregate indicator series over country groups and compare a country against them"
)]
struct Cli {
    /// Data directory holding groups/ and indicators/ (cached API responses).
    #[arg(long, global = true, env = DATA_DIR_ENV, default_value = DEFAULT_DATA_DIR)]
    data_dir: PathBuf,
    /// Indicator catalog JSON. Defaults to <data-dir>/catalog.json, else the built-in catalog.
    #[arg(long, global = true, env = CATALOG_ENV)]
    catalog: Option<PathBuf>,
    /// Log debug output (RUST_LOG takes precedence).
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Aggregate one indicator over one or more groups.
    Aggregate(AggregateArgs),
    /// List catalog indicators.
    Indicators {
        /// Only list indicators of this category (e.g. "Economy").
        #[arg(long)]
        category: Option<String>,
    },
    /// Explain how an indicator is aggregated.
    Describe {
        /// Indicator code (e.g. SP.DYN.LE00.IN)
        code: String,
    },
    /// List groups and their member counts.
    Groups,
}

#[derive(Args, Debug)]
struct AggregateArgs {
    /// Indicator code (e.g. NY.GDP.MKTP.CD)
    #[arg(short, long)]
    indicator: String,
    /// Group ids separated by comma or semicolon (e.g. lldcs,ldcs)
    #[arg(short, long)]
    groups: String,
    /// ISO3 code of a country to compare against its group (e.g. BOL)
    #[arg(short, long)]
    country: Option<String>,
    /// Save the payload as JSON instead of printing it.
    #[arg(long)]
    out: Option<PathBuf>,
    /// Save the per-country breakdown as CSV (requires --country).
    #[arg(long)]
    csv: Option<PathBuf>,
    /// Print metric-card statistics to stderr.
    #[arg(long, default_value_t = false)]
    stats: bool,
}

fn fmt_opt(v: Option<f64>) -> String {
    match v {
        Some(x) if x.is_finite() => {
            // Round to 2 decimals, group thousands, then trim trailing zeros and dot.
            let cents = (x.abs() * 100.0).round() as i64;
            let sign = if x < 0.0 && cents != 0 { "-" } else { "" };
            let s = format!(
                "{}{}.{:02}",
                sign,
                (cents / 100).to_formatted_string(&Locale::en),
                cents % 100
            );
            s.trim_end_matches('0').trim_end_matches('.').to_string()
        }
        _ => "NA".to_string(),
    }
}

fn parse_list(s: &str) -> Vec<String> {
    s.split([',', ';'])
        .map(|x| x.trim().to_string())
        .filter(|x| !x.is_empty())
        .collect()
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default)).init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let layout = DataLayout::new(&cli.data_dir).with_catalog(cli.catalog.clone());
    match cli.cmd {
        Command::Aggregate(args) => cmd_aggregate(&layout, args),
        Command::Indicators { category } => cmd_indicators(&layout, category.as_deref()),
        Command::Describe { code } => cmd_describe(&layout, &code),
        Command::Groups => cmd_groups(&layout),
    }
}

fn cmd_aggregate(layout: &DataLayout, args: AggregateArgs) -> Result<()> {
    let catalog = layout.load_catalog()?;
    let membership = layout.load_membership()?;

    let group_ids = parse_list(&args.groups);
    if group_ids.is_empty() {
        bail!("--groups needs at least one group id");
    }
    let mut query = AggregateQuery::new(args.indicator.trim(), group_ids);
    if let Some(c) = args.country.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
        query = query.with_focus(c);
    }

    let store = cache::load_store(layout.indicators_dir(), &catalog, &query)?;
    let payload = wbi_agg::run_query(&catalog, &membership, &query, &store)?;

    if payload.is_empty() {
        eprintln!(
            "No data available for {} in the selected groups.",
            query.indicator_code
        );
    }

    match args.out.as_ref() {
        Some(path) => {
            storage::save_payload_json(&payload, path)?;
            eprintln!("Saved {} series to {}", payload.series.len(), path.display());
        }
        None => println!("{}", serde_json::to_string_pretty(&payload)?),
    }

    if let Some(path) = args.csv.as_ref() {
        if payload.country_data.is_none() {
            bail!("--csv needs --country with a member of one of the requested groups");
        }
        storage::save_country_csv(&payload, path)?;
        eprintln!("Wrote country data to {}", path.display());
    }

    if args.stats {
        for s in stats::summarize(&payload) {
            eprintln!(
                "{} ({})  latest={} first={} change={}%  min={} max={} mean={}",
                s.key,
                s.latest_date.as_deref().unwrap_or("NA"),
                fmt_opt(s.latest),
                fmt_opt(s.first),
                fmt_opt(s.change_pct),
                fmt_opt(s.min),
                fmt_opt(s.max),
                fmt_opt(s.mean)
            );
        }
        let agg = &catalog.lookup(&query.indicator_code)?.agg;
        if let Some(share) = stats::focus_share(&payload, agg) {
            eprintln!(
                "{}: {}% of group total ({})",
                payload.focus_key.as_deref().unwrap_or_default(),
                fmt_opt(Some(share.percent)),
                share.date
            );
        }
    }

    Ok(())
}

fn cmd_indicators(layout: &DataLayout, category: Option<&str>) -> Result<()> {
    let catalog = layout.load_catalog()?;
    let metas = match category {
        Some(name) => match catalog.category(name) {
            Some(m) => m,
            None => {
                let known: Vec<_> = catalog.categories().collect();
                bail!("unknown category '{}' (known: {})", name, known.join(", "));
            }
        },
        None => catalog.iter().collect(),
    };
    for m in metas {
        println!("{:<24} {:<26} {}", m.code, m.agg.to_string(), m.description);
    }
    Ok(())
}

fn cmd_describe(layout: &DataLayout, code: &str) -> Result<()> {
    let catalog = layout.load_catalog()?;
    println!("{}", methodology::describe(code.trim(), &catalog)?);
    Ok(())
}

fn cmd_groups(layout: &DataLayout) -> Result<()> {
    let membership = layout.load_membership()?;
    for g in membership.groups() {
        println!(
            "{:<10} {:>4} members  {}",
            g.id,
            g.members.len(),
            g.name.as_deref().unwrap_or(g.label())
        );
    }
    Ok(())
}
