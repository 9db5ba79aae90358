use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use gfeed::atom::Entry;
use gfeed::config::Config;
use gfeed::feed::{fetch_feed_with_progress, parse_feed_with_progress, Feed};
use gfeed::parsable::UnknownElementPolicy;
use gfeed::util::format_iso8601;

#[derive(Parser, Debug)]
#[command(name = "gfeed", version, about = "Parse an Atom/GData feed and summarize it")]
struct Args {
    /// Feed file path or http(s) URL
    source: String,

    /// Config file (defaults to ~/.config/gfeed/config.toml)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Keep unrecognized XML instead of failing
    #[arg(long)]
    preserve_unknown: bool,

    /// Print a JSON summary instead of progress lines
    #[arg(long)]
    json: bool,
}

fn is_url(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

fn load_config(args: &Args) -> Result<Config> {
    let mut config = match args.config.clone().or_else(Config::default_path) {
        Some(path) => Config::load(&path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => {
            tracing::debug!("HOME not set, using default configuration");
            Config::default()
        }
    };
    if args.preserve_unknown {
        config.unknown_elements = UnknownElementPolicy::Preserve;
    }
    Ok(config)
}

fn entry_line(entry: &Entry, index: usize, count: u32) -> String {
    format!(
        "{}/{} {} {}",
        index + 1,
        count,
        entry.id().unwrap_or("-"),
        entry.title().unwrap_or("(untitled)")
    )
}

fn summary_json(feed: &Feed<Entry>) -> serde_json::Value {
    let entries: Vec<serde_json::Value> = feed
        .entries()
        .iter()
        .map(|entry| {
            serde_json::json!({
                "id": entry.id(),
                "title": entry.title(),
                "updated": entry.updated().map(|t| format_iso8601(&t)),
                "authors": entry.authors().iter().map(|a| a.name()).collect::<Vec<_>>(),
            })
        })
        .collect();

    serde_json::json!({
        "title": feed.title(),
        "id": feed.id(),
        "updated": format_iso8601(&feed.updated()),
        "etag": feed.etag(),
        "items_per_page": feed.items_per_page(),
        "start_index": feed.start_index(),
        "total_results": feed.total_results(),
        "entries": entries,
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = load_config(&args)?;

    let quiet = args.json;
    let on_entry = |entry: &Entry, index: usize, count: u32| {
        if !quiet {
            println!("{}", entry_line(entry, index, count));
        }
    };

    let feed: Feed<Entry> = if is_url(&args.source) {
        let client = config
            .http_client()
            .context("Failed to build HTTP client")?;
        fetch_feed_with_progress::<Feed<Entry>, _>(
            &client,
            &args.source,
            &config.fetch_options(),
            on_entry,
        )
        .await
        .with_context(|| format!("Failed to fetch feed from {}", args.source))?
    } else {
        let xml = std::fs::read(&args.source)
            .with_context(|| format!("Failed to read feed file: {}", args.source))?;
        parse_feed_with_progress::<Feed<Entry>, _>(xml, config.parse_options(), on_entry)
            .await
            .with_context(|| format!("Failed to parse feed file: {}", args.source))?
    };

    if args.json {
        let summary = serde_json::to_string_pretty(&summary_json(&feed))
            .context("Failed to encode summary")?;
        println!("{summary}");
    } else {
        println!();
        println!("Title:   {}", feed.title());
        println!("Id:      {}", feed.id());
        println!("Updated: {}", format_iso8601(&feed.updated()));
        println!(
            "Results: {} of {} (from {})",
            feed.entries().len(),
            feed.total_results(),
            feed.start_index()
        );
    }

    Ok(())
}
