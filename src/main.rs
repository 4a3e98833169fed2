//! # Canes News
//!
//! A batch pipeline that scrapes the Carolina Hurricanes news section,
//! normalizes every article into a structured record with an LLM (falling
//! back to a deterministic local record whenever the model fails), and
//! upserts the records into a Supabase `articles` table for the dashboard.
//!
//! ## Usage
//!
//! ```sh
//! canes_news run                 # collect → structure → load
//! canes_news collect             # writes data/raw_blob.txt
//! canes_news structure           # writes data/structured.json
//! canes_news load [--dry-run]    # upserts structured.json
//! canes_news recent --limit 10   # newest stored articles
//! ```
//!
//! ## Architecture
//!
//! The stages hand off through files in the data directory:
//! 1. **Discovery**: walk the paginated news index for article URLs
//! 2. **Extraction**: fetch each article and pull out title, byline, date and body
//! 3. **Corpus**: write every article into one delimited `raw_blob.txt`
//! 4. **Structuring**: one model call per document, merged over a local fallback,
//!    written to `structured.json`
//! 5. **Load**: stamp `updated_at` and upsert keyed on `id`

use clap::Parser;
use std::error::Error;
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod api;
mod cli;
mod config;
mod corpus;
mod dashboard;
mod errors;
mod http;
mod models;
mod outputs;
mod scrapers;
mod store;
mod structure;
mod utils;

use api::{ChatClient, RetryAsk, Unconfigured};
use cli::{Cli, Command};
use config::{Config, load_config};
use http::Fetcher;
use store::{ArticleStore, MemoryStore, SupabaseStore, persist};
use utils::ensure_writable_dir;

/// Scrape the news section into the raw corpus blob. Returns the article count.
#[instrument(level = "info", skip_all)]
async fn collect(config: &Config) -> Result<usize, Box<dyn Error>> {
    ensure_writable_dir(&config.data_dir).await?;
    let fetcher = Fetcher::new(&config.http)?;

    let links = match scrapers::links::discover(
        &fetcher,
        &config.site,
        config.discovery.max_pages,
        config.discovery.max_links,
    )
    .await
    {
        Ok(links) => links,
        Err(e) => {
            error!(error = %e, index_url = %config.site.index_url, "Link discovery failed");
            return Err(e.into());
        }
    };
    debug!(links = ?links, "Article links");

    let articles = scrapers::fetch_articles(&fetcher, &links, config.concurrency).await;
    let path = outputs::raw_blob_path(&config.data_dir);
    if let Err(e) = outputs::raw::write_blob(&articles, &path).await {
        error!(path = %path.display(), error = %e, "Failed to write raw corpus");
        return Err(e);
    }
    Ok(articles.len())
}

/// Structure the raw corpus blob into the structured record file. Returns the record count.
#[instrument(level = "info", skip_all)]
async fn structure_stage(config: &Config, api_key: Option<&str>) -> Result<usize, Box<dyn Error>> {
    let raw_path = outputs::raw_blob_path(&config.data_dir);
    let blob = match outputs::raw::read_blob(&raw_path).await {
        Ok(blob) => blob,
        Err(e) => {
            error!(path = %raw_path.display(), error = %e, "No raw corpus found; run `collect` first");
            return Err(e);
        }
    };

    let records = match api_key.filter(|k| !k.is_empty()) {
        Some(key) => {
            info!(model = %config.model.model, base_url = %config.model.base_url, "Structuring with model");
            let client = ChatClient::new(&config.model, key.to_string())?;
            let api = RetryAsk::new(
                client,
                config.model.max_retries,
                std::time::Duration::from_secs(1),
            );
            structure::structure(&api, &blob, config.concurrency).await
        }
        None => {
            warn!("OPENAI_API_KEY not set; every record will use the local fallback");
            structure::structure(&Unconfigured, &blob, config.concurrency).await
        }
    };

    let path = outputs::structured_path(&config.data_dir);
    outputs::json::write_records(&records, &path).await?;
    Ok(records.len())
}

/// Upsert the structured record file. Returns the number of rows written.
#[instrument(level = "info", skip_all, fields(dry_run = dry_run))]
async fn load(config: &Config, args: &Cli, dry_run: bool) -> Result<usize, Box<dyn Error>> {
    let path = outputs::structured_path(&config.data_dir);
    let records = outputs::json::read_records(&path).await?;

    let written = if dry_run {
        let store = MemoryStore::new();
        let written = persist(&store, &records).await?;
        info!(rows = store.len().await, "Dry run; nothing sent to Supabase");
        written
    } else {
        let store = SupabaseStore::new(
            args.supabase_url.as_deref(),
            args.supabase_key.as_deref(),
            &config.store.table,
        )?;
        match persist(&store, &records).await {
            Ok(written) => written,
            Err(e) => {
                error!(error = %e, table = %config.store.table, "Upsert failed");
                return Err(e.into());
            }
        }
    };
    Ok(written)
}

/// Print the newest stored articles, hiding smoke-test rows.
#[instrument(level = "info", skip_all, fields(limit = limit))]
async fn recent(config: &Config, args: &Cli, limit: usize) -> Result<(), Box<dyn Error>> {
    let store = SupabaseStore::new(
        args.supabase_url.as_deref(),
        args.supabase_key.as_deref(),
        &config.store.table,
    )?;
    let rows = dashboard::visible_rows(store.recent(limit).await?);
    if rows.is_empty() {
        println!("No data yet. Run collect → structure → load.");
    } else {
        print!("{}", dashboard::render_rows(&rows));
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("canes_news starting up");

    let args = Cli::parse();
    debug!(?args.command, ?args.data_dir, "Parsed CLI arguments");

    let mut config = load_config(args.config.as_deref())?;
    args.apply(&mut config);
    debug!(?config, "Effective configuration");

    match &args.command {
        Command::Collect(_) => {
            let count = collect(&config).await?;
            info!(count, "Collect complete");
        }
        Command::Structure => {
            let count = structure_stage(&config, args.openai_api_key.as_deref()).await?;
            info!(count, "Structure complete");
        }
        Command::Load(load_args) => {
            let written = load(&config, &args, load_args.dry_run).await?;
            info!(written, "Load complete");
        }
        Command::Run(run_args) => {
            let collected = collect(&config).await?;
            let structured = structure_stage(&config, args.openai_api_key.as_deref()).await?;
            let written = load(&config, &args, run_args.load.dry_run).await?;
            info!(collected, structured, written, "Pipeline complete");
        }
        Command::Recent { limit } => {
            recent(&config, &args, *limit).await?;
        }
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );
    Ok(())
}
