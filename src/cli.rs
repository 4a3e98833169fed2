//! Command-line interface definitions.
//!
//! Each pipeline stage is a subcommand so stages can run separately (e.g.
//! structure on one machine, load on another) or all together with `run`.
//! Credentials are only ever read from flags or environment variables.

use crate::config::Config;
use clap::{Args, Parser, Subcommand};

/// Command-line arguments for the Hurricanes news pipeline.
///
/// # Examples
///
/// ```sh
/// # Whole pipeline, writing intermediates to ./data
/// canes_news run
///
/// # Only scrape, with a bigger crawl
/// canes_news collect --max-pages 8 --max-links 40
///
/// # Load without touching Supabase
/// canes_news load --dry-run
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Optional path to config.yaml file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Directory for raw_blob.txt and structured.json
    #[arg(short, long, global = true)]
    pub data_dir: Option<String>,

    /// Maximum in-flight article fetches / model calls
    #[arg(long, global = true)]
    pub concurrency: Option<usize>,

    /// Supabase project URL
    #[arg(long, env = "SUPABASE_URL", global = true)]
    pub supabase_url: Option<String>,

    /// Supabase API key
    #[arg(long, env = "SUPABASE_ANON_KEY", global = true, hide_env_values = true)]
    pub supabase_key: Option<String>,

    /// OpenAI-compatible API base URL
    #[arg(long, env = "OPENAI_BASE_URL", global = true)]
    pub openai_base_url: Option<String>,

    /// OpenAI API key; without it every record uses the local fallback
    #[arg(long, env = "OPENAI_API_KEY", global = true, hide_env_values = true)]
    pub openai_api_key: Option<String>,

    /// Model or deployment name
    #[arg(long, env = "OPENAI_DEPLOYMENT", global = true)]
    pub model: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Discover and scrape articles into raw_blob.txt
    Collect(CrawlArgs),
    /// Turn raw_blob.txt into structured.json
    Structure,
    /// Upsert structured.json into the articles table
    Load(LoadArgs),
    /// collect, structure and load in one go
    Run(RunArgs),
    /// Print the newest stored articles
    Recent {
        /// Number of rows to show
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },
}

#[derive(Args, Debug, Default)]
pub struct CrawlArgs {
    /// Number of index pages to walk
    #[arg(long)]
    pub max_pages: Option<usize>,

    /// Stop after this many article links
    #[arg(long)]
    pub max_links: Option<usize>,
}

#[derive(Args, Debug, Default)]
pub struct LoadArgs {
    /// Upsert into an in-memory table instead of Supabase
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Args, Debug, Default)]
pub struct RunArgs {
    #[command(flatten)]
    pub crawl: CrawlArgs,

    #[command(flatten)]
    pub load: LoadArgs,
}

impl Cli {
    /// Layer flag and environment values over the file/default configuration.
    pub fn apply(&self, config: &mut Config) {
        if let Some(dir) = &self.data_dir {
            config.data_dir = dir.clone();
        }
        if let Some(n) = self.concurrency {
            config.concurrency = n.max(1);
        }
        if let Some(url) = self.openai_base_url.as_ref().filter(|u| !u.is_empty()) {
            config.model.base_url = url.clone();
        }
        if let Some(model) = self.model.as_ref().filter(|m| !m.is_empty()) {
            config.model.model = model.clone();
        }
        let crawl = match &self.command {
            Command::Collect(c) => Some(c),
            Command::Run(r) => Some(&r.crawl),
            _ => None,
        };
        if let Some(crawl) = crawl {
            if let Some(p) = crawl.max_pages {
                config.discovery.max_pages = p;
            }
            if let Some(l) = crawl.max_links {
                config.discovery.max_links = l;
            }
        }
    }
}
