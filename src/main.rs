mod cli;
mod server;
mod tools;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use resonant::config::ResonantConfig;
use resonant::engine::Engine;
use resonant::ingest::Source;

#[derive(Parser)]
#[command(
    name = "resonant",
    version,
    about = "Frequency-indexed knowledge retrieval engine with an MCP surface"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the MCP server (stdio transport)
    Serve,
    /// Fetch a single URL and add it to the index
    Learn {
        url: String,
        /// Display name for the source (defaults to the URL)
        #[arg(long)]
        name: Option<String>,
        /// Re-fetch and overwrite even if already indexed
        #[arg(long)]
        force: bool,
    },
    /// Batch-ingest sources from the manifest
    Ingest {
        /// Tier name from the manifest
        tier: Option<String>,
        /// Ingest every tier
        #[arg(long, conflicts_with = "tier")]
        all: bool,
        /// List manifest tiers and exit
        #[arg(long)]
        list: bool,
        /// Concurrent fetch workers
        #[arg(long)]
        concurrency: Option<usize>,
        /// Politeness delay per worker, in milliseconds
        #[arg(long)]
        delay_ms: Option<u64>,
        /// Re-fetch sources that are already indexed
        #[arg(long)]
        force: bool,
    },
    /// Rank indexed sources against a text query
    Search {
        query: String,
        #[arg(short = 'n', long)]
        top_n: Option<usize>,
        #[arg(long)]
        min_similarity: Option<f64>,
        /// Print hits as JSON
        #[arg(long)]
        json: bool,
    },
    /// List URLs whose primary frequency falls in a band
    Range {
        min_freq: f64,
        max_freq: f64,
        /// Restrict to one category tag, e.g. `emotion:joy` or `domain:science`
        #[arg(long)]
        category: Option<String>,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Show index totals and cache counters
    Stats,
    /// Answer a question through the source chain
    Ask {
        query: String,
        #[arg(long)]
        json: bool,
    },
    /// Remove a source from the index
    Forget { url: String },
    /// Check database integrity and environment
    Doctor,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load config (for log level)
    let config = ResonantConfig::load()?;

    // Initialize tracing with the configured log level.
    // Log to stderr so stdout stays clean for MCP JSON-RPC.
    let filter = EnvFilter::try_new(&config.server.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Serve => {
            server::serve_stdio(config).await?;
        }
        Command::Doctor => {
            cli::doctor::doctor(&config)?;
        }
        command => {
            let engine = Engine::open(config)?;
            run(&engine, command).await?;
            engine.close().await?;
        }
    }

    Ok(())
}

async fn run(engine: &Engine, command: Command) -> Result<()> {
    let retrieval = engine.config().retrieval.clone();
    match command {
        Command::Learn { url, name, force } => {
            let name = name.unwrap_or_else(|| url.clone());
            cli::ingest::learn(engine, Source::new(url, name), force).await
        }
        Command::Ingest {
            tier,
            all,
            list,
            concurrency,
            delay_ms,
            force,
        } => {
            let args = cli::ingest::IngestArgs {
                tier,
                all,
                list,
                concurrency,
                delay_ms,
                force,
            };
            cli::ingest::ingest(engine, args).await
        }
        Command::Search {
            query,
            top_n,
            min_similarity,
            json,
        } => {
            cli::search::search(
                engine,
                &query,
                top_n.unwrap_or(retrieval.default_top_n),
                min_similarity.unwrap_or(retrieval.default_min_similarity),
                json,
            )
            .await
        }
        Command::Range {
            min_freq,
            max_freq,
            category,
            limit,
        } => cli::search::range(engine, min_freq, max_freq, category.as_deref(), limit).await,
        Command::Stats => cli::stats::stats(engine).await,
        Command::Ask { query, json } => cli::ask::ask(engine, &query, json).await,
        Command::Forget { url } => cli::forget::forget(engine, &url).await,
        Command::Serve | Command::Doctor => Ok(()),
    }
}
