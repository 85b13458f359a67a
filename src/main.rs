//! # Docs Harness CLI (`dh`)
//!
//! ## Usage
//!
//! ```bash
//! dh --config ./config/dh.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `dh sync` | Scan the corpora, ingest them and print counts |
//! | `dh search "<query>"` | Rank passages and report confidence |
//! | `dh chunks <file>` | Show identity, title and chunks of one file |
//! | `dh tokenize "<query>"` | Show the terms and phrases of a query |
//!
//! ## Examples
//!
//! ```bash
//! # Ingest only the knowledge base, then re-ingest to confirm nothing changes
//! dh sync --corpus kb --verify
//!
//! # Search with score breakdowns
//! dh search '"rate limit" errors' --explain
//!
//! # Machine-readable output
//! dh search "webhook retries" --limit 3 --json
//! ```

use clap::{Parser, Subcommand};
use docs_harness::{chunks, config, ingest, logging, search};
use docs_harness_core::models::Corpus;
use std::path::PathBuf;

/// Docs Harness CLI: lexical retrieval over a routed docs site and a
/// knowledge base.
#[derive(Parser)]
#[command(
    name = "dh",
    about = "Docs Harness: lexical retrieval over routed docs and a knowledge base",
    version,
    long_about = "Docs Harness ingests a routed documentation tree (one page.mdx per route) and a \
    path-addressed knowledge base, splits them into heading-bounded passages, ranks passages with a \
    deterministic lexical scorer, and classifies how confident the top results are."
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/dh.toml")]
    config: PathBuf,

    /// Log at debug level (overridden by RUST_LOG).
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Scan and ingest the configured corpora.
    ///
    /// Every file is resolved, normalized and chunked; per-file failures
    /// are reported and counted without stopping the run.
    Sync {
        /// Only sync this corpus (`docs` or `kb`).
        #[arg(long)]
        corpus: Option<Corpus>,

        /// Dry run: count documents and chunks without writing to the index.
        #[arg(long)]
        dry_run: bool,

        /// Re-ingest after the first pass and fail unless every document is unchanged.
        #[arg(long)]
        verify: bool,
    },

    /// Rank passages for a query and report answer confidence.
    Search {
        /// The query. Double-quoted spans are matched as phrases.
        query: String,

        /// Maximum number of results (defaults to `retrieval.top_k`).
        #[arg(long)]
        limit: Option<usize>,

        /// Only search this corpus (`docs` or `kb`).
        #[arg(long)]
        corpus: Option<Corpus>,

        /// Include per-factor score breakdowns.
        #[arg(long)]
        explain: bool,

        /// Print JSON instead of text.
        #[arg(long)]
        json: bool,
    },

    /// Show how one file is identified and chunked.
    Chunks {
        /// File to inspect.
        file: PathBuf,

        /// Corpus policy to apply; inferred from the configured roots if omitted.
        #[arg(long)]
        corpus: Option<Corpus>,
    },

    /// Show the terms and phrases a query tokenizes to.
    Tokenize {
        query: String,

        /// Print JSON instead of text.
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    // Commands that don't require config
    if let Commands::Tokenize { query, json } = &cli.command {
        return search::run_tokenize(query, *json);
    }

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Sync {
            corpus,
            dry_run,
            verify,
        } => {
            ingest::run_sync(&cfg, corpus, dry_run, verify).await?;
        }
        Commands::Search {
            query,
            limit,
            corpus,
            explain,
            json,
        } => {
            search::run_search(&cfg, &query, limit, corpus, explain, json).await?;
        }
        Commands::Chunks { file, corpus } => {
            chunks::run_chunks(&cfg, &file, corpus)?;
        }
        Commands::Tokenize { .. } => unreachable!("handled before config loading"),
    }

    Ok(())
}
