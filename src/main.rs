//! Falcony terminal results page
//!
//! Runs a text or image search through the orchestrator and prints what the
//! results page would show.

use anyhow::Result;
use clap::{Parser, Subcommand};
use falcony::{
    config,
    metrics::FetchKind,
    query::QueryParams,
    results::ResultsFormatter,
    search::{DisplayState, EffectOutcome, FetchStatus, Orchestrator, SearchQuery, UploadedFile},
    HttpClient, Settings,
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "falcony", version, about = "Search the Falcony engine from the terminal")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Print fetch statistics after the results
    #[arg(long, global = true)]
    stats: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Full-text search
    Search {
        /// Query words
        #[arg(required = true)]
        query: Vec<String>,
        /// Page number
        #[arg(short, long, default_value_t = 1)]
        page: u32,
    },
    /// Open a results page URL (`...?query=<text>&page=<n>`)
    Open { url: String },
    /// Search for images similar to a local file
    Image { path: PathBuf },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    info!("Starting Falcony v{}", falcony::VERSION);

    // Load configuration
    let settings = config::load(cli.config.as_deref())?;
    if settings.general.debug {
        info!("Debug mode enabled");
    }

    // Initialize HTTP client
    let client = HttpClient::with_settings(&settings.backend)?;
    info!("Search API at {}", client.base_url());

    let orchestrator = Orchestrator::new(Arc::new(client), &settings.search);

    let handle = match cli.command {
        Command::Search { query, page } => {
            orchestrator.navigate(SearchQuery::simple(query.join(" ")).with_page(page))
        }
        Command::Open { url } => {
            let params = QueryParams::from_url(&url)?;
            if let Some(status) = params.status.clone() {
                orchestrator.set_status(status);
            }
            orchestrator.navigate(params.to_search_query())
        }
        Command::Image { path } => orchestrator.set_file(Some(UploadedFile::from_path(&path)?)),
    };

    if !settle(handle).await? {
        println!("Nothing to search for.");
        return Ok(());
    }

    render(&settings, &orchestrator.state());

    if cli.stats {
        print_stats(&orchestrator);
    }

    Ok(())
}

/// Wait for a spawned fetch; `false` when nothing was triggered
async fn settle(handle: Option<JoinHandle<EffectOutcome>>) -> Result<bool> {
    match handle {
        Some(handle) => {
            let outcome = handle.await?;
            info!("Fetch finished: {:?}", outcome);
            Ok(outcome != EffectOutcome::Skipped)
        }
        None => Ok(false),
    }
}

fn render(settings: &Settings, state: &DisplayState) {
    println!("{}", settings.general.instance_name);
    if let Some(ref query) = state.query.query {
        println!("Search: {}", query);
    }
    if let Some(ref file) = state.file_name {
        println!("Image: {}", file);
    }
    println!();

    if let FetchStatus::Failed(ref err) = state.fetch_status() {
        println!("Search failed: {}", err);
        println!();
    }

    let formatter = ResultsFormatter::new(settings.ui.snippet_length);
    if let Some(view) = state.results_view(&formatter) {
        println!("{}", view.summary);
        println!();
        for item in &view.items {
            println!("{:>3}. {}", item.key + 1, item.title);
            if let Some(ref url) = item.url {
                println!("     {}", url);
            }
            if let Some(ref snippet) = item.snippet {
                println!("     {}", snippet);
            }
            println!();
        }
    }

    if let Some(view) = state.image_view() {
        println!("{} images in {} seconds", view.images.len(), state.elapsed);
        println!();
        for image in &view.images {
            println!("{:>3}. {}", image.key + 1, image.image_url);
            if let Some(ref page) = image.page_url {
                println!("     from {}", page);
            }
        }
        println!();
    }

    let pagination = state.pagination();
    if pagination.total_pages > 0 {
        let pages = pagination
            .pages
            .iter()
            .map(|p| {
                if *p == pagination.page {
                    format!("[{}]", p)
                } else {
                    p.to_string()
                }
            })
            .collect::<Vec<_>>()
            .join(" ");
        println!(
            "{}{}{}",
            if pagination.has_prev { "< " } else { "" },
            pages,
            if pagination.has_next { " >" } else { "" }
        );
    }
}

fn print_stats(orchestrator: &Orchestrator) {
    println!();
    for kind in [FetchKind::Text, FetchKind::Image] {
        let stats = orchestrator.metrics().stats(kind);
        println!(
            "{:<6} issued={} ok={} failed={} stale={} avg={} reliability={:.0}%",
            kind.to_string(),
            stats.issued,
            stats.succeeded,
            stats.failed,
            stats.stale,
            stats
                .avg_response_time
                .map(|ms| format!("{}ms", ms))
                .unwrap_or_else(|| "-".to_string()),
            stats.reliability()
        );
    }
}
