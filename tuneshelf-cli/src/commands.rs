//! CLI command implementations

use std::time::Duration;

use anyhow::Context;
use clap::Subcommand;
use serde_json::json;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::Instant;
use tuneshelf_core::{
    FetchService, HttpResponse, MediaType, ScriptedResponse, SimulatedTransport, TuneshelfConfig,
};
use tuneshelf_search::{
    CombinedSearchState, JoinFailure, SearchEndpoint, SearchOrchestrator, SearchPhase,
    SectionAggregator, SectionState,
};

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Load the home sections and print what would be shown
    Sections {
        /// Only show the section with this key
        #[arg(long)]
        key: Option<String>,
    },
    /// Search movies and podcasts
    ///
    /// Without queries, reads one query per line from stdin, the way a
    /// search field delivers keystrokes.
    Search {
        /// Queries submitted in order
        queries: Vec<String>,
        /// Pause between submitted queries, in milliseconds
        #[arg(long, default_value = "0")]
        interval_ms: u64,
        /// Print only this media type's results
        #[arg(long, value_enum)]
        only: Option<MediaType>,
    },
}

/// Handle the CLI command
///
/// # Errors
/// Returns the first failure that prevents the command from running
pub async fn handle_command(
    command: Commands,
    config: TuneshelfConfig,
    demo: bool,
) -> anyhow::Result<()> {
    let fetch = build_fetch_service(&config, demo)?;

    match command {
        Commands::Sections { key } => show_sections(fetch, &config, key).await,
        Commands::Search {
            queries,
            interval_ms,
            only,
        } => {
            let shown = match only {
                Some(media) => vec![media],
                None => vec![MediaType::Movie, MediaType::Podcast],
            };
            let interval = Duration::from_millis(interval_ms);
            run_search(fetch, &config, queries, interval, &shown).await
        }
    }
}

fn build_fetch_service(config: &TuneshelfConfig, demo: bool) -> anyhow::Result<FetchService> {
    if demo {
        tracing::info!("Using generated demo results");
        return Ok(FetchService::new(std::sync::Arc::new(demo_transport())));
    }

    FetchService::production(&config.endpoint).context("Failed to create HTTP transport")
}

/// Load every configured section and print its visible items
///
/// # Errors
/// - `anyhow::Error` - Requested section key does not exist
pub async fn show_sections(
    fetch: FetchService,
    config: &TuneshelfConfig,
    key: Option<String>,
) -> anyhow::Result<()> {
    let endpoint = SearchEndpoint::from_config(&config.endpoint);
    let (aggregator, load) =
        SectionAggregator::launch(fetch, endpoint, config.sections.categories.clone());

    let selected = match key {
        Some(key) => {
            let channel = aggregator
                .section_channel(&key)
                .with_context(|| format!("Unknown section '{key}'"))?;
            load.wait().await;
            channel.latest().into_iter().collect()
        }
        None => {
            load.wait().await;
            aggregator.snapshot()
        }
    };

    for section in &selected {
        print_section(section);
    }

    Ok(())
}

fn print_section(section: &SectionState) {
    let category = &section.category;
    println!("== {} ({})", category.title, category.key);
    if !category.subtitle.is_empty() {
        println!("   {}", category.subtitle);
    }

    if let Some(error) = &section.last_error {
        println!("   Failed to load: {error}");
    }

    let mut shown = 0;
    for item in section.visible_items() {
        shown += 1;
        println!(
            "   {shown}. {} - {}",
            item.title.as_deref().unwrap_or_default(),
            item.subtitle.as_deref().unwrap_or_default()
        );
    }

    if shown == 0 && section.last_error.is_none() {
        println!("   Nothing to show");
    }
    println!();
}

/// Feed queries to a search orchestrator and print every published outcome
///
/// # Errors
/// - `anyhow::Error` - Reading stdin failed or the orchestrator stopped early
pub async fn run_search(
    fetch: FetchService,
    config: &TuneshelfConfig,
    queries: Vec<String>,
    interval: Duration,
    shown: &[MediaType],
) -> anyhow::Result<()> {
    let endpoint = SearchEndpoint::from_config(&config.endpoint);
    let search = SearchOrchestrator::from_config(fetch, endpoint, &config.search);
    let limit = config.search.display_limit;

    let mut combined = search.combined_channel().observe();
    let mut failures = search.failure_channel().observe();
    let mut feeding = tokio::spawn(feed_queries(search.clone(), queries, interval));
    let mut tick = tokio::time::interval(Duration::from_millis(50));
    let mut quiet_after: Option<Instant> = None;

    loop {
        tokio::select! {
            result = &mut feeding, if quiet_after.is_none() => {
                result.context("Query input task panicked")??;
                quiet_after = Some(Instant::now() + search.debounce() * 2);
            }
            Some(state) = combined.next_value() => print_combined(&state, shown, limit),
            Some(failure) = failures.next_value() => print_failure(&failure),
            _ = tick.tick() => {
                if quiet_after.is_some_and(|at| Instant::now() >= at) && is_at_rest(&search) {
                    break;
                }
            }
        }
    }

    while let Some(state) = combined.try_next() {
        print_combined(&state, shown, limit);
    }
    while let Some(failure) = failures.try_next() {
        print_failure(&failure);
    }

    search.shutdown().await?;
    Ok(())
}

async fn feed_queries(
    search: SearchOrchestrator,
    queries: Vec<String>,
    interval: Duration,
) -> anyhow::Result<()> {
    if !queries.is_empty() {
        for query in queries {
            search.submit(query)?;
            tokio::time::sleep(interval).await;
        }
        return Ok(());
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines
        .next_line()
        .await
        .context("Failed to read query from stdin")?
    {
        search.submit(line)?;
    }
    Ok(())
}

fn is_at_rest(search: &SearchOrchestrator) -> bool {
    search.phase_channel().latest().is_none_or(|update| {
        matches!(
            update.phase,
            SearchPhase::Idle | SearchPhase::Settled | SearchPhase::Failed
        )
    })
}

fn print_combined(state: &CombinedSearchState, shown: &[MediaType], limit: usize) {
    println!(
        "Results for '{}' (generation {})",
        state.query, state.generation
    );

    if state.is_empty {
        println!("   No results");
        println!();
        return;
    }

    for &media in shown {
        println!("  {}", media.title());
        for (index, item) in state.visible(media, limit).enumerate() {
            println!(
                "   {}. {} - {}",
                index + 1,
                item.title.as_deref().unwrap_or_default(),
                item.subtitle.as_deref().unwrap_or_default()
            );
        }
    }
    println!();
}

fn print_failure(failure: &JoinFailure) {
    println!("Search failed: {failure}");
    println!();
}

/// Transport answering every search URL with generated items.
///
/// Terms containing "offline" fail at the transport level.
fn demo_transport() -> SimulatedTransport {
    SimulatedTransport::new()
        .with_latency(Duration::from_millis(120))
        .with_fallback(|url| {
            let param = |name: &str| {
                url.query_pairs()
                    .find(|(key, _)| key == name)
                    .map(|(_, value)| value.into_owned())
                    .unwrap_or_default()
            };
            let term = param("term");
            let media = param("media");

            if term.contains("offline") {
                return ScriptedResponse::transport_failure("demo service offline");
            }
            ScriptedResponse::ok(HttpResponse::json(&demo_payload(&term, &media)))
        })
}

fn demo_payload(term: &str, media: &str) -> serde_json::Value {
    let results: Vec<_> = (1..=6)
        .map(|i| {
            json!({
                "trackName": format!("{term} {media} #{i}"),
                "artistName": format!("Demo artist {i}"),
                "artworkUrl100": format!("https://demo.tuneshelf.invalid/{media}/{i}/100.jpg"),
                "collectionName": format!("{term} collection"),
                "kind": media,
            })
        })
        .collect();

    json!({ "results": results })
}
