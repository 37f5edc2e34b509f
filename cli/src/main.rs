//! TruthWeave binary entry point.
//!
//! This is the composition root: the API client and the repository are
//! constructed exactly once here and passed down explicitly; nothing below
//! this file reaches for ambient singletons.
//!
//! ```text
//! truthweave              dump the causal timeline (seeded or remote feed)
//! truthweave ask [--article <id>] <question...>
//!                         ask the oracle, optionally scoped to an article
//! ```

mod config;

use std::env;

use anyhow::{Context, Result, bail};
use tracing_subscriber::EnvFilter;

use truthweave_client::{ApiClient, retry::RetryConfig};
use truthweave_feed::{FeedSource, NewsRepository, RemoteFeedSource, SeededFeedSource};
use truthweave_types::FeedEntry;

use crate::config::AppConfig;

fn init_tracing() {
    let env_filter = EnvFilter::try_from_env("TRUTHWEAVE_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("info"));

    // Logs go to stderr; stdout is reserved for the timeline dump.
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let config = AppConfig::load();
    tracing::debug!(base_url = %config.base_url, seeded = config.seeded, "resolved config");

    let mut client = ApiClient::with_timeout(config.base_url.clone(), config.request_timeout)
        .context("failed to build HTTP client")?;
    if config.retry {
        client = client.with_retry(RetryConfig::default());
    }

    let args: Vec<String> = env::args().skip(1).collect();
    match args.split_first() {
        None => {
            if config.seeded {
                let repo =
                    NewsRepository::with_page_size(client, SeededFeedSource::new(), config.page_size);
                dump_feed(&repo).await
            } else {
                let source = RemoteFeedSource::new(client.clone());
                let repo = NewsRepository::with_page_size(client, source, config.page_size);
                dump_feed(&repo).await
            }
        }
        Some((command, rest)) if command == "ask" => {
            let (article_id, question) = parse_ask_args(rest)?;
            let repo = NewsRepository::new(client, SeededFeedSource::new());
            let answer = repo
                .ask_oracle(article_id.as_deref(), &question)
                .await
                .context("oracle request failed")?;
            println!("{answer}");
            Ok(())
        }
        Some((command, _)) => bail!("unknown command: {command}"),
    }
}

fn parse_ask_args(rest: &[String]) -> Result<(Option<String>, String)> {
    let mut article_id = None;
    let mut words = rest;

    if let Some((flag, tail)) = words.split_first()
        && flag == "--article"
    {
        let Some((id, tail)) = tail.split_first() else {
            bail!("--article requires an id");
        };
        article_id = Some(id.clone());
        words = tail;
    }

    if words.is_empty() {
        bail!("usage: truthweave ask [--article <id>] <question...>");
    }

    Ok((article_id, words.join(" ")))
}

/// Drives the shared stream to exhaustion and prints the causal timeline,
/// one entry per line, indented by lane.
async fn dump_feed<S: FeedSource>(repo: &NewsRepository<S>) -> Result<()> {
    let stream = repo.stream_feed();
    stream.ensure_started().await?;
    while stream.load_next().await? {}

    let snapshot = stream.snapshot();
    let graph = snapshot.causal_graph();

    for entry in snapshot.entries() {
        match entry {
            FeedEntry::Article(article) => {
                // The graph's lane wins: unresolved parents degrade to lane 0.
                let lane = graph
                    .get(&article.id)
                    .map_or(article.lane, |event| event.lane);
                let indent = "    ".repeat(usize::from(lane));
                let link = graph
                    .causes_of(&article.id)
                    .first()
                    .map(|parent| format!("  <- {parent}"))
                    .unwrap_or_default();
                println!(
                    "{indent}[{}] {} ({}){link}",
                    article.truth_score, article.title, article.timestamp
                );
            }
            FeedEntry::Ad(ad) => {
                println!("    ** {} [{}]", ad.title, ad.sponsor_label);
            }
        }
    }

    tracing::info!(
        entries = snapshot.entry_count(),
        pages = snapshot.pages.len(),
        "feed dump complete"
    );
    Ok(())
}
