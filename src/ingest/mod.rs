// src/ingest/mod.rs
pub mod extract;
pub mod fetch;
pub mod normalize;
pub mod segment;
pub mod types;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use metrics::{counter, describe_counter, describe_histogram, histogram};
use once_cell::sync::OnceCell;
use serde::Serialize;

use crate::ingest::fetch::FetchError;
use crate::ingest::normalize::normalize_item;
use crate::ingest::segment::segment;
use crate::ingest::types::{Article, FeedFetcher};
use crate::sources::Source;

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("feed_articles_total", "Articles extracted from feeds.");
        describe_counter!(
            "feed_fetch_errors_total",
            "Sources whose fetch failed (bad url, status, transport)."
        );
        describe_counter!(
            "feed_sources_empty_total",
            "Sources fetched successfully but yielding no usable item."
        );
        describe_histogram!(
            "feed_aggregate_ms",
            "Wall time of one aggregation pass in milliseconds."
        );
    });
}

/// Why a single source contributed nothing to an aggregation pass.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("no item with both title and link")]
    NoArticles,
}

/// Result of one aggregation pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Aggregation {
    pub articles: Vec<Article>,
    /// Sources were configured but not a single article came out of them.
    pub degraded: bool,
}

/// Segment a fetched document and keep every fragment that normalizes.
pub fn parse_feed(doc: &str, source: &Source, now: DateTime<Utc>) -> Vec<Article> {
    segment(doc)
        .filter_map(|frag| normalize_item(frag.body, source, now))
        .collect()
}

/// Fetch → segment → normalize for one source.
pub async fn collect_source(
    source: &Source,
    fetcher: &dyn FeedFetcher,
    now: DateTime<Utc>,
) -> Result<Vec<Article>, SourceError> {
    let doc = fetcher.fetch(&source.url).await?;
    let articles = parse_feed(&doc, source, now);
    if articles.is_empty() {
        return Err(SourceError::NoArticles);
    }
    Ok(articles)
}

/// Newest first. Stable, so equal dates keep source order.
pub fn sort_newest_first(articles: &mut [Article]) {
    articles.sort_by(|a, b| b.date.cmp(&a.date));
}

/// Run every source concurrently, wait for all of them, merge and sort.
///
/// A failing source is logged and skipped; it never aborts the pass.
pub async fn aggregate(sources: &[Source], fetcher: &dyn FeedFetcher) -> Aggregation {
    ensure_metrics_described();
    let t0 = std::time::Instant::now();
    let now = Utc::now();

    let outcomes = join_all(
        sources
            .iter()
            .map(|source| async move { (source, collect_source(source, fetcher, now).await) }),
    )
    .await;

    let mut articles = Vec::new();
    for (source, outcome) in outcomes {
        match outcome {
            Ok(mut found) => {
                tracing::debug!(
                    target: "ingest",
                    source = %source.name,
                    count = found.len(),
                    "feed parsed"
                );
                counter!("feed_articles_total").increment(found.len() as u64);
                articles.append(&mut found);
            }
            Err(SourceError::NoArticles) => {
                tracing::warn!(
                    target: "ingest",
                    source = %source.name,
                    url = %source.url,
                    "feed yielded no usable items"
                );
                counter!("feed_sources_empty_total").increment(1);
            }
            Err(e) => {
                tracing::warn!(
                    target: "ingest",
                    source = %source.name,
                    url = %source.url,
                    error = %e,
                    "feed source failed"
                );
                counter!("feed_fetch_errors_total").increment(1);
            }
        }
    }

    sort_newest_first(&mut articles);

    let degraded = !sources.is_empty() && articles.is_empty();
    if degraded {
        tracing::warn!(
            target: "ingest",
            sources = sources.len(),
            "no articles extracted from any source; check the feed formats"
        );
    }

    histogram!("feed_aggregate_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);

    Aggregation { articles, degraded }
}
