//! In-memory demo dataset behind the pagination contract.
//!
//! Stands in for the backend during development so the causal timeline can
//! be exercised without a server. Swapping in [`crate::RemoteFeedSource`]
//! at the composition root is the only change needed for production.

use truthweave_types::{Article, BiasRating, FeedEntry, FeedPage, TruthScore};

use crate::source::{FeedSource, PageLoadError};

/// Number of entries in the seeded dataset.
pub const SEED_ENTRY_COUNT: usize = 5;

/// Serves a fixed causal-chain dataset: two root events and three children
/// at varying causal depth, all on page 1. Every later page is empty and
/// terminal, so the stream ends after one load.
#[derive(Debug, Clone, Copy, Default)]
pub struct SeededFeedSource;

impl SeededFeedSource {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// The seed entries. Parent references always point at an earlier id in
    /// this list; tests rely on that invariant.
    #[must_use]
    pub fn seed_entries() -> Vec<FeedEntry> {
        vec![
            article(
                "root_1",
                "Federal Reserve Announces 0.50% Rate Hike",
                "In a bold move to combat inflation, the Fed has raised interest rates, \
                 signaling a hawkish stance that reverberates through global markets.",
                0.98,
                BiasRating::Center,
                "2 hrs ago",
                None,
                0,
            ),
            article(
                "child_1",
                "Tech Sector Sell-Off: NASDAQ Drops 3.5%",
                "High-growth tech stocks are hammered as borrowing costs rise. The direct \
                 consequence of the Fed's decision is immediate market volatility.",
                0.92,
                BiasRating::MarketData,
                "1 hr ago",
                Some("root_1"),
                1,
            ),
            article(
                "child_2",
                "Crypto Winter Deepens: Bitcoin Below $30k",
                "Risk assets follow tech stocks downward. Institutional liquidity dries up \
                 as yields become attractive elsewhere.",
                0.85,
                BiasRating::Speculative,
                "45 mins ago",
                Some("root_1"),
                1,
            ),
            article(
                "root_2",
                "Global Supply Chain 'Healing' Faster Than Expected",
                "Shipping container rates have normalized to pre-pandemic levels, suggesting \
                 inflationary pressures from logistics are easing.",
                0.95,
                BiasRating::Center,
                "3 hrs ago",
                None,
                0,
            ),
            article(
                "child_3",
                "Retailers Slash Prices on Electronics",
                "Overstocked inventories and cheaper shipping lead to massive discounts. A \
                 direct downstream effect of the supply chain normalization.",
                0.89,
                BiasRating::Consumer,
                "30 mins ago",
                Some("root_2"),
                1,
            ),
        ]
    }
}

impl FeedSource for SeededFeedSource {
    async fn load(&self, key: Option<u32>, _limit: u32) -> Result<FeedPage, PageLoadError> {
        let page = key.unwrap_or(1);
        if page > 1 {
            // Dataset already served; point back at the only real page.
            return Ok(FeedPage::exhausted(Some(1)));
        }
        Ok(FeedPage::new(Self::seed_entries(), None, None))
    }
}

#[allow(clippy::too_many_arguments)]
fn article(
    id: &str,
    title: &str,
    summary: &str,
    truth_score: f64,
    bias_rating: BiasRating,
    timestamp: &str,
    causal_parent_id: Option<&str>,
    lane: u8,
) -> FeedEntry {
    FeedEntry::Article(Article {
        id: id.to_string(),
        title: title.to_string(),
        summary: summary.to_string(),
        content: "Full content...".to_string(),
        image_url: None,
        truth_score: TruthScore::clamped(truth_score),
        bias_rating,
        timestamp: timestamp.to_string(),
        causal_parent_id: causal_parent_id.map(ToString::to_string),
        lane,
    })
}
