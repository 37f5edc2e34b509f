//! Feed entries and page cursors.
//!
//! The wire shape for the feed endpoint is a JSON array of adjacently tagged
//! objects: `{"type": "article" | "ad", "content": {...}}`. [`FeedEntry`]
//! maps onto that shape directly, so the client decodes responses without an
//! intermediate DTO layer.

use serde::{Deserialize, Serialize};

use crate::{BiasRating, TruthScore};

/// One entry in the news feed: either an analyzed article or a sponsored ad.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "content", rename_all = "lowercase")]
pub enum FeedEntry {
    Article(Article),
    Ad(Ad),
}

impl FeedEntry {
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::Article(article) => &article.id,
            Self::Ad(ad) => &ad.id,
        }
    }

    #[must_use]
    pub fn as_article(&self) -> Option<&Article> {
        match self {
            Self::Article(article) => Some(article),
            Self::Ad(_) => None,
        }
    }
}

/// An analyzed news article positioned in the causal timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub id: String,
    pub title: String,
    pub summary: String,
    pub content: String,
    #[serde(default)]
    pub image_url: Option<String>,
    pub truth_score: TruthScore,
    pub bias_rating: BiasRating,
    /// Display timestamp; free text ("2 hrs ago") or an RFC 3339 instant.
    pub timestamp: String,
    /// Id of the article this one is presented as a consequence of.
    /// Absent for a root event. Must reference an id appearing earlier in
    /// the feed sequence; dangling references degrade to lane-0 roots when
    /// the causal graph is assembled.
    #[serde(default)]
    pub causal_parent_id: Option<String>,
    /// Visual column for timeline layout. Carries no semantics beyond
    /// indentation depth.
    #[serde(default)]
    pub lane: u8,
}

/// A sponsored entry interleaved into the feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ad {
    pub id: String,
    pub title: String,
    pub body: String,
    pub media_url: String,
    pub target_url: String,
    #[serde(default = "default_sponsor_label")]
    pub sponsor_label: String,
}

fn default_sponsor_label() -> String {
    "Sponsored".to_string()
}

/// One loaded page of the feed with its neighbor cursors.
///
/// An absent `next_key` means the stream is exhausted after this page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedPage {
    pub entries: Vec<FeedEntry>,
    pub prev_key: Option<u32>,
    pub next_key: Option<u32>,
}

impl FeedPage {
    #[must_use]
    pub fn new(entries: Vec<FeedEntry>, prev_key: Option<u32>, next_key: Option<u32>) -> Self {
        Self {
            entries,
            prev_key,
            next_key,
        }
    }

    /// Terminal empty page pointing back at `prev_key`.
    #[must_use]
    pub fn exhausted(prev_key: Option<u32>) -> Self {
        Self {
            entries: Vec::new(),
            prev_key,
            next_key: None,
        }
    }

    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.next_key.is_none()
    }

    /// Resolves the page key to re-fetch after invalidation so the caller
    /// keeps its position: `prev_key + 1` if available, else `next_key - 1`,
    /// else nothing.
    #[must_use]
    pub fn refresh_anchor(&self) -> Option<u32> {
        self.prev_key
            .map(|key| key + 1)
            .or_else(|| self.next_key.map(|key| key.saturating_sub(1)))
    }
}
