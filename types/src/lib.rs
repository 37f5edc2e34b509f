//! Core domain types for TruthWeave.
//!
//! This crate contains pure domain types with no IO and no async: the feed
//! entry sum type and its wire shape, page cursors, and the unified causal
//! graph. Everything here can be used from any layer of the application.

mod feed;
mod graph;

pub use feed::{Ad, Article, FeedEntry, FeedPage};
pub use graph::{CausalEvent, CausalGraph};

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// ============================================================================
// TruthScore
// ============================================================================

/// A verification confidence rating in `0.0..=1.0`, assigned by the backend.
///
/// Construction is validated; out-of-range and non-finite values are
/// rejected, so any `TruthScore` in the program is known to be in range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct TruthScore(f64);

#[derive(Debug, Error)]
#[error("truth score must be within 0.0..=1.0, got {0}")]
pub struct TruthScoreError(pub f64);

impl TruthScore {
    pub fn new(value: f64) -> Result<Self, TruthScoreError> {
        if (0.0..=1.0).contains(&value) {
            Ok(Self(value))
        } else {
            Err(TruthScoreError(value))
        }
    }

    /// Clamps the value into range instead of failing.
    ///
    /// Useful for trusted in-process data; backend responses should go
    /// through the validated [`TruthScore::new`] path instead.
    #[must_use]
    pub fn clamped(value: f64) -> Self {
        if value.is_nan() {
            return Self(0.0);
        }
        Self(value.clamp(0.0, 1.0))
    }

    #[must_use]
    pub fn value(self) -> f64 {
        self.0
    }
}

impl TryFrom<f64> for TruthScore {
    type Error = TruthScoreError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<TruthScore> for f64 {
    fn from(score: TruthScore) -> Self {
        score.0
    }
}

impl fmt::Display for TruthScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

// ============================================================================
// BiasRating
// ============================================================================

/// Categorical bias label attached to an article by the backend.
///
/// The label set is open-ended on the wire; labels outside the known set are
/// preserved verbatim in [`BiasRating::Other`] rather than rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum BiasRating {
    Center,
    Left,
    Right,
    MarketData,
    Speculative,
    Consumer,
    Other(String),
}

impl BiasRating {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Center => "Center",
            Self::Left => "Left",
            Self::Right => "Right",
            Self::MarketData => "Market Data",
            Self::Speculative => "Speculative",
            Self::Consumer => "Consumer",
            Self::Other(label) => label,
        }
    }
}

impl From<String> for BiasRating {
    fn from(label: String) -> Self {
        match label.as_str() {
            "Center" => Self::Center,
            "Left" => Self::Left,
            "Right" => Self::Right,
            "Market Data" => Self::MarketData,
            "Speculative" => Self::Speculative,
            "Consumer" => Self::Consumer,
            _ => Self::Other(label),
        }
    }
}

impl From<BiasRating> for String {
    fn from(rating: BiasRating) -> Self {
        rating.as_str().to_string()
    }
}

impl fmt::Display for BiasRating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
