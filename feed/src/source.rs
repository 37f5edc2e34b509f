//! The pagination contract.

use thiserror::Error;

use truthweave_types::FeedPage;

/// Why a page could not be produced.
///
/// Cloneable so it can live inside a shared snapshot; the underlying error
/// is carried as text because transport errors are not `Clone`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PageLoadError {
    #[error("network failure while loading page {page}: {message}")]
    Network { page: u32, message: String },
    #[error("page {page} could not be produced: {message}")]
    Source { page: u32, message: String },
}

impl PageLoadError {
    #[must_use]
    pub fn page(&self) -> u32 {
        match self {
            Self::Network { page, .. } | Self::Source { page, .. } => *page,
        }
    }
}

/// A paged producer of feed entries.
///
/// `key` is the page cursor: `None` means "from the start" (equivalent to
/// page 1). Implementations return the loaded page with its neighbor keys;
/// an absent `next_key` ends the sequence. Failures must come back as
/// [`PageLoadError`] values, not panics, so one bad page cannot take down
/// the stream.
pub trait FeedSource: Send + Sync {
    fn load(
        &self,
        key: Option<u32>,
        limit: u32,
    ) -> impl Future<Output = Result<FeedPage, PageLoadError>> + Send;
}
