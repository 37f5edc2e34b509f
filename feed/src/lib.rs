//! Feed pagination and the caching repository.
//!
//! # Architecture
//!
//! - [`FeedSource`] - the pagination contract: one page per call, cursor
//!   keys decide continuation
//! - [`SeededFeedSource`] - in-memory demo dataset behind the same contract
//! - [`RemoteFeedSource`] - the real backend via [`truthweave_client`]
//! - [`NewsRepository`] / [`FeedStream`] - a shared, cached page sequence
//!   observed by any number of subscribers through a watch channel
//!
//! A page-production failure never tears down the stream: it is caught at
//! the source boundary as a [`PageLoadError`], recorded in the snapshot,
//! and already-loaded pages stay readable. The subscriber decides whether
//! to retry.

mod remote;
mod repository;
mod seed;
mod source;

pub use remote::RemoteFeedSource;
pub use repository::{DEFAULT_PAGE_SIZE, FeedSnapshot, FeedStream, LoadPhase, NewsRepository};
pub use seed::{SEED_ENTRY_COUNT, SeededFeedSource};
pub use source::{FeedSource, PageLoadError};
