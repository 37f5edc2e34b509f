//! The caching feed repository.
//!
//! One [`FeedStream`] exists per repository. Pages load through it exactly
//! once and land in a [`FeedSnapshot`] published over a
//! [`tokio::sync::watch`] channel, so any number of subscribers (screens,
//! tests) observe the same page sequence without re-issuing requests. Page
//! loads are single-flight behind an async mutex: concurrent callers
//! serialize and the second one finds the work already done.

use std::sync::Arc;

use tokio::sync::{Mutex, watch};

use truthweave_client::{ApiClient, NetworkError};
use truthweave_types::{CausalGraph, FeedEntry, FeedPage};

use crate::source::{FeedSource, PageLoadError};

/// Matches the page size the UI layer requests.
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Where the stream currently stands.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LoadPhase {
    /// More pages may be available; no load in flight.
    #[default]
    Idle,
    /// A page load is in flight.
    Loading,
    /// The source reported the end of the sequence.
    Terminal,
    /// The most recent load failed. Cached pages are unaffected and the
    /// failed page may be retried.
    Failed(PageLoadError),
}

/// The cached state every subscriber observes.
#[derive(Debug, Clone, Default)]
pub struct FeedSnapshot {
    /// Pages in load order.
    pub pages: Vec<FeedPage>,
    pub phase: LoadPhase,
    /// Incremented on every refresh; lets subscribers detect invalidation.
    pub epoch: u64,
}

impl FeedSnapshot {
    /// All loaded entries in feed order.
    pub fn entries(&self) -> impl Iterator<Item = &FeedEntry> {
        self.pages.iter().flat_map(|page| page.entries.iter())
    }

    #[must_use]
    pub fn entry_count(&self) -> usize {
        self.pages.iter().map(|page| page.entries.len()).sum()
    }

    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.phase == LoadPhase::Terminal
    }

    /// Key to re-fetch after invalidation, resolved from the newest page.
    #[must_use]
    pub fn refresh_anchor(&self) -> Option<u32> {
        self.pages.last().and_then(FeedPage::refresh_anchor)
    }

    /// Assembles the causal timeline from everything loaded so far.
    #[must_use]
    pub fn causal_graph(&self) -> CausalGraph {
        CausalGraph::from_entries(self.entries())
    }
}

#[derive(Debug, Default)]
struct Cursor {
    /// Whether the first page has been requested for the current epoch.
    started: bool,
    next_key: Option<u32>,
}

/// A live, cached page sequence over a [`FeedSource`].
#[derive(Debug)]
pub struct FeedStream<S> {
    source: S,
    page_size: u32,
    tx: watch::Sender<FeedSnapshot>,
    cursor: Mutex<Cursor>,
}

impl<S: FeedSource> FeedStream<S> {
    fn new(source: S, page_size: u32) -> Self {
        let (tx, _rx) = watch::channel(FeedSnapshot::default());
        Self {
            source,
            page_size,
            tx,
            cursor: Mutex::new(Cursor::default()),
        }
    }

    /// Observe the cached snapshot. Receivers created at any time see the
    /// current state immediately and every change afterwards.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<FeedSnapshot> {
        self.tx.subscribe()
    }

    #[must_use]
    pub fn snapshot(&self) -> FeedSnapshot {
        self.tx.borrow().clone()
    }

    /// Loads the first page if nothing has been loaded in this epoch.
    ///
    /// Safe to call from every subscriber: concurrent callers collapse into
    /// a single page-1 fetch.
    pub async fn ensure_started(&self) -> Result<(), PageLoadError> {
        let mut cursor = self.cursor.lock().await;
        if cursor.started {
            return Ok(());
        }
        self.load_locked(&mut cursor).await.map(|_| ())
    }

    /// Loads the next page. Returns `Ok(true)` while more pages remain,
    /// `Ok(false)` once the sequence is exhausted.
    ///
    /// On failure the cursor does not advance; calling again retries the
    /// same page.
    pub async fn load_next(&self) -> Result<bool, PageLoadError> {
        let mut cursor = self.cursor.lock().await;
        if cursor.started && cursor.next_key.is_none() {
            return Ok(false);
        }
        self.load_locked(&mut cursor).await
    }

    /// Drops every cached page and re-fetches from the start.
    pub async fn refresh(&self) -> Result<(), PageLoadError> {
        let mut cursor = self.cursor.lock().await;
        *cursor = Cursor::default();
        self.tx.send_modify(|snapshot| {
            snapshot.pages.clear();
            snapshot.phase = LoadPhase::Idle;
            snapshot.epoch += 1;
        });
        self.load_locked(&mut cursor).await.map(|_| ())
    }

    async fn load_locked(&self, cursor: &mut Cursor) -> Result<bool, PageLoadError> {
        let key = if cursor.started { cursor.next_key } else { None };
        let page_number = key.unwrap_or(1);

        self.tx
            .send_modify(|snapshot| snapshot.phase = LoadPhase::Loading);

        match self.source.load(key, self.page_size).await {
            Ok(page) => {
                cursor.started = true;
                cursor.next_key = page.next_key;
                let terminal = page.is_terminal();
                let count = page.entries.len();
                self.tx.send_modify(|snapshot| {
                    snapshot.pages.push(page);
                    snapshot.phase = if terminal {
                        LoadPhase::Terminal
                    } else {
                        LoadPhase::Idle
                    };
                });
                tracing::debug!(page = page_number, entries = count, terminal, "feed page loaded");
                Ok(!terminal)
            }
            Err(err) => {
                tracing::warn!(page = page_number, error = %err, "feed page load failed");
                self.tx
                    .send_modify(|snapshot| snapshot.phase = LoadPhase::Failed(err.clone()));
                Err(err)
            }
        }
    }
}

/// Composes a [`FeedSource`] into the UI-facing feed API and forwards
/// oracle questions to the backend.
#[derive(Debug)]
pub struct NewsRepository<S> {
    client: ApiClient,
    stream: Arc<FeedStream<S>>,
}

impl<S: FeedSource> NewsRepository<S> {
    #[must_use]
    pub fn new(client: ApiClient, source: S) -> Self {
        Self::with_page_size(client, source, DEFAULT_PAGE_SIZE)
    }

    #[must_use]
    pub fn with_page_size(client: ApiClient, source: S, page_size: u32) -> Self {
        Self {
            client,
            stream: Arc::new(FeedStream::new(source, page_size)),
        }
    }

    /// Hands out the shared stream. Every call returns the same underlying
    /// page sequence; re-subscribing never restarts from page 1.
    #[must_use]
    pub fn stream_feed(&self) -> Arc<FeedStream<S>> {
        Arc::clone(&self.stream)
    }

    /// Invalidates the cached sequence and re-fetches from the start.
    pub async fn refresh_feed(&self) -> Result<(), PageLoadError> {
        self.stream.refresh().await
    }

    /// Passthrough to the oracle chat endpoint.
    pub async fn ask_oracle(
        &self,
        article_id: Option<&str>,
        question: &str,
    ) -> Result<String, NetworkError> {
        self.client.ask_oracle(article_id, question).await
    }
}

#[cfg(test)]
mod tests {
    use super::{DEFAULT_PAGE_SIZE, LoadPhase, NewsRepository};
    use crate::seed::{SEED_ENTRY_COUNT, SeededFeedSource};
    use crate::source::{FeedSource, PageLoadError};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};
    use truthweave_client::ApiClient;
    use truthweave_types::FeedPage;

    fn client() -> ApiClient {
        ApiClient::new("http://127.0.0.1:1").unwrap()
    }

    /// Counts how many loads actually reach the source.
    #[derive(Clone)]
    struct CountingSource {
        loads: Arc<AtomicU32>,
        inner: SeededFeedSource,
    }

    impl CountingSource {
        fn new() -> Self {
            Self {
                loads: Arc::new(AtomicU32::new(0)),
                inner: SeededFeedSource::new(),
            }
        }
    }

    impl FeedSource for CountingSource {
        async fn load(&self, key: Option<u32>, limit: u32) -> Result<FeedPage, PageLoadError> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            self.inner.load(key, limit).await
        }
    }

    /// First page succeeds and promises more; every later page fails.
    struct FlakySource;

    impl FeedSource for FlakySource {
        async fn load(&self, key: Option<u32>, _limit: u32) -> Result<FeedPage, PageLoadError> {
            match key {
                None | Some(1) => Ok(FeedPage::new(
                    SeededFeedSource::seed_entries(),
                    None,
                    Some(2),
                )),
                Some(page) => Err(PageLoadError::Source {
                    page,
                    message: "synthetic failure".to_string(),
                }),
            }
        }
    }

    #[tokio::test]
    async fn seed_stream_loads_once_and_terminates() {
        let source = CountingSource::new();
        let loads = source.loads.clone();
        let repo = NewsRepository::new(client(), source);
        let stream = repo.stream_feed();

        stream.ensure_started().await.unwrap();
        let snapshot = stream.snapshot();
        assert_eq!(snapshot.entry_count(), SEED_ENTRY_COUNT);
        assert!(snapshot.is_terminal());

        // Terminal stream refuses further loads without touching the source.
        assert!(!stream.load_next().await.unwrap());
        assert_eq!(loads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn concurrent_subscribers_share_one_fetch() {
        let source = CountingSource::new();
        let loads = source.loads.clone();
        let repo = NewsRepository::new(client(), source);

        let first = repo.stream_feed();
        let second = repo.stream_feed();
        let mut rx_first = first.subscribe();
        let mut rx_second = second.subscribe();

        let (a, b) = tokio::join!(first.ensure_started(), second.ensure_started());
        a.unwrap();
        b.unwrap();

        assert_eq!(loads.load(Ordering::SeqCst), 1, "page 1 fetched twice");

        let snap_first = rx_first.borrow_and_update().clone();
        let snap_second = rx_second.borrow_and_update().clone();
        assert_eq!(snap_first.pages, snap_second.pages);
        assert_eq!(snap_first.entry_count(), SEED_ENTRY_COUNT);
    }

    #[tokio::test]
    async fn failed_page_leaves_cached_pages_intact() {
        let repo = NewsRepository::new(client(), FlakySource);
        let stream = repo.stream_feed();

        stream.ensure_started().await.unwrap();
        assert_eq!(stream.snapshot().pages.len(), 1);

        let err = stream.load_next().await.unwrap_err();
        assert_eq!(err.page(), 2);

        let snapshot = stream.snapshot();
        assert_eq!(snapshot.pages.len(), 1, "cached page lost on failure");
        assert_eq!(snapshot.phase, LoadPhase::Failed(err));
        assert_eq!(snapshot.entry_count(), SEED_ENTRY_COUNT);

        // The cursor did not advance; retrying targets the same page.
        let retry_err = stream.load_next().await.unwrap_err();
        assert_eq!(retry_err.page(), 2);
        assert_eq!(stream.snapshot().pages.len(), 1);
    }

    #[tokio::test]
    async fn refresh_invalidates_and_refetches() {
        let source = CountingSource::new();
        let loads = source.loads.clone();
        let repo = NewsRepository::new(client(), source);
        let stream = repo.stream_feed();

        stream.ensure_started().await.unwrap();
        let before = stream.snapshot();
        assert_eq!(before.epoch, 0);

        repo.refresh_feed().await.unwrap();

        let after = stream.snapshot();
        assert_eq!(after.epoch, 1);
        assert_eq!(after.pages.len(), 1);
        assert_eq!(after.entry_count(), SEED_ENTRY_COUNT);
        assert_eq!(loads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn subscribers_observe_updates_through_the_watch() {
        let repo = NewsRepository::new(client(), SeededFeedSource::new());
        let stream = repo.stream_feed();
        let mut rx = stream.subscribe();

        assert_eq!(rx.borrow_and_update().entry_count(), 0);

        stream.ensure_started().await.unwrap();

        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().entry_count(), SEED_ENTRY_COUNT);
    }

    #[tokio::test]
    async fn snapshot_assembles_causal_graph() {
        let repo = NewsRepository::new(client(), SeededFeedSource::new());
        let stream = repo.stream_feed();
        stream.ensure_started().await.unwrap();

        let graph = stream.snapshot().causal_graph();
        assert_eq!(graph.len(), SEED_ENTRY_COUNT);

        let roots: Vec<&str> = graph.roots().map(|event| event.id.as_str()).collect();
        assert_eq!(roots, vec!["root_1", "root_2"]);
        assert_eq!(graph.effects_of("root_1"), ["child_1", "child_2"]);
    }

    #[tokio::test]
    async fn refresh_anchor_follows_newest_page() {
        let repo = NewsRepository::new(client(), SeededFeedSource::new());
        let stream = repo.stream_feed();

        // Nothing loaded yet: no anchor.
        assert_eq!(stream.snapshot().refresh_anchor(), None);

        stream.ensure_started().await.unwrap();
        // Seed page has no cursors at all.
        assert_eq!(stream.snapshot().refresh_anchor(), None);
    }

    #[test]
    fn default_page_size_matches_ui_request() {
        assert_eq!(DEFAULT_PAGE_SIZE, 10);
    }
}
