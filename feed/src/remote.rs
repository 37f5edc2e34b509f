//! Backend-driven feed source.

use truthweave_client::ApiClient;
use truthweave_types::FeedPage;

use crate::source::{FeedSource, PageLoadError};

/// Adapts [`ApiClient::fetch_feed_page`] to the [`FeedSource`] contract.
///
/// The backend does not return cursors, so continuation is inferred: a full
/// page means another one may follow, a short page ends the stream.
#[derive(Debug, Clone)]
pub struct RemoteFeedSource {
    client: ApiClient,
}

impl RemoteFeedSource {
    #[must_use]
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }
}

impl FeedSource for RemoteFeedSource {
    async fn load(&self, key: Option<u32>, limit: u32) -> Result<FeedPage, PageLoadError> {
        let page = key.unwrap_or(1);
        let entries = self
            .client
            .fetch_feed_page(page, limit)
            .await
            .map_err(|err| PageLoadError::Network {
                page,
                message: err.to_string(),
            })?;

        let next_key = (entries.len() as u32 >= limit).then(|| page + 1);
        let prev_key = (page > 1).then(|| page - 1);
        Ok(FeedPage::new(entries, prev_key, next_key))
    }
}
