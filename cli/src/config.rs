//! Configuration for the composition root.
//!
//! Layered resolution: built-in defaults, then `config.toml` under the
//! platform config directory, then environment variables. A malformed file
//! logs a warning and falls back to defaults rather than aborting; the app
//! is usable out of the box against the seeded dataset.

use std::{env, fs, path::PathBuf, time::Duration};

use serde::Deserialize;

use truthweave_client::DEFAULT_BASE_URL;
use truthweave_feed::DEFAULT_PAGE_SIZE;

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// On-disk shape; everything optional.
#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    backend: Option<BackendSection>,
    feed: Option<FeedSection>,
}

#[derive(Debug, Default, Deserialize)]
struct BackendSection {
    base_url: Option<String>,
    request_timeout_secs: Option<u64>,
    retry: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct FeedSection {
    page_size: Option<u32>,
    seeded: Option<bool>,
}

/// Fully resolved settings.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub base_url: String,
    pub request_timeout: Duration,
    /// Whether the client wraps requests in the retry policy.
    pub retry: bool,
    pub page_size: u32,
    /// Serve the in-memory seed dataset instead of hitting the backend.
    pub seeded: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            retry: true,
            page_size: DEFAULT_PAGE_SIZE,
            seeded: true,
        }
    }
}

impl AppConfig {
    /// `<config dir>/truthweave/config.toml`.
    #[must_use]
    pub fn path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("truthweave").join("config.toml"))
    }

    #[must_use]
    pub fn load() -> Self {
        let file = Self::path()
            .and_then(|path| fs::read_to_string(path).ok())
            .map(|raw| parse_file(&raw))
            .unwrap_or_default();

        let mut config = Self::default();

        if let Some(backend) = file.backend {
            if let Some(base_url) = backend.base_url {
                config.base_url = base_url;
            }
            if let Some(secs) = backend.request_timeout_secs.filter(|secs| *secs > 0) {
                config.request_timeout = Duration::from_secs(secs);
            }
            if let Some(retry) = backend.retry {
                config.retry = retry;
            }
        }
        if let Some(feed) = file.feed {
            if let Some(page_size) = feed.page_size.filter(|size| *size > 0) {
                config.page_size = page_size;
            }
            if let Some(seeded) = feed.seeded {
                config.seeded = seeded;
            }
        }

        config.apply_env();
        config
    }

    fn apply_env(&mut self) {
        if let Ok(base_url) = env::var("TRUTHWEAVE_BASE_URL")
            && !base_url.trim().is_empty()
        {
            // An explicit backend address implies the real source.
            self.base_url = base_url;
            self.seeded = false;
        }
        if let Ok(value) = env::var("TRUTHWEAVE_SEEDED") {
            match value.as_str() {
                "1" | "true" => self.seeded = true,
                "0" | "false" => self.seeded = false,
                other => tracing::warn!(value = other, "unrecognized TRUTHWEAVE_SEEDED value"),
            }
        }
    }
}

fn parse_file(raw: &str) -> ConfigFile {
    match toml::from_str(raw) {
        Ok(file) => file,
        Err(err) => {
            tracing::warn!(error = %err, "malformed config file; using defaults");
            ConfigFile::default()
        }
    }
}
