//! Read-only access to the published data: photo log, track index, track files.
//!
//! Everything is addressed by the URL paths the index and loaders produce
//! (`/data/photos.csv`, `/routes/kato/Log20250423-001.gpx`, ...). A source
//! resolves such a path to bytes.

use crate::error::{Error, Result};
use log::debug;
use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};

/// An opaque store of published resources.
pub trait DataSource: Send + Sync {
    /// Fetch the full content at `url`.
    fn fetch(&self, url: &str) -> impl Future<Output = Result<Vec<u8>>> + Send;
}

/// Serves resources from a directory laid out like the published site
/// (`<root>/data/photos.csv`, `<root>/routes/index.json`, ...).
#[derive(Debug, Clone)]
pub struct FsSource {
    root: PathBuf,
}

impl FsSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, url: &str) -> PathBuf {
        let relative = url.split(['?', '#']).next().unwrap_or(url);
        self.root.join(relative.trim_start_matches('/'))
    }
}

impl DataSource for FsSource {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let path = self.resolve(url);
        debug!("[FsSource] {} -> {}", url, path.display());
        tokio::fs::read(&path)
            .await
            .map_err(|e| Error::fetch(url, format!("{}: {}", path.display(), e)))
    }
}

/// In-memory resources, keyed by URL.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    resources: HashMap<String, Vec<u8>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, url: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        self.insert(url, content);
        self
    }

    pub fn insert(&mut self, url: impl Into<String>, content: impl Into<Vec<u8>>) {
        self.resources.insert(url.into(), content.into());
    }
}

impl DataSource for MemorySource {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        self.resources
            .get(url)
            .cloned()
            .ok_or_else(|| Error::fetch(url, "not found"))
    }
}

#[cfg(feature = "http")]
pub use http::HttpSource;

#[cfg(feature = "http")]
mod http {
    use super::DataSource;
    use crate::error::{Error, Result};
    use log::{debug, warn};
    use reqwest::{Client, StatusCode};
    use std::time::{Duration, Instant};

    const MAX_RETRIES: u32 = 3;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum RetryCause {
        /// HTTP 429
        RateLimited,
        /// Connection, TLS, or timeout failure before a response arrived
        Transport,
    }

    /// Wait before the `attempt`-th retry (1-based), or `None` once
    /// `MAX_RETRIES` is exhausted.
    ///
    /// Rate limits back off 1s, 2s, 4s; transport errors 400ms, 800ms, 1.6s.
    fn retry_delay(cause: RetryCause, attempt: u32) -> Option<Duration> {
        if attempt == 0 || attempt > MAX_RETRIES {
            return None;
        }
        let base_ms = match cause {
            RetryCause::RateLimited => 500,
            RetryCause::Transport => 200,
        };
        Some(Duration::from_millis(base_ms << attempt))
    }

    /// Fetches resources relative to a base URL, e.g. `https://example.org`.
    ///
    /// Transport errors and 429 responses are retried with exponential
    /// backoff; any other non-success status fails immediately.
    #[derive(Debug, Clone)]
    pub struct HttpSource {
        client: Client,
        base_url: String,
    }

    impl HttpSource {
        pub fn new(base_url: &str) -> Result<Self> {
            let client = Client::builder()
                .pool_idle_timeout(Duration::from_secs(60))
                .tcp_keepalive(Duration::from_secs(30))
                .timeout(Duration::from_secs(30))
                .build()
                .map_err(|e| Error::Config(format!("failed to create HTTP client: {}", e)))?;

            Ok(Self {
                client,
                base_url: base_url.trim_end_matches('/').to_string(),
            })
        }

        fn absolute(&self, url: &str) -> String {
            if url.starts_with("http://") || url.starts_with("https://") {
                url.to_string()
            } else {
                format!("{}/{}", self.base_url, url.trim_start_matches('/'))
            }
        }
    }

    impl DataSource for HttpSource {
        async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
            let target = self.absolute(url);
            let mut retries = 0;
            let start = Instant::now();

            loop {
                match self.client.get(&target).send().await {
                    Ok(resp) => {
                        let status = resp.status();

                        if status == StatusCode::TOO_MANY_REQUESTS {
                            retries += 1;
                            let Some(wait) = retry_delay(RetryCause::RateLimited, retries) else {
                                return Err(Error::fetch(url, "max retries exceeded (429)"));
                            };
                            warn!("[HttpSource {}] 429, retry {} after {:?}", url, retries, wait);
                            tokio::time::sleep(wait).await;
                            continue;
                        }

                        if !status.is_success() {
                            return Err(Error::fetch(url, format!("HTTP {}", status)));
                        }

                        let bytes = resp
                            .bytes()
                            .await
                            .map_err(|e| Error::fetch(url, format!("body download error: {}", e)))?;
                        debug!(
                            "[HttpSource {}] {:.1}KB in {:?}",
                            url,
                            bytes.len() as f64 / 1024.0,
                            start.elapsed()
                        );
                        return Ok(bytes.to_vec());
                    }
                    Err(e) => {
                        retries += 1;
                        let Some(wait) = retry_delay(RetryCause::Transport, retries) else {
                            return Err(Error::fetch(url, format!("request error: {}", e)));
                        };
                        warn!(
                            "[HttpSource {}] error: {}, retry {} after {:?}",
                            url, e, retries, wait
                        );
                        tokio::time::sleep(wait).await;
                    }
                }
            }
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_rate_limit_backoff_doubles_until_cutoff() {
            let waits: Vec<_> = (1..=MAX_RETRIES)
                .map(|n| retry_delay(RetryCause::RateLimited, n).unwrap())
                .collect();
            assert_eq!(
                waits,
                vec![
                    Duration::from_millis(1000),
                    Duration::from_millis(2000),
                    Duration::from_millis(4000),
                ]
            );
            assert_eq!(retry_delay(RetryCause::RateLimited, MAX_RETRIES + 1), None);
        }

        #[test]
        fn test_transport_backoff_doubles_until_cutoff() {
            assert_eq!(retry_delay(RetryCause::Transport, 1), Some(Duration::from_millis(400)));
            assert_eq!(retry_delay(RetryCause::Transport, 2), Some(Duration::from_millis(800)));
            assert_eq!(retry_delay(RetryCause::Transport, 3), Some(Duration::from_millis(1600)));
            assert_eq!(retry_delay(RetryCause::Transport, 4), None);
            assert_eq!(retry_delay(RetryCause::Transport, 0), None);
        }

        #[test]
        fn test_absolute_urls() {
            let source = HttpSource::new("https://example.org/").unwrap();
            assert_eq!(source.absolute("/data/photos.csv"), "https://example.org/data/photos.csv");
            assert_eq!(
                source.absolute("routes/index.json"),
                "https://example.org/routes/index.json"
            );
            assert_eq!(
                source.absolute("https://cdn.example.org/a.gpx"),
                "https://cdn.example.org/a.gpx"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_source() {
        let source = MemorySource::new().with("/routes/index.json", "[]");
        assert_eq!(source.fetch("/routes/index.json").await.unwrap(), b"[]".to_vec());

        let err = source.fetch("/routes/missing.json").await.unwrap_err();
        assert!(matches!(err, Error::Fetch { .. }));
    }

    #[tokio::test]
    async fn test_fs_source_resolves_site_paths() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("data")).unwrap();
        std::fs::write(dir.path().join("data/photos.csv"), "x").unwrap();

        let source = FsSource::new(dir.path());
        assert_eq!(source.fetch("/data/photos.csv").await.unwrap(), b"x".to_vec());
        assert_eq!(source.fetch("data/photos.csv?v=2").await.unwrap(), b"x".to_vec());
        assert!(source.fetch("/data/nope.csv").await.is_err());
    }
}
