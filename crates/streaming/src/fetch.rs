use async_trait::async_trait;
use tracing::{debug, warn};

use crate::image::{TileFormat, TileImage};

/// Why a single URL attempt failed. The fallback loop absorbs these for
/// tiles; only the vector-document path surfaces them to callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    Transport(String),
    Status(u16),
}

impl std::fmt::Display for FetchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FetchError::Transport(msg) => write!(f, "transport error: {msg}"),
            FetchError::Status(code) => write!(f, "unexpected status: {code}"),
        }
    }
}

impl std::error::Error for FetchError {}

/// Fetches one candidate URL. A non-success status is a failure.
#[async_trait]
pub trait TileFetcher: Send + Sync {
    async fn fetch_url(&self, url: &str) -> Result<TileImage, FetchError>;
}

/// Attempts candidate URLs strictly in order.
///
/// Resolves `Some` with the first success and `None` once the list is
/// exhausted. No URL is tried twice, nothing is retried after exhaustion,
/// and failures emit diagnostics only.
pub async fn fetch_with_fallback<F: TileFetcher + ?Sized>(
    fetcher: &F,
    urls: &[String],
) -> Option<TileImage> {
    for (i, url) in urls.iter().enumerate() {
        match fetcher.fetch_url(url).await {
            Ok(image) => {
                debug!("tile candidate {i} succeeded: {url} ({} bytes)", image.len());
                return Some(image);
            }
            Err(err) => warn!("tile candidate {i} failed: {url} -> {err}"),
        }
    }
    None
}

/// `reqwest`-backed fetcher.
///
/// No per-request timeout beyond the client's own; a request superseded by a
/// newer build is abandoned, not cancelled.
#[derive(Debug, Clone, Default)]
pub struct HttpTileFetcher {
    client: reqwest::Client,
}

impl HttpTileFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl TileFetcher for HttpTileFetcher {
    async fn fetch_url(&self, url: &str) -> Result<TileImage, FetchError> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(FetchError::Status(resp.status().as_u16()));
        }

        let format = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(TileFormat::from_content_type)
            .filter(|f| *f != TileFormat::Unknown)
            .unwrap_or_else(|| TileFormat::from_url(url));

        let data = resp
            .bytes()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        Ok(TileImage::new(data, format))
    }
}

/// Downloads the vector document with a single GET, fully buffered before
/// parsing. No streaming.
pub async fn fetch_geojson(client: &reqwest::Client, url: &str) -> Result<String, FetchError> {
    let resp = client
        .get(url)
        .send()
        .await
        .map_err(|e| FetchError::Transport(e.to_string()))?;
    if !resp.status().is_success() {
        return Err(FetchError::Status(resp.status().as_u16()));
    }
    resp.text()
        .await
        .map_err(|e| FetchError::Transport(e.to_string()))
}
