use thiserror::Error;

pub type Result<T> = std::result::Result<T, CrawlError>;

/// Failure categories of the crawl pipeline.
///
/// `Fetch`, `Parse` and `Decode` are per-item or per-page and get downgraded to
/// logs by the crawler. `Storage` aborts a run. `Unauthorized` rejects a trigger
/// before any work starts.
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("fetch failed for {url}: {reason}")]
    Fetch { url: String, reason: String },

    #[error("parse error: {0}")]
    Parse(String),

    #[error("decode error: {0}")]
    Decode(#[from] image::ImageError),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("unauthorized")]
    Unauthorized,
}

impl CrawlError {
    pub fn fetch(url: &str, err: impl std::fmt::Display) -> Self {
        CrawlError::Fetch {
            url: url.to_string(),
            reason: err.to_string(),
        }
    }
}

impl From<std::io::Error> for CrawlError {
    fn from(e: std::io::Error) -> Self {
        CrawlError::Storage(e.to_string())
    }
}

impl From<serde_json::Error> for CrawlError {
    fn from(e: serde_json::Error) -> Self {
        CrawlError::Storage(e.to_string())
    }
}
