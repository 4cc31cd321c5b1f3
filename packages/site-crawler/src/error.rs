use std::time::Duration;

use thiserror::Error;

/// Errors surfaced by browser and crawl operations.
///
/// Callers decide how much of this is fatal: the crawl treats per-page
/// failures as soft (the page contributes nothing), while a browser that
/// cannot launch at all propagates.
#[derive(Debug, Error)]
pub enum CrawlError {
    /// The input could not be parsed as an http(s) URL with a host
    #[error("invalid url: {0}")]
    InvalidUrl(String),

    /// The underlying browser failed (launch, page open, CDP command)
    #[error("browser error: {0}")]
    Browser(String),

    /// Navigation did not settle within the allotted time
    #[error("navigation timed out after {0:?}")]
    Timeout(Duration),

    /// In-page evaluation returned something unusable
    #[error("page evaluation failed: {0}")]
    Evaluation(String),
}
