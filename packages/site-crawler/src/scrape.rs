//! Single-page content scraping.

use std::time::Duration;

use tracing::debug;

use crate::fetcher::{PageContent, PageFetcher};

/// Hard timeout for a content scrape navigation.
pub const SCRAPE_TIMEOUT: Duration = Duration::from_secs(30);

/// Scrape the visible content of one page.
///
/// Any navigation or evaluation failure means the page contributed
/// nothing: the caller receives `None`, never an error.
pub async fn scrape(fetcher: &dyn PageFetcher, url: &str) -> Option<PageContent> {
    match fetcher.fetch_content(url, SCRAPE_TIMEOUT).await {
        Ok(content) => Some(content),
        Err(e) => {
            debug!(url = %url, error = %e, "Scrape failed, dropping page");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    use crate::error::CrawlError;

    struct FixedFetcher {
        content: Option<PageContent>,
    }

    #[async_trait]
    impl PageFetcher for FixedFetcher {
        async fn discover_links(
            &self,
            _url: &str,
            _timeout: Duration,
        ) -> Result<Vec<String>, CrawlError> {
            panic!("discover_links is not used by scrape tests");
        }

        async fn fetch_content(
            &self,
            _url: &str,
            _timeout: Duration,
        ) -> Result<PageContent, CrawlError> {
            self.content
                .clone()
                .ok_or(CrawlError::Timeout(SCRAPE_TIMEOUT))
        }
    }

    #[tokio::test]
    async fn successful_scrape_returns_page_content() {
        let fetcher = FixedFetcher {
            content: Some(PageContent {
                url: "https://example.com/about".to_string(),
                title: "About us".to_string(),
                text: "We cut hair.".to_string(),
            }),
        };

        let page = scrape(&fetcher, "https://example.com/about").await.unwrap();
        assert_eq!(page.title, "About us");
        assert_eq!(page.text, "We cut hair.");
    }

    #[tokio::test]
    async fn failed_scrape_is_none() {
        let fetcher = FixedFetcher { content: None };
        assert!(scrape(&fetcher, "https://example.com").await.is_none());
    }
}
