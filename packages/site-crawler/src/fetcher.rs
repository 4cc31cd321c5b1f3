//! Page access seam.
//!
//! The crawl session, the content scraper, and the analysis pipeline all go
//! through [`PageFetcher`] so they can be driven by a mock in tests. The
//! production implementation, [`ChromeFetcher`], drives pages on the shared
//! browser and aborts image/stylesheet/font/script requests to cut load
//! time and bandwidth.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::Browser;
use chromiumoxide::cdp::browser_protocol::fetch::{
    ContinueRequestParams, EnableParams, EventRequestPaused, FailRequestParams, RequestPattern,
};
use chromiumoxide::cdp::browser_protocol::network::{ErrorReason, ResourceType};
use chromiumoxide::Page;
use futures::StreamExt;
use serde::Deserialize;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use crate::browser::BrowserManager;
use crate::error::CrawlError;

/// Content extracted from a rendered page.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct PageContent {
    /// Live page URL (post-redirect)
    pub url: String,
    /// Document title
    pub title: String,
    /// Visible body text
    pub text: String,
}

/// Navigates pages and reads their DOM.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Navigate to `url` and return every anchor href on the page.
    async fn discover_links(
        &self,
        url: &str,
        timeout: Duration,
    ) -> Result<Vec<String>, CrawlError>;

    /// Navigate to `url` and return its URL, title, and visible text.
    async fn fetch_content(&self, url: &str, timeout: Duration)
        -> Result<PageContent, CrawlError>;
}

const LINKS_SCRIPT: &str =
    "Array.from(document.querySelectorAll('a[href]')).map(a => a.href)";

const CONTENT_SCRIPT: &str = r#"
(() => ({
    url: window.location.href,
    title: document.title,
    text: document.body ? document.body.innerText : ''
}))()
"#;

/// [`PageFetcher`] backed by the shared Chromium process.
pub struct ChromeFetcher {
    manager: Arc<BrowserManager>,
}

impl ChromeFetcher {
    pub fn new(manager: Arc<BrowserManager>) -> Self {
        Self { manager }
    }
}

#[async_trait]
impl PageFetcher for ChromeFetcher {
    async fn discover_links(
        &self,
        url: &str,
        timeout: Duration,
    ) -> Result<Vec<String>, CrawlError> {
        let handle = self.manager.acquire().await?;
        let page = InterceptedPage::open(handle.browser()).await?;
        let result = async {
            navigate(&page.page, url, timeout).await?;
            evaluate_into::<Vec<String>>(&page.page, LINKS_SCRIPT).await
        }
        .await;
        page.shutdown().await;
        result
    }

    async fn fetch_content(
        &self,
        url: &str,
        timeout: Duration,
    ) -> Result<PageContent, CrawlError> {
        let handle = self.manager.acquire().await?;
        let page = InterceptedPage::open(handle.browser()).await?;
        let result = async {
            navigate(&page.page, url, timeout).await?;
            evaluate_into::<PageContent>(&page.page, CONTENT_SCRIPT).await
        }
        .await;
        page.shutdown().await;
        result
    }
}

/// A page with Fetch-domain interception aborting heavy resource types.
struct InterceptedPage {
    page: Page,
    interceptor: JoinHandle<()>,
}

impl InterceptedPage {
    async fn open(browser: &Browser) -> Result<Self, CrawlError> {
        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| CrawlError::Browser(e.to_string()))?;

        match Self::arm(&page).await {
            Ok(interceptor) => Ok(Self { page, interceptor }),
            Err(e) => {
                if let Err(close_err) = page.close().await {
                    debug!(error = %close_err, "Failed to close page");
                }
                Err(e)
            }
        }
    }

    async fn arm(page: &Page) -> Result<JoinHandle<()>, CrawlError> {
        page.execute(
            EnableParams::builder()
                .pattern(RequestPattern::builder().url_pattern("*").build())
                .build(),
        )
        .await
        .map_err(|e| CrawlError::Browser(e.to_string()))?;

        let mut paused = page
            .event_listener::<EventRequestPaused>()
            .await
            .map_err(|e| CrawlError::Browser(e.to_string()))?;

        let intercept_page = page.clone();
        let interceptor = tokio::spawn(async move {
            while let Some(event) = paused.next().await {
                let request_id = event.request_id.clone();
                let blocked = matches!(
                    &event.resource_type,
                    ResourceType::Image
                        | ResourceType::Stylesheet
                        | ResourceType::Font
                        | ResourceType::Script
                );
                let outcome = if blocked {
                    intercept_page
                        .execute(FailRequestParams::new(request_id, ErrorReason::Aborted))
                        .await
                        .map(|_| ())
                } else {
                    intercept_page
                        .execute(ContinueRequestParams::new(request_id))
                        .await
                        .map(|_| ())
                };
                if let Err(e) = outcome {
                    trace!(error = %e, "Request interception command failed");
                    break;
                }
            }
        });

        Ok(interceptor)
    }

    /// Close the page and stop the interceptor; runs on every exit path.
    async fn shutdown(self) {
        self.interceptor.abort();
        if let Err(e) = self.page.close().await {
            debug!(error = %e, "Failed to close page");
        }
    }
}

async fn navigate(page: &Page, url: &str, timeout: Duration) -> Result<(), CrawlError> {
    tokio::time::timeout(timeout, async {
        page.goto(url)
            .await
            .map_err(|e| CrawlError::Browser(e.to_string()))?;
        page.wait_for_navigation()
            .await
            .map_err(|e| CrawlError::Browser(e.to_string()))?;
        Ok(())
    })
    .await
    .map_err(|_| CrawlError::Timeout(timeout))?
}

async fn evaluate_into<T>(page: &Page, script: &str) -> Result<T, CrawlError>
where
    T: serde::de::DeserializeOwned,
{
    page.evaluate(script)
        .await
        .map_err(|e| CrawlError::Browser(e.to_string()))?
        .into_value::<T>()
        .map_err(|e| CrawlError::Evaluation(e.to_string()))
}
