//! Shared test doubles: a scripted completion gateway and a canned site.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use ai_gateway::{CompletionGateway, CompletionRequest, GatewayError};
use site_crawler::{CrawlError, PageContent, PageFetcher};

type Responder =
    Box<dyn Fn(&CompletionRequest) -> Result<String, GatewayError> + Send + Sync>;

/// Gateway driven by a closure; records every request it sees.
pub struct MockGateway {
    responder: Responder,
    pub calls: Mutex<Vec<CompletionRequest>>,
}

impl MockGateway {
    pub fn new(
        responder: impl Fn(&CompletionRequest) -> Result<String, GatewayError>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        Self {
            responder: Box::new(responder),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Recorded requests whose system message equals `system`.
    pub fn calls_with_system(&self, system: &str) -> Vec<CompletionRequest> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|r| system_of(r) == system)
            .cloned()
            .collect()
    }
}

/// The system message of a request, or "" when absent.
pub fn system_of(request: &CompletionRequest) -> &str {
    request
        .messages
        .iter()
        .find(|m| m.role == "system")
        .map(|m| m.content.as_str())
        .unwrap_or("")
}

/// The user message of a request, or "" when absent.
pub fn user_of(request: &CompletionRequest) -> &str {
    request
        .messages
        .iter()
        .find(|m| m.role == "user")
        .map(|m| m.content.as_str())
        .unwrap_or("")
}

#[async_trait]
impl CompletionGateway for MockGateway {
    async fn complete(&self, request: CompletionRequest) -> ai_gateway::Result<String> {
        self.calls.lock().unwrap().push(request.clone());
        (self.responder)(&request)
    }
}

/// Fixed link graph plus page contents; pages without content fail to
/// scrape, URLs without links discover nothing.
#[derive(Default)]
pub struct MockSite {
    pub links: HashMap<String, Vec<String>>,
    pub pages: HashMap<String, PageContent>,
    /// Artificial per-navigation delay, for observing in-progress jobs
    pub delay: Option<Duration>,
}

impl MockSite {
    pub fn with_links(mut self, url: &str, targets: &[&str]) -> Self {
        self.links.insert(
            url.to_string(),
            targets.iter().map(|t| t.to_string()).collect(),
        );
        self
    }

    pub fn with_page(mut self, url: &str, title: &str, text: &str) -> Self {
        self.pages.insert(
            url.to_string(),
            PageContent {
                url: url.to_string(),
                title: title.to_string(),
                text: text.to_string(),
            },
        );
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[async_trait]
impl PageFetcher for MockSite {
    async fn discover_links(
        &self,
        url: &str,
        _timeout: Duration,
    ) -> Result<Vec<String>, CrawlError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self.links.get(url).cloned().unwrap_or_default())
    }

    async fn fetch_content(
        &self,
        url: &str,
        timeout: Duration,
    ) -> Result<PageContent, CrawlError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.pages
            .get(url)
            .cloned()
            .ok_or(CrawlError::Timeout(timeout))
    }
}
