//! Bounded-concurrency discovery of same-domain routes.
//!
//! One crawl session per analysis request: a breadth-first sweep from the
//! start URL that records every same-domain page whose URL survives
//! [`normalize`](crate::normalize::normalize), deduplicated by canonical
//! form. A semaphore bounds the number of in-flight page loads; the
//! session ends when the queue is drained and every permit is free.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use futures::stream::FuturesUnordered;
use futures::StreamExt;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::CrawlError;
use crate::fetcher::PageFetcher;
use crate::normalize::normalize;

/// Maximum pages in flight per crawl session.
pub const MAX_CONCURRENT_PAGES: usize = 5;

/// Hard timeout for a single discovery navigation.
pub const DISCOVERY_TIMEOUT: Duration = Duration::from_secs(10);

/// Discover the route set reachable from `start_url`.
///
/// Returns canonical route URLs in discovery order, the normalized start
/// URL first. Individual page failures are soft: the page keeps its spot
/// in the route list but contributes no further links. Only an unusable
/// start URL fails the crawl itself.
pub async fn crawl(
    fetcher: Arc<dyn PageFetcher>,
    start_url: &str,
) -> Result<Vec<String>, CrawlError> {
    let parsed = Url::parse(start_url)
        .map_err(|_| CrawlError::InvalidUrl(start_url.to_string()))?;
    let host = parsed
        .host_str()
        .ok_or_else(|| CrawlError::InvalidUrl(start_url.to_string()))?
        .to_string();

    let mut visited: HashSet<String> = HashSet::new();
    let mut routes: Vec<String> = Vec::new();
    let mut queue: VecDeque<String> = VecDeque::new();

    if let Some(canonical) = normalize(start_url) {
        visited.insert(canonical.clone());
        routes.push(canonical);
    }

    // The start page is fetched exactly once; on error it contributes
    // zero links and the crawl carries on.
    let initial_links = match fetcher.discover_links(start_url, DISCOVERY_TIMEOUT).await {
        Ok(links) => links,
        Err(e) => {
            debug!(url = %start_url, error = %e, "Start page discovery failed");
            Vec::new()
        }
    };
    for link in &initial_links {
        record_discovered(link, &host, &mut visited, &mut routes, &mut queue);
    }

    let semaphore = Arc::new(Semaphore::new(MAX_CONCURRENT_PAGES));
    let mut in_flight = FuturesUnordered::new();

    loop {
        while in_flight.len() < MAX_CONCURRENT_PAGES {
            let Some(url) = queue.pop_front() else { break };
            let permit = match Arc::clone(&semaphore).acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => {
                    warn!("Crawl semaphore closed, stopping early");
                    queue.push_back(url);
                    break;
                }
            };
            let fetcher = Arc::clone(&fetcher);
            in_flight.push(tokio::spawn(async move {
                let _permit = permit;
                match fetcher.discover_links(&url, DISCOVERY_TIMEOUT).await {
                    Ok(links) => links,
                    Err(e) => {
                        debug!(url = %url, error = %e, "Page discovery failed, skipping");
                        Vec::new()
                    }
                }
            }));
        }

        match in_flight.next().await {
            Some(Ok(links)) => {
                for link in &links {
                    record_discovered(link, &host, &mut visited, &mut routes, &mut queue);
                }
            }
            Some(Err(e)) => warn!(error = %e, "Crawl task failed"),
            // Queue drained and nothing in flight
            None => break,
        }
    }

    info!(
        start_url = %start_url,
        routes = routes.len(),
        "Crawl session completed"
    );
    Ok(routes)
}

/// Record a discovered link: same host only, canonical form as dedup key,
/// raw URL onto the work queue. Links that fail to normalize are dropped
/// immediately and never queued.
fn record_discovered(
    link: &str,
    host: &str,
    visited: &mut HashSet<String>,
    routes: &mut Vec<String>,
    queue: &mut VecDeque<String>,
) {
    let Ok(parsed) = Url::parse(link) else { return };
    if parsed.host_str() != Some(host) {
        return;
    }
    let Some(canonical) = normalize(link) else { return };
    if !visited.insert(canonical.clone()) {
        return;
    }
    routes.push(canonical);
    queue.push_back(link.to_string());
}
