//! Website analysis pipeline.
//!
//! Orchestrates route discovery, scraping, and the AI synthesis stages
//! that turn a business website into a filled funnel template. The
//! pipeline strongly favors degraded success over failure: individual
//! pages, syntheses, and stage fills may drop out without affecting the
//! job, while template resolution, route filtering, and consolidation are
//! fatal.

use std::sync::Arc;
use std::time::Instant;

use anyhow::{anyhow, Context, Result};
use futures::future::join_all;
use serde::Serialize;
use tracing::{debug, info, warn};
use url::Url;

use ai_gateway::{strip_code_fences, ChatMessage, CompletionGateway, CompletionRequest};
use site_crawler::{crawl, scrape, PageContent, PageFetcher};

use crate::scraping::prompts;
use crate::templates::{self, Stage, StageFill, Template};

/// Route-count threshold above which the model picks the pages to scrape.
pub const MAX_UNFILTERED_ROUTES: usize = 6;

/// How many routes the model is asked to select on large sites.
pub const FILTERED_ROUTE_COUNT: usize = 5;

/// Wall-clock duration of each pipeline stage, in milliseconds.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageTimings {
    pub crawl_ms: u64,
    pub filter_ms: u64,
    pub scrape_ms: u64,
    pub synthesis_ms: u64,
    pub consolidation_ms: u64,
    pub fill_ms: u64,
    pub total_ms: u64,
}

/// Outcome of a completed analysis.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    /// Filled copy of the requested template
    pub template: Template,
    /// Routes that were selected for scraping, homepage first
    pub routes: Vec<String>,
    pub timings: StageTimings,
}

pub struct AnalysisPipeline {
    gateway: Arc<dyn CompletionGateway>,
    fetcher: Arc<dyn PageFetcher>,
    model: String,
}

impl AnalysisPipeline {
    pub fn new(
        gateway: Arc<dyn CompletionGateway>,
        fetcher: Arc<dyn PageFetcher>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            gateway,
            fetcher,
            model: model.into(),
        }
    }

    /// Analyze `url` and fill the template identified by `template_id`.
    ///
    /// Fatal failures come back as `Err` with partial timings logged; the
    /// caller records them as the job's terminal error.
    pub async fn analyze(&self, url: &str, template_id: &str) -> Result<AnalysisResult> {
        let started = Instant::now();
        let mut timings = StageTimings::default();

        let result = self.run(url, template_id, &mut timings).await;
        timings.total_ms = started.elapsed().as_millis() as u64;

        match result {
            Ok((template, routes)) => {
                info!(url = %url, total_ms = timings.total_ms, "Website analysis completed");
                Ok(AnalysisResult {
                    template,
                    routes,
                    timings,
                })
            }
            Err(e) => {
                warn!(
                    url = %url,
                    error = format!("{e:#}"),
                    partial_timings = ?timings,
                    "Website analysis failed"
                );
                Err(e)
            }
        }
    }

    async fn run(
        &self,
        url: &str,
        template_id: &str,
        timings: &mut StageTimings,
    ) -> Result<(Template, Vec<String>)> {
        let template = templates::get(template_id)
            .ok_or_else(|| anyhow!("unknown template: {template_id}"))?;

        let parsed = Url::parse(url).context("invalid website url")?;
        let origin = parsed.origin().ascii_serialization();

        // Route discovery over the site origin
        let stage_start = Instant::now();
        let routes = crawl(Arc::clone(&self.fetcher), &origin)
            .await
            .context("route discovery failed")?;
        timings.crawl_ms = stage_start.elapsed().as_millis() as u64;

        // Route filtering, only once the site is big enough to need it
        let stage_start = Instant::now();
        let selected = if routes.len() <= MAX_UNFILTERED_ROUTES {
            routes
        } else {
            self.filter_routes(&routes).await?
        };
        timings.filter_ms = stage_start.elapsed().as_millis() as u64;

        // Scraping, sequential; pages that fail contribute nothing
        let stage_start = Instant::now();
        let mut pages: Vec<PageContent> = Vec::with_capacity(selected.len());
        for route in &selected {
            if let Some(page) = scrape(self.fetcher.as_ref(), route).await {
                pages.push(page);
            }
        }
        timings.scrape_ms = stage_start.elapsed().as_millis() as u64;
        debug!(
            selected = selected.len(),
            scraped = pages.len(),
            "Scraping finished"
        );

        // Per-page synthesis, all pages in flight together
        let stage_start = Instant::now();
        let syntheses: Vec<String> = join_all(pages.iter().map(|page| self.synthesize_page(page)))
            .await
            .into_iter()
            .flatten()
            .collect();
        timings.synthesis_ms = stage_start.elapsed().as_millis() as u64;

        // Consolidation; a single surviving synthesis is used verbatim
        let stage_start = Instant::now();
        let content = match syntheses.len() {
            0 => String::new(),
            1 => syntheses.into_iter().next().unwrap_or_default(),
            _ => self.consolidate(&syntheses).await?,
        };
        timings.consolidation_ms = stage_start.elapsed().as_millis() as u64;

        // Template filling, every stage in flight together
        let stage_start = Instant::now();
        let stages = join_all(
            template
                .stages
                .iter()
                .map(|stage| self.fill_stage(stage, &content)),
        )
        .await;
        timings.fill_ms = stage_start.elapsed().as_millis() as u64;

        let filled = Template {
            id: template.id.clone(),
            name: template.name.clone(),
            stages,
        };
        Ok((filled, selected))
    }

    /// Ask the model for the most informative routes. The homepage is
    /// always scraped and is kept at the front of the selection.
    ///
    /// A response that does not parse as a JSON array fails the whole job.
    async fn filter_routes(&self, routes: &[String]) -> Result<Vec<String>> {
        let request = CompletionRequest::new(&self.model)
            .message(ChatMessage::system(prompts::ROUTE_FILTER_SYSTEM))
            .message(ChatMessage::user(prompts::route_filter(routes)))
            .temperature(0.2);
        let response = self
            .gateway
            .complete(request)
            .await
            .context("route filter call failed")?;

        let picked: Vec<String> = serde_json::from_str(strip_code_fences(&response))
            .context("route filter response was not a JSON array of urls")?;

        let mut selected = Vec::with_capacity(FILTERED_ROUTE_COUNT + 1);
        selected.push(routes[0].clone());
        for route in picked.into_iter().take(FILTERED_ROUTE_COUNT) {
            if !selected.contains(&route) {
                selected.push(route);
            }
        }
        Ok(selected)
    }

    /// Reduce one scraped page to a factual summary. A failed call drops
    /// the page from the content set.
    async fn synthesize_page(&self, page: &PageContent) -> Option<String> {
        let request = CompletionRequest::new(&self.model)
            .message(ChatMessage::system(prompts::PAGE_SYNTHESIS_SYSTEM))
            .message(ChatMessage::user(prompts::page_synthesis(page)))
            .temperature(0.3);
        match self.gateway.complete(request).await {
            Ok(synthesis) => Some(synthesis),
            Err(e) => {
                warn!(url = %page.url, error = %e, "Page synthesis failed, dropping page");
                None
            }
        }
    }

    async fn consolidate(&self, syntheses: &[String]) -> Result<String> {
        let request = CompletionRequest::new(&self.model)
            .message(ChatMessage::system(prompts::CONSOLIDATION_SYSTEM))
            .message(ChatMessage::user(prompts::consolidation(syntheses)))
            .temperature(0.3);
        self.gateway
            .complete(request)
            .await
            .context("consolidation call failed")
    }

    /// Fill one stage's editable content. Any failure - gateway error or
    /// unparseable response - returns the stage unmodified.
    async fn fill_stage(&self, stage: &Stage, content: &str) -> Stage {
        let request = CompletionRequest::new(&self.model)
            .message(ChatMessage::system(prompts::STAGE_FILL_SYSTEM))
            .message(ChatMessage::user(prompts::stage_fill(stage, content)))
            .temperature(0.4);

        let response = match self.gateway.complete(request).await {
            Ok(response) => response,
            Err(e) => {
                warn!(stage = %stage.identifier, error = %e, "Stage fill failed, keeping original");
                return stage.clone();
            }
        };

        match serde_json::from_str::<StageFill>(strip_code_fences(&response)) {
            Ok(fill) => templates::apply_fill(stage, &fill),
            Err(e) => {
                warn!(
                    stage = %stage.identifier,
                    error = %e,
                    "Stage fill response was not valid JSON, keeping original"
                );
                stage.clone()
            }
        }
    }
}
