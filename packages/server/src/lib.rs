// Website Analysis API Core
//
// This crate turns a business website into a pre-filled conversational
// funnel template: a bounded crawl discovers the site's routes, an AI
// synthesis pipeline reduces the scraped pages to business facts, and the
// facts are written into the editable parts of a catalog template. Jobs
// run detached and are polled over HTTP.

pub mod config;
pub mod scraping;
pub mod server;
pub mod templates;

pub use config::*;
