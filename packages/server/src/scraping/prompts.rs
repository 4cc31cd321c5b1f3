//! Prompt construction for the analysis pipeline.

use ai_gateway::truncate_to_char_boundary;
use site_crawler::PageContent;

use crate::templates::Stage;

/// Upper bound on page text shipped to the model per request.
pub const MAX_PAGE_TEXT_BYTES: usize = 12_000;

pub const ROUTE_FILTER_SYSTEM: &str = "You select the most informative pages of a business \
website for building a customer-service chatbot. Respond with a JSON array of URLs taken \
verbatim from the provided list, nothing else.";

pub const PAGE_SYNTHESIS_SYSTEM: &str = "You extract business facts from website pages: what \
the business does, products and services with prices, opening hours, location, contact \
details, policies. Respond with a compact factual summary in the page's language. If the \
page has no useful business information, respond with an empty string.";

pub const CONSOLIDATION_SYSTEM: &str = "You merge several factual summaries of pages from \
the same business website into one coherent summary. Remove duplicated facts, keep every \
distinct one, and preserve the original language.";

pub const STAGE_FILL_SYSTEM: &str = "You configure one stage of a customer-service chatbot \
using facts about a business. Rewrite the editable block contents and step texts so they \
speak for this concrete business, keeping each one's intent. Respond with JSON only, in the \
form {\"blocks\": [{\"block_identifier\", \"block_content\"}], \"steps\": [{\"number\", \
\"text\"}]}. Do not invent identifiers or step numbers that are not in the stage.";

pub fn route_filter(routes: &[String]) -> String {
    format!(
        "From the following pages of one website, pick the 5 most informative for \
         understanding the business (services, prices, hours, contact, about). Return a JSON \
         array with exactly those 5 URLs.\n\n{}",
        routes.join("\n")
    )
}

pub fn page_synthesis(page: &PageContent) -> String {
    format!(
        "Page: {}\nTitle: {}\n\n{}",
        page.url,
        page.title,
        truncate_to_char_boundary(&page.text, MAX_PAGE_TEXT_BYTES)
    )
}

pub fn consolidation(syntheses: &[String]) -> String {
    let mut prompt = String::from("Merge these page summaries into one:\n");
    for (index, synthesis) in syntheses.iter().enumerate() {
        prompt.push_str(&format!("\n--- Summary {} ---\n{}\n", index + 1, synthesis));
    }
    prompt
}

pub fn stage_fill(stage: &Stage, content: &str) -> String {
    let editable_blocks: Vec<_> = stage
        .blocks
        .iter()
        .filter(|b| b.editable)
        .map(|b| {
            serde_json::json!({
                "block_identifier": b.block_identifier,
                "block_content": b.block_content,
            })
        })
        .collect();
    let steps: Vec<_> = stage
        .steps
        .iter()
        .map(|s| serde_json::json!({ "number": s.number, "text": s.text }))
        .collect();

    format!(
        "Stage \"{}\".\nEditable blocks:\n{}\nSteps:\n{}\n\nBusiness facts:\n{}",
        stage.identifier,
        serde_json::to_string_pretty(&editable_blocks).unwrap_or_default(),
        serde_json::to_string_pretty(&steps).unwrap_or_default(),
        content
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::templates;

    #[test]
    fn route_filter_lists_every_route() {
        let routes = vec![
            "https://example.com".to_string(),
            "https://example.com/about".to_string(),
        ];
        let prompt = route_filter(&routes);
        for route in &routes {
            assert!(prompt.contains(route));
        }
    }

    #[test]
    fn page_synthesis_truncates_long_text() {
        let page = PageContent {
            url: "https://example.com".to_string(),
            title: "Inicio".to_string(),
            text: "x".repeat(MAX_PAGE_TEXT_BYTES * 2),
        };
        let prompt = page_synthesis(&page);
        assert!(prompt.len() < MAX_PAGE_TEXT_BYTES + 200);
    }

    #[test]
    fn stage_fill_includes_only_editable_blocks() {
        let stage = &templates::get("barberia").unwrap().stages[0];
        let prompt = stage_fill(stage, "facts");
        assert!(prompt.contains("presentacion"));
        assert!(!prompt.contains("politica_horario"));
    }
}
