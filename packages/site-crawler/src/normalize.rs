//! Canonical route form for crawl deduplication.
//!
//! A route is `origin + path` with the trailing slash stripped, no query
//! string, no fragment, and at most one path segment that contains no dot.
//! The single-segment/no-dot rule is a deliberate heuristic: it excludes
//! asset files (`/images/logo.png`) and deep nested pages (`/blog/my-post`)
//! while keeping top-level pages (`/about`). It also accepts dotted
//! segments that are not files (`/v1.0`) - known limitation, kept as-is.

use url::Url;

/// Canonicalize a discovered link, or reject it with `None`.
///
/// Pure and deterministic; `normalize` is idempotent over its own output.
pub fn normalize(raw: &str) -> Option<String> {
    let parsed = Url::parse(raw).ok()?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return None;
    }
    parsed.host_str()?;

    // Anything carrying a query or fragment is not a route
    if parsed.query().is_some() || parsed.fragment().is_some() {
        return None;
    }

    let segments: Vec<&str> = parsed
        .path()
        .split('/')
        .filter(|s| !s.is_empty())
        .collect();

    match segments.as_slice() {
        [] => Some(parsed.origin().ascii_serialization()),
        [segment] if !segment.contains('.') => Some(format!(
            "{}/{}",
            parsed.origin().ascii_serialization(),
            segment
        )),
        _ => None,
    }
}
