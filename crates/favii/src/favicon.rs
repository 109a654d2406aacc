//! Favicon URL resolution from `<link>` tags
//!
//! A link whose `rel` is exactly `icon` or `shortcut icon` is a strict match;
//! any `rel` containing `icon` (e.g. `apple-touch-icon`) is a loose match.
//! The last strict match wins, then the last loose match, then the host's
//! `/favicon.ico`.

use crate::types::Link;

/// Path used when a page advertises no icon
pub const DEFAULT_FAVICON_PATH: &str = "/favicon.ico";

const STRICT_RELS: &[&str] = &["icon", "shortcut icon"];

/// Pick the favicon URL for a page from its links
pub fn resolve_favicon_url(links: &[Link], scheme: &str, hostname: &str) -> String {
    let mut strict: Option<String> = None;
    let mut loose: Option<String> = None;

    for link in links {
        if STRICT_RELS.contains(&link.rel.as_str()) {
            strict = Some(normalize_href(&link.href, scheme, hostname));
        }
        if link.rel.contains("icon") {
            loose = Some(normalize_href(&link.href, scheme, hostname));
        }
    }

    strict
        .filter(|url| !url.is_empty())
        .or_else(|| loose.filter(|url| !url.is_empty()))
        .unwrap_or_else(|| format!("{}://{}{}", scheme, hostname, DEFAULT_FAVICON_PATH))
}

/// Turn an `href` into an absolute URL on the page's origin
///
/// Anything starting with `http` is taken as already absolute, including
/// oddities like `httpfoo`. Paths keep no part of the page's own path.
pub fn normalize_href(href: &str, scheme: &str, hostname: &str) -> String {
    if href.starts_with("http") {
        href.to_string()
    } else if href.starts_with('/') {
        format!("{}://{}{}", scheme, hostname, href)
    } else {
        format!("{}://{}/{}", scheme, hostname, href)
    }
}
