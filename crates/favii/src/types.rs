//! Core types for Favii

use crate::favicon::resolve_favicon_url;
use serde::{Deserialize, Serialize};
use url::Url;

/// `name` and `content` of a `<meta>` tag
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meta {
    pub name: String,
    pub content: String,
}

impl Meta {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }
}

/// `rel` and `href` of a `<link>` tag
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub rel: String,
    pub href: String,
}

impl Link {
    pub fn new(rel: impl Into<String>, href: impl Into<String>) -> Self {
        Self {
            rel: rel.into(),
            href: href.into(),
        }
    }
}

/// Meta and link tags collected from one fetched page
///
/// The scheme and hostname always describe the URL that was fetched, never
/// anything found inside the page. Values are immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMetaInfo {
    url: String,
    scheme: String,
    hostname: String,
    metas: Vec<Meta>,
    links: Vec<Link>,
}

impl PageMetaInfo {
    /// Build page info for `url` from extracted tags
    ///
    /// Returns `None` if the URL has no host.
    pub fn new(url: &Url, metas: Vec<Meta>, links: Vec<Link>) -> Option<Self> {
        Some(Self {
            url: url.to_string(),
            scheme: url.scheme().to_string(),
            hostname: hostname(url)?,
            metas,
            links,
        })
    }

    /// The URL the page was fetched from
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// Host of the fetched URL, without port or IPv6 brackets
    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    /// `<meta>` tags in document order
    pub fn metas(&self) -> &[Meta] {
        &self.metas
    }

    /// `<link>` tags in document order
    pub fn links(&self) -> &[Link] {
        &self.links
    }

    /// Content of the first `<meta>` with the given name
    pub fn meta_content(&self, name: &str) -> Option<&str> {
        self.metas
            .iter()
            .find(|meta| meta.name == name)
            .map(|meta| meta.content.as_str())
    }

    /// Best favicon URL for the page
    ///
    /// Never fails: without any icon links this is `/favicon.ico` on the
    /// page's host.
    pub fn favicon_url(&self) -> String {
        resolve_favicon_url(&self.links, &self.scheme, &self.hostname)
    }
}

/// Host of a URL without port, IPv6 addresses unbracketed
pub(crate) fn hostname(url: &Url) -> Option<String> {
    let host = url.host_str().filter(|h| !h.is_empty())?;
    let host = host
        .strip_prefix('[')
        .and_then(|h| h.strip_suffix(']'))
        .unwrap_or(host);
    Some(host.to_string())
}
