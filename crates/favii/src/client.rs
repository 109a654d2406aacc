//! Page lookup client
//!
//! [`Favii`] ties the pieces together: parse the URL, consult the cache,
//! fetch through the transport, tokenize and extract, then store.

use crate::cache::{Cache, MemoryCache};
use crate::error::FaviiError;
use crate::extract::extract;
use crate::tokenizer::Tokenizer;
use crate::transport::{ReqwestTransport, Transport, TransportOptions};
use crate::types::{hostname, PageMetaInfo};
use std::sync::Arc;
use tracing::debug;
use url::Url;

/// Fetches pages and resolves their favicons, optionally caching per host
///
/// Cheap to share: wrap in an `Arc` to use from several tasks.
#[derive(Clone)]
pub struct Favii {
    transport: Arc<dyn Transport>,
    cache: Option<Arc<dyn Cache>>,
    max_token_len: Option<usize>,
}

impl std::fmt::Debug for Favii {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Favii")
            .field("transport", &self.transport.name())
            .field("cache", &self.cache.is_some())
            .field("max_token_len", &self.max_token_len)
            .finish()
    }
}

impl Favii {
    /// Create a client using the default HTTP transport
    ///
    /// With `use_cache`, pages are cached per hostname for the life of the
    /// client.
    pub fn new(use_cache: bool) -> Result<Self, FaviiError> {
        Self::builder().use_cache(use_cache).build()
    }

    /// Create a new client builder
    pub fn builder() -> FaviiBuilder {
        FaviiBuilder::new()
    }

    /// Whether lookups go through a cache
    pub fn is_caching(&self) -> bool {
        self.cache.is_some()
    }

    /// Fetch `url` and collect its meta and link tags
    ///
    /// A malformed URL fails before any network activity. With caching
    /// enabled, a host that was already fetched is answered from the cache,
    /// even if `url` names a different path on it.
    pub async fn get_page_info(&self, url: &str) -> Result<Arc<PageMetaInfo>, FaviiError> {
        let parsed = Url::parse(url).map_err(|source| FaviiError::InvalidUrl {
            url: url.to_string(),
            source,
        })?;
        let host = hostname(&parsed).ok_or_else(|| FaviiError::MissingHost(url.to_string()))?;

        if let Some(cache) = &self.cache {
            if let Some(info) = cache.get(&host) {
                debug!(url = %parsed, hostname = %host, "Cache hit");
                return Ok(info);
            }
        }

        debug!(transport = self.transport.name(), url = %parsed, "Fetching page");
        let body = self.transport.fetch(&parsed).await?;

        // Body reads may block on the network
        let max_token_len = self.max_token_len;
        let extraction = tokio::task::spawn_blocking(move || {
            let mut tokenizer = Tokenizer::new(body);
            if let Some(limit) = max_token_len {
                tokenizer = tokenizer.with_max_token_len(limit);
            }
            extract(tokenizer)
        })
        .await
        .map_err(FaviiError::Extraction)??;

        let info = PageMetaInfo::new(&parsed, extraction.metas, extraction.links)
            .map(Arc::new)
            .ok_or_else(|| FaviiError::MissingHost(url.to_string()))?;

        if let Some(cache) = &self.cache {
            cache.insert(host, Arc::clone(&info));
        }
        Ok(info)
    }

    /// Fetch `url` and return its favicon URL
    pub async fn get_favicon_url(&self, url: &str) -> Result<String, FaviiError> {
        Ok(self.get_page_info(url).await?.favicon_url())
    }
}

/// Builder for configuring a [`Favii`] client
#[derive(Default)]
pub struct FaviiBuilder {
    transport: Option<Arc<dyn Transport>>,
    transport_options: TransportOptions,
    cache: Option<Arc<dyn Cache>>,
    use_cache: bool,
    max_token_len: Option<usize>,
}

impl FaviiBuilder {
    /// Create a builder with caching off and the default transport
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a custom transport instead of the default HTTP one
    pub fn transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    /// Options for the default HTTP transport
    pub fn transport_options(mut self, options: TransportOptions) -> Self {
        self.transport_options = options;
        self
    }

    /// Set custom User-Agent for the default HTTP transport
    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.transport_options.user_agent = Some(ua.into());
        self
    }

    /// Enable a private in-memory cache
    pub fn use_cache(mut self, enable: bool) -> Self {
        self.use_cache = enable;
        self
    }

    /// Use the given cache, e.g. one shared with other clients
    pub fn cache(mut self, cache: impl Cache + 'static) -> Self {
        self.cache = Some(Arc::new(cache));
        self.use_cache = true;
        self
    }

    /// Limit the size of any single markup token
    pub fn max_token_len(mut self, limit: usize) -> Self {
        self.max_token_len = Some(limit);
        self
    }

    /// Build the client
    pub fn build(self) -> Result<Favii, FaviiError> {
        let transport: Arc<dyn Transport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::with_options(self.transport_options)?),
        };

        let cache = match (self.use_cache, self.cache) {
            (false, _) => None,
            (true, Some(cache)) => Some(cache),
            (true, None) => Some(Arc::new(MemoryCache::new()) as Arc<dyn Cache>),
        };

        Ok(Favii {
            transport,
            cache,
            max_token_len: self.max_token_len,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{TokenizeError, TransportError};
    use crate::transport::Body;
    use async_trait::async_trait;
    use std::io::{self, Cursor, Read};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Serves fixed pages by path and counts fetches
    #[derive(Default)]
    struct StubTransport {
        pages: Vec<(&'static str, &'static str)>,
        fetches: Arc<AtomicUsize>,
    }

    impl StubTransport {
        fn page(mut self, path: &'static str, html: &'static str) -> Self {
            self.pages.push((path, html));
            self
        }
    }

    #[async_trait]
    impl Transport for StubTransport {
        fn name(&self) -> &'static str {
            "stub"
        }

        async fn fetch(&self, url: &Url) -> Result<Body, TransportError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            self.pages
                .iter()
                .find(|(path, _)| *path == url.path())
                .map(|&(_, html)| Box::new(Cursor::new(html.as_bytes())) as Body)
                .ok_or_else(|| TransportError::RequestError("not found".to_string()))
        }
    }

    /// Body that fails partway through
    struct BrokenBody(Cursor<&'static [u8]>);

    impl Read for BrokenBody {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.0.read(buf)? {
                0 => Err(io::Error::new(io::ErrorKind::UnexpectedEof, "truncated")),
                n => Ok(n),
            }
        }
    }

    struct BrokenTransport {
        fetches: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Transport for BrokenTransport {
        fn name(&self) -> &'static str {
            "broken"
        }

        async fn fetch(&self, _url: &Url) -> Result<Body, TransportError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(BrokenBody(Cursor::new(
                &b"<html><head><meta name=\"a\" content=\"b\"><link rel=\"icon\" href=\"/i"[..],
            ))))
        }
    }

    const HOME: &str = r#"<html><head>
<meta name="description" content="Home">
<link rel="shortcut icon" href="/img/favicon.svg">
</head></html>"#;

    const DOCS: &str = r#"<html><head>
<meta name="description" content="Docs">
<link rel="icon" href="/docs.png">
</head></html>"#;

    fn client(transport: StubTransport, use_cache: bool) -> Favii {
        Favii::builder()
            .transport(transport)
            .use_cache(use_cache)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_page_info() {
        let favii = client(StubTransport::default().page("/", HOME), false);
        let info = favii.get_page_info("https://example.com/").await.unwrap();

        assert_eq!(info.scheme(), "https");
        assert_eq!(info.hostname(), "example.com");
        assert_eq!(info.meta_content("description"), Some("Home"));
        assert_eq!(info.favicon_url(), "https://example.com/img/favicon.svg");
    }

    #[tokio::test]
    async fn test_cache_hit_skips_transport() {
        let transport = StubTransport::default().page("/", HOME);
        let fetches = Arc::clone(&transport.fetches);
        let favii = client(transport, true);

        let first = favii.get_page_info("https://example.com/").await.unwrap();
        let second = favii.get_page_info("https://example.com/").await.unwrap();

        assert_eq!(*first, *second);
        assert_eq!(fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_no_cache_fetches_each_time() {
        let transport = StubTransport::default().page("/", HOME);
        let fetches = Arc::clone(&transport.fetches);
        let favii = client(transport, false);

        favii.get_page_info("https://example.com/").await.unwrap();
        favii.get_page_info("https://example.com/").await.unwrap();

        assert!(!favii.is_caching());
        assert_eq!(fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_cache_keyed_by_hostname() {
        let transport = StubTransport::default()
            .page("/", HOME)
            .page("/docs", DOCS);
        let fetches = Arc::clone(&transport.fetches);
        let favii = client(transport, true);

        favii.get_page_info("https://example.com/").await.unwrap();
        let docs = favii.get_page_info("https://example.com/docs").await.unwrap();

        // Same host answers with the first page fetched
        assert_eq!(docs.url(), "https://example.com/");
        assert_eq!(docs.meta_content("description"), Some("Home"));
        assert_eq!(fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_invalid_url_never_fetches() {
        let transport = StubTransport::default().page("/", HOME);
        let fetches = Arc::clone(&transport.fetches);
        let favii = client(transport, true);

        let result = favii.get_page_info("lol-lol.com").await;
        assert!(matches!(result, Err(FaviiError::InvalidUrl { .. })));

        let result = favii.get_page_info("mailto:someone@example.com").await;
        assert!(matches!(result, Err(FaviiError::MissingHost(_))));

        assert_eq!(fetches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_transport_error_surfaces() {
        let favii = client(StubTransport::default(), true);
        let result = favii.get_page_info("https://example.com/missing").await;
        assert!(matches!(
            result,
            Err(FaviiError::Transport(TransportError::RequestError(_)))
        ));
    }

    #[tokio::test]
    async fn test_tokenize_error_not_cached() {
        let fetches = Arc::new(AtomicUsize::new(0));
        let favii = Favii::builder()
            .transport(BrokenTransport {
                fetches: Arc::clone(&fetches),
            })
            .use_cache(true)
            .build()
            .unwrap();

        for _ in 0..2 {
            let result = favii.get_page_info("https://example.com/").await;
            assert!(matches!(
                result,
                Err(FaviiError::Tokenize(TokenizeError::Io(_)))
            ));
        }
        assert_eq!(fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_max_token_len() {
        let favii = Favii::builder()
            .transport(StubTransport::default().page("/", HOME))
            .max_token_len(8)
            .build()
            .unwrap();

        let result = favii.get_page_info("https://example.com/").await;
        assert!(matches!(
            result,
            Err(FaviiError::Tokenize(TokenizeError::TokenTooLarge { limit: 8 }))
        ));
    }

    #[tokio::test]
    async fn test_shared_cache_between_clients() {
        let cache = Arc::new(MemoryCache::new());
        let first = Favii::builder()
            .transport(StubTransport::default().page("/", HOME))
            .cache(Arc::clone(&cache))
            .build()
            .unwrap();
        let second = Favii::builder()
            .transport(StubTransport::default())
            .cache(Arc::clone(&cache))
            .build()
            .unwrap();

        first.get_page_info("https://example.com/").await.unwrap();
        let url = second
            .get_favicon_url("https://example.com/other")
            .await
            .unwrap();

        assert_eq!(url, "https://example.com/img/favicon.svg");
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_favicon_default_without_links() {
        let favii = client(
            StubTransport::default().page("/", "<html><body>hi</body></html>"),
            false,
        );
        let url = favii.get_favicon_url("http://example.org/").await.unwrap();
        assert_eq!(url, "http://example.org/favicon.ico");
    }
}
