//! Page transport
//!
//! Design: the orchestrator only needs "URL in, readable body out". The
//! [`Transport`] trait is that seam; [`ReqwestTransport`] is the default
//! HTTP implementation and tests swap in their own.
//!
//! The HTTP body is not collected up front. A background task forwards
//! response chunks through a small bounded channel and the returned
//! [`Body`] reads them as they arrive, so the tokenizer consumes the page
//! while it downloads.

use crate::error::TransportError;
use crate::DEFAULT_USER_AGENT;
use async_trait::async_trait;
use bytes::{Buf, Bytes};
use futures::StreamExt;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use std::io::{self, Read};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use url::Url;

/// Readable response body
///
/// Bodies may block while waiting for data, so read them off the async
/// runtime (e.g. inside `spawn_blocking`).
pub type Body = Box<dyn Read + Send>;

/// Accept header sent with page requests
const ACCEPT_HTML: &str = "text/html, application/xhtml+xml, */*;q=0.8";

/// Default cap on bytes read from one response (4 MiB)
pub const DEFAULT_MAX_BODY_SIZE: usize = 4 * 1024 * 1024;

/// Response chunks buffered between the network and the reader
const CHUNKS_IN_FLIGHT: usize = 8;

/// Trait for fetching a page body
#[async_trait]
pub trait Transport: Send + Sync {
    /// Identifier for logging
    fn name(&self) -> &'static str;

    /// Fetch the body of `url`
    async fn fetch(&self, url: &Url) -> Result<Body, TransportError>;
}

/// Timeouts, limits and headers for [`ReqwestTransport`]
#[derive(Debug, Clone)]
pub struct TransportOptions {
    /// Custom User-Agent
    pub user_agent: Option<String>,
    /// Time allowed to establish a connection
    pub connect_timeout: Duration,
    /// Time allowed waiting on the server for headers or any body chunk
    pub read_timeout: Duration,
    /// Time allowed to read the whole body
    pub body_timeout: Duration,
    /// Bytes read from the body before the rest is dropped
    pub max_body_size: usize,
}

impl Default for TransportOptions {
    fn default() -> Self {
        Self {
            user_agent: None,
            connect_timeout: Duration::from_secs(10),
            read_timeout: Duration::from_secs(10),
            body_timeout: Duration::from_secs(30),
            max_body_size: DEFAULT_MAX_BODY_SIZE,
        }
    }
}

/// HTTP transport backed by `reqwest`
///
/// Non-success statuses are not errors: error pages are scanned like any
/// other, since they usually carry the site's icons. A body cut short by
/// `body_timeout`, `max_body_size` or a network error ends early and the
/// reader sees what arrived.
pub struct ReqwestTransport {
    client: reqwest::Client,
    body_timeout: Duration,
    max_body_size: usize,
}

impl ReqwestTransport {
    /// Create a transport with default options
    pub fn new() -> Result<Self, TransportError> {
        Self::with_options(TransportOptions::default())
    }

    /// Create a transport with custom options
    pub fn with_options(options: TransportOptions) -> Result<Self, TransportError> {
        let mut headers = HeaderMap::new();
        let user_agent = options.user_agent.as_deref().unwrap_or(DEFAULT_USER_AGENT);
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(user_agent)
                .unwrap_or_else(|_| HeaderValue::from_static(DEFAULT_USER_AGENT)),
        );
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_HTML));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .connect_timeout(options.connect_timeout)
            .read_timeout(options.read_timeout)
            .build()
            .map_err(TransportError::ClientBuildError)?;

        Ok(Self {
            client,
            body_timeout: options.body_timeout,
            max_body_size: options.max_body_size,
        })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    fn name(&self) -> &'static str {
        "reqwest"
    }

    async fn fetch(&self, url: &Url) -> Result<Body, TransportError> {
        if !matches!(url.scheme(), "http" | "https") {
            return Err(TransportError::InvalidUrlScheme);
        }

        let response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(TransportError::from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            warn!(url = %url, status = status.as_u16(), "Non-success status, scanning body anyway");
        }

        let (tx, rx) = mpsc::channel(CHUNKS_IN_FLIGHT);
        let limits = BodyLimits {
            deadline: tokio::time::Instant::now() + self.body_timeout,
            max_size: self.max_body_size,
        };
        tokio::spawn(forward_body(response, tx, limits, url.clone()));

        Ok(Box::new(ChunkReader::new(rx)))
    }
}

/// When to stop forwarding a response body
struct BodyLimits {
    deadline: tokio::time::Instant,
    max_size: usize,
}

/// How forwarding a body ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cutoff {
    Complete,
    Timeout,
    SizeLimit,
    NetworkError,
    ReaderGone,
}

/// Push response chunks into `tx` until the body ends or a limit is hit
async fn forward_body(
    response: reqwest::Response,
    tx: mpsc::Sender<Bytes>,
    limits: BodyLimits,
    url: Url,
) {
    let mut stream = response.bytes_stream();
    let mut forwarded = 0usize;

    let cutoff = loop {
        let Ok(chunk) = tokio::time::timeout_at(limits.deadline, stream.next()).await else {
            break Cutoff::Timeout;
        };

        let mut bytes = match chunk {
            Some(Ok(bytes)) => bytes,
            Some(Err(e)) => {
                warn!(url = %url, error = %e, "Error reading body chunk, ending body early");
                break Cutoff::NetworkError;
            }
            None => break Cutoff::Complete,
        };

        let room = limits.max_size - forwarded;
        let over = bytes.len() > room;
        if over {
            bytes.truncate(room);
        }
        forwarded += bytes.len();

        if !bytes.is_empty() && tx.send(bytes).await.is_err() {
            break Cutoff::ReaderGone;
        }
        if over {
            break Cutoff::SizeLimit;
        }
    };

    match cutoff {
        Cutoff::Timeout => {
            warn!(url = %url, size = forwarded, "Body timeout reached, ending body early")
        }
        Cutoff::SizeLimit => {
            warn!(url = %url, limit = limits.max_size, "Body size limit reached, ignoring the rest")
        }
        _ => {}
    }
    debug!(url = %url, size = forwarded, ?cutoff, "Finished reading page body");
}

/// Blocking [`Read`] over chunks sent from [`forward_body`]
///
/// End of input is reported once the sender is dropped.
struct ChunkReader {
    rx: mpsc::Receiver<Bytes>,
    current: Bytes,
}

impl ChunkReader {
    fn new(rx: mpsc::Receiver<Bytes>) -> Self {
        Self {
            rx,
            current: Bytes::new(),
        }
    }
}

impl Read for ChunkReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        while self.current.is_empty() {
            match self.rx.blocking_recv() {
                Some(chunk) => self.current = chunk,
                None => return Ok(0),
            }
        }
        let n = buf.len().min(self.current.len());
        buf[..n].copy_from_slice(&self.current[..n]);
        self.current.advance(n);
        Ok(n)
    }
}
