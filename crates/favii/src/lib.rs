//! Favii - favicon and page metadata lookup
//!
//! Fetches a page, collects its `<meta>` and `<link>` tags with a streaming
//! tokenizer, and picks the page's favicon URL from the links, falling back
//! to `/favicon.ico` on the page's host.
//!
//! ```no_run
//! # async fn run() -> Result<(), favii::FaviiError> {
//! let favii = favii::Favii::new(true)?;
//! let info = favii.get_page_info("https://www.rust-lang.org/learn").await?;
//! println!("{}", info.favicon_url());
//! # Ok(())
//! # }
//! ```
//!
//! ## Pieces
//!
//! - [`Tokenizer`] - pull-based HTML tokenizer over any reader
//! - [`extract`] - folds a token stream into [`Meta`] and [`Link`] records
//! - [`resolve_favicon_url`] - strict `icon` match, then loose `*icon*`
//!   match, then the default path
//! - [`Transport`] - fetch seam; [`ReqwestTransport`] is the HTTP default
//! - [`Cache`] - per-hostname page cache; [`MemoryCache`] is the default

pub mod cache;
mod client;
mod error;
mod extract;
mod favicon;
pub mod tokenizer;
pub mod transport;
mod types;

pub use cache::{Cache, MemoryCache};
pub use client::{Favii, FaviiBuilder};
pub use error::{FaviiError, TokenizeError, TransportError};
pub use extract::{extract, Extraction};
pub use favicon::{normalize_href, resolve_favicon_url, DEFAULT_FAVICON_PATH};
pub use tokenizer::{Tag, Token, Tokenizer};
pub use transport::{
    Body, ReqwestTransport, Transport, TransportOptions, DEFAULT_MAX_BODY_SIZE,
};
pub use types::{Link, Meta, PageMetaInfo};

/// Default User-Agent string
pub const DEFAULT_USER_AGENT: &str = "Favii/0.1";
