//! Per-host page cache
//!
//! Entries are keyed by hostname only, so every path on a host shares the
//! page info of whichever URL was stored for it. Nothing expires.

use crate::types::PageMetaInfo;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

/// Storage for page info, keyed by hostname
///
/// Implementations must be safe to share between tasks. Concurrent lookups
/// of a cold host may both miss and both insert; the last insert wins.
pub trait Cache: Send + Sync {
    /// Cached page info for `hostname`, if any
    fn get(&self, hostname: &str) -> Option<Arc<PageMetaInfo>>;

    /// Store page info for `hostname`, replacing any previous entry
    fn insert(&self, hostname: String, info: Arc<PageMetaInfo>);
}

/// In-memory cache living as long as the process (or the value) does
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, Arc<PageMetaInfo>>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cached hosts
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Cache for MemoryCache {
    fn get(&self, hostname: &str) -> Option<Arc<PageMetaInfo>> {
        // Values are immutable, so a poisoned map is still consistent
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(hostname)
            .cloned()
    }

    fn insert(&self, hostname: String, info: Arc<PageMetaInfo>) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(hostname, info);
    }
}

impl<C: Cache + ?Sized> Cache for Arc<C> {
    fn get(&self, hostname: &str) -> Option<Arc<PageMetaInfo>> {
        (**self).get(hostname)
    }

    fn insert(&self, hostname: String, info: Arc<PageMetaInfo>) {
        (**self).insert(hostname, info);
    }
}
