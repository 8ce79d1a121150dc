//! In-memory page store and conversion sink.
//!
//! Pages live in a `BTreeMap` keyed by slug and events in a bounded ring
//! buffer, each behind a `RwLock`. Once the buffer is full the oldest event
//! is evicted. Nothing is persisted. Use this for development (fed by
//! [`load_seed`](crate::load_seed)) and in tests that need a real store.

use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::model::{ConversionEvent, PageDefinition};
use crate::{ConversionSink, PageStore, StorageError};

/// An in-memory store implementing both [`PageStore`] and [`ConversionSink`].
///
/// Clones share state, so a test can keep a handle and inspect the events
/// the renderer recorded.
///
/// # Examples
///
/// ```
/// # use lander_storage::{MemoryStore, PageStore};
/// # #[tokio::main]
/// # async fn main() {
/// let store = MemoryStore::new();
/// assert!(store.find_by_slug("missing").await.unwrap().is_none());
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct MemoryStore {
    pages: Arc<RwLock<BTreeMap<String, PageDefinition>>>,
    events: Arc<RwLock<VecDeque<ConversionEvent>>>,
    event_capacity: usize,
}

/// Events kept by [`MemoryStore::new`] before the oldest are evicted.
pub const DEFAULT_EVENT_CAPACITY: usize = 10_000;

impl Default for MemoryStore {
    fn default() -> Self {
        Self::with_event_capacity(DEFAULT_EVENT_CAPACITY)
    }
}

impl MemoryStore {
    /// Create an empty store keeping the last [`DEFAULT_EVENT_CAPACITY`] events.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store keeping at most `capacity` events.
    #[must_use]
    pub fn with_event_capacity(capacity: usize) -> Self {
        Self {
            pages: Arc::default(),
            events: Arc::new(RwLock::new(VecDeque::with_capacity(capacity.min(1024)))),
            event_capacity: capacity,
        }
    }

    /// Insert or replace the page routed at `page.slug`.
    pub async fn insert_page(&self, page: PageDefinition) {
        let mut pages = self.pages.write().await;
        pages.insert(page.slug.clone(), page);
    }

    /// Number of stored pages.
    pub async fn page_count(&self) -> usize {
        self.pages.read().await.len()
    }

    /// Snapshot of the retained events, oldest first.
    pub async fn events(&self) -> Vec<ConversionEvent> {
        self.events.read().await.iter().cloned().collect()
    }
}

#[async_trait::async_trait]
impl PageStore for MemoryStore {
    async fn find_by_slug(&self, slug: &str) -> Result<Option<PageDefinition>, StorageError> {
        let pages = self.pages.read().await;
        Ok(pages.get(slug).cloned())
    }
}

#[async_trait::async_trait]
impl ConversionSink for MemoryStore {
    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "memory"
    }

    async fn record(&self, event: &ConversionEvent) -> Result<(), StorageError> {
        if self.event_capacity == 0 {
            return Ok(());
        }
        let mut events = self.events.write().await;
        if events.len() == self.event_capacity {
            events.pop_front();
        }
        events.push_back(event.clone());
        Ok(())
    }
}
