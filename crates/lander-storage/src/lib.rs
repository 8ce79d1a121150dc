//! Data-store contracts for `Lander`.
//!
//! The renderer never talks to a database directly. It reads page
//! definitions through [`PageStore`] and hands conversion events to a
//! [`ConversionSink`]. Both traits mirror the hosted backend's request/response
//! contract and know nothing about sanitization or HTTP.
//!
//! Implementations provided:
//!
//! - [`MemoryStore`]: in-memory pages and events, for development and tests
//! - [`FileConversionSink`]: append-only JSON-lines event log
//! - [`PostgresStore`]: PostgreSQL tables (feature `postgres-backend`)

mod error;
mod file_sink;
mod memory;
pub mod model;
#[cfg(feature = "postgres-backend")]
mod postgres_backend;
mod seed;

pub use error::StorageError;
pub use file_sink::FileConversionSink;
pub use memory::{DEFAULT_EVENT_CAPACITY, MemoryStore};
#[cfg(feature = "postgres-backend")]
pub use postgres_backend::PostgresStore;
pub use seed::load_seed;

use model::{ConversionEvent, PageDefinition};

/// Read side of the data store: resolve a published page by its slug.
///
/// Implementations must be safe to share across async tasks (`Send + Sync`).
#[async_trait::async_trait]
pub trait PageStore: Send + Sync + 'static {
    /// Look up the page routed at `slug`, together with its template.
    ///
    /// Returns `Ok(None)` if no page has this slug. Unpublished pages may be
    /// returned; filtering them is the caller's job.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Read`] if the underlying backend fails.
    async fn find_by_slug(&self, slug: &str) -> Result<Option<PageDefinition>, StorageError>;
}

/// Write side of the data store: persist a conversion event.
///
/// Events are facts. A sink appends them and never updates or deletes.
#[async_trait::async_trait]
pub trait ConversionSink: Send + Sync + 'static {
    /// Short name used in logs when a write fails.
    fn name(&self) -> &str;

    /// Persist one event.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Write`] or [`StorageError::Serialization`] if
    /// the event could not be stored.
    async fn record(&self, event: &ConversionEvent) -> Result<(), StorageError>;
}
