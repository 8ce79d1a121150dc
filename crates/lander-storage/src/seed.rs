//! Seed loading for the in-memory store.
//!
//! A seed file is a JSON array of page definitions in the data-store read
//! contract shape. Duplicate slugs are rejected rather than silently
//! shadowed.

use std::collections::HashSet;
use std::path::Path;

use tracing::info;

use crate::model::PageDefinition;
use crate::{MemoryStore, StorageError};

/// Load every page in the seed file at `path` into a fresh [`MemoryStore`].
///
/// # Errors
///
/// Returns [`StorageError::Seed`] if the file cannot be read, is not a JSON
/// array of pages, or contains the same slug twice.
pub async fn load_seed(path: impl AsRef<Path>) -> Result<MemoryStore, StorageError> {
    let path = path.as_ref();
    let seed_err = |reason: String| StorageError::Seed {
        path: path.display().to_string(),
        reason,
    };

    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| seed_err(e.to_string()))?;
    let pages: Vec<PageDefinition> =
        serde_json::from_str(&raw).map_err(|e| seed_err(e.to_string()))?;

    let mut seen = HashSet::new();
    for page in &pages {
        if !seen.insert(page.slug.as_str()) {
            return Err(seed_err(format!("duplicate slug '{}'", page.slug)));
        }
    }

    let store = MemoryStore::new();
    let count = pages.len();
    for page in pages {
        store.insert_page(page).await;
    }

    info!(path = %path.display(), pages = count, "seed loaded");
    Ok(store)
}
