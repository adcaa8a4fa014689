//! Per-run cache of extracted document text.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tracing::trace;

use super::{DocumentReader, DocumentText, Result};

type Entry = std::result::Result<Arc<DocumentText>, crate::error::DocumentError>;

/// Extracted text keyed by document path, read at most once per run.
///
/// Failures are cached too, so an unreadable document is not retried by later
/// stages of the same run.
#[derive(Debug, Default)]
pub struct DocumentTextCache {
    entries: Mutex<HashMap<PathBuf, Entry>>,
}

impl DocumentTextCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, path: &Path) -> Option<Entry> {
        self.lock().get(path).cloned()
    }

    pub fn insert(&self, path: &Path, entry: Entry) {
        self.lock().insert(path.to_path_buf(), entry);
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cached text for `path`, reading it through `reader` on first use.
    pub async fn get_or_read(&self, reader: &DocumentReader, path: &Path) -> Result<Arc<DocumentText>> {
        if let Some(entry) = self.get(path) {
            trace!("text cache hit: {}", path.display());
            return entry;
        }

        let entry = reader.read_with_timeout(path).await.map(Arc::new);
        self.insert(path, entry.clone());
        entry
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<PathBuf, Entry>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
