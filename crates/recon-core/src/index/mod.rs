//! Corpus indexing and the read-only document index used for matching.

mod corpus;
mod store;

pub use corpus::Corpus;
pub use store::{read_index_csv, write_index_csv};

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::NaiveDate;
use futures_util::stream::{self, StreamExt};
use tracing::{debug, info, warn};

use crate::extract::CandidateExtractor;
use crate::models::DocumentRecord;
use crate::normalize::normalize_number;
use crate::pdf::{DocumentReader, DocumentTextCache};

/// Builds one [`DocumentRecord`] per corpus file.
///
/// A file that cannot be read yields a record with `error` set; indexing
/// never fails as a whole because of a single document.
pub struct DocumentIndexer {
    reader: DocumentReader,
    extractor: Arc<CandidateExtractor>,
    jobs: usize,
}

impl DocumentIndexer {
    pub fn new(reader: DocumentReader, extractor: Arc<CandidateExtractor>, jobs: usize) -> Self {
        Self {
            reader,
            extractor,
            jobs: jobs.max(1),
        }
    }

    /// Index `files` with up to `jobs` documents in flight. Output is sorted by path.
    pub async fn index_files(&self, files: Vec<PathBuf>, cache: &DocumentTextCache) -> Vec<DocumentRecord> {
        self.index_files_with_progress(files, cache, |_| {}).await
    }

    /// Like [`index_files`](Self::index_files), calling `on_record` as each document finishes.
    pub async fn index_files_with_progress<F>(
        &self,
        files: Vec<PathBuf>,
        cache: &DocumentTextCache,
        on_record: F,
    ) -> Vec<DocumentRecord>
    where
        F: Fn(&DocumentRecord),
    {
        let total = files.len();
        info!("Indexing {} documents with {} workers", total, self.jobs);

        let mut records: Vec<DocumentRecord> = stream::iter(files)
            .map(|path| self.index_one(path, cache))
            .buffer_unordered(self.jobs)
            .inspect(|record| on_record(record))
            .collect()
            .await;

        records.sort_by(|a, b| a.source_path.cmp(&b.source_path));

        let failed = records.iter().filter(|r| r.is_failed()).count();
        info!("Indexed {} documents ({} with errors)", total, failed);
        records
    }

    async fn index_one(&self, path: PathBuf, cache: &DocumentTextCache) -> DocumentRecord {
        match cache.get_or_read(&self.reader, &path).await {
            Ok(text) => {
                if text.is_blank() {
                    debug!("No text in {}", path.display());
                }
                self.extractor.record(&path, &text.joined())
            }
            Err(e) => {
                warn!("Failed to read {}: {}", path.display(), e);
                DocumentRecord::failed(&path, e.to_string())
            }
        }
    }
}

/// Read-only lookup structure over the indexed documents.
#[derive(Debug, Clone, Default)]
pub struct DocumentIndex {
    records: Vec<DocumentRecord>,
    by_number: HashMap<String, Vec<usize>>,
}

impl DocumentIndex {
    pub fn new(mut records: Vec<DocumentRecord>) -> Self {
        records.sort_by(|a, b| a.source_path.cmp(&b.source_path));

        let mut by_number: HashMap<String, Vec<usize>> = HashMap::new();
        for (idx, record) in records.iter().enumerate() {
            let Some(number) = record.extracted_number.as_deref() else { continue };
            let key = normalize_number(number);
            if !key.is_empty() {
                by_number.entry(key).or_default().push(idx);
            }
        }

        Self { records, by_number }
    }

    pub fn records(&self) -> &[DocumentRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Documents whose normalized number equals `normalized`, in path order.
    pub fn by_number(&self, normalized: &str) -> Vec<&DocumentRecord> {
        self.by_number
            .get(normalized)
            .map(|ids| ids.iter().map(|&i| &self.records[i]).collect())
            .unwrap_or_default()
    }

    /// Documents dated exactly `date`, in path order.
    pub fn by_date(&self, date: NaiveDate) -> impl Iterator<Item = &DocumentRecord> {
        self.records
            .iter()
            .filter(move |r| r.extracted_date == Some(date))
    }

    pub fn get(&self, path: &Path) -> Option<&DocumentRecord> {
        self.records
            .binary_search_by(|r| r.source_path.as_path().cmp(path))
            .ok()
            .map(|i| &self.records[i])
    }

    pub fn failed(&self) -> impl Iterator<Item = &DocumentRecord> {
        self.records.iter().filter(|r| r.is_failed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DocumentError;
    use crate::models::config::PdfConfig;
    use crate::pdf::TextSource;

    struct Utf8Pages;

    impl TextSource for Utf8Pages {
        fn page_texts(&self, data: &[u8], _max_pages: usize) -> crate::pdf::Result<Vec<String>> {
            let text = std::str::from_utf8(data).map_err(|e| DocumentError::Parse(e.to_string()))?;
            Ok(vec![text.to_string()])
        }
    }

    fn record(path: &str, number: Option<&str>) -> DocumentRecord {
        let mut r = DocumentRecord::empty(Path::new(path));
        r.extracted_number = number.map(str::to_string);
        r
    }

    #[test]
    fn test_lookup_by_normalized_number() {
        let index = DocumentIndex::new(vec![
            record("/c/b.pdf", Some("fv/01/2024")),
            record("/c/a.pdf", Some("FV/001/2024")),
            record("/c/c.pdf", None),
        ]);

        let hits: Vec<_> = index.by_number("FV/1/2024").iter().map(|r| r.filename.clone()).collect();
        assert_eq!(hits, vec!["a.pdf", "b.pdf"]);
        assert!(index.by_number("FV/2/2024").is_empty());
        assert!(index.get(Path::new("/c/c.pdf")).is_some());
    }

    #[tokio::test]
    async fn test_indexer_records_failures_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.pdf"), "FAKTURA FV/2/2024\nNETTO 10,00").unwrap();
        std::fs::write(dir.path().join("a.pdf"), [0xff, 0xfe, 0x00]).unwrap();

        let reader = DocumentReader::with_source(Arc::new(Utf8Pages), &PdfConfig::default());
        let indexer = DocumentIndexer::new(reader, Arc::new(CandidateExtractor::default()), 2);
        let cache = DocumentTextCache::new();

        let corpus = Corpus::open(dir.path()).unwrap();
        let files = corpus.files(&PdfConfig::default()).unwrap();
        let records = indexer.index_files(files, &cache).await;

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].filename, "a.pdf");
        assert!(records[0].is_failed());
        assert_eq!(records[1].extracted_number.as_deref(), Some("FV/2/2024"));
        assert_eq!(cache.len(), 2);
    }
}
