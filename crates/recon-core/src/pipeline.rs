//! End-to-end reconciliation run.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, warn};

use crate::error::Result;
use crate::extract::{CandidateExtractor, Expected};
use crate::index::{Corpus, DocumentIndex, DocumentIndexer, read_index_csv, write_index_csv};
use crate::ledger::{load_ledger, load_overrides};
use crate::matching::{AnywhereRecheck, Comparator, MatchResolver, judge};
use crate::models::{DocumentRecord, ExtractedFields, LedgerRow, ReconConfig, Verdict};
use crate::pdf::{DocumentReader, DocumentText, DocumentTextCache};
use crate::report::{
    INDEX_FILE, MANIFEST_FILE, RenameEntry, ReportAggregator, Summary, copy_unique, proposed_name,
    write_manifest,
};

/// Inputs and switches of one run.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub ledger: PathBuf,
    /// Corpus directory or zip archive.
    pub corpus: PathBuf,
    /// Previously written index; when set the corpus is not re-indexed.
    pub index: Option<PathBuf>,
    pub overrides: Option<PathBuf>,
    pub out_dir: PathBuf,
    /// Only reconcile rows of this section.
    pub section: Option<String>,
    pub propose_renames: bool,
    /// Copy matched documents here under their proposed names.
    pub rename_dir: Option<PathBuf>,
}

/// Result of a finished run.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub summary: Summary,
    pub verdicts: Vec<Verdict>,
    pub renamed: Vec<RenameEntry>,
}

/// Runs indexing, matching, comparison, recheck and reporting.
///
/// One [`DocumentTextCache`] is built per run and shared by every stage, so
/// each document is read at most once.
pub struct Reconciler {
    config: ReconConfig,
    reader: DocumentReader,
    extractor: Arc<CandidateExtractor>,
}

impl Reconciler {
    pub fn new(config: ReconConfig) -> Self {
        let reader = DocumentReader::new(&config);
        let extractor = Arc::new(CandidateExtractor::new(&config.extraction));
        Self {
            config,
            reader,
            extractor,
        }
    }

    /// Replace the document reader, e.g. with a different text source.
    pub fn with_reader(mut self, reader: DocumentReader) -> Self {
        self.reader = reader;
        self
    }

    pub fn config(&self) -> &ReconConfig {
        &self.config
    }

    /// Index every allow-listed file of `corpus`.
    pub async fn index_corpus<F>(
        &self,
        corpus: &Corpus,
        cache: &DocumentTextCache,
        on_record: F,
    ) -> Result<Vec<DocumentRecord>>
    where
        F: Fn(&DocumentRecord),
    {
        let files = corpus.files(&self.config.pdf)?;
        let indexer = DocumentIndexer::new(self.reader.clone(), self.extractor.clone(), self.config.pdf.jobs);
        Ok(indexer.index_files_with_progress(files, cache, on_record).await)
    }

    /// Reconcile a ledger against a corpus and write all reports.
    pub async fn run(&self, options: &RunOptions) -> Result<RunOutcome> {
        self.run_with_progress(options, |_| {}).await
    }

    /// Like [`run`](Self::run), calling `on_record` for every indexed document.
    pub async fn run_with_progress<F>(&self, options: &RunOptions, on_record: F) -> Result<RunOutcome>
    where
        F: Fn(&DocumentRecord),
    {
        let mut rows = load_ledger(&options.ledger)?;
        if let Some(section) = &options.section {
            rows.retain(|r| &r.section == section);
            info!("Reconciling {} rows of section '{}'", rows.len(), section);
        }

        let corpus = Corpus::open(&options.corpus)?;
        let cache = DocumentTextCache::new();

        let records = match &options.index {
            Some(path) => read_index_csv(path)?,
            None => self.index_corpus(&corpus, &cache, on_record).await?,
        };
        let mut aggregator = ReportAggregator::create(&options.out_dir, &self.config.report)?;
        write_index_csv(&options.out_dir.join(INDEX_FILE), &records)?;
        let index = DocumentIndex::new(records);

        let overrides = match &options.overrides {
            Some(path) => match load_overrides(path) {
                Ok(overrides) => overrides,
                Err(e) => {
                    warn!("Ignoring overrides: {}", e);
                    Vec::new()
                }
            },
            None => Vec::new(),
        };
        let resolver = MatchResolver::new(&self.config.matching).with_overrides(&overrides, Some(corpus.root()));
        let resolutions = resolver.resolve_all(&rows, &index);

        let comparator = Comparator::new(&self.config.compare);
        let recheck = self
            .config
            .recheck
            .enabled
            .then(|| AnywhereRecheck::new(&self.config.recheck));
        let propose = options.propose_renames || options.rename_dir.is_some();

        let mut verdicts = Vec::with_capacity(rows.len());
        let mut renamed = Vec::new();

        for (row, resolution) in rows.iter().zip(resolutions) {
            let mut notes = resolution.notes;
            let candidate = resolution.candidate;

            let document = candidate.as_ref().map(|c| c.document_ref.clone());
            let (extracted, text) = match &document {
                Some(path) if path.is_file() => {
                    self.read_fields(row, path, &index, &cache, &mut notes).await
                }
                Some(path) => {
                    notes.push(format!("document_missing:{}", path.display()));
                    (None, None)
                }
                None => (None, None),
            };

            let mut verdict = judge(row, candidate, extracted, &comparator, notes);

            if let (Some(recheck), Some(text)) = (&recheck, &text) {
                recheck.apply(&mut verdict, text);
            }

            if propose && verdict.match_candidate.is_some() {
                verdict.proposed_name = Some(proposed_name(row));
            }

            if let (Some(dir), Some(name), Some(source)) =
                (&options.rename_dir, verdict.proposed_name.clone(), &document)
            {
                if source.is_file() {
                    match copy_unique(source, dir, &name) {
                        Ok(destination) => renamed.push(RenameEntry {
                            row_id: row.row_id.clone(),
                            source_path: source.clone(),
                            destination_path: destination,
                        }),
                        Err(e) => {
                            warn!("Could not copy {} for row {}: {}", source.display(), row.row_id, e);
                            verdict.notes.push(format!("rename_failed:{}", e));
                        }
                    }
                }
            }

            aggregator.record(&verdict)?;
            verdicts.push(verdict);
        }

        if options.rename_dir.is_some() {
            write_manifest(&options.out_dir.join(MANIFEST_FILE), &renamed)?;
        }

        let summary = aggregator.finish(index.records())?;
        info!(
            "Reconciled {} rows: {} ok, {} mismatch, {} missing",
            summary.totals.rows, summary.totals.ok, summary.totals.mismatch, summary.totals.missing_pdf
        );

        Ok(RunOutcome {
            summary,
            verdicts,
            renamed,
        })
    }

    /// Fields of the matched document, biased towards the row's values.
    ///
    /// Falls back to the unbiased index values when the text cannot be read.
    async fn read_fields(
        &self,
        row: &LedgerRow,
        path: &Path,
        index: &DocumentIndex,
        cache: &DocumentTextCache,
        notes: &mut Vec<String>,
    ) -> (Option<ExtractedFields>, Option<Arc<DocumentText>>) {
        match cache.get_or_read(&self.reader, path).await {
            Ok(text) => {
                let fields = self
                    .extractor
                    .extract(&text.joined(), &Expected::from_row(row))
                    .fields();
                (Some(fields), Some(text))
            }
            Err(e) => {
                warn!("Using index values for {}: {}", path.display(), e);
                notes.push(format!("text_unavailable:{}", e));
                let fields = index
                    .get(path)
                    .map(|r| ExtractedFields {
                        number: r.extracted_number.clone(),
                        date: r.extracted_date,
                        amount: r.extracted_amount,
                    })
                    .unwrap_or_default();
                (Some(fields), None)
            }
        }
    }
}
