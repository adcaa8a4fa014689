//! Aggregate counts over a run's verdicts.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::models::{DocumentRecord, Overall, Verdict};

/// Per-section verdict counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionCounts {
    pub rows: usize,
    pub ok: usize,
    pub mismatch: usize,
    pub missing_pdf: usize,
    /// Mismatches granted an alternate status by the anywhere recheck.
    pub ok_anywhere: usize,
}

impl SectionCounts {
    fn add(&mut self, verdict: &Verdict) {
        self.rows += 1;
        match verdict.overall {
            Overall::Ok => self.ok += 1,
            Overall::Mismatch => self.mismatch += 1,
            Overall::MissingPdf => self.missing_pdf += 1,
        }
        if verdict.alternate_status.is_some() {
            self.ok_anywhere += 1;
        }
    }
}

/// A document that could not be read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemError {
    pub path: PathBuf,
    pub error: String,
}

/// Run summary, written as `summary.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub totals: SectionCounts,
    pub by_section: BTreeMap<String, SectionCounts>,
    /// Failing-field name to number of rows failing it.
    pub failing_fields: BTreeMap<String, usize>,
    /// Rows without a document to check.
    pub missing_evidence: usize,
    /// Resolver criterion to number of rows it matched.
    pub by_criterion: BTreeMap<String, usize>,
    pub documents_indexed: usize,
    pub documents_with_errors: usize,
    pub errors: Vec<ItemError>,
}

impl Summary {
    /// Count one verdict.
    pub fn add(&mut self, verdict: &Verdict) {
        self.totals.add(verdict);
        self.by_section
            .entry(verdict.section.clone())
            .or_default()
            .add(verdict);

        for field in verdict.failing_fields() {
            *self.failing_fields.entry(field.to_string()).or_default() += 1;
        }
        if verdict.overall == Overall::MissingPdf {
            self.missing_evidence += 1;
        }
        if let Some(candidate) = &verdict.match_candidate {
            *self
                .by_criterion
                .entry(candidate.criterion.to_string())
                .or_default() += 1;
        }
    }

    /// Record the indexing outcome, including every per-document error.
    pub fn set_documents(&mut self, records: &[DocumentRecord]) {
        self.documents_indexed = records.len();
        self.errors = records
            .iter()
            .filter_map(|r| {
                r.error.as_ref().map(|e| ItemError {
                    path: r.source_path.clone(),
                    error: e.clone(),
                })
            })
            .collect();
        self.documents_with_errors = self.errors.len();
    }
}
