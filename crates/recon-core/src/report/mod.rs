//! Run outputs: the verdict log, the summary and the top-mismatches view.

mod rename;
mod summary;

pub use rename::{RenameEntry, copy_unique, proposed_name, write_manifest};
pub use summary::{ItemError, SectionCounts, Summary};

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{ReconError, Result};
use crate::models::config::ReportConfig;
use crate::models::{DocumentRecord, Overall, Verdict};

pub const VERDICTS_FILE: &str = "verdicts.jsonl";
pub const SUMMARY_FILE: &str = "summary.json";
pub const TOP_MISMATCHES_FILE: &str = "top_mismatches.csv";
pub const INDEX_FILE: &str = "index.csv";
pub const MANIFEST_FILE: &str = "rename_manifest.csv";

/// One line of `top_mismatches.csv`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MismatchLine {
    pub row_id: String,
    pub section: String,
    pub failing_fields: String,
    pub failing_count: usize,
    pub document_path: Option<PathBuf>,
    pub confidence: Option<f32>,
    pub expected_number: Option<String>,
    pub found_number: Option<String>,
    pub expected_date: Option<NaiveDate>,
    pub found_date: Option<NaiveDate>,
    pub expected_amount: Option<Decimal>,
    pub found_amount: Option<Decimal>,
    pub alternate_status: Option<String>,
}

impl MismatchLine {
    fn from_verdict(verdict: &Verdict) -> Self {
        let failing = verdict.failing_fields();
        Self {
            row_id: verdict.ledger_row_id.clone(),
            section: verdict.section.clone(),
            failing_fields: failing.join(";"),
            failing_count: failing.len(),
            document_path: verdict.match_candidate.as_ref().map(|c| c.document_ref.clone()),
            confidence: verdict.match_candidate.as_ref().map(|c| c.confidence),
            expected_number: verdict.expected.number.clone(),
            found_number: verdict.extracted.number.clone(),
            expected_date: verdict.expected.date,
            found_date: verdict.extracted.date,
            expected_amount: verdict.expected.amount,
            found_amount: verdict.extracted.amount,
            alternate_status: verdict.alternate_status.clone(),
        }
    }
}

/// Streams verdicts to the log as they are produced and keeps running counts.
///
/// Verdicts must be recorded in ledger order; the log and the tie-breaking
/// of the top-mismatches view both follow recording order.
pub struct ReportAggregator {
    out_dir: PathBuf,
    log: BufWriter<File>,
    summary: Summary,
    mismatches: Vec<MismatchLine>,
    top_n: usize,
}

impl ReportAggregator {
    /// Start a fresh verdict log in `out_dir`, creating the directory if needed.
    pub fn create(out_dir: &Path, config: &ReportConfig) -> Result<Self> {
        fs::create_dir_all(out_dir)?;
        let log_path = out_dir.join(VERDICTS_FILE);
        if log_path.exists() {
            fs::remove_file(&log_path)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(&log_path)?;

        Ok(Self {
            out_dir: out_dir.to_path_buf(),
            log: BufWriter::new(file),
            summary: Summary::default(),
            mismatches: Vec::new(),
            top_n: config.top_mismatches,
        })
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    /// Append one verdict to the log and count it.
    pub fn record(&mut self, verdict: &Verdict) -> Result<()> {
        serde_json::to_writer(&mut self.log, verdict)?;
        self.log.write_all(b"\n")?;

        self.summary.add(verdict);
        if verdict.overall == Overall::Mismatch {
            self.mismatches.push(MismatchLine::from_verdict(verdict));
        }
        debug!("Row {}: {}", verdict.ledger_row_id, verdict.effective_status());
        Ok(())
    }

    pub fn summary(&self) -> &Summary {
        &self.summary
    }

    /// Flush the log and write `summary.json` and `top_mismatches.csv`.
    pub fn finish(mut self, documents: &[DocumentRecord]) -> Result<Summary> {
        self.log.flush()?;
        self.summary.set_documents(documents);

        let mut summary_file = BufWriter::new(File::create(self.out_dir.join(SUMMARY_FILE))?);
        serde_json::to_writer_pretty(&mut summary_file, &self.summary)?;
        summary_file.flush()?;

        let top = top_mismatches(self.mismatches, self.top_n);
        let mut writer = csv::Writer::from_path(self.out_dir.join(TOP_MISMATCHES_FILE))?;
        for line in &top {
            writer.serialize(line)?;
        }
        writer.flush()?;

        info!(
            "Report written to {} ({} rows, {} mismatches shown)",
            self.out_dir.display(),
            self.summary.totals.rows,
            top.len()
        );
        Ok(self.summary)
    }
}

/// Rank mismatches by failing-field count, keeping recording order on ties.
pub fn top_mismatches(mut lines: Vec<MismatchLine>, n: usize) -> Vec<MismatchLine> {
    lines.sort_by(|a, b| b.failing_count.cmp(&a.failing_count));
    lines.truncate(n);
    lines
}

/// Read back a verdict log.
pub fn read_verdicts(path: &Path) -> Result<Vec<Verdict>> {
    let content = fs::read_to_string(path)?;
    content
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| serde_json::from_str::<Verdict>(l).map_err(ReconError::from))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ExtractedFields, FieldCheck, FieldComparisons, MismatchReason};
    use pretty_assertions::assert_eq;

    fn verdict(row_id: &str, failing: usize) -> Verdict {
        let fail = || FieldCheck::fail(MismatchReason::NotFound { expected: None });
        let check = |i: usize| if i < failing { fail() } else { FieldCheck::pass() };
        let comparisons = FieldComparisons {
            number: check(0),
            date: check(1),
            amount: check(2),
        };
        Verdict {
            ledger_row_id: row_id.to_string(),
            section: "Koszty".to_string(),
            expected: ExtractedFields::default(),
            match_candidate: None,
            extracted: ExtractedFields::default(),
            overall: if comparisons.all_passed() {
                Overall::Ok
            } else {
                Overall::Mismatch
            },
            field_comparisons: Some(comparisons),
            alternate_status: None,
            anywhere: None,
            proposed_name: None,
            notes: Vec::new(),
        }
    }

    #[test]
    fn test_top_mismatches_ranking() {
        let lines = ["a", "b", "c", "d"]
            .iter()
            .zip([1, 3, 1, 2])
            .map(|(id, n)| MismatchLine::from_verdict(&verdict(id, n)))
            .collect();

        let ids: Vec<_> = top_mismatches(lines, 3).into_iter().map(|l| l.row_id).collect();
        assert_eq!(ids, vec!["b", "d", "a"]);
    }

    #[test]
    fn test_aggregator_writes_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");

        let mut aggregator = ReportAggregator::create(&out, &ReportConfig::default()).unwrap();
        aggregator.record(&verdict("1", 0)).unwrap();
        aggregator.record(&verdict("2", 2)).unwrap();
        let summary = aggregator.finish(&[]).unwrap();

        assert_eq!(summary.totals.ok, 1);
        assert_eq!(summary.totals.mismatch, 1);

        let verdicts = read_verdicts(&out.join(VERDICTS_FILE)).unwrap();
        assert_eq!(verdicts.len(), 2);
        assert_eq!(verdicts[1].ledger_row_id, "2");

        let stored: Summary =
            serde_json::from_str(&fs::read_to_string(out.join(SUMMARY_FILE)).unwrap()).unwrap();
        assert_eq!(stored, summary);

        let top = fs::read_to_string(out.join(TOP_MISMATCHES_FILE)).unwrap();
        assert_eq!(top.lines().count(), 2);
        assert!(top.lines().nth(1).unwrap().starts_with("2,Koszty,number;date,2,"));
    }

    #[test]
    fn test_new_run_starts_fresh_log() {
        let dir = tempfile::tempdir().unwrap();
        for _ in 0..2 {
            let mut aggregator = ReportAggregator::create(dir.path(), &ReportConfig::default()).unwrap();
            aggregator.record(&verdict("1", 0)).unwrap();
            aggregator.finish(&[]).unwrap();
        }
        assert_eq!(read_verdicts(&dir.path().join(VERDICTS_FILE)).unwrap().len(), 1);
    }
}
