//! Configuration structures for a reconciliation run.

use std::path::Path;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{ReconError, Result};

/// Main configuration for the recon pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconConfig {
    /// Corpus walking and PDF text extraction.
    pub pdf: PdfConfig,

    /// OCR fallback for pages without a text layer.
    pub ocr: OcrConfig,

    /// Candidate extraction thresholds.
    pub extraction: ExtractionConfig,

    /// Resolver confidences and tolerances.
    pub matching: MatchConfig,

    /// Field comparison tolerances.
    pub compare: CompareConfig,

    /// Secondary full-document amount rescan.
    pub recheck: RecheckConfig,

    /// Report output.
    pub report: ReportConfig,
}

/// Corpus and PDF processing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PdfConfig {
    /// File extensions (lower-case, without dot) that are indexed.
    pub allowed_extensions: Vec<String>,

    /// Files larger than this are recorded as unreadable.
    pub max_file_size_mb: u64,

    /// Maximum pages read per document.
    pub max_pages: usize,

    /// Time budget for reading one document.
    pub timeout_secs: u64,

    /// Number of documents processed concurrently.
    pub jobs: usize,
}

impl Default for PdfConfig {
    fn default() -> Self {
        Self {
            allowed_extensions: vec!["pdf".to_string()],
            max_file_size_mb: 50,
            max_pages: 100,
            timeout_secs: 60,
            jobs: 4,
        }
    }
}

/// OCR collaborator configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Run OCR on pages that yield no text.
    pub enabled: bool,

    /// OCR executable (tesseract-compatible command line).
    pub command: String,

    /// Language passed to the OCR engine.
    pub language: String,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            command: "tesseract".to_string(),
            language: "pol".to_string(),
        }
    }
}

/// Candidate extraction configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Minimum similarity to accept a number candidate against the expected one.
    pub number_similarity_threshold: f32,

    /// Same, when the expected number is itself `/`-segmented.
    pub segmented_similarity_threshold: f32,

    /// Currency assumed when the document names none.
    pub default_currency: String,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            number_similarity_threshold: 0.75,
            segmented_similarity_threshold: 0.90,
            default_currency: "PLN".to_string(),
        }
    }
}

/// Resolver configuration. Confidence values are tuning knobs, not semantics.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    pub override_confidence: f32,
    pub number_unique: f32,
    pub number_ambiguous: f32,
    pub date_amount_unique: f32,
    pub date_amount_ambiguous: f32,

    /// Absolute amount tolerance for the date+amount fallback.
    pub date_amount_tolerance: Decimal,

    /// Factor applied when a document was already claimed by an earlier row.
    pub shared_document_penalty: f32,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            override_confidence: 1.0,
            number_unique: 1.0,
            number_ambiguous: 0.8,
            date_amount_unique: 0.6,
            date_amount_ambiguous: 0.55,
            date_amount_tolerance: Decimal::new(1, 2),
            shared_document_penalty: 0.9,
        }
    }
}

/// Comparator configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompareConfig {
    /// Maximum distance between expected and found dates.
    pub date_window_days: i64,

    /// Absolute amount tolerance.
    pub abs_tolerance: Decimal,

    /// Relative amount tolerance (fraction of the expected amount).
    pub rel_tolerance: Decimal,
}

impl Default for CompareConfig {
    fn default() -> Self {
        Self {
            date_window_days: 5,
            abs_tolerance: Decimal::new(5, 0),
            rel_tolerance: Decimal::new(1, 2),
        }
    }
}

/// Anywhere recheck configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecheckConfig {
    pub enabled: bool,

    /// Accepted distance from the expected amount, in percent.
    pub tolerance_pct: Decimal,
}

impl Default for RecheckConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            tolerance_pct: Decimal::ONE,
        }
    }
}

/// Report configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Rows kept in the top-mismatches view.
    pub top_mismatches: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self { top_mismatches: 50 }
    }
}

impl ReconConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Apply `RECON_*` environment overrides for the comparison tolerances.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(days) = lookup("RECON_DATE_TOL_DAYS").and_then(|v| v.trim().parse().ok()) {
            debug!("RECON_DATE_TOL_DAYS={}", days);
            self.compare.date_window_days = days;
        }
        if let Some(tol) = lookup("RECON_AMT_REL_TOL").and_then(|v| Decimal::from_str(v.trim()).ok()) {
            debug!("RECON_AMT_REL_TOL={}", tol);
            self.compare.rel_tolerance = tol;
        }
        if let Some(tol) = lookup("RECON_AMT_ABS_TOL").and_then(|v| Decimal::from_str(v.trim()).ok()) {
            debug!("RECON_AMT_ABS_TOL={}", tol);
            self.compare.abs_tolerance = tol;
        }
        if let Some(pct) = lookup("RECON_ANYWHERE_PCT").and_then(|v| Decimal::from_str(v.trim()).ok()) {
            debug!("RECON_ANYWHERE_PCT={}", pct);
            self.recheck.tolerance_pct = pct;
        }
    }

    /// Reject values that would make matching meaningless.
    pub fn validate(&self) -> Result<()> {
        let confidences = [
            ("matching.override_confidence", self.matching.override_confidence),
            ("matching.number_unique", self.matching.number_unique),
            ("matching.number_ambiguous", self.matching.number_ambiguous),
            ("matching.date_amount_unique", self.matching.date_amount_unique),
            ("matching.date_amount_ambiguous", self.matching.date_amount_ambiguous),
            ("matching.shared_document_penalty", self.matching.shared_document_penalty),
        ];
        for (key, value) in confidences {
            if !(0.0..=1.0).contains(&value) {
                return Err(ReconError::Config(format!("{key} must be within [0, 1], got {value}")));
            }
        }

        if self.compare.date_window_days < 0 {
            return Err(ReconError::Config("compare.date_window_days must not be negative".to_string()));
        }
        if self.compare.abs_tolerance.is_sign_negative() || self.compare.rel_tolerance.is_sign_negative() {
            return Err(ReconError::Config("compare tolerances must not be negative".to_string()));
        }
        if self.recheck.tolerance_pct.is_sign_negative() {
            return Err(ReconError::Config("recheck.tolerance_pct must not be negative".to_string()));
        }
        if self.pdf.jobs == 0 {
            warn!("pdf.jobs is 0, one worker will be used");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ReconConfig::default();
        assert_eq!(config.compare.date_window_days, 5);
        assert_eq!(config.compare.abs_tolerance, Decimal::new(5, 0));
        assert_eq!(config.compare.rel_tolerance, Decimal::new(1, 2));
        assert_eq!(config.matching.number_ambiguous, 0.8);
        assert!(config.recheck.enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: ReconConfig =
            serde_json::from_str(r#"{"compare": {"date_window_days": 3}}"#).unwrap();
        assert_eq!(config.compare.date_window_days, 3);
        assert_eq!(config.compare.abs_tolerance, Decimal::new(5, 0));
        assert_eq!(config.report.top_mismatches, 50);
    }

    #[test]
    fn test_env_overrides() {
        let mut config = ReconConfig::default();
        config.apply_overrides(|key| match key {
            "RECON_DATE_TOL_DAYS" => Some("3".to_string()),
            "RECON_AMT_ABS_TOL" => Some("0.5".to_string()),
            "RECON_AMT_REL_TOL" => Some("not a number".to_string()),
            _ => None,
        });
        assert_eq!(config.compare.date_window_days, 3);
        assert_eq!(config.compare.abs_tolerance, Decimal::new(5, 1));
        assert_eq!(config.compare.rel_tolerance, Decimal::new(1, 2));
    }

    #[test]
    fn test_validate_rejects_out_of_range_confidence() {
        let mut config = ReconConfig::default();
        config.matching.number_ambiguous = 1.5;
        assert!(matches!(config.validate(), Err(ReconError::Config(_))));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let mut config = ReconConfig::default();
        config.recheck.tolerance_pct = Decimal::new(5, 1);
        config.save(&path).unwrap();

        let loaded = ReconConfig::from_file(&path).unwrap();
        assert_eq!(loaded.recheck.tolerance_pct, Decimal::new(5, 1));
    }
}
