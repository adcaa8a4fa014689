//! Bounded per-document text reading with OCR fallback.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use super::{OcrEngine, PdfTextSource, Result, TesseractOcr, TextSource};
use crate::error::DocumentError;
use crate::models::config::{PdfConfig, ReconConfig};

/// Page texts of one document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentText {
    pub pages: Vec<String>,
}

impl DocumentText {
    pub fn new(pages: Vec<String>) -> Self {
        Self { pages }
    }

    /// All pages joined by newlines.
    pub fn joined(&self) -> String {
        self.pages.join("\n")
    }

    pub fn is_blank(&self) -> bool {
        self.pages.iter().all(|p| p.trim().is_empty())
    }
}

/// Reads document text through a [`TextSource`], applying size, page and
/// time limits.
#[derive(Clone)]
pub struct DocumentReader {
    source: Arc<dyn TextSource>,
    ocr: Option<Arc<dyn OcrEngine>>,
    max_file_size_mb: u64,
    max_pages: usize,
    timeout: Duration,
}

impl DocumentReader {
    /// The default reader: PDF text layer, tesseract when OCR is enabled.
    pub fn new(config: &ReconConfig) -> Self {
        let reader = Self::with_source(Arc::new(PdfTextSource::new()), &config.pdf);
        if config.ocr.enabled {
            reader.with_ocr(Arc::new(TesseractOcr::new(&config.ocr)))
        } else {
            reader
        }
    }

    pub fn with_source(source: Arc<dyn TextSource>, config: &PdfConfig) -> Self {
        Self {
            source,
            ocr: None,
            max_file_size_mb: config.max_file_size_mb,
            max_pages: config.max_pages,
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    pub fn with_ocr(mut self, ocr: Arc<dyn OcrEngine>) -> Self {
        self.ocr = Some(ocr);
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Reject files above the size limit without reading them.
    pub fn check_size(&self, path: &Path) -> Result<()> {
        let size = std::fs::metadata(path)?.len();
        let size_mb = size as f64 / (1024.0 * 1024.0);
        if size_mb > self.max_file_size_mb as f64 {
            return Err(DocumentError::TooLarge {
                size_mb,
                limit_mb: self.max_file_size_mb,
            });
        }
        Ok(())
    }

    /// Read a document synchronously.
    pub fn read(&self, path: &Path) -> Result<DocumentText> {
        self.check_size(path)?;
        let data = std::fs::read(path)?;

        let mut pages = self.source.page_texts(&data, self.max_pages)?;

        if let Some(ocr) = &self.ocr {
            for (idx, page) in pages.iter_mut().enumerate() {
                if !page.trim().is_empty() {
                    continue;
                }
                let page_no = idx as u32 + 1;
                match self.ocr_page(ocr.as_ref(), &data, page_no) {
                    Ok(text) => *page = text,
                    Err(e) => warn!("OCR failed for {} page {}: {}", path.display(), page_no, e),
                }
            }
        }

        Ok(DocumentText::new(pages))
    }

    fn ocr_page(&self, ocr: &dyn OcrEngine, data: &[u8], page: u32) -> Result<String> {
        let images = self.source.page_images(data, page)?;
        debug!("OCR on page {} ({} images)", page, images.len());

        let mut text = String::new();
        for image in &images {
            let recognized = ocr.recognize(image)?;
            if !text.is_empty() {
                text.push('\n');
            }
            text.push_str(recognized.trim_end());
        }
        Ok(text)
    }

    /// Read a document on the blocking pool, giving up after the configured timeout.
    ///
    /// A timed-out read keeps running in the background; its result is discarded.
    pub async fn read_with_timeout(&self, path: &Path) -> Result<DocumentText> {
        let reader = self.clone();
        let owned: PathBuf = path.to_path_buf();
        let task = tokio::task::spawn_blocking(move || reader.read(&owned));

        match tokio::time::timeout(self.timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_error)) => Err(DocumentError::Parse(format!("extraction aborted: {}", join_error))),
            Err(_) => Err(DocumentError::Timeout(self.timeout.as_secs())),
        }
    }
}
