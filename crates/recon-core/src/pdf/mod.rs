//! PDF text access.

mod cache;
mod extractor;
mod ocr;
mod reader;

pub use cache::DocumentTextCache;
pub use extractor::PdfTextSource;
pub use ocr::{OcrEngine, TesseractOcr};
pub use reader::{DocumentReader, DocumentText};

use image::DynamicImage;

use crate::error::DocumentError;

/// Result type for document operations.
pub type Result<T> = std::result::Result<T, DocumentError>;

/// Per-page text extraction from raw document bytes.
pub trait TextSource: Send + Sync {
    /// Text of the first `max_pages` pages, one entry per page (possibly empty).
    fn page_texts(&self, data: &[u8], max_pages: usize) -> Result<Vec<String>>;

    /// Raster images of a 1-based page, used for OCR of pages without text.
    fn page_images(&self, _data: &[u8], _page: u32) -> Result<Vec<DynamicImage>> {
        Ok(Vec::new())
    }
}
