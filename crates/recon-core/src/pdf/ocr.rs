//! OCR collaborator for pages without a text layer.

use std::process::Command;

use image::{DynamicImage, ImageFormat};
use tracing::debug;

use super::Result;
use crate::error::DocumentError;
use crate::models::config::OcrConfig;

/// Turns a page image into text.
pub trait OcrEngine: Send + Sync {
    fn recognize(&self, image: &DynamicImage) -> Result<String>;
}

/// OCR through an external tesseract-compatible executable.
#[derive(Debug, Clone)]
pub struct TesseractOcr {
    command: String,
    language: String,
}

impl TesseractOcr {
    pub fn new(config: &OcrConfig) -> Self {
        Self {
            command: config.command.clone(),
            language: config.language.clone(),
        }
    }
}

impl OcrEngine for TesseractOcr {
    fn recognize(&self, image: &DynamicImage) -> Result<String> {
        let scratch = tempfile::Builder::new()
            .prefix("recon-ocr-")
            .suffix(".png")
            .tempfile()?;
        image
            .save_with_format(scratch.path(), ImageFormat::Png)
            .map_err(|e| DocumentError::Ocr(e.to_string()))?;

        debug!("Running {} on {}x{} image", self.command, image.width(), image.height());
        let output = Command::new(&self.command)
            .arg(scratch.path())
            .arg("stdout")
            .arg("-l")
            .arg(&self.language)
            .output()
            .map_err(|e| DocumentError::Ocr(format!("{}: {}", self.command, e)))?;

        if !output.status.success() {
            return Err(DocumentError::Ocr(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_binary_is_ocr_error() {
        let ocr = TesseractOcr::new(&OcrConfig {
            enabled: true,
            command: "recon-no-such-ocr-binary".to_string(),
            language: "pol".to_string(),
        });
        let image = DynamicImage::new_rgb8(4, 4);
        assert!(matches!(ocr.recognize(&image), Err(DocumentError::Ocr(_))));
    }
}
