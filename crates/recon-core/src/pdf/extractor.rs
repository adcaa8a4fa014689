//! PDF text and image extraction using lopdf and pdf-extract.

use image::{DynamicImage, ImageBuffer, Rgba};
use lopdf::{Dictionary, Document, Object, ObjectId};
use tracing::{debug, trace};

use super::{Result, TextSource};
use crate::error::DocumentError;

/// Text source backed by the PDF's own text layer.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfTextSource;

impl PdfTextSource {
    pub fn new() -> Self {
        Self
    }

    /// Parse the document, decrypting it with the empty password if needed.
    fn load(data: &[u8]) -> Result<Document> {
        let mut doc = Document::load_mem(data).map_err(|e| DocumentError::Parse(e.to_string()))?;

        if doc.is_encrypted() {
            if doc.decrypt("").is_err() {
                return Err(DocumentError::Encrypted);
            }
            debug!("Decrypted PDF with empty password");
        }

        if doc.get_pages().is_empty() {
            return Err(DocumentError::NoPages);
        }
        Ok(doc)
    }

    /// Whole-document text through pdf-extract, split on form feeds.
    fn fallback_text(doc: &mut Document, data: &[u8], pages: usize) -> Vec<String> {
        if pages == 0 {
            return Vec::new();
        }

        let text = if doc.is_encrypted() {
            Err("encrypted".to_string())
        } else {
            let mut decrypted = Vec::new();
            match doc.save_to(&mut decrypted) {
                Ok(()) => pdf_extract::extract_text_from_mem(&decrypted).map_err(|e| e.to_string()),
                Err(_) => pdf_extract::extract_text_from_mem(data).map_err(|e| e.to_string()),
            }
        };

        match text {
            Ok(text) => {
                let split: Vec<String> = text.split('\u{000c}').map(str::to_string).collect();
                if split.len() == pages {
                    split
                } else {
                    let mut single = vec![String::new(); pages];
                    single[0] = text;
                    single
                }
            }
            Err(e) => {
                debug!("pdf-extract fallback failed: {}", e);
                vec![String::new(); pages]
            }
        }
    }

    fn try_extract_image(doc: &Document, obj: &Object) -> Option<DynamicImage> {
        let Object::Stream(stream) = obj else {
            return None;
        };
        let dict = &stream.dict;

        if dict.get(b"Subtype").ok()?.as_name().ok()? != b"Image" {
            return None;
        }

        let width = dict.get(b"Width").ok()?.as_i64().ok()? as u32;
        let height = dict.get(b"Height").ok()?.as_i64().ok()? as u32;
        trace!("Found image object: {}x{}", width, height);

        if let Ok(filter) = dict.get(b"Filter") {
            let filter_name = match filter {
                Object::Name(name) => Some(name.as_slice()),
                Object::Array(arr) => arr.first().and_then(|o| o.as_name().ok()),
                _ => None,
            };
            match filter_name {
                Some(b"DCTDecode") => {
                    return image::load_from_memory_with_format(&stream.content, image::ImageFormat::Jpeg).ok();
                }
                Some(b"JPXDecode") | Some(b"CCITTFaxDecode") | Some(b"JBIG2Decode") => {
                    trace!("Unsupported image filter");
                    return None;
                }
                _ => {}
            }
        }

        let data = stream
            .decompressed_content()
            .unwrap_or_else(|_| stream.content.clone());

        let color_space = dict
            .get(b"ColorSpace")
            .ok()
            .and_then(|o| match o {
                Object::Name(name) => Some(name.as_slice()),
                Object::Array(arr) => arr.first().and_then(|o| o.as_name().ok()),
                Object::Reference(r) => doc.get_object(*r).ok().and_then(|o| o.as_name().ok()),
                _ => None,
            })
            .unwrap_or(b"DeviceRGB");

        let bits = dict
            .get(b"BitsPerComponent")
            .ok()
            .and_then(|o| o.as_i64().ok())
            .unwrap_or(8);
        if bits != 8 {
            return None;
        }

        let pixels = (width as usize) * (height as usize);
        let channels = match color_space {
            b"DeviceRGB" | b"RGB" => 3,
            b"DeviceGray" | b"G" => 1,
            _ => return None,
        };
        if data.len() < pixels * channels {
            trace!("Image data too short: {} < {}", data.len(), pixels * channels);
            return None;
        }

        let rgba: Vec<u8> = data[..pixels * channels]
            .chunks(channels)
            .flat_map(|px| match px {
                [r, g, b] => [*r, *g, *b, 255],
                [gray] => [*gray, *gray, *gray, 255],
                _ => [0, 0, 0, 255],
            })
            .collect();

        ImageBuffer::<Rgba<u8>, _>::from_raw(width, height, rgba).map(DynamicImage::ImageRgba8)
    }

    /// Resources of a page, following `Parent` inheritance.
    fn page_resources(doc: &Document, node_id: ObjectId) -> Option<Dictionary> {
        let Object::Dictionary(dict) = doc.get_object(node_id).ok()? else {
            return None;
        };

        if let Ok(resources) = dict.get(b"Resources") {
            if let Ok((_, Object::Dictionary(res))) = doc.dereference(resources) {
                return Some(res.clone());
            }
        }

        match dict.get(b"Parent") {
            Ok(Object::Reference(parent)) => Self::page_resources(doc, *parent),
            _ => None,
        }
    }
}

impl TextSource for PdfTextSource {
    fn page_texts(&self, data: &[u8], max_pages: usize) -> Result<Vec<String>> {
        let mut doc = Self::load(data)?;

        let page_numbers: Vec<u32> = doc.get_pages().keys().copied().take(max_pages).collect();
        let mut texts: Vec<String> = page_numbers
            .iter()
            .map(|n| doc.extract_text(&[*n]).unwrap_or_default())
            .collect();

        if texts.iter().all(|t| t.trim().is_empty()) {
            debug!("No text layer found by lopdf, trying pdf-extract");
            texts = Self::fallback_text(&mut doc, data, page_numbers.len());
        }

        debug!(
            "Extracted {} chars from {} pages",
            texts.iter().map(String::len).sum::<usize>(),
            texts.len()
        );
        Ok(texts)
    }

    fn page_images(&self, data: &[u8], page: u32) -> Result<Vec<DynamicImage>> {
        let doc = Self::load(data)?;
        let pages = doc.get_pages();
        let Some(page_id) = pages.get(&page) else {
            return Ok(Vec::new());
        };

        let mut images = Vec::new();
        if let Some(resources) = Self::page_resources(&doc, *page_id) {
            if let Ok(xobjects) = resources.get(b"XObject") {
                if let Ok((_, Object::Dictionary(xobj_dict))) = doc.dereference(xobjects) {
                    for (_name, obj_ref) in xobj_dict.iter() {
                        if let Ok((_, obj)) = doc.dereference(obj_ref) {
                            if let Some(img) = Self::try_extract_image(&doc, obj) {
                                images.push(img);
                            }
                        }
                    }
                }
            }
        }

        debug!("Extracted {} images from page {}", images.len(), page);
        Ok(images)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_garbage_is_parse_error() {
        let result = PdfTextSource::new().page_texts(b"definitely not a pdf", 10);
        assert!(matches!(result, Err(DocumentError::Parse(_))));
    }

    #[test]
    fn test_page_images_of_garbage() {
        assert!(PdfTextSource::new().page_images(b"%PDF-garbage", 1).is_err());
    }
}
