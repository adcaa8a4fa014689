//! Corpus discovery: a directory of documents or a zip archive of one.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use glob::{Pattern, glob};
use tempfile::TempDir;
use tracing::{debug, info, warn};
use zip::ZipArchive;

use crate::error::{ReconError, Result};
use crate::models::config::PdfConfig;

/// The document corpus of one run.
///
/// An archive is extracted into a temporary directory that lives as long as
/// the `Corpus` value.
#[derive(Debug)]
pub struct Corpus {
    root: PathBuf,
    _extracted: Option<TempDir>,
}

impl Corpus {
    /// Open a corpus root. A missing root is the only fatal condition.
    pub fn open(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ReconError::InputNotFound(path.to_path_buf()));
        }

        if path.is_file() {
            if !is_zip(path) {
                return Err(ReconError::Config(format!(
                    "corpus must be a directory or a .zip archive: {}",
                    path.display()
                )));
            }
            let dir = extract_archive(path)?;
            return Ok(Self {
                root: dir.path().to_path_buf(),
                _extracted: Some(dir),
            });
        }

        Ok(Self {
            root: path.to_path_buf(),
            _extracted: None,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn is_archive(&self) -> bool {
        self._extracted.is_some()
    }

    /// All files under the root whose extension is allow-listed, sorted by path.
    pub fn files(&self, config: &PdfConfig) -> Result<Vec<PathBuf>> {
        let pattern = format!("{}/**/*", Pattern::escape(&self.root.to_string_lossy()));
        let allowed: Vec<String> = config
            .allowed_extensions
            .iter()
            .map(|e| e.trim_start_matches('.').to_lowercase())
            .collect();

        let mut files: Vec<PathBuf> = glob(&pattern)
            .map_err(|e| ReconError::Config(format!("invalid corpus pattern: {}", e)))?
            .filter_map(|entry| match entry {
                Ok(path) => Some(path),
                Err(e) => {
                    warn!("Skipping unreadable corpus entry: {}", e);
                    None
                }
            })
            .filter(|p| p.is_file())
            .filter(|p| {
                let ext = p.extension().and_then(|e| e.to_str()).unwrap_or("");
                allowed.iter().any(|a| a == &ext.to_lowercase())
            })
            .collect();

        files.sort();
        debug!("Found {} corpus files under {}", files.len(), self.root.display());
        Ok(files)
    }
}

fn is_zip(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("zip"))
}

/// Extract an archive into a fresh temporary directory.
///
/// Entries whose path would escape the directory are skipped.
fn extract_archive(path: &Path) -> Result<TempDir> {
    let file = File::open(path)?;
    let mut archive = ZipArchive::new(file)?;
    let dir = tempfile::Builder::new().prefix("recon-corpus-").tempdir()?;

    let mut extracted = 0usize;
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let Some(relative) = entry.enclosed_name() else {
            warn!("Skipping archive entry with unsafe path: {}", entry.name());
            continue;
        };
        let out_path = dir.path().join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&out_path)?;
            continue;
        }
        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut out = File::create(&out_path)?;
        io::copy(&mut entry, &mut out)?;
        extracted += 1;
    }

    info!("Extracted {} files from {}", extracted, path.display());
    Ok(dir)
}
