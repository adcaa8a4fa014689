//! Canonical document names and collision-safe copies.

use std::fs::{self, File, OpenOptions};
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::models::LedgerRow;
use crate::normalize::{format_amount_comma, sanitize_for_filename};

const SEPARATOR: &str = " – ";

/// Highest ` (n)` suffix tried before giving up on a name.
const MAX_SUFFIX: u32 = 10_000;

/// The canonical name for the document of `row`:
/// `zal <attachment> – <number> – <YYYY-MM-DD> – <amount>.pdf`.
///
/// The attachment part is the hint's file name without a `.pdf` extension, or the row id when the ledger
/// has no hint. Parts the ledger does not know are left out.
pub fn proposed_name(row: &LedgerRow) -> String {
    let attachment = row
        .attachment_hint
        .as_deref()
        .map(attachment_label)
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| row.row_id.clone());

    let mut parts = vec![format!("zal {}", sanitize_for_filename(&attachment))];
    if let Some(number) = row.expected_number.as_deref() {
        let number = sanitize_for_filename(number);
        if !number.is_empty() {
            parts.push(number);
        }
    }
    if let Some(date) = row.expected_date {
        parts.push(date.format("%Y-%m-%d").to_string());
    }
    if let Some(amount) = row.expected_amount {
        parts.push(format_amount_comma(amount));
    }

    format!("{}.pdf", parts.join(SEPARATOR))
}

fn attachment_label(hint: &str) -> String {
    let path = Path::new(hint.trim());
    let is_pdf = path
        .extension()
        .is_some_and(|e| e.to_string_lossy().eq_ignore_ascii_case("pdf"));
    let label = if is_pdf { path.file_stem() } else { path.file_name() };
    label
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| hint.trim().to_string())
}

/// One executed copy, as recorded in the rename manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenameEntry {
    pub row_id: String,
    pub source_path: PathBuf,
    pub destination_path: PathBuf,
}

/// Copy `source` into `dir` as `name`, never overwriting another file.
///
/// Each candidate name is created with `create_new`, so a file that appears
/// between the check and the write is detected. A destination that already
/// holds identical bytes is reused; otherwise ` (n)` is appended before the
/// extension.
pub fn copy_unique(source: &Path, dir: &Path, name: &str) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let contents = fs::read(source)?;

    let stem = Path::new(name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| name.to_string());
    let extension = Path::new(name)
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    for n in 0..=MAX_SUFFIX {
        let candidate = if n == 0 {
            dir.join(name)
        } else {
            dir.join(format!("{} ({}){}", stem, n, extension))
        };

        match OpenOptions::new().write(true).create_new(true).open(&candidate) {
            Ok(mut file) => {
                write_or_discard(&mut file, &candidate, &contents, |f| f.sync_all())?;
                debug!("Copied {} -> {}", source.display(), candidate.display());
                return Ok(candidate);
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                if same_contents(&candidate, &contents)? {
                    debug!("Reusing identical {}", candidate.display());
                    return Ok(candidate);
                }
            }
            Err(e) => return Err(e.into()),
        }
    }

    Err(io::Error::new(
        ErrorKind::AlreadyExists,
        format!("no free name for {} in {}", name, dir.display()),
    )
    .into())
}

/// Write `contents` to the freshly created `path`, removing it again when
/// the write does not complete.
fn write_or_discard<W: io::Write>(
    file: &mut W,
    path: &Path,
    contents: &[u8],
    finish: impl FnOnce(&mut W) -> io::Result<()>,
) -> io::Result<()> {
    let written = file
        .write_all(contents)
        .and_then(|()| file.flush())
        .and_then(|()| finish(file));
    if let Err(e) = written {
        if let Err(remove) = fs::remove_file(path) {
            warn!("Could not remove partial copy {}: {}", path.display(), remove);
        }
        return Err(e);
    }
    Ok(())
}

fn same_contents(path: &Path, contents: &[u8]) -> io::Result<bool> {
    let file = File::open(path)?;
    if file.metadata()?.len() != contents.len() as u64 {
        return Ok(false);
    }
    Ok(fs::read(path)? == contents)
}

/// Write the manifest of executed copies.
pub fn write_manifest(path: &Path, entries: &[RenameEntry]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    for entry in entries {
        writer.serialize(entry)?;
    }
    writer.flush()?;
    info!("Wrote rename manifest with {} entries to {}", entries.len(), path.display());
    Ok(())
}
