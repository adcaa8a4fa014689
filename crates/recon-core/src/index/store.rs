//! Index persistence as CSV.

use std::path::Path;

use tracing::debug;

use crate::error::{ReconError, Result};
use crate::models::DocumentRecord;

/// Write the flat index, one row per document.
pub fn write_index_csv(path: &Path, records: &[DocumentRecord]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    debug!("Wrote {} index rows to {}", records.len(), path.display());
    Ok(())
}

/// Load an index written by [`write_index_csv`].
pub fn read_index_csv(path: &Path) -> Result<Vec<DocumentRecord>> {
    if !path.is_file() {
        return Err(ReconError::InputNotFound(path.to_path_buf()));
    }

    let mut reader = csv::Reader::from_path(path)?;
    let records = reader
        .deserialize::<DocumentRecord>()
        .collect::<std::result::Result<Vec<_>, _>>()?;
    debug!("Loaded {} index rows from {}", records.len(), path.display());
    Ok(records)
}
