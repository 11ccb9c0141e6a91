//! CSV report output.

use std::path::Path;

use tracing::info;

use crate::error::Result;

/// Writes a CSV report with the given header fields and rows.
///
/// Parent directories are created as needed; an existing file is
/// overwritten. Rows shorter than the header are padded by the reader, so
/// each row is written as-is.
pub fn write_csv<P, R, F>(path: P, fields: &[&str], rows: R) -> Result<()>
where
    P: AsRef<Path>,
    R: IntoIterator<Item = Vec<F>>,
    F: AsRef<[u8]>,
{
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(fields)?;
    let mut count = 0usize;
    for row in rows {
        writer.write_record(&row)?;
        count += 1;
    }
    writer.flush()?;
    info!(path = %path.display(), rows = count, "CSV report written");
    Ok(())
}
