use crate::RuntimeError;
use std::fs;
use std::io::{self, Cursor};
use std::path::{Path, PathBuf};

/// Extract an in-memory zip archive into `dest`.
///
/// Entries whose names would escape `dest` are skipped. Returns the relative
/// paths of the extracted files, in archive order.
pub fn extract_zip(bytes: &[u8], dest: &Path) -> Result<Vec<PathBuf>, RuntimeError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| RuntimeError::Archive(format!("invalid zip archive: {e}")))?;

    fs::create_dir_all(dest)?;
    let mut extracted = Vec::new();
    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|e| RuntimeError::Archive(format!("failed to read zip entry {i}: {e}")))?;
        let Some(relative) = entry.enclosed_name().map(Path::to_path_buf) else {
            tracing::warn!("skipping unsafe zip entry: {}", entry.name());
            continue;
        };
        let out_path = dest.join(&relative);
        if entry.is_dir() {
            fs::create_dir_all(&out_path)?;
            continue;
        }
        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut out_file = fs::File::create(&out_path)?;
        io::copy(&mut entry, &mut out_file).map_err(|e| {
            RuntimeError::Archive(format!("failed to extract {}: {e}", relative.display()))
        })?;
        extracted.push(relative);
    }
    tracing::debug!(
        "extracted {} files into {}",
        extracted.len(),
        dest.display()
    );
    Ok(extracted)
}
