use crate::error::{StorageError, StorageResult};
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Replace `path` with `bytes` so readers see either the old or the new
/// content, never a truncated file.
///
/// The temp file is created next to the target so the final rename stays on
/// one filesystem.
pub(crate) fn replace_file(path: &Path, bytes: &[u8]) -> StorageResult<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    fs::create_dir_all(parent).map_err(|e| StorageError::write(parent, e))?;

    let mut tmp = NamedTempFile::new_in(parent).map_err(|e| StorageError::write(path, e))?;
    tmp.write_all(bytes)
        .and_then(|()| tmp.as_file().sync_all())
        .map_err(|e| StorageError::write(path, e))?;
    tmp.persist(path)
        .map_err(|e| StorageError::write(path, e.error))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replace_creates_and_overwrites() {
        let tmp = tempfile::tempdir().unwrap();
        let target = tmp.path().join("nested").join("doc.json");

        replace_file(&target, b"first").unwrap();
        assert_eq!(fs::read(&target).unwrap(), b"first");

        replace_file(&target, b"second").unwrap();
        assert_eq!(fs::read(&target).unwrap(), b"second");

        let leftovers = fs::read_dir(target.parent().unwrap()).unwrap().count();
        assert_eq!(leftovers, 1);
    }
}
