//! Managed portrait storage.
//!
//! Every enrolled badge may carry a portrait. The image selected by the
//! operator is copied into a managed directory under a name derived from
//! the badge id (`<ID><ext>`), so the directory document never points at
//! files outside the kiosk's own data.

use crate::error::{StorageError, StorageResult};
use badgegate_core::{BadgeId, Error};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct ImageAssets {
    dir: PathBuf,
}

impl ImageAssets {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create the managed directory if it does not exist yet.
    pub fn ensure_dir(&self) -> StorageResult<()> {
        fs::create_dir_all(&self.dir).map_err(|e| StorageError::write(&self.dir, e))
    }

    /// Path a source image will occupy once imported for `id`.
    ///
    /// ```
    /// use badgegate_core::BadgeId;
    /// use badgegate_storage::ImageAssets;
    /// use std::path::Path;
    ///
    /// let assets = ImageAssets::new("user_images");
    /// let id = BadgeId::new("a1b2").unwrap();
    ///
    /// assert_eq!(
    ///     assets.managed_path(&id, Path::new("/home/op/alice.PNG")),
    ///     Path::new("user_images/A1B2.PNG"),
    /// );
    /// ```
    pub fn managed_path(&self, id: &BadgeId, source: &Path) -> PathBuf {
        let file_name = match source.extension() {
            Some(ext) => format!("{}.{}", id.as_str(), ext.to_string_lossy()),
            None => id.as_str().to_string(),
        };
        self.dir.join(file_name)
    }

    /// Copy `source` into the managed directory and return the new path.
    ///
    /// Importing a file that already lives at its managed path is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::MissingResource` if `source` does not exist,
    /// `StorageError::Validation` if the managed path would leave the managed
    /// directory, or `StorageError::Write` if the copy fails.
    pub fn import(&self, id: &BadgeId, source: &Path) -> StorageResult<PathBuf> {
        if !source.is_file() {
            return Err(StorageError::MissingResource(source.to_path_buf()));
        }

        let destination = self.managed_path(id, source);
        if destination.parent() != Some(self.dir.as_path()) {
            return Err(StorageError::Validation(Error::InvalidBadgeId(format!(
                "{id} does not name a file inside {}",
                self.dir.display()
            ))));
        }
        if same_file(source, &destination) {
            return Ok(destination);
        }

        self.ensure_dir()?;
        fs::copy(source, &destination).map_err(|e| StorageError::write(&destination, e))?;
        debug!(
            badge = %id,
            source = %source.display(),
            destination = %destination.display(),
            "Imported badge image"
        );

        Ok(destination)
    }
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_import_copies_under_badge_name() {
        let tmp = tempfile::tempdir().unwrap();
        let source = tmp.path().join("portrait.jpg");
        fs::write(&source, b"jpeg").unwrap();

        let assets = ImageAssets::new(tmp.path().join("user_images"));
        let id = BadgeId::new("c3d4").unwrap();

        let stored = assets.import(&id, &source).unwrap();
        assert_eq!(stored, tmp.path().join("user_images").join("C3D4.jpg"));
        assert_eq!(fs::read(&stored).unwrap(), b"jpeg");
        assert!(source.exists());
    }

    #[test]
    fn test_import_stays_inside_managed_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let source = tmp.path().join("portrait.png");
        fs::write(&source, b"png").unwrap();
        let images = tmp.path().join("data").join("user_images");
        let assets = ImageAssets::new(&images);

        assert!(BadgeId::new("../../ESCAPED").is_err());

        let id = BadgeId::new("a..b").unwrap();
        let stored = assets.import(&id, &source).unwrap();
        assert_eq!(stored, images.join("A..B.png"));
        assert_eq!(fs::read_dir(tmp.path()).unwrap().count(), 2);
    }

    #[test]
    fn test_import_missing_source() {
        let tmp = tempfile::tempdir().unwrap();
        let assets = ImageAssets::new(tmp.path());
        let id = BadgeId::new("C3D4").unwrap();

        let err = assets.import(&id, &tmp.path().join("nope.png")).unwrap_err();
        assert!(matches!(err, StorageError::MissingResource(_)));
    }

    #[test]
    fn test_import_already_managed_is_noop() {
        let tmp = tempfile::tempdir().unwrap();
        let assets = ImageAssets::new(tmp.path());
        let id = BadgeId::new("C3D4").unwrap();
        let managed = tmp.path().join("C3D4.png");
        fs::write(&managed, b"png").unwrap();

        assert_eq!(assets.import(&id, &managed).unwrap(), managed);
        assert_eq!(fs::read(&managed).unwrap(), b"png");
    }
}
