use badgegate_core::constants::{DEFAULT_DIRECTORY_FILE, DEFAULT_IMAGES_DIR, DEFAULT_LEDGER_FILE};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File locations used by the store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Path to the directory document (JSON)
    pub directory_file: PathBuf,

    /// Path to the access ledger (CSV)
    pub ledger_file: PathBuf,

    /// Managed directory that holds copied portrait images
    pub images_dir: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            directory_file: PathBuf::from(DEFAULT_DIRECTORY_FILE),
            ledger_file: PathBuf::from(DEFAULT_LEDGER_FILE),
            images_dir: PathBuf::from(DEFAULT_IMAGES_DIR),
        }
    }
}

impl StoreConfig {
    /// Create a configuration with every file placed under `base_dir`
    ///
    /// # Example
    ///
    /// ```
    /// use badgegate_storage::StoreConfig;
    /// use std::path::Path;
    ///
    /// let config = StoreConfig::under("/var/lib/badgegate");
    /// assert_eq!(config.directory_file, Path::new("/var/lib/badgegate/users.json"));
    /// assert_eq!(config.images_dir, Path::new("/var/lib/badgegate/user_images"));
    /// ```
    pub fn under(base_dir: impl AsRef<Path>) -> Self {
        let base = base_dir.as_ref();
        Self {
            directory_file: base.join(DEFAULT_DIRECTORY_FILE),
            ledger_file: base.join(DEFAULT_LEDGER_FILE),
            images_dir: base.join(DEFAULT_IMAGES_DIR),
        }
    }

    /// Set the directory document path
    pub fn directory_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.directory_file = path.into();
        self
    }

    /// Set the ledger path
    pub fn ledger_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.ledger_file = path.into();
        self
    }

    /// Set the managed image directory
    pub fn images_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.images_dir = path.into();
        self
    }
}
