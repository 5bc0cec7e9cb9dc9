//! Application configuration.
//!
//! Settings come from three layers, later ones winning:
//!
//! 1. built-in defaults
//! 2. an optional JSON file (`--config` / `BADGEGATE_CONFIG`)
//! 3. command-line flags and their environment variables
//!
//! ```json
//! {
//!     "store": { "directory_file": "users.json", "ledger_file": "access_logs.csv", "images_dir": "user_images" },
//!     "serial": { "port": "/dev/ttyUSB0", "baud_rate": 9600 },
//!     "reader": { "poll_interval_ms": 100 },
//!     "kiosk": { "idle_reset_ms": 3000, "admin": { "username": "admin", "password": "admin" } }
//! }
//! ```

use anyhow::Context;
use badgegate_hardware::{ReaderConfig, SerialConfig};
use badgegate_kiosk::KioskSettings;
use badgegate_storage::StoreConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub store: StoreConfig,
    pub serial: SerialConfig,
    pub reader: ReaderConfig,
    pub kiosk: KioskSettings,
}

impl AppConfig {
    /// Load the file at `path`, or the defaults when no path is given.
    ///
    /// # Errors
    ///
    /// A path that is given but cannot be read or parsed is an error; the
    /// kiosk does not start on a configuration it cannot see.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("parsing config file {}", path.display()))
    }

    /// Keep every data file under `data_dir`, using the default file names.
    pub fn with_data_dir(mut self, data_dir: &Path) -> Self {
        self.store = StoreConfig::under(data_dir);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_path_gives_defaults() {
        let config = AppConfig::load(None).unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.serial.baud_rate, 9600);
        assert_eq!(config.kiosk.idle_reset_ms, 3000);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("badgegate.json");
        fs::write(
            &path,
            r#"{"serial": {"port": "COM3"}, "kiosk": {"idle_reset_ms": 1500}}"#,
        )
        .unwrap();

        let config = AppConfig::load(Some(&path)).unwrap();
        assert_eq!(config.serial.port, "COM3");
        assert_eq!(config.serial.baud_rate, 9600);
        assert_eq!(config.kiosk.idle_reset_ms, 1500);
        assert_eq!(config.reader, ReaderConfig::default());
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let error = AppConfig::load(Some(&tmp.path().join("nope.json"))).unwrap_err();
        assert!(error.to_string().contains("reading config file"));
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("bad.json");
        fs::write(&path, "{ serial: ").unwrap();
        assert!(AppConfig::load(Some(&path)).is_err());
    }

    #[test]
    fn test_data_dir_relocates_store() {
        let config = AppConfig::default().with_data_dir(Path::new("/srv/kiosk"));
        assert_eq!(config.store.directory_file, Path::new("/srv/kiosk/users.json"));
        assert_eq!(config.store.images_dir, Path::new("/srv/kiosk/user_images"));
    }
}
