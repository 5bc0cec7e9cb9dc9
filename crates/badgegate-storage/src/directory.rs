//! Directory of enrolled badges.
//!
//! The directory is a JSON document mapping badge id to name and portrait
//! path:
//!
//! ```text
//! {
//!     "A1B2": {
//!         "name": "Alice",
//!         "image": "user_images/A1B2.png"
//!     }
//! }
//! ```
//!
//! It is loaded whole at startup and written back whole, through a
//! temp-file rename, after every mutation. [`DirectoryStore`] is the only
//! writer; it is meant to be owned by the kiosk's UI task. Other tasks
//! observe the enrolled id set through [`DirectoryStore::subscribe`].

use crate::assets::ImageAssets;
use crate::atomic::replace_file;
use crate::config::StoreConfig;
use crate::error::{StorageError, StorageResult};
use badgegate_core::{BadgeId, BadgeRecord, EnrolledIds};
use serde::{Deserialize, Serialize};
use serde_json::ser::PrettyFormatter;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Badge records keyed by normalized id.
pub type Directory = BTreeMap<BadgeId, BadgeRecord>;

/// On-disk shape of one directory entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct DocumentEntry {
    name: String,
    image: PathBuf,
}

/// Load the directory document at `path`.
///
/// A missing or malformed document yields an empty directory so the kiosk
/// stays usable with zero enrolled badges. Entries whose key or name is
/// invalid are skipped.
pub fn load_directory(path: &Path) -> Directory {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            info!(path = %path.display(), "Directory document not found, starting empty");
            return Directory::new();
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to read directory document");
            return Directory::new();
        }
    };

    let document: BTreeMap<String, DocumentEntry> = match serde_json::from_str(&text) {
        Ok(document) => document,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Malformed directory document, starting empty");
            return Directory::new();
        }
    };

    let mut directory = Directory::new();
    for (key, entry) in document {
        let record = BadgeId::new(&key)
            .and_then(|id| BadgeRecord::new(id, &entry.name, entry.image));
        match record {
            Ok(record) => {
                if let Some(previous) = directory.insert(record.id.clone(), record) {
                    warn!(
                        key = %key,
                        badge = %previous.id,
                        replaced = %previous.display_name,
                        "Duplicate directory key after normalization, keeping the later entry"
                    );
                }
            }
            Err(e) => warn!(key = %key, error = %e, "Skipping invalid directory entry"),
        }
    }

    debug!(path = %path.display(), count = directory.len(), "Loaded directory");
    directory
}

/// Write the full directory to `path`, replacing the previous document.
pub fn save_directory(path: &Path, directory: &Directory) -> StorageResult<()> {
    let document: BTreeMap<&str, DocumentEntry> = directory
        .values()
        .map(|record| {
            (
                record.id.as_str(),
                DocumentEntry {
                    name: record.display_name.clone(),
                    image: record.image_ref.clone(),
                },
            )
        })
        .collect();

    let mut bytes = Vec::new();
    let mut serializer =
        serde_json::Serializer::with_formatter(&mut bytes, PrettyFormatter::with_indent(b"    "));
    document
        .serialize(&mut serializer)
        .map_err(|e| StorageError::write(path, std::io::Error::other(e)))?;

    replace_file(path, &bytes)
}

/// Owner of the in-memory directory and its document.
#[derive(Debug)]
pub struct DirectoryStore {
    path: PathBuf,
    records: Directory,
    assets: ImageAssets,
    enrolled: watch::Sender<EnrolledIds>,
}

impl DirectoryStore {
    /// Open the store described by `config`.
    ///
    /// Creates the managed image directory and, when no document exists
    /// yet, writes an empty one. Neither step is fatal: failures are logged
    /// and the store starts with whatever could be loaded.
    pub fn open(config: &StoreConfig) -> Self {
        let assets = ImageAssets::new(&config.images_dir);
        if let Err(e) = assets.ensure_dir() {
            warn!(error = %e, "Failed to create image directory");
        }

        let store = Self::with_records(
            config.directory_file.clone(),
            load_directory(&config.directory_file),
            assets,
        );

        if !store.path.exists()
            && let Err(e) = store.save()
        {
            warn!(error = %e, "Failed to create empty directory document");
        }

        store
    }

    fn with_records(path: PathBuf, records: Directory, assets: ImageAssets) -> Self {
        let (enrolled, _) = watch::channel(snapshot(&records));
        Self {
            path,
            records,
            assets,
            enrolled,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn assets(&self) -> &ImageAssets {
        &self.assets
    }

    /// Look up a record by raw id; the id is normalized first.
    pub fn get(&self, raw_id: &str) -> Option<&BadgeRecord> {
        self.records.get(BadgeId::normalize(raw_id).as_str())
    }

    pub fn contains(&self, raw_id: &str) -> bool {
        self.get(raw_id).is_some()
    }

    /// Snapshot of every record, ordered by id.
    pub fn records(&self) -> Vec<BadgeRecord> {
        self.records.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Receive the enrolled id set, updated after every mutation.
    pub fn subscribe(&self) -> watch::Receiver<EnrolledIds> {
        self.enrolled.subscribe()
    }

    /// Rewrite the document from the in-memory directory.
    pub fn save(&self) -> StorageResult<()> {
        save_directory(&self.path, &self.records)
    }

    /// Insert or replace the record for `record.id`.
    ///
    /// `record.image_ref` is the operator-selected source image; it is
    /// copied into managed storage and the stored record points at the
    /// copy.
    ///
    /// # Errors
    ///
    /// Fails before touching the directory if the image cannot be imported.
    /// If the final save fails, the in-memory directory keeps the new record
    /// and the error is returned so the caller can report the divergence.
    pub fn register_or_update(&mut self, record: BadgeRecord) -> StorageResult<BadgeRecord> {
        let image_ref = self.assets.import(&record.id, &record.image_ref)?;
        let record = BadgeRecord { image_ref, ..record };

        let replaced = self.records.insert(record.id.clone(), record.clone());
        self.publish();
        info!(
            badge = %record.id,
            name = %record.display_name,
            updated = replaced.is_some(),
            "Badge registered"
        );

        self.save()?;
        Ok(record)
    }

    /// Change the name, and optionally the portrait, of an existing record.
    pub fn edit(
        &mut self,
        id: &BadgeId,
        display_name: &str,
        new_image: Option<&Path>,
    ) -> StorageResult<BadgeRecord> {
        let current = self
            .records
            .get(id)
            .ok_or_else(|| StorageError::badge_not_found(id.as_str()))?;

        let image_ref = match new_image {
            Some(source) if source != current.image_ref => self.assets.import(id, source)?,
            _ => current.image_ref.clone(),
        };
        let record = BadgeRecord::new(id.clone(), display_name, image_ref)?;

        self.records.insert(id.clone(), record.clone());
        info!(badge = %id, name = %record.display_name, "Badge edited");

        self.save()?;
        Ok(record)
    }

    /// Delete the record for `id`.
    ///
    /// The portrait stays in the managed image directory.
    pub fn remove(&mut self, id: &BadgeId) -> StorageResult<BadgeRecord> {
        let removed = self
            .records
            .remove(id)
            .ok_or_else(|| StorageError::badge_not_found(id.as_str()))?;
        self.publish();
        info!(badge = %id, name = %removed.display_name, "Badge removed");

        self.save()?;
        Ok(removed)
    }

    fn publish(&self) {
        self.enrolled.send_replace(snapshot(&self.records));
    }
}

fn snapshot(records: &Directory) -> EnrolledIds {
    Arc::new(records.keys().cloned().collect::<BTreeSet<_>>())
}
