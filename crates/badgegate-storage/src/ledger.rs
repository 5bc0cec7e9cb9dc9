//! Append-only access ledger.
//!
//! The ledger is a CSV file with the header `Timestamp,Card ID,Name,Status`
//! and one row per access decision:
//!
//! ```text
//! Timestamp,Card ID,Name,Status
//! 2025-10-27 14:30:00,A1B2,Alice,ACCESS GRANTED
//! 2025-10-27 14:30:12,ZZ99,Unknown User,ACCESS DENIED
//! ```
//!
//! Rows are only ever appended; the single exception is [`Ledger::clear`],
//! which replaces the file with the header alone. Each row is encoded in
//! memory and handed to the OS in one `write`, so a concurrent reader may
//! miss the newest row but never sees half of one.

use crate::atomic::replace_file;
use crate::error::{StorageError, StorageResult};
use badgegate_core::constants::LEDGER_HEADER;
use badgegate_core::{AccessEvent, AccessOutcome};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use tracing::{debug, info, warn};

#[derive(Debug)]
pub struct Ledger {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl Ledger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one event, creating the file with its header when it is
    /// absent or empty.
    pub fn append(&self, event: &AccessEvent) -> StorageResult<()> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| StorageError::write(parent, e))?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| StorageError::write(&self.path, e))?;

        let needs_header = file
            .metadata()
            .map_err(|e| StorageError::write(&self.path, e))?
            .len()
            == 0;

        let mut rows: Vec<[&str; 4]> = Vec::with_capacity(2);
        if needs_header {
            rows.push(LEDGER_HEADER);
        }
        let timestamp = event.formatted_timestamp();
        rows.push([
            timestamp.as_str(),
            event.badge_id.as_str(),
            event.actor_name.as_str(),
            event.outcome.status_label(),
        ]);

        let bytes = encode_rows(&rows).map_err(|e| StorageError::write(&self.path, e))?;
        file.write_all(&bytes)
            .and_then(|()| file.flush())
            .map_err(|e| StorageError::write(&self.path, e))?;

        debug!(
            badge = %event.badge_id,
            outcome = %event.outcome,
            "Appended ledger row"
        );
        Ok(())
    }

    /// Truncate the ledger back to its header row.
    ///
    /// The caller is responsible for having obtained operator confirmation.
    pub fn clear(&self) -> StorageResult<()> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let bytes = encode_rows(&[LEDGER_HEADER]).map_err(|e| StorageError::write(&self.path, e))?;
        replace_file(&self.path, &bytes)?;

        info!(path = %self.path.display(), "Ledger cleared");
        Ok(())
    }

    /// Read every event, oldest first.
    ///
    /// A missing ledger reads as empty. Rows that cannot be parsed are
    /// skipped with a warning.
    pub fn entries(&self) -> StorageResult<Vec<AccessEvent>> {
        let file = match fs::File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StorageError::read(&self.path, e)),
        };

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(file);

        let mut events = Vec::new();
        for (index, row) in reader.byte_records().enumerate() {
            let row = match row {
                Ok(row) => row,
                Err(e) if matches!(e.kind(), csv::ErrorKind::Io(_)) => return Err(e.into()),
                Err(e) => {
                    warn!(row = index + 1, error = %e, "Skipping unreadable ledger row");
                    continue;
                }
            };
            let parsed = csv::StringRecord::from_byte_record(row)
                .ok()
                .and_then(|row| parse_row(&row));
            match parsed {
                Some(event) => events.push(event),
                None => warn!(row = index + 1, "Skipping malformed ledger row"),
            }
        }

        Ok(events)
    }

    /// Copy the ledger to `destination`, returning the number of bytes copied.
    pub fn export(&self, destination: &Path) -> StorageResult<u64> {
        if !self.path.is_file() {
            return Err(StorageError::MissingResource(self.path.clone()));
        }

        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let bytes =
            fs::copy(&self.path, destination).map_err(|e| StorageError::write(destination, e))?;

        info!(destination = %destination.display(), bytes, "Ledger exported");
        Ok(bytes)
    }
}

fn encode_rows(rows: &[[&str; 4]]) -> std::io::Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::CRLF)
        .from_writer(Vec::new());
    for row in rows {
        writer.write_record(row)?;
    }
    writer
        .into_inner()
        .map_err(|e| std::io::Error::other(e.to_string()))
}

fn parse_row(row: &csv::StringRecord) -> Option<AccessEvent> {
    if row.len() != LEDGER_HEADER.len() {
        return None;
    }

    Some(AccessEvent {
        timestamp: AccessEvent::parse_timestamp(&row[0]).ok()?,
        badge_id: row[1].to_string(),
        actor_name: row[2].to_string(),
        outcome: row[3].parse::<AccessOutcome>().ok()?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use badgegate_core::constants::UNKNOWN_USER;

    const HEADER_LINE: &str = "Timestamp,Card ID,Name,Status\r\n";

    fn ledger_in(dir: &Path) -> Ledger {
        Ledger::new(dir.join("access_logs.csv"))
    }

    #[test]
    fn test_first_append_writes_header() {
        let tmp = tempfile::tempdir().unwrap();
        let ledger = ledger_in(tmp.path());

        let event = AccessEvent::now("A1B2", "Alice", AccessOutcome::Granted);
        ledger.append(&event).unwrap();

        let text = fs::read_to_string(ledger.path()).unwrap();
        let expected = format!(
            "{HEADER_LINE}{},A1B2,Alice,ACCESS GRANTED\r\n",
            event.formatted_timestamp()
        );
        assert_eq!(text, expected);
    }

    #[test]
    fn test_appends_accumulate_and_read_back() {
        let tmp = tempfile::tempdir().unwrap();
        let ledger = ledger_in(tmp.path());

        ledger
            .append(&AccessEvent::now("A1B2", "Alice", AccessOutcome::Granted))
            .unwrap();
        ledger.append(&AccessEvent::unknown("ZZ99")).unwrap();
        ledger
            .append(&AccessEvent::now("C3D4", "Smith, Bob", AccessOutcome::Granted))
            .unwrap();

        let entries = ledger.entries().unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[1].badge_id, "ZZ99");
        assert_eq!(entries[1].actor_name, UNKNOWN_USER);
        assert_eq!(entries[1].outcome, AccessOutcome::Denied);
        assert_eq!(entries[2].actor_name, "Smith, Bob");
    }

    #[test]
    fn test_empty_file_gets_header() {
        let tmp = tempfile::tempdir().unwrap();
        let ledger = ledger_in(tmp.path());
        fs::write(ledger.path(), b"").unwrap();

        ledger.append(&AccessEvent::unknown("ZZ99")).unwrap();

        let text = fs::read_to_string(ledger.path()).unwrap();
        assert!(text.starts_with(HEADER_LINE));
        assert_eq!(text.lines().count(), 2);
    }

    #[test]
    fn test_clear_leaves_header_only() {
        let tmp = tempfile::tempdir().unwrap();
        let ledger = ledger_in(tmp.path());
        ledger.append(&AccessEvent::unknown("ZZ99")).unwrap();
        ledger.append(&AccessEvent::unknown("ZZ98")).unwrap();

        ledger.clear().unwrap();

        assert_eq!(fs::read_to_string(ledger.path()).unwrap(), HEADER_LINE);
        assert!(ledger.entries().unwrap().is_empty());

        ledger.append(&AccessEvent::unknown("ZZ97")).unwrap();
        assert_eq!(ledger.entries().unwrap().len(), 1);
    }

    #[test]
    fn test_missing_ledger_reads_empty() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(ledger_in(tmp.path()).entries().unwrap().is_empty());
    }

    #[test]
    fn test_malformed_rows_are_skipped() {
        let tmp = tempfile::tempdir().unwrap();
        let ledger = ledger_in(tmp.path());
        let mut contents = b"Timestamp,Card ID,Name,Status\n\
             2025-10-27 14:30:00,A1B2,Alice,ACCESS GRANTED\n\
             garbage\n\
             2025-10-27 14:31:00,A1B2,Alice,ACCESS PENDING\n"
            .to_vec();
        contents.extend_from_slice(b"2025-10-27 14:31:30,\xFF\xFE,Bob,ACCESS GRANTED\n");
        contents.extend_from_slice(b"2025-10-27 14:32:00,ZZ99,Unknown User,ACCESS DENIED\n");
        fs::write(ledger.path(), contents).unwrap();

        let entries = ledger.entries().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].badge_id, "A1B2");
        assert_eq!(entries[1].badge_id, "ZZ99");
    }

    #[test]
    fn test_export_copies_file() {
        let tmp = tempfile::tempdir().unwrap();
        let ledger = ledger_in(tmp.path());
        let destination = tmp.path().join("export.csv");

        assert!(matches!(
            ledger.export(&destination),
            Err(StorageError::MissingResource(_))
        ));

        ledger.append(&AccessEvent::unknown("ZZ99")).unwrap();
        let copied = ledger.export(&destination).unwrap();

        assert_eq!(copied, fs::metadata(ledger.path()).unwrap().len());
        assert_eq!(
            fs::read(&destination).unwrap(),
            fs::read(ledger.path()).unwrap()
        );
    }
}
