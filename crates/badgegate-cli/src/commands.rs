//! One-shot administrative commands that work on the data files directly,
//! without starting the kiosk.

use anyhow::{Context, bail};
use badgegate_core::{BadgeId, BadgeRecord};
use badgegate_storage::{DirectoryStore, Ledger, StoreConfig};
use std::io::Write;
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminCommand {
    Enroll {
        id: String,
        name: String,
        image: PathBuf,
    },
    Edit {
        id: String,
        name: String,
        image: Option<PathBuf>,
    },
    Remove {
        id: String,
    },
    List,
    Logs,
    ExportLogs {
        destination: PathBuf,
    },
    ClearLogs {
        confirmed: bool,
    },
}

/// Run `command` against the store described by `config`, writing a
/// human-readable report to `out`.
pub fn execute(
    command: AdminCommand,
    config: &StoreConfig,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    match command {
        AdminCommand::Enroll { id, name, image } => {
            let mut store = DirectoryStore::open(config);
            let record = BadgeRecord::new(BadgeId::new(&id)?, &name, image)?;
            let record = store
                .register_or_update(record)
                .with_context(|| format!("enrolling {id}"))?;
            writeln!(out, "enrolled {} ({})", record.id, record.display_name)?;
        }
        AdminCommand::Edit { id, name, image } => {
            let mut store = DirectoryStore::open(config);
            let record = store
                .edit(&BadgeId::new(&id)?, &name, image.as_deref())
                .with_context(|| format!("editing {id}"))?;
            writeln!(out, "updated {} ({})", record.id, record.display_name)?;
        }
        AdminCommand::Remove { id } => {
            let mut store = DirectoryStore::open(config);
            let removed = store
                .remove(&BadgeId::new(&id)?)
                .with_context(|| format!("removing {id}"))?;
            writeln!(out, "removed {} ({})", removed.id, removed.display_name)?;
        }
        AdminCommand::List => {
            let store = DirectoryStore::open(config);
            for record in store.records() {
                writeln!(
                    out,
                    "{}\t{}\t{}",
                    record.id,
                    record.display_name,
                    record.image_ref.display()
                )?;
            }
        }
        AdminCommand::Logs => {
            for event in ledger(config).entries()? {
                writeln!(
                    out,
                    "{}\t{}\t{}\t{}",
                    event.formatted_timestamp(),
                    event.badge_id,
                    event.actor_name,
                    event.outcome.status_label()
                )?;
            }
        }
        AdminCommand::ExportLogs { destination } => {
            let bytes = ledger(config).export(&destination)?;
            writeln!(out, "exported {bytes} bytes to {}", destination.display())?;
        }
        AdminCommand::ClearLogs { confirmed } => {
            if !confirmed {
                bail!("refusing to clear the access logs without --yes");
            }
            ledger(config).clear()?;
            info!(path = %config.ledger_file.display(), "Access logs cleared from the command line");
            writeln!(out, "access logs cleared")?;
        }
    }

    Ok(())
}

fn ledger(config: &StoreConfig) -> Ledger {
    Ledger::new(&config.ledger_file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use badgegate_core::{AccessEvent, AccessOutcome};
    use std::fs;
    use tempfile::TempDir;

    struct Fixture {
        _tmp: TempDir,
        config: StoreConfig,
        portrait: PathBuf,
    }

    fn fixture() -> Fixture {
        let tmp = tempfile::tempdir().unwrap();
        let config = StoreConfig::under(tmp.path().join("data"));
        let portrait = tmp.path().join("alice.png");
        fs::write(&portrait, b"png").unwrap();
        Fixture {
            _tmp: tmp,
            config,
            portrait,
        }
    }

    fn run(command: AdminCommand, config: &StoreConfig) -> anyhow::Result<String> {
        let mut out = Vec::new();
        execute(command, config, &mut out)?;
        Ok(String::from_utf8(out).unwrap())
    }

    #[test]
    fn test_enroll_edit_remove() {
        let fx = fixture();

        let text = run(
            AdminCommand::Enroll {
                id: " a1b2 ".into(),
                name: "Alice".into(),
                image: fx.portrait.clone(),
            },
            &fx.config,
        )
        .unwrap();
        assert_eq!(text, "enrolled A1B2 (Alice)\n");

        let listing = run(AdminCommand::List, &fx.config).unwrap();
        assert!(listing.starts_with("A1B2\tAlice\t"));

        run(
            AdminCommand::Edit {
                id: "a1b2".into(),
                name: "Alice Smith".into(),
                image: None,
            },
            &fx.config,
        )
        .unwrap();
        let store = DirectoryStore::open(&fx.config);
        assert_eq!(store.get("A1B2").unwrap().display_name, "Alice Smith");

        let text = run(AdminCommand::Remove { id: "A1B2".into() }, &fx.config).unwrap();
        assert_eq!(text, "removed A1B2 (Alice Smith)\n");
        assert!(run(AdminCommand::List, &fx.config).unwrap().is_empty());
    }

    #[test]
    fn test_remove_unknown_fails() {
        let fx = fixture();
        let error = run(AdminCommand::Remove { id: "ZZ99".into() }, &fx.config).unwrap_err();
        assert!(error.to_string().contains("removing ZZ99"));
    }

    #[test]
    fn test_enroll_blank_name_fails() {
        let fx = fixture();
        let result = run(
            AdminCommand::Enroll {
                id: "A1B2".into(),
                name: "  ".into(),
                image: fx.portrait.clone(),
            },
            &fx.config,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_logs_export_and_clear() {
        let fx = fixture();
        let ledger = Ledger::new(&fx.config.ledger_file);
        ledger.append(&AccessEvent::unknown("ZZ99")).unwrap();
        ledger
            .append(&AccessEvent::now("A1B2", "Alice", AccessOutcome::Granted))
            .unwrap();

        let logs = run(AdminCommand::Logs, &fx.config).unwrap();
        assert_eq!(logs.lines().count(), 2);
        assert!(logs.contains("ZZ99\tUnknown User"));

        let destination = fx.config.ledger_file.with_file_name("export.csv");
        run(
            AdminCommand::ExportLogs {
                destination: destination.clone(),
            },
            &fx.config,
        )
        .unwrap();
        assert_eq!(
            fs::read(&destination).unwrap(),
            fs::read(&fx.config.ledger_file).unwrap()
        );

        assert!(run(AdminCommand::ClearLogs { confirmed: false }, &fx.config).is_err());
        assert_eq!(ledger.entries().unwrap().len(), 2);

        run(AdminCommand::ClearLogs { confirmed: true }, &fx.config).unwrap();
        assert!(ledger.entries().unwrap().is_empty());
    }
}
