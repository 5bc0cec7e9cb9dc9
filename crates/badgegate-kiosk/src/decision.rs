//! Access decision for a scan made on the idle screen.

use badgegate_core::constants::UNKNOWN_USER;
use badgegate_core::{AccessEvent, AccessOutcome, BadgeId};
use badgegate_storage::{DirectoryStore, Ledger, StorageResult};
use std::path::PathBuf;
use tracing::{error, info};

/// Result of checking one scanned id against the directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessDecision {
    /// Normalized id as it was looked up and logged.
    pub badge_id: String,
    pub outcome: AccessOutcome,

    /// Enrolled name, or "Unknown User".
    pub actor_name: String,

    /// Portrait of the enrolled badge, when granted.
    pub image_ref: Option<PathBuf>,
}

impl AccessDecision {
    /// Look `raw` up in the directory. Never fails: anything that is not an
    /// enrolled id, including an empty one, is denied.
    pub fn evaluate(directory: &DirectoryStore, raw: &str) -> Self {
        let badge_id = BadgeId::normalize(raw);

        match directory.get(&badge_id) {
            Some(record) => Self {
                badge_id,
                outcome: AccessOutcome::Granted,
                actor_name: record.display_name.clone(),
                image_ref: Some(record.image_ref.clone()),
            },
            None => Self {
                badge_id,
                outcome: AccessOutcome::Denied,
                actor_name: UNKNOWN_USER.to_string(),
                image_ref: None,
            },
        }
    }

    pub fn is_granted(&self) -> bool {
        self.outcome.is_granted()
    }

    /// Ledger row for this decision, stamped now.
    pub fn to_event(&self) -> AccessEvent {
        AccessEvent::now(self.badge_id.clone(), self.actor_name.clone(), self.outcome)
    }
}

/// Decide on a scanned id and append exactly one ledger row for it.
///
/// The decision is returned even when the append fails, so the visitor
/// still sees the outcome; the second element carries the ledger result.
pub fn decide(
    directory: &DirectoryStore,
    ledger: &Ledger,
    raw: &str,
) -> (AccessDecision, StorageResult<()>) {
    let decision = AccessDecision::evaluate(directory, raw);
    let logged = ledger.append(&decision.to_event());

    match &logged {
        Ok(()) => info!(
            badge = %decision.badge_id,
            outcome = %decision.outcome,
            actor = %decision.actor_name,
            "Access decided"
        ),
        Err(e) => error!(
            badge = %decision.badge_id,
            outcome = %decision.outcome,
            error = %e,
            "Access decided but ledger append failed"
        ),
    }

    (decision, logged)
}
