use crate::{
    Result,
    constants::{
        LEDGER_TIMESTAMP_FORMAT, STATUS_DENIED, STATUS_GRANTED, UNKNOWN_USER,
    },
    error::Error,
};
use chrono::{Local, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use subtle::ConstantTimeEq;

/// Badge identifier as read from an RFID card.
///
/// The identifier is normalized (trimmed and converted to uppercase) on
/// construction, so a badge registered as `" ab12 "` and later scanned as
/// `"AB12"` resolve to the same key.
///
/// # Security
/// Equality uses constant-time comparison so that lookups do not leak how
/// many leading characters of a guessed identifier were correct.
#[derive(Debug, Clone, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BadgeId(String);

impl BadgeId {
    /// Create a new badge id from raw reader or form input.
    ///
    /// # Errors
    /// Returns `Error::InvalidBadgeId` if nothing remains after trimming, if
    /// the identifier contains control characters or path separators, or if
    /// it is `.` or `..`. The id names the badge's portrait file, so it must
    /// be a single plain file name.
    pub fn new(raw: &str) -> Result<Self> {
        let normalized = Self::normalize(raw);

        if normalized.is_empty() {
            return Err(Error::InvalidBadgeId("badge id is empty".to_string()));
        }

        if normalized.chars().any(char::is_control) {
            return Err(Error::InvalidBadgeId(format!(
                "badge id contains control characters: {normalized:?}"
            )));
        }

        if normalized.contains(['/', '\\']) || normalized == "." || normalized == ".." {
            return Err(Error::InvalidBadgeId(format!(
                "badge id is not a plain file name: {normalized:?}"
            )));
        }

        Ok(BadgeId(normalized))
    }

    /// Normalize raw input without validating it.
    ///
    /// ```
    /// use badgegate_core::BadgeId;
    ///
    /// assert_eq!(BadgeId::normalize("  a1b2\r\n"), "A1B2");
    /// assert_eq!(BadgeId::normalize("   "), "");
    /// ```
    #[must_use]
    pub fn normalize(raw: &str) -> String {
        raw.trim().to_uppercase()
    }

    /// Get the badge id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BadgeId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for BadgeId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        BadgeId::new(s)
    }
}

impl TryFrom<String> for BadgeId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        BadgeId::new(&value)
    }
}

impl From<BadgeId> for String {
    fn from(id: BadgeId) -> Self {
        id.0
    }
}

impl PartialEq for BadgeId {
    fn eq(&self, other: &Self) -> bool {
        self.0.as_bytes().ct_eq(other.0.as_bytes()).into()
    }
}

impl std::hash::Hash for BadgeId {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

impl Ord for BadgeId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.cmp(&other.0)
    }
}

impl PartialOrd for BadgeId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Borrow<str> for BadgeId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Immutable snapshot of the enrolled badge ids.
///
/// The directory store republishes a fresh snapshot after every mutation;
/// the reader loop consults the latest one to pick its acknowledgment byte.
pub type EnrolledIds = Arc<BTreeSet<BadgeId>>;

/// One enrolled user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BadgeRecord {
    pub id: BadgeId,
    pub display_name: String,
    pub image_ref: PathBuf,
}

impl BadgeRecord {
    /// Create a new record.
    ///
    /// # Errors
    /// Returns `Error::MissingField` if the display name is blank.
    pub fn new(id: BadgeId, display_name: &str, image_ref: impl Into<PathBuf>) -> Result<Self> {
        let display_name = display_name.trim();
        if display_name.is_empty() {
            return Err(Error::MissingField { field: "name" });
        }

        Ok(Self {
            id,
            display_name: display_name.to_string(),
            image_ref: image_ref.into(),
        })
    }

    pub fn image_path(&self) -> &Path {
        &self.image_ref
    }
}

/// Result of an access decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccessOutcome {
    Granted,
    Denied,
}

impl AccessOutcome {
    #[inline]
    #[must_use]
    pub fn from_enrolled(enrolled: bool) -> Self {
        if enrolled { Self::Granted } else { Self::Denied }
    }

    #[inline]
    #[must_use]
    pub fn is_granted(self) -> bool {
        matches!(self, Self::Granted)
    }

    /// Status column value written to the ledger.
    #[must_use]
    pub fn status_label(self) -> &'static str {
        match self {
            Self::Granted => STATUS_GRANTED,
            Self::Denied => STATUS_DENIED,
        }
    }
}

impl fmt::Display for AccessOutcome {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Granted => write!(f, "Granted"),
            Self::Denied => write!(f, "Denied"),
        }
    }
}

impl std::str::FromStr for AccessOutcome {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            STATUS_GRANTED => Ok(Self::Granted),
            STATUS_DENIED => Ok(Self::Denied),
            other => Err(Error::InvalidStatus(other.to_string())),
        }
    }
}

/// One immutable ledger line.
///
/// `badge_id` is kept as the raw normalized text rather than a [`BadgeId`]
/// because a decision on an empty token is still recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessEvent {
    pub timestamp: NaiveDateTime,
    pub badge_id: String,
    pub actor_name: String,
    pub outcome: AccessOutcome,
}

impl AccessEvent {
    /// Create an event stamped with the current local time, truncated to
    /// whole seconds.
    pub fn now(
        badge_id: impl Into<String>,
        actor_name: impl Into<String>,
        outcome: AccessOutcome,
    ) -> Self {
        let now = Local::now().naive_local();
        Self {
            timestamp: now.with_nanosecond(0).unwrap_or(now),
            badge_id: badge_id.into(),
            actor_name: actor_name.into(),
            outcome,
        }
    }

    /// Event for a badge that is not enrolled.
    pub fn unknown(badge_id: impl Into<String>) -> Self {
        Self::now(badge_id, UNKNOWN_USER, AccessOutcome::Denied)
    }

    #[must_use]
    pub fn formatted_timestamp(&self) -> String {
        self.timestamp.format(LEDGER_TIMESTAMP_FORMAT).to_string()
    }

    /// Parse a ledger timestamp column.
    ///
    /// # Errors
    /// Returns `Error::InvalidTimestamp` if the text does not match
    /// `YYYY-MM-DD HH:MM:SS`.
    pub fn parse_timestamp(text: &str) -> Result<NaiveDateTime> {
        NaiveDateTime::parse_from_str(text.trim(), LEDGER_TIMESTAMP_FORMAT)
            .map_err(|e| Error::InvalidTimestamp(format!("{text:?}: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    #[rstest]
    #[case("AB12", "AB12")]
    #[case(" ab12 ", "AB12")]
    #[case("a1b2\r\n", "A1B2")]
    #[case("\t04abcdef", "04ABCDEF")]
    fn test_badge_id_normalization(#[case] raw: &str, #[case] expected: &str) {
        let id = BadgeId::new(raw).unwrap();
        assert_eq!(id.as_str(), expected);
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    #[case("\r\n")]
    #[case("AB\u{7}12")]
    #[case("../../ESCAPED")]
    #[case("A1/B2")]
    #[case("A1\\B2")]
    #[case(".")]
    #[case(" .. ")]
    fn test_badge_id_rejects(#[case] raw: &str) {
        assert!(matches!(
            BadgeId::new(raw),
            Err(Error::InvalidBadgeId(_))
        ));
    }

    #[test]
    fn test_badge_id_registration_matches_scan() {
        let registered = BadgeId::new(" ab12 ").unwrap();
        let scanned = BadgeId::new("AB12").unwrap();
        assert_eq!(registered, scanned);
    }

    #[test]
    fn test_badge_id_serde_normalizes() {
        let id: BadgeId = serde_json::from_str("\"a1b2\"").unwrap();
        assert_eq!(id.as_str(), "A1B2");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"A1B2\"");
        assert!(serde_json::from_str::<BadgeId>("\"  \"").is_err());
    }

    #[test]
    fn test_enrolled_ids_lookup_by_str() {
        let mut ids = BTreeSet::new();
        ids.insert(BadgeId::new("a1b2").unwrap());
        let snapshot: EnrolledIds = Arc::new(ids);

        assert!(snapshot.contains("A1B2"));
        assert!(!snapshot.contains("a1b2"));
    }

    #[test]
    fn test_badge_record_requires_name() {
        let id = BadgeId::new("A1B2").unwrap();
        assert!(matches!(
            BadgeRecord::new(id.clone(), "  ", "a1b2.png"),
            Err(Error::MissingField { field: "name" })
        ));

        let record = BadgeRecord::new(id, " Alice ", "a1b2.png").unwrap();
        assert_eq!(record.display_name, "Alice");
        assert_eq!(record.image_path(), Path::new("a1b2.png"));
    }

    #[rstest]
    #[case(AccessOutcome::Granted, "ACCESS GRANTED")]
    #[case(AccessOutcome::Denied, "ACCESS DENIED")]
    fn test_outcome_labels(#[case] outcome: AccessOutcome, #[case] label: &str) {
        assert_eq!(outcome.status_label(), label);
        assert_eq!(label.parse::<AccessOutcome>().unwrap(), outcome);
    }

    #[test]
    fn test_outcome_rejects_unknown_label() {
        assert!("ACCESS MAYBE".parse::<AccessOutcome>().is_err());
    }

    #[test]
    fn test_access_event_timestamp_has_second_resolution() {
        let event = AccessEvent::now("A1B2", "Alice", AccessOutcome::Granted);
        assert_eq!(event.timestamp.nanosecond(), 0);

        let text = event.formatted_timestamp();
        assert_eq!(text.len(), "YYYY-MM-DD HH:MM:SS".len());
        assert_eq!(AccessEvent::parse_timestamp(&text).unwrap(), event.timestamp);
    }

    #[test]
    fn test_unknown_event() {
        let event = AccessEvent::unknown("ZZ99");
        assert_eq!(event.actor_name, UNKNOWN_USER);
        assert_eq!(event.outcome, AccessOutcome::Denied);
    }

    #[test]
    fn test_parse_timestamp_rejects_garbage() {
        assert!(AccessEvent::parse_timestamp("yesterday").is_err());
    }

    proptest! {
        #[test]
        fn prop_normalization_is_idempotent(raw in "[ \t]{0,3}[a-zA-Z0-9]{1,20}[ \t\r\n]{0,3}") {
            let once = BadgeId::new(&raw).unwrap();
            let twice = BadgeId::new(once.as_str()).unwrap();
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn prop_case_and_padding_do_not_matter(core in "[a-zA-Z0-9]{1,20}", pad in "[ \t]{0,4}") {
            let padded = format!("{pad}{}{pad}", core.to_lowercase());
            let plain = core.to_uppercase();
            prop_assert_eq!(BadgeId::new(&padded).unwrap(), BadgeId::new(&plain).unwrap());
        }
    }
}
