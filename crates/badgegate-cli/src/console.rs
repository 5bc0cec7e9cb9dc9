//! Line-oriented operator console for `badgegate run`.
//!
//! Commands are read from stdin, one per line:
//!
//! ```text
//! scan                       return to the idle screen
//! login <user> <password>    open the admin menu
//! capture                    open the enrollment form and wait for a card
//! name <text>                set the enrollment name
//! image <path>               set the enrollment portrait
//! submit                     register the form
//! back                       leave the form for the admin menu
//! edit <id> <name> [--image <path>]
//! remove <id>
//! users                      list enrolled badges
//! logs                       list access logs
//! export <path>              copy the access logs
//! clear-logs yes             truncate the access logs
//! card <token>               present a card to the mock reader
//! help | quit
//! ```

use badgegate_core::{AccessEvent, BadgeRecord};
use badgegate_kiosk::{
    AccessDecision, CaptureState, KioskError, KioskMessages, KioskMode, KioskView,
    RegistrationForm, UiAction,
};
use std::io::Write;
use std::path::PathBuf;

pub const HELP: &str = "\
commands:
  scan | login <user> <password> | capture | name <text> | image <path>
  submit | back | edit <id> <name> [--image <path>] | remove <id>
  users | logs | export <path> | clear-logs yes | card <token> | help | quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Action(UiAction),
    /// Feed a token to the mock reader.
    Present(String),
    Help,
    Quit,
}

/// Parse one console line. Blank lines yield `Ok(None)`.
pub fn parse_command(line: &str) -> Result<Option<ConsoleCommand>, String> {
    let line = line.trim();
    let Some((word, rest)) = split_word(line) else {
        return Ok(None);
    };

    let command = match word {
        "scan" => ConsoleCommand::Action(UiAction::EnterScanning),
        "login" => {
            let (username, password) = split_word(rest).ok_or("usage: login <user> <password>")?;
            ConsoleCommand::Action(UiAction::OpenAdminMenu {
                username: username.to_string(),
                password: password.to_string(),
            })
        }
        "capture" => ConsoleCommand::Action(UiAction::BeginCapture),
        "name" => ConsoleCommand::Action(UiAction::SetName(rest.to_string())),
        "image" => ConsoleCommand::Action(UiAction::SetImage(required(rest, "image <path>")?.into())),
        "submit" => ConsoleCommand::Action(UiAction::SubmitRegistration),
        "back" => ConsoleCommand::Action(UiAction::CloseRegistration),
        "edit" => parse_edit(rest)?,
        "remove" => ConsoleCommand::Action(UiAction::RemoveRecord {
            id: required(rest, "remove <id>")?.to_string(),
        }),
        "users" => ConsoleCommand::Action(UiAction::ListRecords),
        "logs" => ConsoleCommand::Action(UiAction::ListLedger),
        "export" => ConsoleCommand::Action(UiAction::ExportLedger {
            destination: required(rest, "export <path>")?.into(),
        }),
        "clear-logs" => {
            if rest != "yes" {
                return Err("refusing to clear logs; confirm with: clear-logs yes".to_string());
            }
            ConsoleCommand::Action(UiAction::ClearLedger)
        }
        "card" => ConsoleCommand::Present(required(rest, "card <token>")?.to_string()),
        "help" | "?" => ConsoleCommand::Help,
        "quit" | "exit" => ConsoleCommand::Quit,
        other => return Err(format!("unknown command '{other}'; type 'help'")),
    };

    Ok(Some(command))
}

fn split_word(text: &str) -> Option<(&str, &str)> {
    let text = text.trim_start();
    if text.is_empty() {
        return None;
    }
    match text.split_once(char::is_whitespace) {
        Some((word, rest)) => Some((word, rest.trim())),
        None => Some((text, "")),
    }
}

fn required<'a>(rest: &'a str, usage: &str) -> Result<&'a str, String> {
    if rest.is_empty() {
        Err(format!("usage: {usage}"))
    } else {
        Ok(rest)
    }
}

fn parse_edit(rest: &str) -> Result<ConsoleCommand, String> {
    const USAGE: &str = "usage: edit <id> <name> [--image <path>]";
    let (id, rest) = split_word(rest).ok_or(USAGE)?;

    let (name, image) = match rest.split_once("--image") {
        Some((name, path)) => {
            let path = path.trim();
            if path.is_empty() {
                return Err(USAGE.to_string());
            }
            (name.trim(), Some(PathBuf::from(path)))
        }
        None => (rest, None),
    };

    Ok(ConsoleCommand::Action(UiAction::EditRecord {
        id: id.to_string(),
        name: name.to_string(),
        image,
    }))
}

/// Plain-text view writing to `out`.
pub struct ConsoleView<W> {
    out: W,
}

impl<W: Write + Send> ConsoleView<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out
    }

    fn line(&mut self, text: &str) {
        // The console is best-effort; a closed stdout must not stop the kiosk.
        let _ = writeln!(self.out, "{text}");
        let _ = self.out.flush();
    }
}

impl<W: Write + Send> KioskView for ConsoleView<W> {
    fn show_idle(&mut self) {
        self.line(&format!(
            "[{}] {}",
            KioskMessages::READY,
            KioskMessages::PLACE_CARD
        ));
    }

    fn show_decision(&mut self, decision: &AccessDecision) {
        let (headline, footer) = if decision.is_granted() {
            (KioskMessages::ALLOWED, KioskMessages::WELCOME)
        } else {
            (KioskMessages::NOT_ALLOWED, KioskMessages::NO_PERMISSION)
        };
        self.line(&format!(
            "[{headline}] {} ({}) {footer}",
            decision.actor_name, decision.badge_id
        ));
    }

    fn show_mode(&mut self, mode: KioskMode) {
        self.line(&format!("-- {mode} --"));
    }

    fn show_form(&mut self, form: &RegistrationForm) {
        let card = form.captured_id().map_or("-", |id| id.as_str());
        let image = form
            .image()
            .map_or_else(|| "-".to_string(), |p| p.display().to_string());
        let capture = match form.capture_state() {
            CaptureState::Ready => "ready",
            CaptureState::Waiting => "waiting for card",
        };
        self.line(&format!(
            "form: card={card} name={:?} image={image} capture={capture}",
            form.name()
        ));
        if !form.status().is_empty() {
            self.line(&format!("      {}", form.status()));
        }
    }

    fn show_records(&mut self, records: &[BadgeRecord]) {
        if records.is_empty() {
            self.line("no users enrolled");
            return;
        }
        for record in records {
            self.line(&format!(
                "{:<16} {:<24} {}",
                record.id,
                record.display_name,
                record.image_ref.display()
            ));
        }
    }

    fn show_ledger(&mut self, events: &[AccessEvent]) {
        if events.is_empty() {
            self.line("no access logs");
            return;
        }
        for event in events {
            self.line(&format!(
                "{}  {:<16} {:<24} {}",
                event.formatted_timestamp(),
                event.badge_id,
                event.actor_name,
                event.outcome.status_label()
            ));
        }
    }

    fn show_notice(&mut self, message: &str) {
        self.line(message);
    }

    fn show_fault(&mut self, error: &KioskError) {
        self.line(&format!("error ({}): {error}", error.kind()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use badgegate_core::{AccessOutcome, BadgeId};
    use rstest::rstest;

    fn action(line: &str) -> UiAction {
        match parse_command(line) {
            Ok(Some(ConsoleCommand::Action(action))) => action,
            other => panic!("expected action for {line:?}, got {other:?}"),
        }
    }

    #[rstest]
    #[case("scan", UiAction::EnterScanning)]
    #[case("capture", UiAction::BeginCapture)]
    #[case("submit", UiAction::SubmitRegistration)]
    #[case("back", UiAction::CloseRegistration)]
    #[case("users", UiAction::ListRecords)]
    #[case("logs", UiAction::ListLedger)]
    #[case("clear-logs yes", UiAction::ClearLedger)]
    #[case("  name   Mary Ann  ", UiAction::SetName("Mary Ann".into()))]
    #[case("remove a1b2", UiAction::RemoveRecord { id: "a1b2".into() })]
    fn test_simple_commands(#[case] line: &str, #[case] expected: UiAction) {
        assert_eq!(action(line), expected);
    }

    #[test]
    fn test_login() {
        assert_eq!(
            action("login admin s3cret"),
            UiAction::OpenAdminMenu {
                username: "admin".into(),
                password: "s3cret".into(),
            }
        );
        assert!(parse_command("login admin").is_err());
    }

    #[test]
    fn test_edit_with_and_without_image() {
        assert_eq!(
            action("edit A1B2 Alice Smith"),
            UiAction::EditRecord {
                id: "A1B2".into(),
                name: "Alice Smith".into(),
                image: None,
            }
        );
        assert_eq!(
            action("edit A1B2 Alice --image /tmp/new.png"),
            UiAction::EditRecord {
                id: "A1B2".into(),
                name: "Alice".into(),
                image: Some(PathBuf::from("/tmp/new.png")),
            }
        );
        assert!(parse_command("edit A1B2 Alice --image").is_err());
    }

    #[rstest]
    #[case("clear-logs")]
    #[case("clear-logs now")]
    #[case("export")]
    #[case("card")]
    #[case("frobnicate")]
    fn test_rejected_lines(#[case] line: &str) {
        assert!(parse_command(line).is_err());
    }

    #[test]
    fn test_non_actions() {
        assert_eq!(parse_command("   ").unwrap(), None);
        assert_eq!(parse_command("help").unwrap(), Some(ConsoleCommand::Help));
        assert_eq!(parse_command("quit").unwrap(), Some(ConsoleCommand::Quit));
        assert_eq!(
            parse_command("card a1b2").unwrap(),
            Some(ConsoleCommand::Present("a1b2".into()))
        );
    }

    #[test]
    fn test_view_renders_decision_and_form() {
        let mut view = ConsoleView::new(Vec::new());
        view.show_decision(&AccessDecision {
            badge_id: "ZZ99".into(),
            outcome: AccessOutcome::Denied,
            actor_name: "Unknown User".into(),
            image_ref: None,
        });

        let mut form = RegistrationForm::new();
        form.capture(BadgeId::new("c3d4").unwrap());
        view.show_form(&form);

        let text = String::from_utf8(view.into_inner()).unwrap();
        assert!(text.contains("[Not Allowed] Unknown User (ZZ99)"));
        assert!(text.contains("card=C3D4"));
        assert!(text.contains("Card ID C3D4 scanned successfully!"));
    }
}
