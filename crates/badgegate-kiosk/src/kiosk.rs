//! Kiosk runtime.
//!
//! One task owns the mode machine, the directory store, the ledger, the
//! enrollment form and the view. It multiplexes three inputs:
//!
//! - accepted badges from the reader loop
//! - operator actions from the front end
//! - idle-reset timer firings it scheduled itself
//!
//! and stops when its cancellation token fires or the front end's action
//! queue closes. Because all mutation happens here, the directory needs no
//! locking; the reader loop sees enrollment changes through the store's
//! `watch` snapshot.

use crate::admin::AdminCredentials;
use crate::decision::decide;
use crate::error::{KioskError, KioskResult};
use crate::messages::KioskMessages;
use crate::mode::{KioskMode, ModeMachine};
use crate::registration::{FormError, RegistrationForm};
use crate::view::KioskView;
use badgegate_core::constants::DEFAULT_IDLE_RESET_MS;
use badgegate_core::{BadgeId, FaultKind};
use badgegate_hardware::{ReaderControl, ReaderEvent, ReaderHandle};
use badgegate_storage::{DirectoryStore, Ledger};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Kiosk behaviour settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KioskSettings {
    /// How long a decision stays on screen before the idle screen returns.
    pub idle_reset_ms: u64,

    /// Credentials required to open the admin menu.
    pub admin: AdminCredentials,
}

impl Default for KioskSettings {
    fn default() -> Self {
        Self {
            idle_reset_ms: DEFAULT_IDLE_RESET_MS,
            admin: AdminCredentials::default(),
        }
    }
}

impl KioskSettings {
    pub fn idle_reset_ms(mut self, idle_reset_ms: u64) -> Self {
        self.idle_reset_ms = idle_reset_ms;
        self
    }

    pub fn admin(mut self, admin: AdminCredentials) -> Self {
        self.admin = admin;
        self
    }

    pub fn idle_reset(&self) -> Duration {
        Duration::from_millis(self.idle_reset_ms)
    }
}

/// Operator input from the front end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiAction {
    /// Return to the idle screen.
    EnterScanning,

    /// Open the admin menu. Credentials are checked when coming from the
    /// idle screen and ignored when stepping back from the enrollment form.
    OpenAdminMenu { username: String, password: String },

    /// Open the enrollment form if needed and arm the card capture.
    BeginCapture,
    SetName(String),
    SetImage(PathBuf),
    SubmitRegistration,

    /// Leave the enrollment form for the admin menu.
    CloseRegistration,

    EditRecord {
        id: String,
        name: String,
        image: Option<PathBuf>,
    },
    RemoveRecord { id: String },
    ListRecords,
    ListLedger,

    /// Truncate the ledger. Confirmation is the front end's job.
    ClearLedger,
    ExportLedger { destination: PathBuf },
}

impl UiAction {
    /// Short human-readable name for logs and errors.
    pub fn label(&self) -> &'static str {
        match self {
            UiAction::EnterScanning => "Returning to scanning",
            UiAction::OpenAdminMenu { .. } => "Opening the admin menu",
            UiAction::BeginCapture => "Capturing a card",
            UiAction::SetName(_) => "Setting the name",
            UiAction::SetImage(_) => "Setting the image",
            UiAction::SubmitRegistration => "Registering a user",
            UiAction::CloseRegistration => "Closing registration",
            UiAction::EditRecord { .. } => "Editing a user",
            UiAction::RemoveRecord { .. } => "Deleting a user",
            UiAction::ListRecords => "Listing users",
            UiAction::ListLedger => "Listing access logs",
            UiAction::ClearLedger => "Clearing access logs",
            UiAction::ExportLedger { .. } => "Exporting access logs",
        }
    }
}

/// Cancel-and-reschedule idle timer.
///
/// Each schedule bumps a generation counter; a firing whose generation is
/// no longer current is ignored, which covers a timer that fired after it
/// was cancelled but before its message was consumed.
#[derive(Debug)]
struct IdleTimer {
    generation: u64,
    pending: Option<JoinHandle<()>>,
    fired_tx: mpsc::UnboundedSender<u64>,
    fired_rx: mpsc::UnboundedReceiver<u64>,
}

impl IdleTimer {
    fn new() -> Self {
        let (fired_tx, fired_rx) = mpsc::unbounded_channel();
        Self {
            generation: 0,
            pending: None,
            fired_tx,
            fired_rx,
        }
    }

    fn schedule(&mut self, delay: Duration) {
        self.cancel();
        let generation = self.generation;
        let fired_tx = self.fired_tx.clone();
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = fired_tx.send(generation);
        }));
    }

    fn cancel(&mut self) {
        if let Some(task) = self.pending.take() {
            task.abort();
        }
        self.generation += 1;
    }

    /// Consume a firing; `true` if it belongs to the live timer.
    fn fire(&mut self, generation: u64) -> bool {
        if generation == self.generation && self.pending.is_some() {
            self.pending = None;
            true
        } else {
            false
        }
    }

    fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    async fn next(&mut self) -> Option<u64> {
        self.fired_rx.recv().await
    }
}

/// The kiosk's UI context.
pub struct Kiosk<V> {
    modes: ModeMachine,
    store: DirectoryStore,
    ledger: Ledger,
    form: RegistrationForm,
    view: V,
    settings: KioskSettings,
    reader: ReaderControl,
    idle: IdleTimer,
}

impl<V: KioskView> Kiosk<V> {
    pub fn new(store: DirectoryStore, ledger: Ledger, view: V, settings: KioskSettings) -> Self {
        Self {
            modes: ModeMachine::new(),
            store,
            ledger,
            form: RegistrationForm::new(),
            view,
            settings,
            reader: ReaderControl::new(),
            idle: IdleTimer::new(),
        }
    }

    /// Attach the control of a reader loop that is driven elsewhere.
    pub fn with_reader_control(mut self, control: ReaderControl) -> Self {
        self.reader = control;
        self
    }

    pub fn mode(&self) -> KioskMode {
        self.modes.current_mode()
    }

    pub fn modes(&self) -> &ModeMachine {
        &self.modes
    }

    pub fn store(&self) -> &DirectoryStore {
        &self.store
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn form(&self) -> &RegistrationForm {
        &self.form
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    /// Whether a decision is on screen waiting for the idle reset.
    pub fn idle_reset_pending(&self) -> bool {
        self.idle.is_pending()
    }

    /// Route one reader event according to the current mode.
    ///
    /// Must be called from within a Tokio runtime: a scan on the idle screen
    /// schedules the idle reset.
    pub fn handle_reader_event(&mut self, event: ReaderEvent) {
        match event {
            ReaderEvent::CardAccepted { id, authorized } => {
                debug!(badge = %id, authorized, mode = %self.mode(), "Reader event");
                self.on_accepted_token(id);
            }
            _ => {}
        }
    }

    /// Route an accepted badge id.
    ///
    /// - `Scanning`: decide, log one ledger row, show the result and
    ///   schedule the idle reset
    /// - `Registering`: fill the form's card field; nothing is logged
    /// - `AdminMenu`: ignored
    pub fn on_accepted_token(&mut self, id: BadgeId) {
        match self.mode() {
            KioskMode::Scanning => {
                let (decision, logged) = decide(&self.store, &self.ledger, id.as_str());
                self.view.show_decision(&decision);
                if let Err(e) = logged {
                    self.report(e.into());
                }
                self.idle.schedule(self.settings.idle_reset());
            }
            KioskMode::Registering => {
                info!(badge = %id, "Card captured for registration");
                self.form.capture(id);
                self.view.show_form(&self.form);
            }
            KioskMode::AdminMenu => {
                debug!(badge = %id, "Ignoring scan in admin menu");
            }
        }
    }

    /// Apply an action and report any failure to the view.
    pub fn dispatch(&mut self, action: UiAction) {
        let label = action.label();
        if let Err(e) = self.handle_action(action) {
            debug!(action = label, "Action failed");
            self.report(e);
        }
    }

    /// Apply one operator action.
    ///
    /// # Errors
    ///
    /// Returns the failure without showing it; [`Kiosk::dispatch`] is the
    /// reporting wrapper.
    pub fn handle_action(&mut self, action: UiAction) -> KioskResult<()> {
        let label = action.label();

        match action {
            UiAction::EnterScanning => self.transition(KioskMode::Scanning),

            UiAction::OpenAdminMenu { username, password } => {
                if self.mode() == KioskMode::Scanning
                    && !self.settings.admin.verify(&username, &password)
                {
                    warn!("Rejected admin login");
                    return Err(KioskError::InvalidCredentials);
                }
                self.transition(KioskMode::AdminMenu)
            }

            UiAction::BeginCapture => {
                self.transition(KioskMode::Registering)?;
                self.form.begin_capture();
                self.view.show_form(&self.form);
                Ok(())
            }

            UiAction::SetName(name) => {
                self.require_operator(label)?;
                self.form.set_name(name);
                self.view.show_form(&self.form);
                Ok(())
            }

            UiAction::SetImage(image) => {
                self.require_operator(label)?;
                self.form.set_image(image);
                self.view.show_form(&self.form);
                Ok(())
            }

            UiAction::SubmitRegistration => {
                self.require_operator(label)?;
                let result = self.form.submit(&mut self.store);
                self.view.show_form(&self.form);
                result.map(|_| ())
            }

            UiAction::CloseRegistration => {
                if self.mode() != KioskMode::Registering {
                    return Err(KioskError::not_available(label, self.mode()));
                }
                self.transition(KioskMode::AdminMenu)
            }

            UiAction::EditRecord { id, name, image } => {
                self.require_operator(label)?;
                if name.trim().is_empty() {
                    return Err(FormError::MissingName.into());
                }
                let id = BadgeId::new(&id)?;
                let record = self.store.edit(&id, &name, image.as_deref())?;
                self.view
                    .show_notice(&KioskMessages::user_updated(&record.display_name));
                Ok(())
            }

            UiAction::RemoveRecord { id } => {
                self.require_operator(label)?;
                let id = BadgeId::new(&id)?;
                self.store.remove(&id)?;
                self.view.show_notice(KioskMessages::USER_DELETED);
                Ok(())
            }

            UiAction::ListRecords => {
                self.require_operator(label)?;
                self.view.show_records(&self.store.records());
                Ok(())
            }

            UiAction::ListLedger => {
                self.require_operator(label)?;
                let events = self.ledger.entries()?;
                self.view.show_ledger(&events);
                Ok(())
            }

            UiAction::ClearLedger => {
                self.require_operator(label)?;
                self.ledger.clear()?;
                self.view.show_notice(KioskMessages::LOGS_CLEARED);
                Ok(())
            }

            UiAction::ExportLedger { destination } => {
                self.require_operator(label)?;
                self.ledger.export(&destination)?;
                self.view
                    .show_notice(&KioskMessages::logs_exported(&destination));
                Ok(())
            }
        }
    }

    /// Run until `shutdown` fires or `actions` closes.
    ///
    /// When `reader` is given its control is attached and the loop is shut
    /// down on exit. A reader that stops on its own is logged and the kiosk
    /// keeps serving operator actions. Returns the kiosk for inspection.
    pub async fn run(
        mut self,
        mut reader: Option<ReaderHandle>,
        mut actions: mpsc::Receiver<UiAction>,
        shutdown: CancellationToken,
    ) -> Self {
        if let Some(handle) = &reader {
            self.reader = handle.control().clone();
        }
        let mut reader_live = reader.is_some();

        info!(mode = %self.mode(), reader = reader_live, "Kiosk started");
        self.view.show_idle();

        loop {
            tokio::select! {
                biased;

                () = shutdown.cancelled() => {
                    info!("Kiosk shutting down");
                    break;
                }

                event = next_reader_event(&mut reader), if reader_live => match event {
                    Some(event) => self.handle_reader_event(event),
                    None => {
                        warn!("Reader loop ended; continuing without a reader");
                        reader_live = false;
                    }
                },

                action = actions.recv() => match action {
                    Some(action) => self.dispatch(action),
                    None => {
                        info!("Action queue closed");
                        break;
                    }
                },

                Some(generation) = self.idle.next() => self.on_idle_timer(generation),
            }
        }

        self.idle.cancel();
        if let Some(handle) = reader.take()
            && let Err(e) = handle.shutdown().await
        {
            error!(error = %e, "Reader loop did not stop cleanly");
        }

        info!("Kiosk stopped");
        self
    }

    fn on_idle_timer(&mut self, generation: u64) {
        if !self.idle.fire(generation) {
            debug!(generation, "Stale idle timer");
            return;
        }
        if self.mode() == KioskMode::Scanning {
            self.show_idle_screen();
        }
    }

    fn show_idle_screen(&mut self) {
        self.reader.request_reset();
        self.view.show_idle();
    }

    fn transition(&mut self, mode: KioskMode) -> KioskResult<()> {
        let dwell = self.modes.time_in_current_mode();
        let Some(transition) = self.modes.transition_to(mode)? else {
            return Ok(());
        };
        info!(
            from = %transition.from,
            to = %transition.to,
            dwell_ms = dwell.as_millis() as u64,
            "Kiosk mode changed"
        );

        self.idle.cancel();
        self.view.show_mode(mode);
        if mode == KioskMode::Scanning {
            self.form.reset();
            self.show_idle_screen();
        }
        Ok(())
    }

    fn require_operator(&self, action: &'static str) -> KioskResult<()> {
        if self.mode().is_operator() {
            Ok(())
        } else {
            Err(KioskError::not_available(action, self.mode()))
        }
    }

    fn report(&mut self, error: KioskError) {
        match error.kind() {
            FaultKind::Persistence => error!(error = %error, kind = %error.kind(), "Kiosk fault"),
            kind => warn!(error = %error, %kind, "Kiosk fault"),
        }
        self.view.show_fault(&error);
    }
}

async fn next_reader_event(reader: &mut Option<ReaderHandle>) -> Option<ReaderEvent> {
    match reader.as_mut() {
        Some(handle) => handle.recv().await,
        None => std::future::pending().await,
    }
}
