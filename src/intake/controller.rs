//! IntakeController owns one questionnaire from first field to submission.
//!
//! The controller is single-owner: callers serialize access (see
//! [`IntakeSession`](super::session::IntakeSession) for the shared handle).
//! Deferred work such as the auto-advance is handed out as tickets the caller
//! schedules; the controller only decides whether a ticket is still current.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::model::{Draft, EventSetting, EventType, Field, LeadRecord, MealPreference, parse_guest_count};
use super::stage::{Direction, Stage};
use super::validation::FieldErrors;
use crate::config::IntakeConfig;
use crate::error::LeadSinkError;
use crate::leads::LeadSink;
use crate::store::{DraftStore, PersistedDraft};

/// Path of the landing view clients return to after submitting.
pub const LANDING_PATH: &str = "/";

/// Collaborators a controller needs.
#[derive(Clone)]
pub struct IntakeDeps {
    pub store: Arc<dyn DraftStore>,
    pub sink: Arc<dyn LeadSink>,
    pub config: IntakeConfig,
}

/// A scheduled advance. Only fires if nothing moved the wizard in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutoAdvance {
    epoch: u64,
    from: Stage,
    delay: Duration,
}

impl AutoAdvance {
    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn from_stage(&self) -> Stage {
        self.from
    }
}

/// Keys the questionnaire listens to while mounted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Key {
    Enter,
    Escape,
}

/// What a key press resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyAction {
    Advance,
    Submit,
    Retreat,
}

/// Why a submission was refused before reaching the lead sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(rename_all = "snake_case")]
pub enum SubmitRejected {
    #[error("submission is only available on the review stage")]
    NotAtReview,
    #[error("human verification has not completed")]
    NotVerified,
    #[error("a submission is already in progress")]
    InFlight,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    Success,
    Error,
}

/// A message shown to the visitor as an alert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

/// Result of a submission that reached the lead sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SubmitOutcome {
    /// Stored; the client should navigate to `redirect_to` after the delay.
    Submitted {
        redirect_to: String,
        redirect_after_ms: u64,
    },
    /// The sink refused; the draft is kept for a retry.
    Failed { message: String },
}

/// Serializable view of the controller for clients.
#[derive(Debug, Clone, Serialize)]
pub struct IntakeSnapshot {
    pub stage: Stage,
    pub stage_index: usize,
    pub stage_count: usize,
    pub stage_label: &'static str,
    pub title: &'static str,
    pub subtitle: &'static str,
    pub progress_percent: u8,
    pub direction: Direction,
    pub draft: Draft,
    pub field_errors: FieldErrors,
    pub can_advance: bool,
    pub can_retreat: bool,
    pub can_submit: bool,
    pub verified: bool,
    pub submitting: bool,
    pub submit_error: Option<String>,
    pub notice: Option<Notice>,
    pub auto_advance_pending: bool,
}

pub struct IntakeController {
    draft: Draft,
    stage: Stage,
    errors: FieldErrors,
    direction: Direction,
    verification_token: Option<String>,
    submitting: bool,
    submit_error: Option<String>,
    notice: Option<Notice>,
    mounted: bool,
    advance_epoch: u64,
    pending_advance: Option<AutoAdvance>,
    store: Arc<dyn DraftStore>,
    sink: Arc<dyn LeadSink>,
    config: IntakeConfig,
}

impl IntakeController {
    /// Mount a controller, restoring any draft the store holds.
    pub async fn mount(deps: IntakeDeps) -> Self {
        let saved = match deps.store.load().await {
            Ok(saved) => saved,
            Err(e) => {
                warn!(error = %e, "Failed to load saved draft, starting empty");
                None
            }
        };
        Self::from_saved(deps, saved)
    }

    /// Mount a controller from an already loaded draft.
    pub fn from_saved(deps: IntakeDeps, saved: Option<PersistedDraft>) -> Self {
        let PersistedDraft { draft, stage } = saved.unwrap_or_default();
        debug!(stage = %stage, "Intake controller mounted");
        Self {
            draft,
            stage,
            errors: FieldErrors::default(),
            direction: Direction::Forward,
            verification_token: None,
            submitting: false,
            submit_error: None,
            notice: None,
            mounted: true,
            advance_epoch: 0,
            pending_advance: None,
            store: deps.store,
            sink: deps.sink,
            config: deps.config,
        }
    }

    // ── Accessors ───────────────────────────────────────────────────

    pub fn draft(&self) -> &Draft {
        &self.draft
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn is_verified(&self) -> bool {
        self.verification_token.is_some()
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    pub fn submit_error(&self) -> Option<&str> {
        self.submit_error.as_deref()
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    pub fn config(&self) -> &IntakeConfig {
        &self.config
    }

    pub fn sink(&self) -> Arc<dyn LeadSink> {
        Arc::clone(&self.sink)
    }

    // ── Gating ──────────────────────────────────────────────────────

    /// Whether `stage`'s data is complete enough to move past it.
    pub fn stage_complete(&self, stage: Stage) -> bool {
        let d = &self.draft;
        match stage {
            Stage::ContactInfo => {
                !d.contact_name.is_empty()
                    && !d.phone.is_empty()
                    && !d.email.is_empty()
                    && self.errors.is_empty()
            }
            Stage::EventType => d.event_type.is_some(),
            Stage::EventSetting => d.event_setting.is_some(),
            Stage::GuestCount => d.guest_count.is_some(),
            Stage::MealPreferences => !d.meal_preferences.is_empty(),
            Stage::Review => false,
        }
    }

    pub fn can_advance(&self) -> bool {
        !self.stage.is_terminal() && self.stage_complete(self.stage)
    }

    pub fn can_retreat(&self) -> bool {
        self.stage.previous().is_some()
    }

    pub fn can_submit(&self) -> bool {
        self.check_submit().is_ok()
    }

    fn check_submit(&self) -> Result<(), SubmitRejected> {
        if self.stage != Stage::Review {
            return Err(SubmitRejected::NotAtReview);
        }
        if self.submitting {
            return Err(SubmitRejected::InFlight);
        }
        match self.verification_token.as_deref() {
            Some(token) if !token.is_empty() => Ok(()),
            _ => Err(SubmitRejected::NotVerified),
        }
    }

    // ── Navigation ──────────────────────────────────────────────────

    /// Move to the next stage if the current one is complete.
    pub async fn advance(&mut self) -> bool {
        if !self.can_advance() {
            debug!(stage = %self.stage, "Advance blocked");
            return false;
        }
        let Some(next) = self.stage.next() else {
            return false;
        };
        self.move_to(next, Direction::Forward).await;
        true
    }

    /// Move to the previous stage. No-op on the first stage.
    pub async fn retreat(&mut self) -> bool {
        let Some(previous) = self.stage.previous() else {
            return false;
        };
        self.move_to(previous, Direction::Backward).await;
        true
    }

    /// Jump from the review stage straight to an editable stage.
    pub async fn jump_to(&mut self, target: Stage) -> bool {
        if self.stage != Stage::Review || !target.is_jump_target() {
            debug!(from = %self.stage, to = %target, "Jump refused");
            return false;
        }
        let direction = Direction::between(self.stage, target);
        self.move_to(target, direction).await;
        true
    }

    async fn move_to(&mut self, target: Stage, direction: Direction) {
        debug!(from = %self.stage, to = %target, ?direction, "Stage change");
        self.stage = target;
        self.direction = direction;
        self.cancel_auto_advance();
        self.persist().await;
    }

    // ── Auto-advance ────────────────────────────────────────────────

    fn schedule_auto_advance(&mut self) -> AutoAdvance {
        self.advance_epoch += 1;
        let ticket = AutoAdvance {
            epoch: self.advance_epoch,
            from: self.stage,
            delay: self.config.auto_advance_delay,
        };
        self.pending_advance = Some(ticket);
        ticket
    }

    /// Invalidate any scheduled advance.
    pub fn cancel_auto_advance(&mut self) {
        self.advance_epoch += 1;
        self.pending_advance = None;
    }

    pub fn auto_advance_pending(&self) -> bool {
        self.pending_advance.is_some()
    }

    /// Run a scheduled advance if it is still current.
    pub async fn fire_auto_advance(&mut self, ticket: AutoAdvance) -> bool {
        if !self.mounted || ticket.epoch != self.advance_epoch || ticket.from != self.stage {
            debug!(from = %ticket.from, "Stale auto-advance ignored");
            return false;
        }
        self.pending_advance = None;
        self.advance().await
    }

    // ── Field edits ─────────────────────────────────────────────────

    /// Set a free-text field and re-run its validator.
    pub async fn set_field(&mut self, field: Field, value: &str) {
        match field {
            Field::Name => self.draft.contact_name = value.to_string(),
            Field::Phone => self.draft.phone = value.to_string(),
            Field::Email => self.draft.email = value.to_string(),
            Field::GuestCount => self.draft.guest_count = parse_guest_count(value),
        }
        self.errors.revalidate(field, value);
        self.persist().await;
    }

    /// Record the event type. On the event-type stage this also schedules an
    /// advance; the returned ticket must be fired after its delay.
    pub async fn select_event_type(&mut self, event_type: EventType) -> Option<AutoAdvance> {
        self.draft.event_type = Some(event_type);
        self.persist().await;
        (self.stage == Stage::EventType).then(|| self.schedule_auto_advance())
    }

    /// Record the venue setting, scheduling an advance on its stage.
    pub async fn select_event_setting(&mut self, setting: EventSetting) -> Option<AutoAdvance> {
        self.draft.event_setting = Some(setting);
        self.persist().await;
        (self.stage == Stage::EventSetting).then(|| self.schedule_auto_advance())
    }

    /// Pre-fill the event type from a landing page hint unless one is chosen.
    pub async fn apply_event_type_hint(&mut self, event_type: EventType) -> bool {
        if self.draft.event_type.is_some() {
            return false;
        }
        self.draft.event_type = Some(event_type);
        self.persist().await;
        true
    }

    pub async fn increment_guests(&mut self) -> i64 {
        let value = self.draft.guest_count.unwrap_or(0).saturating_add(1);
        self.set_field(Field::GuestCount, &value.to_string()).await;
        value
    }

    /// Decrement, never going below one guest.
    pub async fn decrement_guests(&mut self) -> i64 {
        let value = self.draft.guest_count.unwrap_or(0).saturating_sub(1).max(1);
        self.set_field(Field::GuestCount, &value.to_string()).await;
        value
    }

    /// Returns whether the meal is selected afterwards.
    pub async fn toggle_meal(&mut self, meal: MealPreference) -> bool {
        let selected = self.draft.toggle_meal(meal);
        self.persist().await;
        selected
    }

    // ── Verification & submission ───────────────────────────────────

    /// Store the token from a completed challenge. Empty tokens are ignored.
    pub fn verification_succeeded(&mut self, token: &str) -> bool {
        if token.trim().is_empty() {
            return false;
        }
        self.verification_token = Some(token.to_string());
        true
    }

    /// Check preconditions, mark the submission in flight and build the record.
    pub fn begin_submit(&mut self) -> Result<LeadRecord, SubmitRejected> {
        self.check_submit()?;
        self.submitting = true;
        self.submit_error = None;
        Ok(LeadRecord::from_draft(&self.draft, &self.config.region))
    }

    /// Apply the lead sink's answer to a submission started by
    /// [`begin_submit`](Self::begin_submit).
    pub async fn finish_submit(&mut self, result: Result<(), LeadSinkError>) -> SubmitOutcome {
        self.submitting = false;
        match result {
            Ok(()) => {
                if let Err(e) = self.store.clear().await {
                    warn!(error = %e, "Failed to clear saved draft");
                }
                self.draft = Draft::default();
                self.errors.clear();
                self.stage = Stage::ContactInfo;
                self.direction = Direction::Forward;
                self.verification_token = None;
                self.cancel_auto_advance();
                self.notice = Some(Notice {
                    kind: NoticeKind::Success,
                    message: format!(
                        "Vowza! 🎉\n\nWe've received your details. Our top vendors in {} will be in touch shortly.",
                        self.config.region
                    ),
                });
                info!(sink = self.sink.name(), "Lead submitted");
                SubmitOutcome::Submitted {
                    redirect_to: LANDING_PATH.to_string(),
                    redirect_after_ms: self.config.redirect_delay.as_millis() as u64,
                }
            }
            Err(e) => {
                let message = e.user_message();
                warn!(sink = self.sink.name(), error = %e, "Lead submission failed");
                self.submit_error = Some(message.clone());
                self.notice = Some(Notice {
                    kind: NoticeKind::Error,
                    message: format!("Error: {message}"),
                });
                SubmitOutcome::Failed { message }
            }
        }
    }

    /// Drop an in-flight submit whose answer will never arrive, so the
    /// visitor can try again. Returns false when nothing was in flight.
    pub fn abandon_submit(&mut self) -> bool {
        if !self.submitting {
            return false;
        }
        self.submitting = false;
        warn!(sink = self.sink.name(), "Lead submission abandoned before the sink answered");
        true
    }

    /// Submit and wait for the lead sink in one step.
    pub async fn submit(&mut self) -> Result<SubmitOutcome, SubmitRejected> {
        let record = self.begin_submit()?;
        let result = self.sink.insert(&record).await;
        Ok(self.finish_submit(result).await)
    }

    // ── Keyboard & lifecycle ────────────────────────────────────────

    /// Resolve a key press against the current state. Unmounted controllers
    /// and disabled controls yield `None`.
    pub fn key_action(&self, key: Key) -> Option<KeyAction> {
        if !self.mounted {
            return None;
        }
        match key {
            Key::Enter if self.stage.is_terminal() => {
                self.can_submit().then_some(KeyAction::Submit)
            }
            Key::Enter => self.can_advance().then_some(KeyAction::Advance),
            Key::Escape => self.can_retreat().then_some(KeyAction::Retreat),
        }
    }

    /// Stop listening for keys and drop any scheduled advance. The saved
    /// draft stays in the store.
    pub fn unmount(&mut self) {
        self.mounted = false;
        self.cancel_auto_advance();
        debug!(stage = %self.stage, "Intake controller unmounted");
    }

    pub fn snapshot(&self) -> IntakeSnapshot {
        IntakeSnapshot {
            stage: self.stage,
            stage_index: self.stage.index(),
            stage_count: Stage::COUNT,
            stage_label: self.stage.label(),
            title: self.stage.title(),
            subtitle: self.stage.subtitle(),
            progress_percent: self.stage.progress_percent(),
            direction: self.direction,
            draft: self.draft.clone(),
            field_errors: self.errors.clone(),
            can_advance: self.can_advance(),
            can_retreat: self.can_retreat(),
            can_submit: self.can_submit(),
            verified: self.is_verified(),
            submitting: self.submitting,
            submit_error: self.submit_error.clone(),
            notice: self.notice.clone(),
            auto_advance_pending: self.auto_advance_pending(),
        }
    }

    /// Write the draft through to the store. Failures are logged only.
    async fn persist(&self) {
        let persisted = PersistedDraft {
            draft: self.draft.clone(),
            stage: self.stage,
        };
        if let Err(e) = self.store.save(&persisted).await {
            warn!(error = %e, "Failed to persist draft");
        }
    }
}
