//! Shared intake sessions.
//!
//! An [`IntakeSession`] wraps one controller behind an async mutex and owns
//! the timer task for its auto-advance. [`IntakeSessions`] is the registry the
//! HTTP layer talks to.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{Duration, Instant};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::controller::{
    AutoAdvance, IntakeController, IntakeDeps, IntakeSnapshot, Key, KeyAction, SubmitOutcome,
    SubmitRejected,
};
use super::model::{EventSetting, EventType, Field, MealPreference};
use super::stage::Stage;
use crate::config::IntakeConfig;
use crate::error::{IntakeError, VerificationError};
use crate::leads::LeadSink;
use crate::store::{DraftBackend, ScopedDraftStore};
use crate::verification::VerificationProvider;

/// Handle to one visitor's questionnaire. Cheap to clone.
#[derive(Clone)]
pub struct IntakeSession {
    id: Uuid,
    controller: Arc<Mutex<IntakeController>>,
    timer: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl IntakeSession {
    fn new(id: Uuid, controller: IntakeController) -> Self {
        Self {
            id,
            controller: Arc::new(Mutex::new(controller)),
            timer: Arc::new(Mutex::new(None)),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub async fn snapshot(&self) -> IntakeSnapshot {
        self.controller.lock().await.snapshot()
    }

    pub async fn set_field(&self, field: Field, value: &str) -> IntakeSnapshot {
        let mut c = self.controller.lock().await;
        c.set_field(field, value).await;
        c.snapshot()
    }

    pub async fn advance(&self) -> IntakeSnapshot {
        let mut c = self.controller.lock().await;
        c.advance().await;
        c.snapshot()
    }

    pub async fn retreat(&self) -> IntakeSnapshot {
        let mut c = self.controller.lock().await;
        c.retreat().await;
        c.snapshot()
    }

    pub async fn jump_to(&self, stage: Stage) -> IntakeSnapshot {
        let mut c = self.controller.lock().await;
        c.jump_to(stage).await;
        c.snapshot()
    }

    pub async fn select_event_type(&self, event_type: EventType) -> IntakeSnapshot {
        let (ticket, snapshot) = {
            let mut c = self.controller.lock().await;
            let ticket = c.select_event_type(event_type).await;
            (ticket, c.snapshot())
        };
        if let Some(ticket) = ticket {
            self.spawn_auto_advance(ticket).await;
        }
        snapshot
    }

    pub async fn select_event_setting(&self, setting: EventSetting) -> IntakeSnapshot {
        let (ticket, snapshot) = {
            let mut c = self.controller.lock().await;
            let ticket = c.select_event_setting(setting).await;
            (ticket, c.snapshot())
        };
        if let Some(ticket) = ticket {
            self.spawn_auto_advance(ticket).await;
        }
        snapshot
    }

    pub async fn increment_guests(&self) -> IntakeSnapshot {
        let mut c = self.controller.lock().await;
        c.increment_guests().await;
        c.snapshot()
    }

    pub async fn decrement_guests(&self) -> IntakeSnapshot {
        let mut c = self.controller.lock().await;
        c.decrement_guests().await;
        c.snapshot()
    }

    pub async fn toggle_meal(&self, meal: MealPreference) -> IntakeSnapshot {
        let mut c = self.controller.lock().await;
        c.toggle_meal(meal).await;
        c.snapshot()
    }

    pub async fn apply_event_type_hint(&self, event_type: EventType) -> bool {
        self.controller
            .lock()
            .await
            .apply_event_type_hint(event_type)
            .await
    }

    /// Check a challenge token with `verifier` and record it on success.
    pub async fn verify(
        &self,
        verifier: &dyn VerificationProvider,
        token: &str,
    ) -> Result<IntakeSnapshot, VerificationError> {
        let accepted = verifier.verify(token).await?;
        let mut c = self.controller.lock().await;
        c.verification_succeeded(&accepted);
        debug!(session = %self.id, provider = verifier.name(), "Verification recorded");
        Ok(c.snapshot())
    }

    /// Submit the draft. The session stays usable while the lead sink is
    /// awaited; a second submit in that window is rejected. If this future
    /// is dropped before the sink answers, the in-flight flag is released.
    pub async fn submit(&self) -> Result<SubmitOutcome, SubmitRejected> {
        let (record, sink) = {
            let mut c = self.controller.lock().await;
            (c.begin_submit()?, c.sink())
        };
        let guard = InFlightSubmit::arm(self);
        let result = sink.insert(&record).await;
        let mut c = self.controller.lock().await;
        let outcome = c.finish_submit(result).await;
        guard.disarm();
        Ok(outcome)
    }

    /// Resolve and run a key press. Returns the action taken, if any.
    pub async fn handle_key(&self, key: Key) -> Result<Option<KeyAction>, SubmitRejected> {
        let action = self.controller.lock().await.key_action(key);
        match action {
            Some(KeyAction::Advance) => {
                self.advance().await;
            }
            Some(KeyAction::Retreat) => {
                self.retreat().await;
            }
            Some(KeyAction::Submit) => {
                self.submit().await?;
            }
            None => {}
        }
        Ok(action)
    }

    /// Schedule `ticket`, replacing any earlier timer.
    async fn spawn_auto_advance(&self, ticket: AutoAdvance) {
        let controller = Arc::downgrade(&self.controller);
        let id = self.id;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(ticket.delay()).await;
            let Some(controller) = controller.upgrade() else {
                return;
            };
            let fired = controller.lock().await.fire_auto_advance(ticket).await;
            debug!(session = %id, from = %ticket.from_stage(), fired, "Auto-advance timer elapsed");
        });
        if let Some(previous) = self.timer.lock().await.replace(handle) {
            previous.abort();
        }
    }

    /// Stop the controller and its timer. The saved draft is kept.
    async fn unmount(&self) {
        self.controller.lock().await.unmount();
        if let Some(handle) = self.timer.lock().await.take() {
            handle.abort();
        }
    }
}

/// Releases a session's in-flight submit when dropped while still armed.
struct InFlightSubmit {
    id: Uuid,
    controller: Option<Arc<Mutex<IntakeController>>>,
}

impl InFlightSubmit {
    fn arm(session: &IntakeSession) -> Self {
        Self {
            id: session.id,
            controller: Some(Arc::clone(&session.controller)),
        }
    }

    fn disarm(mut self) {
        self.controller = None;
    }
}

impl Drop for InFlightSubmit {
    fn drop(&mut self) {
        let Some(controller) = self.controller.take() else {
            return;
        };
        let id = self.id;
        if let Ok(mut c) = controller.try_lock() {
            c.abandon_submit();
            debug!(session = %id, "Cancelled submit released");
            return;
        }
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(async move {
                    controller.lock().await.abandon_submit();
                    debug!(session = %id, "Cancelled submit released");
                });
            }
            Err(_) => warn!(session = %id, "No runtime to release a cancelled submit"),
        }
    }
}

/// A live session and when a request last reached it.
struct Entry {
    session: IntakeSession,
    last_seen: Instant,
}

impl Entry {
    fn new(session: IntakeSession) -> Self {
        Self {
            session,
            last_seen: Instant::now(),
        }
    }
}

/// All live intake sessions plus the collaborators new ones are built with.
pub struct IntakeSessions {
    sessions: RwLock<HashMap<Uuid, Entry>>,
    backend: Arc<dyn DraftBackend>,
    sink: Arc<dyn LeadSink>,
    verifier: Arc<dyn VerificationProvider>,
    config: IntakeConfig,
}

impl IntakeSessions {
    pub fn new(
        backend: Arc<dyn DraftBackend>,
        sink: Arc<dyn LeadSink>,
        verifier: Arc<dyn VerificationProvider>,
        config: IntakeConfig,
    ) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            backend,
            sink,
            verifier,
            config,
        }
    }

    pub fn verifier(&self) -> &dyn VerificationProvider {
        self.verifier.as_ref()
    }

    pub fn config(&self) -> &IntakeConfig {
        &self.config
    }

    fn deps(&self, id: Uuid) -> IntakeDeps {
        IntakeDeps {
            store: Arc::new(ScopedDraftStore::new(
                Arc::clone(&self.backend),
                id.to_string(),
            )),
            sink: Arc::clone(&self.sink),
            config: self.config.clone(),
        }
    }

    /// Start a fresh session, optionally pre-selecting the event type.
    pub async fn open(&self, hint: Option<EventType>) -> IntakeSession {
        let id = Uuid::new_v4();
        let controller = IntakeController::mount(self.deps(id)).await;
        let session = IntakeSession::new(id, controller);
        if let Some(hint) = hint {
            session.apply_event_type_hint(hint).await;
        }
        self.sessions
            .write()
            .await
            .insert(id, Entry::new(session.clone()));
        info!(session = %id, hint = ?hint, "Intake session opened");
        session
    }

    /// Look up a live session, or remount one whose draft is still stored.
    /// Either way the session counts as active again.
    pub async fn resume(&self, id: Uuid) -> Option<IntakeSession> {
        if let Some(session) = self.touch(id).await {
            return Some(session);
        }

        let deps = self.deps(id);
        let saved = deps.store.load().await.ok().flatten()?;

        let mut sessions = self.sessions.write().await;
        if let Some(entry) = sessions.get_mut(&id) {
            entry.last_seen = Instant::now();
            return Some(entry.session.clone());
        }
        let session = IntakeSession::new(id, IntakeController::from_saved(deps, Some(saved)));
        sessions.insert(id, Entry::new(session.clone()));
        info!(session = %id, "Intake session restored from saved draft");
        Some(session)
    }

    pub async fn get(&self, id: Uuid) -> Result<IntakeSession, IntakeError> {
        self.resume(id)
            .await
            .ok_or(IntakeError::SessionNotFound(id))
    }

    async fn touch(&self, id: Uuid) -> Option<IntakeSession> {
        let mut sessions = self.sessions.write().await;
        let entry = sessions.get_mut(&id)?;
        entry.last_seen = Instant::now();
        Some(entry.session.clone())
    }

    /// Unmount and forget a session. Its saved draft stays for a later resume.
    pub async fn close(&self, id: Uuid) -> bool {
        let Some(entry) = self.sessions.write().await.remove(&id) else {
            return false;
        };
        entry.session.unmount().await;
        info!(session = %id, "Intake session closed");
        true
    }

    /// Close every session untouched for at least `max_idle`. Saved drafts
    /// are kept, so an evicted visitor resumes where they left off.
    pub async fn evict_idle(&self, max_idle: Duration) -> usize {
        let now = Instant::now();
        let evicted: Vec<IntakeSession> = {
            let mut sessions = self.sessions.write().await;
            let stale: Vec<Uuid> = sessions
                .iter()
                .filter(|(_, entry)| now.duration_since(entry.last_seen) >= max_idle)
                .map(|(id, _)| *id)
                .collect();
            stale
                .iter()
                .filter_map(|id| sessions.remove(id))
                .map(|entry| entry.session)
                .collect()
        };
        for session in &evicted {
            session.unmount().await;
        }
        if !evicted.is_empty() {
            info!(count = evicted.len(), "Evicted idle intake sessions");
        }
        evicted.len()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

/// Periodically evict sessions idle longer than the configured timeout.
pub fn spawn_eviction_task(sessions: Arc<IntakeSessions>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        loop {
            interval.tick().await;
            let max_idle = sessions.config().session_idle_timeout;
            let evicted = sessions.evict_idle(max_idle).await;
            let remaining = sessions.len().await;
            debug!(evicted, remaining, "Idle session sweep");
        }
    })
}
