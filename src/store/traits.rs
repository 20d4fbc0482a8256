//! Draft persistence ports.
//!
//! A [`DraftBackend`] is a plain text key-value store partitioned by scope
//! (one scope per intake session). [`ScopedDraftStore`] layers the two fixed
//! draft keys on top of it and is what controllers talk to via the
//! [`DraftStore`] trait.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::error::DatabaseError;
use crate::intake::{Draft, Stage};

/// Storage keys for a persisted draft.
pub mod draft_keys {
    /// JSON of the form fields.
    pub const FORM: &str = "eventForm";
    /// Stage index as decimal text.
    pub const STAGE: &str = "eventStep";
}

/// What survives a reload: the form fields and the current stage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersistedDraft {
    pub draft: Draft,
    pub stage: Stage,
}

/// Backend-agnostic text key-value storage.
#[async_trait]
pub trait DraftBackend: Send + Sync {
    async fn get(&self, scope: &str, key: &str) -> Result<Option<String>, DatabaseError>;

    async fn set(&self, scope: &str, key: &str, value: &str) -> Result<(), DatabaseError>;

    /// Returns whether an entry was removed.
    async fn remove(&self, scope: &str, key: &str) -> Result<bool, DatabaseError>;
}

/// Load/save/clear of a single draft.
#[async_trait]
pub trait DraftStore: Send + Sync {
    async fn load(&self) -> Result<Option<PersistedDraft>, DatabaseError>;

    async fn save(&self, persisted: &PersistedDraft) -> Result<(), DatabaseError>;

    async fn clear(&self) -> Result<(), DatabaseError>;
}

/// A [`DraftStore`] bound to one scope of a [`DraftBackend`].
#[derive(Clone)]
pub struct ScopedDraftStore {
    backend: Arc<dyn DraftBackend>,
    scope: String,
}

impl ScopedDraftStore {
    pub fn new(backend: Arc<dyn DraftBackend>, scope: impl Into<String>) -> Self {
        Self {
            backend,
            scope: scope.into(),
        }
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }
}

#[async_trait]
impl DraftStore for ScopedDraftStore {
    async fn load(&self) -> Result<Option<PersistedDraft>, DatabaseError> {
        let form = self.backend.get(&self.scope, draft_keys::FORM).await?;
        let stage = self.backend.get(&self.scope, draft_keys::STAGE).await?;
        if form.is_none() && stage.is_none() {
            return Ok(None);
        }
        Ok(Some(decode(&self.scope, form.as_deref(), stage.as_deref())))
    }

    async fn save(&self, persisted: &PersistedDraft) -> Result<(), DatabaseError> {
        let form = serde_json::to_string(&persisted.draft)
            .map_err(|e| DatabaseError::Serialization(e.to_string()))?;
        self.backend
            .set(&self.scope, draft_keys::FORM, &form)
            .await?;
        self.backend
            .set(
                &self.scope,
                draft_keys::STAGE,
                &persisted.stage.index().to_string(),
            )
            .await
    }

    async fn clear(&self) -> Result<(), DatabaseError> {
        self.backend.remove(&self.scope, draft_keys::FORM).await?;
        self.backend.remove(&self.scope, draft_keys::STAGE).await?;
        Ok(())
    }
}

/// Rebuild a draft from stored text. Unreadable values fall back to defaults
/// so a corrupted entry never blocks the questionnaire.
fn decode(scope: &str, form: Option<&str>, stage: Option<&str>) -> PersistedDraft {
    let draft = match form.map(serde_json::from_str::<Draft>) {
        Some(Ok(draft)) => draft,
        Some(Err(e)) => {
            debug!(scope, error = %e, "Discarding unreadable saved form");
            Draft::default()
        }
        None => Draft::default(),
    };

    let stage = stage
        .and_then(|s| s.trim().parse::<usize>().ok())
        .and_then(Stage::from_index)
        .unwrap_or_default();

    PersistedDraft { draft, stage }
}
