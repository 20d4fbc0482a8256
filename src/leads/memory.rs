//! In-process lead sink, used for local runs and tests.

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::info;

use super::LeadSink;
use crate::error::LeadSinkError;
use crate::intake::LeadRecord;

/// Collects leads in memory. Can be switched into a failing mode to exercise
/// the error path.
#[derive(Default)]
pub struct MemoryLeadSink {
    records: RwLock<Vec<LeadRecord>>,
    failure: RwLock<Option<String>>,
}

impl MemoryLeadSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent inserts fail (`Some`) or succeed (`None`).
    pub async fn set_failure(&self, message: Option<String>) {
        *self.failure.write().await = message;
    }

    pub async fn records(&self) -> Vec<LeadRecord> {
        self.records.read().await.clone()
    }
}

#[async_trait]
impl LeadSink for MemoryLeadSink {
    fn name(&self) -> &str {
        "memory"
    }

    async fn insert(&self, record: &LeadRecord) -> Result<(), LeadSinkError> {
        if let Some(message) = self.failure.read().await.clone() {
            return Err(LeadSinkError::Unavailable(message));
        }
        let mut records = self.records.write().await;
        records.push(record.clone());
        info!(total = records.len(), "Lead stored in memory");
        Ok(())
    }
}
