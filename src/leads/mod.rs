//! Lead sink, where finished questionnaires end up.

pub mod memory;
pub mod supabase;

use async_trait::async_trait;

use crate::error::LeadSinkError;
use crate::intake::LeadRecord;

pub use memory::MemoryLeadSink;
pub use supabase::SupabaseLeadSink;

/// Durable store for finalized leads.
#[async_trait]
pub trait LeadSink: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &str;

    /// Store one record. Returns once the sink has accepted or refused it.
    async fn insert(&self, record: &LeadRecord) -> Result<(), LeadSinkError>;
}
