//! Draft persistence that survives reloads of the questionnaire.

pub mod libsql_backend;
pub mod memory;
pub mod migrations;
pub mod traits;

pub use libsql_backend::LibSqlBackend;
pub use memory::MemoryBackend;
pub use traits::{DraftBackend, DraftStore, PersistedDraft, ScopedDraftStore, draft_keys};
