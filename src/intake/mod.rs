//! Sequential intake questionnaire.
//!
//! Flow: contact info → event type → event setting → guest count → meals →
//! review. Single-choice stages advance on their own shortly after a
//! selection. Progress is written through to a draft store so a reload picks
//! up where the visitor left off; a verified review submits a lead.

pub mod controller;
pub mod model;
pub mod routes;
pub mod session;
pub mod stage;
pub mod validation;

pub use controller::{
    AutoAdvance, IntakeController, IntakeDeps, IntakeSnapshot, Key, KeyAction, Notice, NoticeKind,
    SubmitOutcome, SubmitRejected,
};
pub use model::{Draft, EventSetting, EventType, Field, LeadRecord, MealPreference};
pub use routes::{IntakeRouteState, intake_routes};
pub use session::{IntakeSession, IntakeSessions, spawn_eviction_task};
pub use stage::{Direction, Stage};
pub use validation::{FieldErrorKind, FieldErrors};
