//! REST endpoints driving intake sessions.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use super::controller::{IntakeSnapshot, Key, KeyAction, SubmitOutcome};
use super::model::{EventSetting, EventType, Field, MealPreference};
use super::session::{IntakeSession, IntakeSessions};
use super::stage::Stage;
use crate::error::{IntakeError, VerificationError};

/// Shared state for intake routes.
#[derive(Clone)]
pub struct IntakeRouteState {
    pub sessions: Arc<IntakeSessions>,
}

/// Snapshot plus the session id it belongs to.
#[derive(Debug, Serialize)]
pub struct SessionView {
    pub id: Uuid,
    #[serde(flatten)]
    pub snapshot: IntakeSnapshot,
}

impl SessionView {
    async fn of(session: &IntakeSession) -> Self {
        Self {
            id: session.id(),
            snapshot: session.snapshot().await,
        }
    }

    fn with(session: &IntakeSession, snapshot: IntakeSnapshot) -> Self {
        Self {
            id: session.id(),
            snapshot,
        }
    }
}

/// Build the intake REST routes.
pub fn intake_routes(state: IntakeRouteState) -> Router {
    Router::new()
        .route("/api/intake/sessions", post(open_session))
        .route(
            "/api/intake/sessions/{id}",
            get(get_session).delete(close_session),
        )
        .route("/api/intake/sessions/{id}/fields", post(set_field))
        .route("/api/intake/sessions/{id}/advance", post(advance))
        .route("/api/intake/sessions/{id}/retreat", post(retreat))
        .route("/api/intake/sessions/{id}/jump", post(jump))
        .route("/api/intake/sessions/{id}/event-type", post(select_event_type))
        .route(
            "/api/intake/sessions/{id}/event-setting",
            post(select_event_setting),
        )
        .route(
            "/api/intake/sessions/{id}/guests/increment",
            post(increment_guests),
        )
        .route(
            "/api/intake/sessions/{id}/guests/decrement",
            post(decrement_guests),
        )
        .route("/api/intake/sessions/{id}/meals/toggle", post(toggle_meal))
        .route("/api/intake/sessions/{id}/verification", post(verify))
        .route("/api/intake/sessions/{id}/submit", post(submit))
        .route("/api/intake/sessions/{id}/keys", post(press_key))
        .with_state(state)
}

fn error_body(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(serde_json::json!({ "error": message.into() }))).into_response()
}

impl IntoResponse for IntakeError {
    fn into_response(self) -> Response {
        let status = match &self {
            IntakeError::SessionNotFound(_) => StatusCode::NOT_FOUND,
            IntakeError::SubmitRejected(_) => StatusCode::CONFLICT,
            IntakeError::Verification(VerificationError::RequestFailed { .. }) => {
                StatusCode::BAD_GATEWAY
            }
            IntakeError::Verification(_) => StatusCode::BAD_REQUEST,
        };
        error_body(status, self.to_string())
    }
}

async fn session(state: &IntakeRouteState, id: Uuid) -> Result<IntakeSession, IntakeError> {
    state.sessions.get(id).await
}

// ── Lifecycle ───────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct OpenRequest {
    #[serde(default)]
    event_type_hint: Option<String>,
}

async fn open_session(
    State(state): State<IntakeRouteState>,
    Json(body): Json<OpenRequest>,
) -> impl IntoResponse {
    let hint = body.event_type_hint.as_deref().and_then(EventType::from_hint);
    let session = state.sessions.open(hint).await;
    (StatusCode::CREATED, Json(SessionView::of(&session).await))
}

async fn get_session(
    State(state): State<IntakeRouteState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, IntakeError> {
    let session = session(&state, id).await?;
    Ok(Json(SessionView::of(&session).await))
}

async fn close_session(
    State(state): State<IntakeRouteState>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, IntakeError> {
    if state.sessions.close(id).await {
        Ok(Json(serde_json::json!({ "status": "closed" })))
    } else {
        Err(IntakeError::SessionNotFound(id))
    }
}

// ── Edits & navigation ──────────────────────────────────────────────────

#[derive(Deserialize)]
struct FieldRequest {
    field: Field,
    value: String,
}

async fn set_field(
    State(state): State<IntakeRouteState>,
    Path(id): Path<Uuid>,
    Json(body): Json<FieldRequest>,
) -> Result<Json<SessionView>, IntakeError> {
    let session = session(&state, id).await?;
    let snapshot = session.set_field(body.field, &body.value).await;
    Ok(Json(SessionView::with(&session, snapshot)))
}

async fn advance(
    State(state): State<IntakeRouteState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, IntakeError> {
    let session = session(&state, id).await?;
    let snapshot = session.advance().await;
    Ok(Json(SessionView::with(&session, snapshot)))
}

async fn retreat(
    State(state): State<IntakeRouteState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, IntakeError> {
    let session = session(&state, id).await?;
    let snapshot = session.retreat().await;
    Ok(Json(SessionView::with(&session, snapshot)))
}

#[derive(Deserialize)]
struct JumpRequest {
    stage: Stage,
}

async fn jump(
    State(state): State<IntakeRouteState>,
    Path(id): Path<Uuid>,
    Json(body): Json<JumpRequest>,
) -> Result<Json<SessionView>, IntakeError> {
    let session = session(&state, id).await?;
    let snapshot = session.jump_to(body.stage).await;
    Ok(Json(SessionView::with(&session, snapshot)))
}

#[derive(Deserialize)]
struct ChoiceRequest<T> {
    value: T,
}

async fn select_event_type(
    State(state): State<IntakeRouteState>,
    Path(id): Path<Uuid>,
    Json(body): Json<ChoiceRequest<EventType>>,
) -> Result<Json<SessionView>, IntakeError> {
    let session = session(&state, id).await?;
    let snapshot = session.select_event_type(body.value).await;
    Ok(Json(SessionView::with(&session, snapshot)))
}

async fn select_event_setting(
    State(state): State<IntakeRouteState>,
    Path(id): Path<Uuid>,
    Json(body): Json<ChoiceRequest<EventSetting>>,
) -> Result<Json<SessionView>, IntakeError> {
    let session = session(&state, id).await?;
    let snapshot = session.select_event_setting(body.value).await;
    Ok(Json(SessionView::with(&session, snapshot)))
}

async fn increment_guests(
    State(state): State<IntakeRouteState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, IntakeError> {
    let session = session(&state, id).await?;
    let snapshot = session.increment_guests().await;
    Ok(Json(SessionView::with(&session, snapshot)))
}

async fn decrement_guests(
    State(state): State<IntakeRouteState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, IntakeError> {
    let session = session(&state, id).await?;
    let snapshot = session.decrement_guests().await;
    Ok(Json(SessionView::with(&session, snapshot)))
}

#[derive(Deserialize)]
struct MealRequest {
    meal: MealPreference,
}

async fn toggle_meal(
    State(state): State<IntakeRouteState>,
    Path(id): Path<Uuid>,
    Json(body): Json<MealRequest>,
) -> Result<Json<SessionView>, IntakeError> {
    let session = session(&state, id).await?;
    let snapshot = session.toggle_meal(body.meal).await;
    Ok(Json(SessionView::with(&session, snapshot)))
}

// ── Verification & submission ───────────────────────────────────────────

#[derive(Deserialize)]
struct VerificationRequest {
    token: String,
}

async fn verify(
    State(state): State<IntakeRouteState>,
    Path(id): Path<Uuid>,
    Json(body): Json<VerificationRequest>,
) -> Result<Json<SessionView>, IntakeError> {
    let session = session(&state, id).await?;
    let snapshot = session
        .verify(state.sessions.verifier(), &body.token)
        .await
        .inspect_err(|e| warn!(session = %id, error = %e, "Verification failed"))?;
    Ok(Json(SessionView::with(&session, snapshot)))
}

#[derive(Serialize)]
struct SubmitResponse {
    outcome: SubmitOutcome,
    session: SessionView,
}

async fn submit(
    State(state): State<IntakeRouteState>,
    Path(id): Path<Uuid>,
) -> Result<Response, IntakeError> {
    let session = session(&state, id).await?;
    let outcome = session.submit().await?;
    let status = match outcome {
        SubmitOutcome::Submitted { .. } => StatusCode::OK,
        SubmitOutcome::Failed { .. } => StatusCode::BAD_GATEWAY,
    };
    let body = SubmitResponse {
        outcome,
        session: SessionView::of(&session).await,
    };
    Ok((status, Json(body)).into_response())
}

#[derive(Deserialize)]
struct KeyRequest {
    key: Key,
}

#[derive(Serialize)]
struct KeyResponse {
    action: Option<KeyAction>,
    session: SessionView,
}

async fn press_key(
    State(state): State<IntakeRouteState>,
    Path(id): Path<Uuid>,
    Json(body): Json<KeyRequest>,
) -> Result<Json<KeyResponse>, IntakeError> {
    let session = session(&state, id).await?;
    let action = session.handle_key(body.key).await?;
    Ok(Json(KeyResponse {
        action,
        session: SessionView::of(&session).await,
    }))
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    use super::*;
    use crate::config::IntakeConfig;
    use crate::leads::MemoryLeadSink;
    use crate::store::MemoryBackend;
    use crate::verification::TrustingVerifier;

    fn app() -> Router {
        let sessions = IntakeSessions::new(
            Arc::new(MemoryBackend::new()),
            Arc::new(MemoryLeadSink::new()),
            Arc::new(TrustingVerifier),
            IntakeConfig::default(),
        );
        intake_routes(IntakeRouteState {
            sessions: Arc::new(sessions),
        })
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::post(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json_body(resp: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn open_session_applies_hint() {
        let resp = app()
            .oneshot(post_json(
                "/api/intake/sessions",
                serde_json::json!({ "event_type_hint": "corporate" }),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body = json_body(resp).await;
        assert_eq!(body["stage"], "contact_info");
        assert_eq!(body["draft"]["eventType"], "Other Event");
        assert!(body["id"].is_string());
    }

    #[tokio::test]
    async fn unknown_session_is_404() {
        let uri = format!("/api/intake/sessions/{}/advance", Uuid::new_v4());
        let resp = app()
            .oneshot(Request::post(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let body = json_body(resp).await;
        assert!(body["error"].as_str().unwrap().contains("not found"));
    }

    #[tokio::test]
    async fn submit_before_review_is_conflict() {
        let app = app();
        let resp = app
            .clone()
            .oneshot(post_json("/api/intake/sessions", serde_json::json!({})))
            .await
            .unwrap();
        let id = json_body(resp).await["id"].as_str().unwrap().to_string();

        let resp = app
            .oneshot(
                Request::post(format!("/api/intake/sessions/{id}/submit"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn field_edit_reports_inline_error() {
        let app = app();
        let resp = app
            .clone()
            .oneshot(post_json("/api/intake/sessions", serde_json::json!({})))
            .await
            .unwrap();
        let id = json_body(resp).await["id"].as_str().unwrap().to_string();

        let resp = app
            .oneshot(post_json(
                &format!("/api/intake/sessions/{id}/fields"),
                serde_json::json!({ "field": "email", "value": "a@b" }),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = json_body(resp).await;
        assert_eq!(body["field_errors"]["email"], "Please enter a valid email");
        assert_eq!(body["can_advance"], false);
    }
}
