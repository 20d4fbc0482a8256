//! Public site: landing view, questionnaire view and health check.

pub mod pages;

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Query, State},
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
};
use serde::Deserialize;
use tracing::debug;
use uuid::Uuid;

use crate::intake::{EventType, IntakeSessions};

/// Shared state for the page routes.
#[derive(Clone)]
pub struct SiteState {
    pub sessions: Arc<IntakeSessions>,
    /// Public Turnstile key rendered into the questionnaire view.
    pub turnstile_site_key: Option<String>,
}

/// Build the page routes.
pub fn site_routes(state: SiteState) -> Router {
    Router::new()
        .route("/", get(landing))
        .route("/questionnaire", get(questionnaire))
        .route("/health", get(health))
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "vowza"
    }))
}

async fn landing() -> Html<String> {
    Html(pages::landing())
}

#[derive(Debug, Default, Deserialize)]
struct QuestionnaireQuery {
    #[serde(rename = "type")]
    event_type: Option<String>,
    session: Option<Uuid>,
}

/// Resume the given session when it still exists. Otherwise open a new one
/// and redirect to its own URL so a reload lands on the same draft.
/// The `type` hint only fills an empty event type.
async fn questionnaire(
    State(state): State<SiteState>,
    Query(query): Query<QuestionnaireQuery>,
) -> Response {
    let hint = query.event_type.as_deref().and_then(EventType::from_hint);

    let resumed = match query.session {
        Some(id) => state.sessions.resume(id).await,
        None => None,
    };
    let Some(session) = resumed else {
        let session = state.sessions.open(hint).await;
        debug!(session = %session.id(), "Questionnaire opened, redirecting");
        return Redirect::to(&questionnaire_url(session.id())).into_response();
    };

    if let Some(hint) = hint {
        session.apply_event_type_hint(hint).await;
    }
    debug!(session = %session.id(), "Questionnaire resumed");
    Html(pages::questionnaire(
        session.id(),
        state.turnstile_site_key.as_deref(),
    ))
    .into_response()
}

/// The reloadable address of a questionnaire session.
pub fn questionnaire_url(id: Uuid) -> String {
    format!("/questionnaire?session={id}")
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use super::*;
    use crate::config::IntakeConfig;
    use crate::leads::MemoryLeadSink;
    use crate::store::MemoryBackend;
    use crate::verification::TrustingVerifier;

    fn state() -> SiteState {
        SiteState {
            sessions: Arc::new(IntakeSessions::new(
                Arc::new(MemoryBackend::new()),
                Arc::new(MemoryLeadSink::new()),
                Arc::new(TrustingVerifier),
                IntakeConfig::default(),
            )),
            turnstile_site_key: None,
        }
    }

    async fn get(state: &SiteState, uri: &str) -> axum::response::Response {
        site_routes(state.clone())
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    fn location(resp: &axum::response::Response) -> String {
        resp.headers()
            .get(axum::http::header::LOCATION)
            .expect("redirect location")
            .to_str()
            .unwrap()
            .to_string()
    }

    #[tokio::test]
    async fn questionnaire_opens_session_with_hint() {
        let state = state();
        let resp = get(&state, "/questionnaire?type=wedding").await;
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(state.sessions.len().await, 1);

        let target = location(&resp);
        let id: Uuid = target
            .strip_prefix("/questionnaire?session=")
            .unwrap()
            .parse()
            .unwrap();
        let session = state.sessions.get(id).await.unwrap();
        assert_eq!(
            session.snapshot().await.draft.event_type,
            Some(EventType::Wedding)
        );
    }

    #[tokio::test]
    async fn reloading_questionnaire_keeps_draft() {
        let state = state();
        let target = location(&get(&state, "/questionnaire").await);
        let id: Uuid = target
            .strip_prefix("/questionnaire?session=")
            .unwrap()
            .parse()
            .unwrap();
        state
            .sessions
            .get(id)
            .await
            .unwrap()
            .set_field(crate::intake::Field::Name, "Meera")
            .await;

        for _ in 0..2 {
            let resp = get(&state, &target).await;
            assert_eq!(resp.status(), StatusCode::OK);
        }
        assert_eq!(state.sessions.len().await, 1);
        let session = state.sessions.get(id).await.unwrap();
        assert_eq!(session.snapshot().await.draft.contact_name, "Meera");
    }

    #[tokio::test]
    async fn unknown_session_redirects_to_fresh_one() {
        let state = state();
        let stale = Uuid::new_v4();
        let resp = get(&state, &format!("/questionnaire?session={stale}")).await;
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert!(!location(&resp).contains(&stale.to_string()));
        assert_eq!(state.sessions.len().await, 1);
    }

    #[tokio::test]
    async fn questionnaire_resumes_existing_session() {
        let state = state();
        let session = state.sessions.open(None).await;
        let uri = format!("/questionnaire?session={}&type=birthday", session.id());

        let resp = site_routes(state.clone())
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(state.sessions.len().await, 1);
        assert_eq!(
            session.snapshot().await.draft.event_type,
            Some(EventType::Birthday)
        );
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let resp = site_routes(state())
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }
}
