//! Integration tests for the intake questionnaire over HTTP.
//!
//! Each test spins up the full app on a random port and drives a session
//! through the JSON API with reqwest.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::time::timeout;

use vowza::config::IntakeConfig;
use vowza::intake::IntakeSessions;
use vowza::leads::MemoryLeadSink;
use vowza::store::{DraftBackend, LibSqlBackend};
use vowza::verification::TrustingVerifier;

/// Maximum time any test is allowed to run before we consider it hung.
const TEST_TIMEOUT: Duration = Duration::from_secs(10);

struct Server {
    base: String,
    client: reqwest::Client,
    sink: Arc<MemoryLeadSink>,
}

impl Server {
    async fn post(&self, path: &str, body: Value) -> (u16, Value) {
        let resp = self
            .client
            .post(format!("{}{path}", self.base))
            .json(&body)
            .send()
            .await
            .unwrap();
        let status = resp.status().as_u16();
        (status, resp.json().await.unwrap())
    }

    async fn get(&self, path: &str) -> (u16, Value) {
        let resp = self
            .client
            .get(format!("{}{path}", self.base))
            .send()
            .await
            .unwrap();
        let status = resp.status().as_u16();
        (status, resp.json().await.unwrap())
    }

    async fn open(&self) -> String {
        let (status, body) = self.post("/api/intake/sessions", json!({})).await;
        assert_eq!(status, 201);
        body["id"].as_str().unwrap().to_string()
    }

    /// Poll until the session reaches `stage` (auto-advance runs on a timer).
    async fn wait_for_stage(&self, id: &str, stage: &str) -> Value {
        loop {
            let (_, body) = self.get(&format!("/api/intake/sessions/{id}")).await;
            if body["stage"] == stage {
                return body;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    }
}

/// Start the app on a random port with the given draft backend.
async fn start_server(backend: Arc<dyn DraftBackend>) -> Server {
    let sink = Arc::new(MemoryLeadSink::new());
    let config = IntakeConfig {
        auto_advance_delay: Duration::from_millis(50),
        ..IntakeConfig::default()
    };
    let sessions = Arc::new(IntakeSessions::new(
        backend,
        sink.clone(),
        Arc::new(TrustingVerifier),
        config,
    ));
    let app = vowza::app(sessions, None);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    Server {
        base: format!("http://127.0.0.1:{port}"),
        client: reqwest::Client::new(),
        sink,
    }
}

async fn memory_server() -> Server {
    start_server(Arc::new(LibSqlBackend::new_memory().await.unwrap())).await
}

/// Fill in the stages up to review.
async fn walk_to_review(server: &Server, id: &str) {
    let s = format!("/api/intake/sessions/{id}");
    for (field, value) in [
        ("name", "Asha Rao"),
        ("phone", "9876543210"),
        ("email", "asha@example.com"),
    ] {
        let (status, _) = server
            .post(&format!("{s}/fields"), json!({ "field": field, "value": value }))
            .await;
        assert_eq!(status, 200);
    }
    let (_, body) = server.post(&format!("{s}/advance"), json!({})).await;
    assert_eq!(body["stage"], "event_type");

    server
        .post(&format!("{s}/event-type"), json!({ "value": "Wedding" }))
        .await;
    server.wait_for_stage(id, "event_setting").await;

    server
        .post(&format!("{s}/event-setting"), json!({ "value": "Outdoor" }))
        .await;
    server.wait_for_stage(id, "guest_count").await;

    server
        .post(
            &format!("{s}/fields"),
            json!({ "field": "guestCount", "value": "80" }),
        )
        .await;
    server.post(&format!("{s}/advance"), json!({})).await;

    server
        .post(&format!("{s}/meals/toggle"), json!({ "meal": "Vegetarian" }))
        .await;
    server
        .post(&format!("{s}/meals/toggle"), json!({ "meal": "Vegan" }))
        .await;
    let (_, body) = server.post(&format!("{s}/advance"), json!({})).await;
    assert_eq!(body["stage"], "review");
    assert_eq!(body["can_submit"], false);
}

#[tokio::test]
async fn full_questionnaire_submits_lead() {
    timeout(TEST_TIMEOUT, async {
        let server = memory_server().await;
        let id = server.open().await;
        walk_to_review(&server, &id).await;
        let s = format!("/api/intake/sessions/{id}");

        let (status, _) = server.post(&format!("{s}/submit"), json!({})).await;
        assert_eq!(status, 409);

        let (status, body) = server
            .post(&format!("{s}/verification"), json!({ "token": "tok" }))
            .await;
        assert_eq!(status, 200);
        assert_eq!(body["can_submit"], true);

        let (status, body) = server.post(&format!("{s}/submit"), json!({})).await;
        assert_eq!(status, 200);
        assert_eq!(body["outcome"]["status"], "submitted");
        assert_eq!(body["outcome"]["redirect_to"], "/");
        assert_eq!(body["session"]["stage"], "contact_info");
        assert_eq!(body["session"]["draft"]["name"], "");
        assert_eq!(body["session"]["notice"]["kind"], "success");

        let records = server.sink.records().await;
        assert_eq!(records.len(), 1);
        let lead = serde_json::to_value(&records[0]).unwrap();
        assert_eq!(lead["event_type"], "Wedding");
        assert_eq!(lead["event_setting"], "Outdoor");
        assert_eq!(lead["number_of_people"], 80);
        assert_eq!(lead["meal_options"], json!(["Vegetarian", "Vegan"]));
        assert_eq!(lead["location"], "Hyderabad");
        assert_eq!(lead["status"], "new");
        assert_eq!(lead["notes"], "[Captcha Verified]");
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn failing_sink_keeps_draft_for_retry() {
    timeout(TEST_TIMEOUT, async {
        let server = memory_server().await;
        server.sink.set_failure(Some("insert refused".into())).await;
        let id = server.open().await;
        walk_to_review(&server, &id).await;
        let s = format!("/api/intake/sessions/{id}");
        server
            .post(&format!("{s}/verification"), json!({ "token": "tok" }))
            .await;

        let (status, body) = server.post(&format!("{s}/submit"), json!({})).await;
        assert_eq!(status, 502);
        assert_eq!(body["outcome"]["status"], "failed");
        assert_eq!(body["session"]["stage"], "review");
        assert_eq!(body["session"]["submitting"], false);
        assert_eq!(body["session"]["submit_error"], "insert refused");
        assert_eq!(body["session"]["draft"]["name"], "Asha Rao");

        server.sink.set_failure(None).await;
        let (status, _) = server.post(&format!("{s}/submit"), json!({})).await;
        assert_eq!(status, 200);
        assert_eq!(server.sink.records().await.len(), 1);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn closed_session_resumes_from_saved_draft() {
    timeout(TEST_TIMEOUT, async {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("drafts.db");
        let id;
        {
            let backend = Arc::new(LibSqlBackend::new_local(&path).await.unwrap());
            let server = start_server(backend).await;
            id = server.open().await;
            let s = format!("/api/intake/sessions/{id}");
            server
                .post(&format!("{s}/fields"), json!({ "field": "name", "value": "Ravi" }))
                .await;
            server
                .post(&format!("{s}/fields"), json!({ "field": "phone", "value": "9876543210" }))
                .await;
            server
                .post(&format!("{s}/fields"), json!({ "field": "email", "value": "ravi@example.com" }))
                .await;
            server.post(&format!("{s}/advance"), json!({})).await;

            let resp = server
                .client
                .delete(format!("{}{s}", server.base))
                .send()
                .await
                .unwrap();
            assert_eq!(resp.status().as_u16(), 200);
        }

        // A fresh process over the same database picks the draft back up.
        let backend = Arc::new(LibSqlBackend::new_local(&path).await.unwrap());
        let server = start_server(backend).await;
        let (status, body) = server.get(&format!("/api/intake/sessions/{id}")).await;
        assert_eq!(status, 200);
        assert_eq!(body["stage"], "event_type");
        assert_eq!(body["draft"]["name"], "Ravi");
        assert_eq!(body["draft"]["email"], "ravi@example.com");
        assert_eq!(body["field_errors"], json!({}));
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn keys_and_jumps() {
    timeout(TEST_TIMEOUT, async {
        let server = memory_server().await;
        let id = server.open().await;
        let s = format!("/api/intake/sessions/{id}");

        let (_, body) = server.post(&format!("{s}/keys"), json!({ "key": "Enter" })).await;
        assert_eq!(body["action"], Value::Null);
        assert_eq!(body["session"]["stage"], "contact_info");

        walk_to_review(&server, &id).await;
        let (_, body) = server
            .post(&format!("{s}/jump"), json!({ "stage": "guest_count" }))
            .await;
        assert_eq!(body["stage"], "review");
        let (_, body) = server
            .post(&format!("{s}/jump"), json!({ "stage": "event_type" }))
            .await;
        assert_eq!(body["stage"], "event_type");
        assert_eq!(body["direction"], "backward");

        let (_, body) = server.post(&format!("{s}/keys"), json!({ "key": "Escape" })).await;
        assert_eq!(body["action"], "retreat");
        assert_eq!(body["session"]["stage"], "contact_info");
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn malformed_choice_is_rejected() {
    timeout(TEST_TIMEOUT, async {
        let server = memory_server().await;
        let id = server.open().await;
        let resp = server
            .client
            .post(format!("{}/api/intake/sessions/{id}/event-type", server.base))
            .json(&json!({ "value": "Funeral" }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status().as_u16(), 422);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn pages_render() {
    timeout(TEST_TIMEOUT, async {
        let server = memory_server().await;
        let landing = server
            .client
            .get(format!("{}/", server.base))
            .send()
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert!(landing.contains("/questionnaire?type=wedding"));

        // Opening the questionnaire redirects to a session URL that survives a reload.
        let first = server
            .client
            .get(format!("{}/questionnaire?type=wedding", server.base))
            .send()
            .await
            .unwrap();
        assert_eq!(first.status().as_u16(), 200);
        let reload_url = first.url().clone();
        let id = reload_url
            .query_pairs()
            .find(|(k, _)| k == "session")
            .map(|(_, v)| v.into_owned())
            .expect("session in redirected url");
        server
            .post(
                &format!("/api/intake/sessions/{id}/fields"),
                json!({ "field": "name", "value": "Kiran" }),
            )
            .await;

        let again = server.client.get(reload_url).send().await.unwrap();
        assert_eq!(again.status().as_u16(), 200);
        assert!(again.text().await.unwrap().contains(&id));
        let (_, body) = server.get(&format!("/api/intake/sessions/{id}")).await;
        assert_eq!(body["draft"]["name"], "Kiran");
        assert_eq!(body["draft"]["eventType"], "Wedding");

        let (status, body) = server.get("/health").await;
        assert_eq!(status, 200);
        assert_eq!(body["status"], "ok");
    })
    .await
    .expect("test timed out");
}
