//! Supabase (PostgREST) lead sink.

use async_trait::async_trait;
use secrecy::ExposeSecret;
use tracing::{debug, warn};

use super::LeadSink;
use crate::config::SupabaseConfig;
use crate::error::LeadSinkError;
use crate::intake::LeadRecord;

/// Inserts leads into a Supabase table over the REST API.
pub struct SupabaseLeadSink {
    config: SupabaseConfig,
    client: reqwest::Client,
}

impl SupabaseLeadSink {
    pub fn new(config: SupabaseConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    fn table_url(&self) -> String {
        format!("{}/rest/v1/{}", self.config.url, self.config.table)
    }
}

/// Pull the human-readable message out of a PostgREST error body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("message")
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.trim().to_string())
}

#[async_trait]
impl LeadSink for SupabaseLeadSink {
    fn name(&self) -> &str {
        "supabase"
    }

    async fn insert(&self, record: &LeadRecord) -> Result<(), LeadSinkError> {
        let key = self.config.anon_key.expose_secret();
        let resp = self
            .client
            .post(self.table_url())
            .header("apikey", key)
            .bearer_auth(key)
            .header("Prefer", "return=minimal")
            .json(&[record])
            .send()
            .await
            .map_err(|e| LeadSinkError::RequestFailed {
                sink: "supabase".into(),
                reason: e.to_string(),
            })?;

        let status = resp.status();
        if status.is_success() {
            debug!(table = %self.config.table, "Lead inserted");
            return Ok(());
        }

        let body = resp.text().await.unwrap_or_default();
        let message = error_message(&body);
        warn!(status = %status, message = %message, "Supabase insert rejected");
        Err(LeadSinkError::Rejected {
            sink: "supabase".into(),
            status: status.as_u16(),
            message,
        })
    }
}
