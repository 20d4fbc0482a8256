//! Cloudflare Turnstile siteverify client.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::{debug, warn};

use super::VerificationProvider;
use crate::error::VerificationError;

const SITEVERIFY_URL: &str = "https://challenges.cloudflare.com/turnstile/v0/siteverify";

#[derive(Debug, Deserialize)]
struct SiteverifyResponse {
    success: bool,
    #[serde(rename = "error-codes", default)]
    error_codes: Vec<String>,
}

/// Validates widget tokens against Turnstile's siteverify endpoint.
pub struct TurnstileVerifier {
    secret: SecretString,
    endpoint: String,
    client: reqwest::Client,
}

impl TurnstileVerifier {
    pub fn new(secret: SecretString) -> Self {
        Self::with_endpoint(secret, SITEVERIFY_URL)
    }

    /// Point at a different siteverify URL (tests, proxies).
    pub fn with_endpoint(secret: SecretString, endpoint: impl Into<String>) -> Self {
        Self {
            secret,
            endpoint: endpoint.into(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl VerificationProvider for TurnstileVerifier {
    fn name(&self) -> &str {
        "turnstile"
    }

    async fn verify(&self, token: &str) -> Result<String, VerificationError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(VerificationError::EmptyToken);
        }

        let body = serde_json::json!({
            "secret": self.secret.expose_secret(),
            "response": token,
        });

        let resp = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| VerificationError::RequestFailed {
                provider: "turnstile".into(),
                reason: e.to_string(),
            })?;

        let parsed: SiteverifyResponse =
            resp.json()
                .await
                .map_err(|e| VerificationError::RequestFailed {
                    provider: "turnstile".into(),
                    reason: format!("invalid siteverify response: {e}"),
                })?;

        if !parsed.success {
            warn!(codes = ?parsed.error_codes, "Turnstile token rejected");
            return Err(VerificationError::Rejected {
                codes: parsed.error_codes,
            });
        }

        debug!("Turnstile token accepted");
        Ok(token.to_string())
    }
}
