//! Human verification: checks the token produced by the challenge widget.

pub mod turnstile;

use async_trait::async_trait;

use crate::error::VerificationError;

pub use turnstile::TurnstileVerifier;

/// Checks an opaque challenge token.
#[async_trait]
pub trait VerificationProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Returns the token once it is accepted.
    async fn verify(&self, token: &str) -> Result<String, VerificationError>;
}

/// Accepts any non-empty token without a remote check.
///
/// Used when no Turnstile secret is configured; the token still gates
/// submission.
pub struct TrustingVerifier;

#[async_trait]
impl VerificationProvider for TrustingVerifier {
    fn name(&self) -> &str {
        "trusting"
    }

    async fn verify(&self, token: &str) -> Result<String, VerificationError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(VerificationError::EmptyToken);
        }
        Ok(token.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn trusting_verifier_rejects_only_empty() {
        let verifier = TrustingVerifier;
        assert_eq!(verifier.verify(" tok ").await.unwrap(), "tok");
        assert!(matches!(
            verifier.verify("").await,
            Err(VerificationError::EmptyToken)
        ));
    }
}
