//! Configuration types.

use std::time::Duration;

use secrecy::SecretString;

/// Default region literal attached to every lead.
pub const DEFAULT_REGION: &str = "Hyderabad";

/// Timing and record constants used by intake controllers.
#[derive(Debug, Clone)]
pub struct IntakeConfig {
    /// Delay before a single-choice selection advances the wizard.
    pub auto_advance_delay: Duration,
    /// Delay before the client is sent back to the landing view after a
    /// successful submission.
    pub redirect_delay: Duration,
    /// Region literal stored on every lead.
    pub region: String,
    /// How long a session may go untouched before it is unmounted and
    /// dropped from memory. Its saved draft stays resumable.
    pub session_idle_timeout: Duration,
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            auto_advance_delay: Duration::from_millis(300),
            redirect_delay: Duration::from_millis(2000),
            region: DEFAULT_REGION.to_string(),
            session_idle_timeout: Duration::from_secs(30 * 60),
        }
    }
}

impl IntakeConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let auto_advance_delay = std::env::var("VOWZA_AUTO_ADVANCE_MS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_millis)
            .unwrap_or(defaults.auto_advance_delay);

        let redirect_delay = std::env::var("VOWZA_REDIRECT_MS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_millis)
            .unwrap_or(defaults.redirect_delay);

        let region = std::env::var("VOWZA_REGION")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or(defaults.region);

        let session_idle_timeout = std::env::var("VOWZA_SESSION_IDLE_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.session_idle_timeout);

        Self {
            auto_advance_delay,
            redirect_delay,
            region,
            session_idle_timeout,
        }
    }
}

/// Supabase connection for the lead sink.
#[derive(Debug, Clone)]
pub struct SupabaseConfig {
    pub url: String,
    pub anon_key: SecretString,
    pub table: String,
}

impl SupabaseConfig {
    /// Returns `None` when `SUPABASE_URL` or `SUPABASE_ANON_KEY` is unset.
    pub fn from_env() -> Option<Self> {
        let url = std::env::var("SUPABASE_URL").ok()?;
        let anon_key = std::env::var("SUPABASE_ANON_KEY").ok()?;
        let table =
            std::env::var("SUPABASE_LEADS_TABLE").unwrap_or_else(|_| "event_leads".to_string());

        Some(Self {
            url: url.trim_end_matches('/').to_string(),
            anon_key: SecretString::from(anon_key),
            table,
        })
    }
}

/// Turnstile widget and server-side check settings.
#[derive(Debug, Clone, Default)]
pub struct TurnstileConfig {
    /// Public site key rendered into the questionnaire view.
    pub site_key: Option<String>,
    /// Secret used for siteverify. Without it tokens are trusted as-is.
    pub secret_key: Option<SecretString>,
}

impl TurnstileConfig {
    pub fn from_env() -> Self {
        Self {
            site_key: std::env::var("TURNSTILE_SITE_KEY")
                .ok()
                .filter(|s| !s.is_empty()),
            secret_key: std::env::var("TURNSTILE_SECRET_KEY")
                .ok()
                .filter(|s| !s.is_empty())
                .map(SecretString::from),
        }
    }
}

/// Top-level site configuration.
#[derive(Debug, Clone)]
pub struct SiteConfig {
    pub port: u16,
    /// Draft database path; `:memory:` keeps drafts in process memory.
    pub db_path: String,
    pub intake: IntakeConfig,
    pub supabase: Option<SupabaseConfig>,
    pub turnstile: TurnstileConfig,
}

impl SiteConfig {
    pub fn from_env() -> Self {
        let port: u16 = std::env::var("VOWZA_PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(8080);

        let db_path =
            std::env::var("VOWZA_DB_PATH").unwrap_or_else(|_| "./data/vowza.db".to_string());

        Self {
            port,
            db_path,
            intake: IntakeConfig::from_env(),
            supabase: SupabaseConfig::from_env(),
            turnstile: TurnstileConfig::from_env(),
        }
    }
}
