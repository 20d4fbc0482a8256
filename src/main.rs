use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use vowza::config::SiteConfig;
use vowza::intake::{IntakeSessions, spawn_eviction_task};
use vowza::leads::{LeadSink, MemoryLeadSink, SupabaseLeadSink};
use vowza::store::{DraftBackend, LibSqlBackend, MemoryBackend};
use vowza::verification::{TrustingVerifier, TurnstileVerifier, VerificationProvider};

/// Saved drafts untouched for this many days are dropped at startup.
const DRAFT_RETENTION_DAYS: u32 = 30;

/// How often idle sessions are swept out of memory.
const EVICTION_INTERVAL: std::time::Duration = std::time::Duration::from_secs(60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = SiteConfig::from_env();

    eprintln!("💍 Vowza v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Site: http://0.0.0.0:{}/", config.port);
    eprintln!("   Intake API: http://0.0.0.0:{}/api/intake/sessions", config.port);
    eprintln!("   Region: {}", config.intake.region);

    // ── Draft storage ───────────────────────────────────────────────────
    let backend: Arc<dyn DraftBackend> = if config.db_path == ":memory:" {
        eprintln!("   Drafts: in-memory");
        Arc::new(MemoryBackend::new())
    } else {
        let db = LibSqlBackend::new_local(Path::new(&config.db_path))
            .await
            .with_context(|| format!("failed to open draft database at {}", config.db_path))?;
        match db.prune_stale(DRAFT_RETENTION_DAYS).await {
            Ok(0) => {}
            Ok(pruned) => tracing::info!(pruned, "Pruned stale drafts"),
            Err(e) => tracing::warn!(error = %e, "Failed to prune stale drafts"),
        }
        eprintln!("   Drafts: {}", config.db_path);
        Arc::new(db)
    };

    // ── Lead sink ───────────────────────────────────────────────────────
    let sink: Arc<dyn LeadSink> = match config.supabase.clone() {
        Some(supabase) => {
            eprintln!("   Leads: supabase ({})", supabase.table);
            Arc::new(SupabaseLeadSink::new(supabase))
        }
        None => {
            tracing::warn!("SUPABASE_URL/SUPABASE_ANON_KEY not set, leads are kept in memory");
            Arc::new(MemoryLeadSink::new())
        }
    };

    // ── Verification ────────────────────────────────────────────────────
    let verifier: Arc<dyn VerificationProvider> = match config.turnstile.secret_key.clone() {
        Some(secret) => Arc::new(TurnstileVerifier::new(secret)),
        None => {
            tracing::warn!("TURNSTILE_SECRET_KEY not set, verification tokens are trusted");
            Arc::new(TrustingVerifier)
        }
    };
    eprintln!("   Verification: {}", verifier.name());

    let sessions = Arc::new(IntakeSessions::new(
        backend,
        sink,
        verifier,
        config.intake.clone(),
    ));
    let _eviction_handle = spawn_eviction_task(Arc::clone(&sessions), EVICTION_INTERVAL);
    let app = vowza::app(sessions, config.turnstile.site_key.clone());

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port))
        .await
        .with_context(|| format!("failed to bind port {}", config.port))?;
    tracing::info!(port = config.port, "Vowza site started");
    axum::serve(listener, app).await?;

    Ok(())
}
