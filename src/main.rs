use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use productivity_hub::auth::AuthService;
use productivity_hub::config::{BackendConfig, HubConfig};
use productivity_hub::hub::Hub;
use productivity_hub::store::{MemoryBackend, RowStore};
use productivity_hub::supabase::SupabaseClient;
use productivity_hub::web::{HubState, spawn_auth_listener, web_routes};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = HubConfig::from_env().context("Invalid configuration")?;

    // Initialize tracing; keep the file writer's guard alive until exit
    let (file_layer, _log_guard) = match &config.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "productivity-hub.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_target(false)
                .with_ansi(false)
                .with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().with_target(false))
        .with(file_layer)
        .init();

    // ── Backend ──────────────────────────────────────────────────────────
    let (auth, store, backend_label): (Arc<dyn AuthService>, Arc<dyn RowStore>, String) =
        match config.backend {
            BackendConfig::Supabase(supabase) => {
                let label = format!("supabase ({})", supabase.url);
                let client = Arc::new(SupabaseClient::new(supabase));
                (client.clone(), client, label)
            }
            BackendConfig::Memory => {
                let backend = Arc::new(MemoryBackend::with_auto_confirm());
                (backend.clone(), backend, "memory (data is lost on exit)".to_string())
            }
        };

    let addr = SocketAddr::new(config.bind, config.port);

    eprintln!("📋 Productivity Hub v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Backend: {}", backend_label);
    eprintln!("   UI: http://{}/", addr);
    if let Some(dir) = &config.log_dir {
        eprintln!("   Logs: {}", dir.display());
    }
    eprintln!();

    // ── Hub ──────────────────────────────────────────────────────────────
    let mut hub = Hub::new(Arc::clone(&auth), store);
    hub.start().await;
    let state = HubState::new(hub);
    let _auth_listener = spawn_auth_listener(auth.as_ref(), state.clone());

    // ── UI server ────────────────────────────────────────────────────────
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind UI server on {addr}"))?;
    tracing::info!(%addr, "UI server started");

    axum::serve(listener, web_routes(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .context("UI server failed")?;

    tracing::info!("Shut down");
    Ok(())
}
