use mimalloc::MiMalloc;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use pocket_persist::config::Config;
use pocket_persist::router::{AppState, app_router};
use pocket_persist::{PersonRegistry, SecureValueStore, secure};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let cfg = Config::load()?;

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cfg.loglevel.clone()));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_level(true)
                .with_target(false),
        )
        .init();

    info!(
        database_url = %cfg.database_url,
        secure_backend = ?cfg.secure_backend,
        secure_store_dir = %cfg.secure_store_dir.display(),
        secure_store_key = if cfg.secure_store_key.is_some() { "<configured>" } else { "<key file>" },
        loglevel = %cfg.loglevel,
    );

    let registry = PersonRegistry::open(&cfg.database_url).await?;
    let backend = secure::backend_from_config(&cfg)?;
    let secure_store = SecureValueStore::new(backend);

    let state = AppState::new(registry.clone(), secure_store).await?;
    let app = app_router(state);

    let listener = TcpListener::bind(&cfg.listen_addr).await?;
    info!("HTTP server listening on {}", cfg.listen_addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "failed to listen for shutdown signal");
            }
        })
        .await?;

    registry.db().shutdown();
    info!("shut down");
    Ok(())
}
