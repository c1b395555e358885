use quiz_relay::{
    config::Config,
    database::pool::{create_pool, migrate},
    routes,
    utils::time::SystemClock,
    AppState,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = Config::from_env()?;
    let pool = create_pool(&config.database_url).await?;
    migrate(&pool).await?;

    let app_state = AppState::new(pool, config, Arc::new(SystemClock))?;
    let config = app_state.config.clone();

    let shutdown = CancellationToken::new();
    let poller = app_state
        .notification_service
        .clone()
        .spawn(config.notify_interval, shutdown.clone());
    info!(
        interval_ms = config.notify_interval.as_millis() as u64,
        target = %config.notification_url(),
        "Notification poller started"
    );

    let app = routes::app(app_state);

    let addr: SocketAddr = config.server_address.parse()?;
    info!("Server listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
        .await?;

    shutdown.cancel();
    poller.await?;

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn shutdown_signal(shutdown: CancellationToken) {
    tokio::select! {
        _ = tokio::signal::ctrl_c() => info!("Shutdown signal received"),
        _ = shutdown.cancelled() => {}
    }
    shutdown.cancel();
}
