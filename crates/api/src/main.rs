//! API server entry point.

use api::config::{Config, LogFormat};
use api::routes::travel_orders::AppStore;
use metrics_exporter_prometheus::PrometheusHandle;
use notifier::{LogMailer, NotificationWorker};
use store::{InMemoryStore, PostgresStore};
use tokio::signal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Resolves on SIGINT, or SIGTERM on unix, so in-flight requests can finish.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        let mut terminate = signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler");

        tokio::select! {
            result = signal::ctrl_c() => {
                result.expect("failed to install SIGINT handler");
                tracing::info!(signal = "SIGINT", "shutting down");
            }
            _ = terminate.recv() => {
                tracing::info!(signal = "SIGTERM", "shutting down");
            }
        }
    }

    #[cfg(not(unix))]
    {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
        tracing::info!(signal = "SIGINT", "shutting down");
    }
}

fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    let registry = tracing_subscriber::registry().with(filter);

    match config.log_format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

/// Serves the API on `store` until a shutdown signal arrives, then lets the
/// notification worker drain its queue.
async fn serve<S: AppStore>(store: S, config: &Config, metrics_handle: PrometheusHandle) {
    let (state, jobs) = api::create_default_state(store.clone(), config.locale);
    let worker = NotificationWorker::new(store, LogMailer, config.worker_config()).spawn(jobs);

    let locale = state.transitions.locale();
    let app = api::create_app(state, metrics_handle);

    let addr = config.addr();
    tracing::info!(%addr, locale = locale.as_str(), "starting API server");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    if let Err(e) = worker.await {
        tracing::error!(error = %e, "notification worker panicked");
    }

    tracing::info!("server shut down gracefully");
}

#[tokio::main]
async fn main() {
    // 1. Load configuration and initialize tracing
    let config = Config::from_env();
    init_tracing(&config);

    // 2. Install Prometheus metrics recorder
    let prometheus_builder = metrics_exporter_prometheus::PrometheusBuilder::new();
    let metrics_handle = prometheus_builder
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    // 3. Pick the store and serve
    match config.database_url.clone() {
        Some(url) => {
            let store = PostgresStore::connect(&url)
                .await
                .expect("failed to connect to database");
            store
                .run_migrations()
                .await
                .expect("failed to run migrations");
            tracing::info!("using PostgreSQL store");

            serve(store, &config, metrics_handle).await;
        }
        None => {
            let store = InMemoryStore::new();
            let (admin, employee) = api::seed_demo_users(&store)
                .await
                .expect("failed to seed demo users");
            tracing::info!(
                admin_id = %admin.id,
                employee_id = %employee.id,
                "DATABASE_URL not set, using in-memory store with demo users"
            );

            serve(store, &config, metrics_handle).await;
        }
    }
}
