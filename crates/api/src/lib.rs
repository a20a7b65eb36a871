//! HTTP API server for travel order approvals.
//!
//! Provides REST endpoints to submit, view, list and approve or cancel travel
//! orders, with structured logging (tracing) and Prometheus metrics.

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, patch, post};
use common::Locale;
use domain::StatusTransitionService;
use metrics_exporter_prometheus::PrometheusHandle;
use notifier::{JobReceiver, NotificationQueue};
use store::{User, UserDirectory};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use routes::travel_orders::{AppState, AppStore};

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: AppStore>(state: Arc<AppState<S>>, metrics_handle: PrometheusHandle) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::system::metrics))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::system::health))
        .route(
            "/travel-orders",
            post(routes::travel_orders::create::<S>).get(routes::travel_orders::list::<S>),
        )
        .route("/travel-orders/{id}", get(routes::travel_orders::show::<S>))
        .route(
            "/travel-orders/{id}/status",
            patch(routes::travel_orders::update_status::<S>),
        )
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates the application state over `store`.
///
/// Returns the receiving end of the notification queue, which the caller
/// hands to a [`notifier::NotificationWorker`].
pub fn create_default_state<S: AppStore>(
    store: S,
    locale: Locale,
) -> (Arc<AppState<S>>, JobReceiver) {
    let (notifications, receiver) = NotificationQueue::channel();

    let state = Arc::new(AppState {
        transitions: StatusTransitionService::new(store.clone()).with_locale(locale),
        store,
        notifications,
    });

    (state, receiver)
}

/// Inserts a demo administrator and employee so the in-memory mode is usable.
pub async fn seed_demo_users<S: UserDirectory>(store: &S) -> store::Result<(User, User)> {
    let admin = User::admin("Admin", "admin@example.com");
    let employee = User::new("Employee", "employee@example.com");

    store.upsert_user(admin.clone()).await?;
    store.upsert_user(employee.clone()).await?;

    Ok((admin, employee))
}
