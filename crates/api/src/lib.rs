//! HTTP API server with observability for the laundry backend.
//!
//! Provides REST endpoints for accounts, orders and order history,
//! with JWT auth, structured logging (tracing) and Prometheus metrics.

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post, put};
use domain::{OrderService, UserService};
use metrics_exporter_prometheus::PrometheusHandle;
use store::{OrderStore, UserStore};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use auth::AuthKeys;
use config::Config;

/// Shared application state accessible from all handlers.
pub struct AppState<S: OrderStore + UserStore> {
    pub orders: OrderService<S>,
    pub users: UserService<S>,
    pub auth: AuthKeys,
}

/// Creates the application state from a store and configuration.
pub fn create_state<S: OrderStore + UserStore + Clone + 'static>(
    store: S,
    config: &Config,
) -> Arc<AppState<S>> {
    Arc::new(AppState {
        orders: OrderService::new(store.clone()),
        users: UserService::new(store),
        auth: AuthKeys::new(
            &config.auth_secret,
            config.access_ttl_secs,
            config.refresh_ttl_secs,
        ),
    })
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: OrderStore + UserStore + Clone + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        // Accounts and sessions
        .route("/register", post(routes::users::register::<S>))
        .route("/login", post(routes::users::login::<S>))
        .route("/refresh", post(routes::users::refresh::<S>))
        .route("/me", get(routes::users::me::<S>))
        .route("/me/profile", put(routes::users::update_profile::<S>))
        .route("/me/password", put(routes::users::update_password::<S>))
        .route("/users", get(routes::users::list::<S>))
        .route("/users/banned", get(routes::users::list_banned::<S>))
        .route("/user/{id}", get(routes::users::get::<S>))
        .route("/user/{id}/ban", put(routes::users::ban::<S>))
        .route("/user/{id}/unban", put(routes::users::unban::<S>))
        // Orders
        .route("/order", post(routes::orders::create::<S>))
        .route("/orders", get(routes::orders::list_mine::<S>))
        .route("/orders/all", get(routes::orders::list_all::<S>))
        .route("/orders/user/{id}", get(routes::orders::list_for_user::<S>))
        .route("/order/{id}", get(routes::orders::get::<S>))
        .route("/order/{id}/edit", put(routes::orders::edit::<S>))
        .route("/order/{id}/cancel", put(routes::orders::cancel::<S>))
        .route("/order/{id}/accept", put(routes::orders::accept::<S>))
        .route("/order/{id}/reject", put(routes::orders::reject::<S>))
        .route("/order/{id}/deliver", put(routes::orders::deliver::<S>))
        .route("/order/{id}/weight", put(routes::orders::weight::<S>))
        .route("/order/{id}/pay", put(routes::orders::pay::<S>))
        .route("/order/{id}/complete", put(routes::orders::complete::<S>))
        // History
        .route("/histories", get(routes::history::list_mine::<S>))
        .route("/histories/all", get(routes::history::list_all::<S>))
        .route(
            "/histories/user/{id}",
            get(routes::history::list_for_user::<S>),
        )
        .route("/history/{id}", get(routes::history::get::<S>))
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
