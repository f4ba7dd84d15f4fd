use axum::{
    http::{header, HeaderValue, Method},
    middleware,
    routing::{get, patch, post},
    Router,
};
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod models;

use auth::rate_limit::RateLimitState;
use config::Config;

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Arc<Config>,
    pub rate_limiter: RateLimitState,
}

impl AppState {
    pub fn new(db: PgPool, config: Config) -> Self {
        let rate_limiter =
            RateLimitState::new(config.auth_rate_limit_max, config.auth_rate_limit_window_secs);
        Self {
            db,
            config: Arc::new(config),
            rate_limiter,
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    let auth_routes = Router::new()
        .route("/api/register/", post(handlers::auth::register))
        .route("/api/login/", post(handlers::auth::login))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::rate_limit::rate_limit_auth,
        ));

    let public_routes = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/readyz", get(handlers::health::readyz))
        .merge(auth_routes);

    let protected_routes = Router::new()
        .route("/api/logout/", post(handlers::auth::logout))
        // Habits
        .route(
            "/api/habits/",
            get(handlers::habits::list_habits).post(handlers::habits::create_habit),
        )
        .route(
            "/api/habits/:id/",
            get(handlers::habits::get_habit)
                .put(handlers::habits::update_habit)
                .patch(handlers::habits::patch_habit)
                .delete(handlers::habits::delete_habit),
        )
        .route(
            "/api/habits/:id/toggle_complete/",
            patch(handlers::habits::toggle_complete),
        )
        .route("/api/habits/:id/complete/", patch(handlers::habits::complete))
        // Daily logs
        .route(
            "/api/dailylogs/",
            get(handlers::daily_logs::list_daily_logs).post(handlers::daily_logs::create_daily_log),
        )
        .route(
            "/api/dailylogs/:id/",
            get(handlers::daily_logs::get_daily_log)
                .put(handlers::daily_logs::update_daily_log)
                .patch(handlers::daily_logs::patch_daily_log)
                .delete(handlers::daily_logs::delete_daily_log),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::middleware::require_auth,
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(cors_layer(&state.config))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(config: &Config) -> CorsLayer {
    let origins: Vec<HeaderValue> = std::iter::once(&config.frontend_url)
        .chain(config.cors_extra_origins.iter())
        .filter_map(|o| match o.parse::<HeaderValue>() {
            Ok(hv) => Some(hv),
            Err(_) => {
                tracing::warn!(origin = %o, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        .allow_credentials(true)
}
