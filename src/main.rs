//! Roster Backend
//!
//! REST backend for volunteer rosters and service schedules, with SQLite persistence
//! and export of assignments to Google Calendar.

mod api;
mod auth;
mod calendar;
mod config;
mod db;
mod errors;
mod models;
mod roster;

use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use calendar::{CalendarSession, GoogleCalendar};
use config::Config;
use db::Repository;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub calendar: Arc<CalendarSession>,
    pub config: Arc<Config>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Roster Backend");
    tracing::info!("Database path: {:?}", config.db_path);
    tracing::info!("Bind address: {}", config.bind_addr);
    tracing::info!("Calendar timezone: {}", config.timezone);

    if config.admin_key.is_none() {
        tracing::warn!("No admin key configured (ROSTER_ADMIN_KEY). Write routes are open!");
    }
    if config.google.client_id.is_none() {
        tracing::warn!("GOOGLE_CLIENT_ID not set. Calendar export is unavailable.");
    }

    // Initialize database
    let pool = db::init_database(&config.db_path).await?;
    let repo = Arc::new(Repository::new(pool));

    // Calendar client is initialized lazily on first export
    let backend = Arc::new(GoogleCalendar::new(config.google.clone()));
    let calendar = Arc::new(CalendarSession::new(
        backend,
        config.google.init_retry_delay,
    ));

    let state = AppState {
        repo,
        calendar,
        config: Arc::new(config.clone()),
    };

    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let admin_key = state.config.admin_key.clone();

    // Roster edits require the admin key
    let admin_routes = Router::new()
        .route("/members", post(api::create_member_in_groups))
        .route(
            "/organizations/{org}/members",
            post(api::create_member),
        )
        .route(
            "/organizations/{org}/teams/{team}/schedules/{date}",
            put(api::upsert_schedule),
        )
        .route_layer(middleware::from_fn(move |req, next| {
            auth::admin_key_layer(admin_key.clone(), req, next)
        }));

    let public_routes = Router::new()
        // Members
        .route("/organizations/{org}/members", get(api::list_members))
        .route(
            "/organizations/{org}/members/exists",
            get(api::member_exists),
        )
        .route(
            "/organizations/{org}/roles/{role}/members",
            get(api::members_for_role),
        )
        // Schedules
        .route(
            "/organizations/{org}/teams/{team}/roles",
            get(api::get_team_roles),
        )
        .route(
            "/organizations/{org}/teams/{team}/schedules",
            get(api::list_schedules),
        )
        .route(
            "/organizations/{org}/teams/{team}/schedules/{date}",
            get(api::get_schedule),
        )
        .route(
            "/organizations/{org}/teams/{team}/schedules/{date}/edits",
            post(api::edit_schedule),
        )
        // Service calendar
        .route("/quarters/current", get(api::get_current_quarter))
        .route("/quarters/{index}", get(api::get_quarter))
        // Calendar export
        .route("/calendar/status", get(api::calendar_status))
        .route("/calendar/authorize", get(api::authorize_calendar))
        .route("/calendar/callback", get(api::calendar_callback))
        .route(
            "/organizations/{org}/teams/{team}/calendar-export",
            post(api::export_calendar),
        );

    // Health check (no auth required)
    let health_routes = Router::new().route("/health", get(health_check));

    Router::new()
        .nest("/api", public_routes.merge(admin_routes))
        .merge(health_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}
