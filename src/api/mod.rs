mod handlers;
pub mod middleware;

use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::db::Database;
use middleware::SecurityConfig;

/// Shared state for handlers and middleware.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub security: SecurityConfig,
}

pub fn create_router(db: Database, security: SecurityConfig) -> Router {
    let state = AppState { db, security };

    let api = Router::new()
        // Companies
        .route("/companies", get(handlers::list_companies))
        .route("/companies/{id}", get(handlers::get_company))
        .route("/companies/{id}", put(handlers::update_company))
        // Lists
        .route("/lists", get(handlers::list_lists))
        .route("/lists", post(handlers::create_list))
        .route("/lists/{id}", get(handlers::get_list))
        .route("/lists/{id}/title", put(handlers::rename_list))
        .route("/lists/{id}/members", get(handlers::get_members))
        .route("/lists/{id}/members", put(handlers::replace_members))
        .route("/lists/{id}/curation", get(handlers::get_curation))
        // Anti-forgery tokens
        .route("/token/{action}", get(handlers::issue_token))
        // Bulk import
        .route("/import", post(handlers::import_companies))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::resolve_actor,
        ));

    Router::new()
        .nest("/api/v1", api)
        // The embed path is the public rendering surface; no actor needed.
        .route("/embed/lists/{id}", get(handlers::render_list))
        .route("/health", get(handlers::health))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
