//! Route registration for every `/api/*` endpoint (§6).

pub mod admin;
pub mod categories;
pub mod doc;
pub mod health;
pub mod recent;
pub mod search;
pub mod sources;

use std::sync::Arc;

use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::auth::require_admin_token;
use crate::rate_limit::{enforce, RateLimiter};
use crate::state::AppState;

/// Assemble the full application router: public routes behind the per-IP
/// rate limiter, admin routes behind the bearer-token middleware.
#[must_use]
pub fn build_router(state: AppState) -> Router {
    let limiter = Arc::new(RateLimiter::new());

    let public = Router::new()
        .route("/api/health", get(health::health))
        .route("/api/search", get(search::search))
        .route("/api/doc/:id", get(doc::get_doc))
        .route("/api/sources", get(sources::list_sources))
        .route("/api/categories", get(categories::categories))
        .route("/api/categories/:source/:category", get(categories::category_documents))
        .route("/api/recent", get(recent::recent))
        .layer(axum::middleware::from_fn_with_state(limiter.clone(), enforce))
        .with_state(state.clone());

    let admin = Router::new()
        .route("/api/admin/upsert", post(admin::upsert))
        .route("/api/admin/bulk-upsert", post(admin::bulk_upsert))
        .route("/api/admin/doc/:id", delete(admin::delete_doc))
        .route("/api/admin/reindex", post(admin::reindex))
        .layer(axum::middleware::from_fn_with_state(state.clone(), require_admin_token))
        .with_state(state);

    public.merge(admin).layer(TraceLayer::new_for_http()).layer(CorsLayer::permissive())
}
