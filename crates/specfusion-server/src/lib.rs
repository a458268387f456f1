//! HTTP API surface for SpecFusion (§6).

pub mod auth;
pub mod error;
pub mod rate_limit;
pub mod routes;
pub mod state;

pub use routes::build_router;
pub use state::AppState;
