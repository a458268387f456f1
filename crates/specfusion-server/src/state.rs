//! Shared application state (§6): the document store plus whatever the
//! middleware layers need read access to.

use std::sync::Arc;

use specfusion_core::store::DocStore;

/// Cloned into every handler; cheap because everything inside is `Arc`'d.
#[derive(Clone)]
pub struct AppState {
    /// The embedded document store, shared across all connections.
    pub store: Arc<DocStore>,
    /// Bearer token required on `/api/admin/*` routes.
    pub admin_token: Arc<str>,
}

impl AppState {
    /// Build application state from an already-open store and the
    /// configured admin token.
    #[must_use]
    pub fn new(store: Arc<DocStore>, admin_token: impl Into<Arc<str>>) -> Self {
        Self { store, admin_token: admin_token.into() }
    }
}
