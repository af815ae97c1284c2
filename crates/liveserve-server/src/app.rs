//! Router construction.
//!
//! Builds the axum router with all routes and middleware.

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use tower::ServiceBuilder;

use crate::middleware::access_log;
use crate::state::AppState;
use crate::static_files;

/// Create the application router.
///
/// Every path is served from the root directory. `get` also answers HEAD;
/// other methods get 405.
pub(crate) fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(static_files::serve_path))
        .route("/{*path}", get(static_files::serve_path))
        .layer(ServiceBuilder::new().layer(access_log::layer()))
        .with_state(state)
}
