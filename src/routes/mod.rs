//! API Routes
//!
//! - `/api/files` - listing, uploads, downloads and deletes
//! - `/api/bucket` - password-protected bucket creation and login
//! - `/api/llm` - questions about a stored file
//! - `/api/health`, `/api/storage/status` - health checks

pub mod buckets;
pub mod files;
pub mod health;
pub mod llm;

use axum::Router;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::middleware::cors::apply_cors;
use crate::models::AppState;

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    info!("Creating application router");

    let server_config = state.config.server.clone();

    let api_router = Router::new()
        .merge(files::router(state.clone()))
        .merge(buckets::router(state.clone()))
        .merge(llm::router(state.clone()))
        .merge(health::router(state));

    apply_cors(api_router, &server_config).layer(TraceLayer::new_for_http())
}
