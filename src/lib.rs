// bucketbox - password-protected file storage on S3-compatible buckets

pub mod access;
pub mod config;
pub mod db;
pub mod files;
pub mod llm;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod storage;
pub mod types;
pub mod utils;

#[cfg(test)]
mod test_support;

// Re-exports for convenience
pub use config::Config;
pub use models::AppState;

pub fn create_router(state: AppState) -> axum::Router {
    routes::create_router(state)
}
