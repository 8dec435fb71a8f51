// CORS for the API itself. Bucket CORS for presigned uploads lives in storage::bucket.

use axum::http::{HeaderValue, Method};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tracing::warn;

use crate::config::{Environment, ServerConfig};

pub fn cors_layer(config: &ServerConfig) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any);

    match config.environment {
        Environment::Development => layer.allow_origin(Any),
        Environment::Production => {
            let origins: Vec<HeaderValue> = config
                .cors_allowed_origins
                .iter()
                .chain(config.site_url.iter())
                .filter_map(|origin| match origin.parse::<HeaderValue>() {
                    Ok(value) => Some(value),
                    Err(_) => {
                        warn!("Ignoring invalid CORS origin {:?}", origin);
                        None
                    }
                })
                .collect();
            layer.allow_origin(origins)
        }
    }
}

pub fn apply_cors(router: Router, config: &ServerConfig) -> Router {
    router.layer(cors_layer(config))
}
