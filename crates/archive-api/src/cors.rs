use axum::http::Method;
use tower_http::cors::{self, AllowOrigin};

/// Mirrors the teacher's `control::cors::cors_layer`: `["*"]` means wide
/// open, anything else is an explicit allow-list.
pub fn cors_layer(allowed_origins: &[String]) -> cors::CorsLayer {
    cors::CorsLayer::new()
        .allow_methods(vec![Method::GET, Method::POST, Method::OPTIONS])
        .allow_origin(allowed_origins_policy(allowed_origins))
}

fn allowed_origins_policy(configured: &[String]) -> AllowOrigin {
    if configured.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        let origins: Vec<_> = configured.iter().filter_map(|o| o.parse().ok()).collect();
        AllowOrigin::list(origins)
    }
}
