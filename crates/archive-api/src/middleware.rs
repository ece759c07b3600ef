use crate::state::AppState;
use axum::extract::{Request, State};
use axum::http::{Method, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

/// Rejects mutating requests while the deployment is in read-only mode
/// (spec's admin/runtime surface, out of scope to implement fully but the
/// gate itself is ambient infrastructure every write route needs). GET and
/// HEAD pass through unconditionally.
pub async fn reject_when_read_only(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if state.read_only_mode && !matches!(request.method(), &Method::GET | &Method::HEAD) {
        return (StatusCode::SERVICE_UNAVAILABLE, "read-only mode: mutations are disabled").into_response();
    }
    next.run(request).await
}
