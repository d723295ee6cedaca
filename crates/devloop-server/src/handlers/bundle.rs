//! Compiled bundle endpoint.

use std::io::ErrorKind;
use std::sync::Arc;

use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};

use crate::state::AppState;

/// Content type of the compiled bundle.
const JAVASCRIPT: &str = "application/javascript; charset=utf-8";

/// Handle `GET /client.bundle.js`.
///
/// Serves whatever bytes the artifact holds right now. A missing artifact is
/// the expected state before the first successful build and answers 404.
pub(crate) async fn bundle(State(state): State<Arc<AppState>>) -> Response {
    match tokio::fs::read(&state.artifact_path).await {
        Ok(bytes) => ([(header::CONTENT_TYPE, JAVASCRIPT)], bytes).into_response(),
        Err(err) if err.kind() == ErrorKind::NotFound => {
            tracing::debug!(path = %state.artifact_path.display(), "Bundle not built yet");
            (StatusCode::NOT_FOUND, "Not found").into_response()
        }
        Err(err) => {
            tracing::warn!(path = %state.artifact_path.display(), error = %err, "Failed to read bundle");
            (StatusCode::INTERNAL_SERVER_ERROR, "Server error").into_response()
        }
    }
}
