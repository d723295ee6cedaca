//! HTTP request handlers.

pub(crate) mod bundle;
pub(crate) mod index;

use axum::http::StatusCode;

/// Handle any unmatched path.
pub(crate) async fn not_found() -> (StatusCode, &'static str) {
    (StatusCode::NOT_FOUND, "Not found")
}
