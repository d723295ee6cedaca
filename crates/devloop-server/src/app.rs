//! Router construction.
//!
//! Builds the axum router with all routes and middleware.

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::live_reload;
use crate::middleware::headers;
use crate::state::AppState;
use crate::{BUNDLE_ROUTE, RELOAD_ROUTE};

/// Create the application router.
pub(crate) fn create_router(state: Arc<AppState>) -> Router {
    let mut router = Router::new()
        .route("/", get(handlers::index::index))
        .route(BUNDLE_ROUTE, get(handlers::bundle::bundle));

    if state.live_reload {
        router = router.route(RELOAD_ROUTE, get(live_reload::reload_stream));
    }

    router
        .fallback(handlers::not_found)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(headers::no_cache_layer())
                .layer(headers::content_type_options_layer()),
        )
        .with_state(state)
}
