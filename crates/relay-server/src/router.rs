use axum::http::{HeaderName, HeaderValue};
use axum::routing::any;
use axum::Router;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::handler::{self, AppState, VERSION_HEADER};

/// Build the axum router. Every path of every branch goes through the same
/// handler.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", any(handler::root))
        .route("/*path", any(handler::nested))
        .with_state(state)
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static(VERSION_HEADER),
            HeaderValue::from_static(env!("CARGO_PKG_VERSION")),
        ))
        .layer(TraceLayer::new_for_http())
}
