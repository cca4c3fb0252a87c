pub mod items;
pub mod menu;
pub mod receipts;

use axum::{
    extract::DefaultBodyLimit,
    http::{header::CONTENT_TYPE, HeaderName, Method},
    middleware,
    routing::{delete, get, patch, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};
use tracing::info_span;

use crate::session::{session_layer, SESSION_HEADER};
use crate::state::{AppState, Backends};

fn item_routes<B: Backends>() -> Router<AppState<B>> {
    Router::new()
        .route(
            "/api/items",
            get(items::list_items::<B>)
                .post(items::add_item::<B>)
                .delete(items::clear_items::<B>),
        )
        .route("/api/items/form", get(items::form_defaults))
        .route("/api/items/quantities", put(items::save_quantities::<B>))
        .route("/api/items/{id}", delete(items::delete_item::<B>))
        .route("/api/items/{id}/quantity", patch(items::update_quantity::<B>))
}

fn receipt_routes<B: Backends>() -> Router<AppState<B>> {
    Router::new()
        .route("/api/receipts/scan", post(receipts::scan_receipt::<B>))
        .route(
            "/api/receipts/draft",
            get(receipts::get_draft::<B>)
                .put(receipts::put_draft::<B>)
                .delete(receipts::cancel_draft::<B>),
        )
        .route("/api/receipts/draft/commit", post(receipts::commit_draft::<B>))
}

fn menu_routes<B: Backends>() -> Router<AppState<B>> {
    Router::new()
        .route("/api/menu/options", get(menu::options::<B>))
        .route("/api/menu/suggest", post(menu::suggest::<B>))
        .route("/api/menu/current", get(menu::current::<B>))
}

/// Returns the [`Router`] of this application.
pub fn router<B: Backends>(state: AppState<B>, max_upload_bytes: usize) -> Router {
    let trace_layer =
        TraceLayer::new_for_http().make_span_with(|request: &axum::extract::Request| {
            let uri = request.uri().to_string();
            info_span!("http_request", method = ?request.method(), uri)
        });

    let session_header = HeaderName::from_static(SESSION_HEADER);
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_origin(Any)
        .allow_headers([CONTENT_TYPE, session_header.clone()])
        .expose_headers([session_header]);

    Router::new()
        .merge(item_routes::<B>())
        .merge(receipt_routes::<B>())
        .merge(menu_routes::<B>())
        .layer(middleware::from_fn(session_layer))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_upload_bytes))
        .layer(trace_layer)
        .layer(cors)
        .with_state(state)
}
