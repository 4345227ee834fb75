use super::error::ServerError;
use super::{library, routes};
use super::state::AppState;
use axum::http::{HeaderValue, Method};
use axum::routing::{delete, get, patch, post, put};
use axum::Router;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::{info, warn};

/// Assemble routes and CORS for the given allowed origins.
pub fn build_router(state: AppState, allowed_origins: &[String]) -> Router {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = origin.as_str(), "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any);

    Router::new()
        .route("/", get(routes::root))
        .route("/chat", post(routes::chat_handler))
        .route("/stats", get(routes::stats_handler))
        .route("/settings/smtp", put(routes::smtp_settings_handler))
        .route("/tools", get(routes::tools_handler))
        .route("/tools/{name}", get(routes::tool_handler))
        .route("/photos", get(library::list_photos))
        .route("/photos/{id}", delete(library::delete_photo))
        .route("/photos/{id}/category", patch(library::move_photo))
        .route("/people", get(library::list_people).post(library::create_person))
        .route("/people/tag-photo", post(library::tag_photo))
        .route("/people/{id}", delete(library::delete_person))
        .route("/receipts", get(library::list_receipts))
        .route("/receipts/{id}", delete(library::delete_receipt))
        .route("/vault", get(library::list_vault))
        .layer(cors)
        .with_state(state)
}

/// Bind `addr` and serve until `shutdown` is cancelled.
pub async fn serve(
    router: Router,
    addr: SocketAddr,
    shutdown: CancellationToken,
) -> Result<(), ServerError> {
    info!(%addr, "Binding REST server");
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind { addr, source })?;
    serve_listener(router, listener, shutdown).await
}

/// Serve on an already-bound listener.
pub async fn serve_listener(
    router: Router,
    listener: TcpListener,
    shutdown: CancellationToken,
) -> Result<(), ServerError> {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "REST server ready to accept connections");
    }

    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(ServerError::Serve)?;

    info!("REST server stopped");
    Ok(())
}
