/// MCP over HTTP
///
/// Routes: `POST /` and `POST /mcp` take one JSON-RPC request, `GET` on the
/// same paths returns the static server descriptor. `OPTIONS` is answered by
/// the CORS layer before it reaches the router.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::mcp::dispatcher::McpDispatcher;
use crate::mcp::protocol::server_descriptor;
use crate::tools::ToolKind;
use crate::ServerError;

/// Shared state threaded through all axum handlers
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<McpDispatcher>,
}

/// Build the axum `Router` with all MCP routes
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    Router::new()
        .route("/", get(handle_descriptor).post(handle_mcp))
        .route("/mcp", get(handle_descriptor).post(handle_mcp))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve the router on `addr` until ctrl-c
pub async fn serve(dispatcher: Arc<McpDispatcher>, addr: SocketAddr) -> Result<(), ServerError> {
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %addr, "MusicToolkit MCP HTTP server ready");

    let router = build_router(AppState { dispatcher });
    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received");
        })
        .await?;

    Ok(())
}

async fn handle_descriptor() -> impl IntoResponse {
    let names: Vec<&str> = ToolKind::ALL.iter().map(|kind| kind.name()).collect();
    Json(server_descriptor(&names))
}

async fn handle_mcp(State(state): State<AppState>, body: String) -> Response {
    match state.dispatcher.handle_str(&body).await {
        Some(response) => Json(response).into_response(),
        None => StatusCode::ACCEPTED.into_response(),
    }
}
