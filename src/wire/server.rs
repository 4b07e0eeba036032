//! Wire server setup

use std::net::SocketAddr;

use anyhow::{Context, Result};
use axum::{
    body::Body,
    extract::State,
    http::Request,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tokio::net::TcpListener;

use super::error::WireError;
use super::handler::{self, is_wire_request, WireState};

/// Registered component types and tracked instances
#[derive(Debug, Serialize)]
pub struct ComponentsResponse {
    pub components: Vec<String>,
    pub instances: Vec<String>,
}

/// Build the router
///
/// - `GET /mount/:name` for a component's first render
/// - `GET /api/components` for registry introspection
/// - anything under `…/wire/{id}` (or carrying the wire header) goes to the
///   orchestrator
pub fn router(state: WireState) -> Router {
    Router::new()
        .route("/mount/:name", get(handler::mount_component))
        .route("/api/components", get(list_components))
        .fallback(dispatch)
        .with_state(state)
}

async fn dispatch(State(state): State<WireState>, req: Request<Body>) -> Response {
    if is_wire_request(req.uri().path(), req.headers()) {
        return handler::handle(State(state), req).await.into_response();
    }

    WireError::NotFound(format!("No route for {} {}", req.method(), req.uri().path()))
        .into_response()
}

async fn list_components(State(state): State<WireState>) -> Json<ComponentsResponse> {
    Json(ComponentsResponse {
        components: state.registry.factory_names(),
        instances: state.registry.instance_ids(),
    })
}

/// Serve the wire protocol until `shutdown_rx` fires
pub async fn start_server(
    bind_addr: SocketAddr,
    state: WireState,
    shutdown_rx: tokio::sync::oneshot::Receiver<()>,
) -> Result<()> {
    let components = state.registry.factory_names();
    if components.is_empty() {
        tracing::warn!("No component types registered; every wire request will 404");
    } else {
        tracing::info!("Serving components: {:?}", components);
    }
    tracing::debug!(
        renderer = state.renderer.name(),
        max_body_bytes = state.max_body_bytes,
        "Wire handler configured"
    );

    let app = router(state);

    tracing::info!("Starting wire server on {}", bind_addr);

    let listener = TcpListener::bind(bind_addr)
        .await
        .context("Failed to bind to address")?;

    tracing::info!("Wire server listening on {}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_rx.await.ok();
        })
        .await
        .context("Server error")?;

    tracing::info!("Wire server shut down gracefully");
    Ok(())
}
