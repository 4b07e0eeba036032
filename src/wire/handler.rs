//! Wire request orchestrator
//!
//! The single place where component failures become responses. Everything
//! below this layer propagates errors with `?`; here they are logged and
//! turned into a 500. Panics in component code get the same treatment.

use super::envelope::{WireRequest, WireResponse};
use super::error::WireError;
use super::render::{HtmlRenderer, Renderer};
use crate::codec::StateCodec;
use crate::component::LiveComponent;
use crate::config::DEFAULT_MAX_BODY_BYTES;
use crate::registry::Registry;
use anyhow::Result;
use axum::{
    body::Body,
    extract::{Path, State},
    http::{HeaderMap, Method, Request},
    Json,
};
use chrono::Utc;
use futures::FutureExt;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::Instrument;

/// Header a client may set instead of using a `/wire/{id}` path
pub const WIRE_HEADER: &str = "x-wire-request";

/// Shared state for the wire endpoints
#[derive(Clone)]
pub struct WireState {
    pub registry: Arc<Registry>,
    pub renderer: Arc<dyn Renderer>,
    /// Larger bodies are rejected with 400
    pub max_body_bytes: usize,
}

impl WireState {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self {
            registry,
            renderer: Arc::new(HtmlRenderer),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn Renderer>) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn with_max_body_bytes(mut self, max_body_bytes: usize) -> Self {
        self.max_body_bytes = max_body_bytes;
        self
    }
}

/// Whether a request is addressed to the wire protocol
pub fn is_wire_request(path: &str, headers: &HeaderMap) -> bool {
    headers.contains_key(WIRE_HEADER) || wire_path_id(path).is_some()
}

/// The `{id}` of a `…/wire/{id}` path
pub fn wire_path_id(path: &str) -> Option<&str> {
    let mut segments = path.trim_end_matches('/').rsplit('/');
    let id = segments.next()?;
    let marker = segments.next()?;
    (marker == "wire" && !id.is_empty()).then_some(id)
}

/// Unique id for correlating the log lines of one request
fn generate_request_id() -> String {
    use std::sync::atomic::{AtomicU64, Ordering};
    static COUNTER: AtomicU64 = AtomicU64::new(0);

    let count = COUNTER.fetch_add(1, Ordering::SeqCst);
    format!("{}-{}", Utc::now().timestamp_millis(), count)
}

// ─────────────────────────────────────────────────────────────────────────────
// Endpoints
// ─────────────────────────────────────────────────────────────────────────────

/// `POST …/wire/{id}`: restore, mutate, act, render
pub async fn handle(
    State(state): State<WireState>,
    req: Request<Body>,
) -> Result<Json<WireResponse>, WireError> {
    let request_id = generate_request_id();

    if req.method() != Method::POST {
        return Err(WireError::MethodNotAllowed(format!(
            "Method {} not allowed for wire requests",
            req.method()
        )));
    }

    let path = req.uri().path().to_string();
    let body = axum::body::to_bytes(req.into_body(), state.max_body_bytes)
        .await
        .map_err(|e| WireError::BadRequest(format!("Failed to read request body: {}", e)))?;
    let request = WireRequest::parse(&body)?;

    // Unverified, so only fit for log context
    let component_id = StateCodec::extract_component_id(&request.state);
    let span = tracing::info_span!(
        "wire",
        request_id = %request_id,
        component = %request.type_name,
        component_id = component_id.as_deref().unwrap_or("-")
    );
    async move {
        tracing::debug!(
            path = %path,
            action = request.action.as_deref().unwrap_or("-"),
            models = request.models.len(),
            event = request.event.as_ref().map(|e| e.name.as_str()).unwrap_or("-"),
            "Wire request"
        );

        let type_name = request.type_name.clone();
        let registry = state.registry.clone();
        respond(
            &type_name,
            run_phases(&state, &type_name, registry.handle_wire_request(request)),
        )
        .await
    }
    .instrument(span)
    .await
}

/// `GET /mount/{type}`: first render of a fresh instance
///
/// The instance is mounted but not tracked; the response carries the first
/// signed state token for the client to send back.
pub async fn mount_component(
    State(state): State<WireState>,
    Path(type_name): Path<String>,
) -> Result<Json<WireResponse>, WireError> {
    let span = tracing::info_span!(
        "mount",
        request_id = %generate_request_id(),
        component = %type_name
    );
    async {
        let registry = state.registry.clone();
        let mounted = async { registry.mount_ephemeral(&type_name) };
        respond(&type_name, run_phases(&state, &type_name, mounted)).await
    }
    .instrument(span)
    .await
}

// ─────────────────────────────────────────────────────────────────────────────
// Phases
// ─────────────────────────────────────────────────────────────────────────────

/// Resolve an instance, then render it
async fn run_phases<F>(state: &WireState, type_name: &str, resolve: F) -> Result<Option<WireResponse>>
where
    F: Future<Output = Result<Option<Box<dyn LiveComponent>>>>,
{
    let Some(mut instance) = resolve.await? else {
        return Ok(None);
    };
    render_instance(state, type_name, instance.as_mut())
        .await
        .map(Some)
}

/// `before_render` → `build` → renderer → drain events
pub(crate) async fn render_instance(
    state: &WireState,
    type_name: &str,
    instance: &mut dyn LiveComponent,
) -> Result<WireResponse> {
    instance.before_render().await?;
    let built = instance.build(type_name, state.registry.codec())?;
    let html = state.renderer.render(&built);
    let events = instance.take_events();

    tracing::debug!(
        renderer = state.renderer.name(),
        visible = built.visible,
        events = events.len(),
        "Rendered component"
    );
    Ok(WireResponse { html, events })
}

/// Convert the phase outcome into a response, catching panics
async fn respond<F>(type_name: &str, phases: F) -> Result<Json<WireResponse>, WireError>
where
    F: Future<Output = Result<Option<WireResponse>>>,
{
    match AssertUnwindSafe(phases).catch_unwind().await {
        Ok(Ok(Some(response))) => Ok(Json(response)),
        Ok(Ok(None)) => Err(WireError::NotFound(format!(
            "Unknown component type '{}'",
            type_name
        ))),
        Ok(Err(error)) => {
            tracing::error!(error = ?error, "Component failed during wire request");
            Err(WireError::Internal(format!(
                "Component '{}' failed: {}",
                type_name, error
            )))
        }
        Err(panic) => {
            let message = panic_message(panic.as_ref());
            tracing::error!(panic = %message, "Component panicked during wire request");
            Err(WireError::Internal(format!(
                "Component '{}' panicked",
                type_name
            )))
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
