// crates/warden-server/src/server.rs
// ============================================================================
// Module: Governance HTTP Surface
// Description: axum routes exposing the governance orchestrator.
// Purpose: Serve policy, provenance, kill-switch, and registry endpoints.
// Dependencies: axum, tokio, serde_json, crate::governor
// ============================================================================

//! ## Overview
//! The HTTP surface is a thin boundary over [`Governor`]: request bodies are
//! size-capped and parsed explicitly, blocking registry/policy/store calls
//! shift to a blocking context, and every failure maps through one status
//! table. Error payloads are a single `{"error": ...}` envelope; decisions
//! and manifests serialize from their typed forms.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::body::Bytes;
use axum::extract::Path;
use axum::extract::Query;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::routing::post;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use serde_json::json;
use thiserror::Error;

use warden_core::ManifestId;
use warden_core::TenantSlug;
use warden_registry::NewTool;

use crate::config::WardenConfig;
use crate::governor::Governor;
use crate::governor::GovernorError;
use crate::governor::KillRequest;
use crate::governor::PolicyCheckRequest;
use crate::governor::RestoreRequest;
use crate::governor::SignRequest;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// HTTP server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Server configuration is unusable.
    #[error("server config error: {0}")]
    Config(String),
    /// Transport-level failure binding or serving.
    #[error("server transport error: {0}")]
    Transport(String),
}

// ============================================================================
// SECTION: Server State
// ============================================================================

/// Shared state for HTTP handlers.
pub struct ServerState {
    /// Governance orchestrator.
    governor: Arc<Governor>,
    /// Maximum allowed request body size.
    max_body_bytes: usize,
}

impl ServerState {
    /// Creates handler state over a governor.
    #[must_use]
    pub fn new(governor: Arc<Governor>, max_body_bytes: usize) -> Self {
        Self {
            governor,
            max_body_bytes,
        }
    }
}

/// Response alias used by every handler.
type ApiResponse = (StatusCode, Json<Value>);

// ============================================================================
// SECTION: Serving
// ============================================================================

/// Serves the governance API until the process stops.
///
/// # Errors
///
/// Returns [`ServerError`] when the bind address is invalid or serving fails.
pub async fn serve(config: &WardenConfig, governor: Governor) -> Result<(), ServerError> {
    let addr: SocketAddr = config
        .server
        .bind
        .parse()
        .map_err(|_| ServerError::Config("invalid bind address".to_string()))?;
    let state = Arc::new(ServerState::new(Arc::new(governor), config.server.max_body_bytes));
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|_| ServerError::Transport("http bind failed".to_string()))?;
    axum::serve(listener, app)
        .await
        .map_err(|_| ServerError::Transport("http server failed".to_string()))
}

/// Builds the governance router over shared state.
#[must_use]
pub fn router(state: Arc<ServerState>) -> Router {
    Router::new()
        .route("/healthz", get(handle_health))
        .route("/policy/check", post(handle_policy_check))
        .route("/provenance/sign", post(handle_sign))
        .route("/provenance/verify/{manifest_id}", get(handle_verify))
        .route("/kill", post(handle_kill))
        .route("/kill/restore", post(handle_restore))
        .route("/tools", get(handle_list_tools).post(handle_register_tool))
        .route("/tenants", get(handle_list_tenants))
        .with_state(state)
}

// ============================================================================
// SECTION: Handlers
// ============================================================================

/// Reports process liveness.
async fn handle_health() -> ApiResponse {
    (StatusCode::OK, Json(json!({"status": "ok"})))
}

/// Checks an action against the policy evaluator.
async fn handle_policy_check(
    State(state): State<Arc<ServerState>>,
    bytes: Bytes,
) -> ApiResponse {
    let request: PolicyCheckRequest = match parse_body(&state, &bytes) {
        Ok(request) => request,
        Err(response) => return response,
    };
    match run_blocking(|| state.governor.check_policy(&request)) {
        Ok(decision) => encode_ok(StatusCode::OK, &decision),
        Err(err) => error_response(&err),
    }
}

/// Signs a provenance manifest for a completed action.
async fn handle_sign(State(state): State<Arc<ServerState>>, bytes: Bytes) -> ApiResponse {
    let request: SignRequest = match parse_body(&state, &bytes) {
        Ok(request) => request,
        Err(response) => return response,
    };
    match run_blocking(|| state.governor.sign_provenance(&request)) {
        Ok(manifest) => (
            StatusCode::CREATED,
            Json(json!({
                "manifest_id": manifest.signature,
                "signature": manifest.signature,
                "timestamp": manifest.timestamp,
            })),
        ),
        Err(err) => error_response(&err),
    }
}

/// Verifies the manifest stored under the given identity.
async fn handle_verify(
    State(state): State<Arc<ServerState>>,
    Path(manifest_id): Path<String>,
) -> ApiResponse {
    let id = ManifestId::new(manifest_id);
    match run_blocking(|| state.governor.verify_manifest(&id)) {
        Ok(verdict) => match serde_json::to_value(&verdict.manifest) {
            Ok(manifest) => (
                StatusCode::OK,
                Json(json!({
                    "manifest_id": id,
                    "verified": verdict.verified,
                    "manifest": manifest,
                })),
            ),
            Err(_) => encode_failure(),
        },
        Err(err) => error_response(&err),
    }
}

/// Disables a tenant's tools through the kill-switch.
async fn handle_kill(State(state): State<Arc<ServerState>>, bytes: Bytes) -> ApiResponse {
    let request: KillRequest = match parse_body(&state, &bytes) {
        Ok(request) => request,
        Err(response) => return response,
    };
    match run_blocking(|| state.governor.kill(&request)) {
        Ok(affected) => (
            StatusCode::OK,
            Json(json!({"status": "disabled", "affected_tools": affected})),
        ),
        Err(err) => error_response(&err),
    }
}

/// Re-enables a tenant's tools after a kill-switch.
async fn handle_restore(State(state): State<Arc<ServerState>>, bytes: Bytes) -> ApiResponse {
    let request: RestoreRequest = match parse_body(&state, &bytes) {
        Ok(request) => request,
        Err(response) => return response,
    };
    match run_blocking(|| state.governor.restore(&request)) {
        Ok(affected) => (
            StatusCode::OK,
            Json(json!({"status": "enabled", "affected_tools": affected})),
        ),
        Err(err) => error_response(&err),
    }
}

/// Registers a new tool.
async fn handle_register_tool(
    State(state): State<Arc<ServerState>>,
    bytes: Bytes,
) -> ApiResponse {
    let request: NewTool = match parse_body(&state, &bytes) {
        Ok(request) => request,
        Err(response) => return response,
    };
    match run_blocking(|| state.governor.register_tool(&request)) {
        Ok(tool) => encode_ok(StatusCode::CREATED, &tool),
        Err(err) => error_response(&err),
    }
}

/// Query parameters for tool listing.
#[derive(Debug, Deserialize)]
struct ListToolsQuery {
    /// Optional tenant scope.
    tenant_slug: Option<String>,
}

/// Lists registered tools, optionally scoped to one tenant.
async fn handle_list_tools(
    State(state): State<Arc<ServerState>>,
    Query(query): Query<ListToolsQuery>,
) -> ApiResponse {
    let scope = query.tenant_slug.map(TenantSlug::new);
    match run_blocking(|| state.governor.list_tools(scope.as_ref())) {
        Ok(tools) => encode_ok(StatusCode::OK, &tools),
        Err(err) => error_response(&err),
    }
}

/// Lists all tenants.
async fn handle_list_tenants(State(state): State<Arc<ServerState>>) -> ApiResponse {
    match run_blocking(|| state.governor.list_tenants()) {
        Ok(tenants) => encode_ok(StatusCode::OK, &tenants),
        Err(err) => error_response(&err),
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Parses a size-capped JSON request body.
fn parse_body<T: DeserializeOwned>(
    state: &ServerState,
    bytes: &Bytes,
) -> Result<T, ApiResponse> {
    if bytes.len() > state.max_body_bytes {
        return Err((
            StatusCode::PAYLOAD_TOO_LARGE,
            Json(json!({"error": "request body too large"})),
        ));
    }
    serde_json::from_slice(bytes.as_ref()).map_err(|err| {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": format!("invalid request body: {err}")})),
        )
    })
}

/// Serializes a typed success payload.
fn encode_ok<T: serde::Serialize>(status: StatusCode, payload: &T) -> ApiResponse {
    serde_json::to_value(payload).map_or_else(|_| encode_failure(), |value| (status, Json(value)))
}

/// Reports a response serialization failure.
fn encode_failure() -> ApiResponse {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({"error": "response serialization failed"})),
    )
}

/// Maps orchestrator failures onto the HTTP status table.
fn error_response(err: &GovernorError) -> ApiResponse {
    let status = match err {
        GovernorError::NotFound(_) => StatusCode::NOT_FOUND,
        GovernorError::Conflict(_) => StatusCode::CONFLICT,
        GovernorError::PolicyUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        GovernorError::Invalid(_) => StatusCode::BAD_REQUEST,
        GovernorError::Storage(_) | GovernorError::Registry(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, Json(json!({"error": err.to_string()})))
}

/// Executes a blocking task, shifting off the async worker when possible.
fn run_blocking<T>(task: impl FnOnce() -> T) -> T {
    match tokio::runtime::Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == tokio::runtime::RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(task)
        }
        _ => task(),
    }
}
