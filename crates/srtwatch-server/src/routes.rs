//! HTTP route handlers.
//!
//! The wire protocol is fixed: snapshots are `[{timestamp, data: {…}}]`
//! arrays, mutations answer `{"status": "ok", …}` envelopes, and errors
//! come back as `{"error": "…"}` with the matching status code.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use srtwatch_core::{ChangeKind, StatusReport, WireEntry};

use crate::ws::push_channel;
use crate::AppState;

// ── Request / response bodies ────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ReportResponse {
    status: &'static str,
    action: &'static str,
}

#[derive(Debug, Deserialize)]
struct AddressQuery {
    address: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RemoveRequest {
    identity: String,
    local_address: String,
    port: u16,
}

#[derive(Debug, Deserialize)]
struct RenameRequest {
    old_name: String,
    new_name: String,
}

#[derive(Debug, Serialize)]
struct OkResponse {
    status: &'static str,
}

/// Error envelope with its HTTP status.
#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    error: String,
}

impl ApiError {
    fn bad_request(error: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            error: error.into(),
        }
    }

    fn not_found(error: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            error: error.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({ "error": self.error });
        (self.status, Json(body)).into_response()
    }
}

// ── Router ───────────────────────────────────────────────────────────

/// Build the full route table over the shared state.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(get_snapshot))
        .route("/report", post(submit_report))
        .route("/devices", get(get_devices))
        .route("/remove", post(remove_device))
        .route("/update_name", post(rename_device))
        .route("/ws", get(push_channel))
        .route("/health", get(health))
        .with_state(state)
}

// ── Handlers ─────────────────────────────────────────────────────────

/// POST /report - ingest one status report.
async fn submit_report(
    State(state): State<Arc<AppState>>,
    Json(report): Json<StatusReport>,
) -> Result<Json<ReportResponse>, ApiError> {
    let (record, kind) = state
        .store
        .upsert(&report)
        .map_err(|e| ApiError::bad_request(e.to_string()))?;

    let action = match kind {
        ChangeKind::NewIdentity => "inserted",
        _ => "updated",
    };
    info!(identity = %record.identity, action, change = ?kind, "report ingested");

    Ok(Json(ReportResponse {
        status: "ok",
        action,
    }))
}

/// GET / - full snapshot in wire format, most recently mutated first.
async fn get_snapshot(State(state): State<Arc<AppState>>) -> Json<Vec<WireEntry>> {
    let entries: Vec<WireEntry> = state
        .store
        .get_all(state.config.snapshot_limit)
        .iter()
        .map(|r| WireEntry::from(r.as_ref()))
        .collect();
    Json(entries)
}

/// GET /devices?address=… - records matching a local address.
async fn get_devices(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AddressQuery>,
) -> Result<Json<Vec<WireEntry>>, ApiError> {
    let Some(address) = query.address else {
        return Err(ApiError::bad_request("missing 'address' query parameter"));
    };

    let entries: Vec<WireEntry> = state
        .store
        .get_by_address(&address)
        .iter()
        .map(|r| WireEntry::from(r.as_ref()))
        .collect();
    Ok(Json(entries))
}

/// POST /remove - delete the record matching the exact triple.
async fn remove_device(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RemoveRequest>,
) -> Result<Json<OkResponse>, ApiError> {
    if state
        .store
        .remove_exact(&req.identity, &req.local_address, req.port)
    {
        info!(identity = %req.identity, port = req.port, "device removed");
        Ok(Json(OkResponse { status: "ok" }))
    } else {
        Err(ApiError::not_found("device not found"))
    }
}

/// POST /update_name - rename a device identity in place.
async fn rename_device(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RenameRequest>,
) -> Result<Json<OkResponse>, ApiError> {
    match state.store.rename_identity(&req.old_name, &req.new_name) {
        Ok(()) => {
            info!(old = %req.old_name, new = %req.new_name, "device renamed");
            Ok(Json(OkResponse { status: "ok" }))
        }
        Err(e) if e.is_not_found() => Err(ApiError::not_found(e.to_string())),
        Err(e) => Err(ApiError::bad_request(e.to_string())),
    }
}

/// GET /health - liveness probe.
async fn health() -> &'static str {
    "ok"
}
