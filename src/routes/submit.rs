use std::net::SocketAddr;

use axum::body::Bytes;
use axum::extract::{ConnectInfo, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::error::AppError;
use crate::state::SharedState;
use crate::submission::pipeline;

pub async fn submit(
    State(state): State<SharedState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, AppError> {
    let accepted = pipeline::run(&state, &headers, addr.ip(), body).await?;

    Ok((
        StatusCode::OK,
        Json(json!({
            "ok": true,
            "success": true,
            "message": "Submission received",
            "id": accepted.id,
        })),
    )
        .into_response())
}

/// Liveness only; never calls the Sheets API.
pub async fn healthz() -> Json<serde_json::Value> {
    Json(json!({ "ok": true, "status": "healthy" }))
}
