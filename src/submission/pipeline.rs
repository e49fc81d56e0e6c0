use std::net::IpAddr;

use axum::body::Bytes;
use axum::http::HeaderMap;
use chrono::Utc;
use uuid::Uuid;

use crate::error::AppError;
use crate::state::SharedState;

use super::{client_ip, parser, row, validate};

pub struct Accepted {
    pub id: Uuid,
}

/// One submission, start to finish: rate limit, backend check, parse,
/// validate, append. Nothing is appended unless every step before it passed.
pub async fn run(
    state: &SharedState,
    headers: &HeaderMap,
    peer: IpAddr,
    body: Bytes,
) -> Result<Accepted, AppError> {
    let ip = client_ip::resolve(headers, peer, &state.config.trusted_proxies);
    state.limiter.check(ip).map_err(|retry_after| {
        tracing::debug!("Rate limited {ip}, retry after {retry_after}s");
        AppError::RateLimited(retry_after)
    })?;

    let appender = state.appender.as_ref().map_err(|e| AppError::Config(e.clone()))?;

    let raw = parser::parse(headers, body)
        .await
        .map_err(AppError::BadRequest)?;

    let record = validate::validate(&raw, &state.config.schema, state.config.validation)
        .map_err(|violations| {
            tracing::debug!("Rejected submission from {ip}: {violations:?}");
            AppError::Validation(violations)
        })?;

    let id = Uuid::now_v7();
    let cells = row::build(&record, Utc::now());

    appender.append_row(cells).await?;

    tracing::info!("Appended submission {id} from {ip}");

    Ok(Accepted { id })
}
