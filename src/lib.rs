pub mod config;
pub mod credentials;
pub mod error;
pub mod rate_limit;
pub mod routes;
pub mod sheets;
pub mod state;
pub mod submission;

use std::sync::Arc;
use std::time::Duration;

use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderName, HeaderValue, Method};
use axum::Router;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::config::{AllowedOrigins, Config};
use crate::credentials::CREDENTIALS_BASE64_VAR;
use crate::error::ConfigError;
use crate::rate_limit::SubmissionRateLimiter;
use crate::sheets::{range_for, RowAppender, SheetsClient, SheetsSettings};
use crate::state::{AppState, SharedState};

/// Build the Sheets client described by `config`.
///
/// `ConfigError::Missing` means the deployment simply has no backend yet;
/// `ConfigError::Invalid` means what it has is broken.
pub fn sheets_backend(config: &Config) -> Result<Arc<dyn RowAppender>, ConfigError> {
    let spreadsheet_id = config
        .spreadsheet_id
        .clone()
        .ok_or_else(|| ConfigError::Missing("SPREADSHEET_ID".to_string()))?;
    let account = config
        .credentials
        .as_ref()
        .ok_or_else(|| ConfigError::Missing(CREDENTIALS_BASE64_VAR.to_string()))?;

    let settings = SheetsSettings {
        api_base: config.sheets_api_base.clone(),
        spreadsheet_id,
        range: range_for(&config.sheet_name, config.schema.column_count()),
        timeout: config.sheets_timeout,
    };

    let client = SheetsClient::new(settings, account)?;
    tracing::info!(
        "Appending rows to range {} as {}",
        client.range(),
        account.client_email
    );
    Ok(Arc::new(client))
}

pub fn build_app(
    config: Config,
    appender: Result<Arc<dyn RowAppender>, ConfigError>,
) -> (Router, SharedState) {
    let cors = cors_layer(&config.allowed_origins);
    let max_body_size = config.max_body_size;

    let state: SharedState = Arc::new(AppState {
        limiter: SubmissionRateLimiter::new(config.rate_limit),
        config,
        appender,
    });

    // Security headers
    let app = Router::new()
        .merge(routes::form_routes())
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_body_size))
        .layer(cors)
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("x-content-type-options"),
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("x-frame-options"),
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("referrer-policy"),
            HeaderValue::from_static("strict-origin-when-cross-origin"),
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state.clone());

    (app, state)
}

fn cors_layer(origins: &AllowedOrigins) -> CorsLayer {
    let allow_origin = match origins {
        AllowedOrigins::Any => AllowOrigin::any(),
        AllowedOrigins::List(list) => AllowOrigin::list(list.iter().cloned()),
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
        .max_age(Duration::from_secs(86400))
}
