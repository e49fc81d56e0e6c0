use std::time::Duration;

use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde_json::json;

use crate::credentials::ServiceAccount;
use crate::error::ConfigError;

use super::auth::{truncated_body, TokenSource};
use super::{RowAppender, SheetsError, SPREADSHEETS_SCOPE};

#[derive(Debug, Clone)]
pub struct SheetsSettings {
    pub api_base: String,
    pub spreadsheet_id: String,
    /// A1 range rows are appended after, e.g. `'Sheet1'!A:D`.
    pub range: String,
    pub timeout: Duration,
}

/// Google Sheets v4 client bound to one spreadsheet range. Built once at
/// startup and shared through application state.
pub struct SheetsClient {
    http: reqwest::Client,
    tokens: TokenSource,
    append_url: Url,
    range: String,
}

impl SheetsClient {
    pub fn new(settings: SheetsSettings, account: &ServiceAccount) -> Result<Self, ConfigError> {
        let http = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|e| ConfigError::Invalid(format!("Failed to build HTTP client: {e}")))?;

        let tokens = TokenSource::new(account, SPREADSHEETS_SCOPE, http.clone())?;
        let append_url = append_url(&settings)?;

        Ok(Self {
            http,
            tokens,
            append_url,
            range: settings.range,
        })
    }

    pub fn range(&self) -> &str {
        &self.range
    }

    async fn post_row(&self, token: &str, row: &[String]) -> Result<(), SheetsError> {
        let body = json!({
            "majorDimension": "ROWS",
            "values": [row],
        });

        let resp = self
            .http
            .post(self.append_url.clone())
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .map_err(|e| SheetsError::Transport(e.to_string()))?;

        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }

        Err(SheetsError::Api {
            status: status.as_u16(),
            body: truncated_body(resp).await,
        })
    }
}

#[async_trait]
impl RowAppender for SheetsClient {
    async fn append_row(&self, row: Vec<String>) -> Result<(), SheetsError> {
        let token = self.tokens.access_token().await?;
        let result = self.post_row(&token, &row).await;

        // A revoked or rotated key shows up as 401; the next request starts
        // over with a fresh token instead of reusing the cached one.
        if let Err(SheetsError::Api { status, .. }) = &result {
            if *status == StatusCode::UNAUTHORIZED.as_u16() {
                self.tokens.invalidate().await;
            }
        }

        result
    }
}

fn append_url(settings: &SheetsSettings) -> Result<Url, ConfigError> {
    let mut url = Url::parse(&settings.api_base).map_err(|e| {
        ConfigError::Invalid(format!("Invalid Sheets API base '{}': {e}", settings.api_base))
    })?;

    url.path_segments_mut()
        .map_err(|_| {
            ConfigError::Invalid(format!(
                "Sheets API base '{}' cannot carry a path",
                settings.api_base
            ))
        })?
        .pop_if_empty()
        .extend([
            "v4",
            "spreadsheets",
            settings.spreadsheet_id.as_str(),
            "values",
            format!("{}:append", settings.range).as_str(),
        ]);

    url.query_pairs_mut()
        .append_pair("valueInputOption", "RAW")
        .append_pair("insertDataOption", "INSERT_ROWS");

    Ok(url)
}
