use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};

use formsheet::config::{AllowedOrigins, Config, RateLimitConfig};
use formsheet::error::ConfigError;
use formsheet::sheets::{RowAppender, SheetsError};
use formsheet::submission::schema::{Schema, ValidationMode};

/// Stands in for the Sheets API and remembers every row it was handed.
#[derive(Default)]
pub struct RecordingAppender {
    rows: Mutex<Vec<Vec<String>>>,
    fail_with: Option<u16>,
}

impl RecordingAppender {
    pub fn failing(status: u16) -> Self {
        Self {
            rows: Mutex::new(Vec::new()),
            fail_with: Some(status),
        }
    }

    pub fn rows(&self) -> Vec<Vec<String>> {
        self.rows.lock().unwrap().clone()
    }

    pub fn attempts(&self) -> usize {
        self.rows.lock().unwrap().len()
    }
}

#[async_trait]
impl RowAppender for RecordingAppender {
    async fn append_row(&self, row: Vec<String>) -> Result<(), SheetsError> {
        self.rows.lock().unwrap().push(row);
        match self.fail_with {
            Some(status) => Err(SheetsError::Api {
                status,
                body: "The caller does not have permission (project 1234)".to_string(),
            }),
            None => Ok(()),
        }
    }
}

/// A running test server instance.
pub struct TestApp {
    pub addr: SocketAddr,
    pub client: Client,
    pub sink: Arc<RecordingAppender>,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Submit a JSON body, return (body, status).
    pub async fn submit_json(&self, data: &Value) -> (Value, StatusCode) {
        let resp = self
            .client
            .post(self.url("/submit"))
            .json(data)
            .send()
            .await
            .expect("submit json failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    /// Submit form-urlencoded data, return (body, status).
    pub async fn submit_form(&self, data: &[(&str, &str)]) -> (Value, StatusCode) {
        let resp = self
            .client
            .post(self.url("/submit"))
            .form(data)
            .send()
            .await
            .expect("submit form failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }
}

pub fn test_config() -> Config {
    Config {
        spreadsheet_id: Some("test-sheet".to_string()),
        credentials: None,
        sheet_name: "Sheet1".to_string(),
        schema: Schema::contact(),
        validation: ValidationMode::Strict,
        allowed_origins: AllowedOrigins::Any,
        host: "127.0.0.1".parse().unwrap(),
        port: 0, // unused, we bind to random port
        max_body_size: 16 * 1024,
        rate_limit: RateLimitConfig {
            max_requests: 1000,
            window_secs: 60,
        },
        trusted_proxies: vec![],
        sheets_api_base: "http://127.0.0.1:1".to_string(),
        sheets_timeout: Duration::from_secs(2),
        log_level: "warn".to_string(),
    }
}

/// Spawn the app with a recording appender.
pub async fn spawn_app(config: Config) -> TestApp {
    spawn_with(config, Arc::new(RecordingAppender::default())).await
}

pub async fn spawn_with(config: Config, sink: Arc<RecordingAppender>) -> TestApp {
    let appender: Arc<dyn RowAppender> = sink.clone();
    let addr = serve(config, Ok(appender)).await;
    TestApp {
        addr,
        client: Client::new(),
        sink,
    }
}

/// Spawn the app with no backend at all, as when credentials are absent.
pub async fn spawn_unconfigured(config: Config, reason: ConfigError) -> TestApp {
    let addr = serve(config, Err(reason)).await;
    TestApp {
        addr,
        client: Client::new(),
        sink: Arc::new(RecordingAppender::default()),
    }
}

async fn serve(config: Config, appender: Result<Arc<dyn RowAppender>, ConfigError>) -> SocketAddr {
    let (app, _state) = formsheet::build_app(config, appender);

    // Bind to random port
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind to random port");
    let addr = listener.local_addr().unwrap();

    // Spawn server in background
    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .expect("Server failed");
    });

    addr
}
