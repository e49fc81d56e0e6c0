use std::sync::Arc;

use crate::config::Config;
use crate::error::ConfigError;
use crate::rate_limit::SubmissionRateLimiter;
use crate::sheets::RowAppender;

pub type SharedState = Arc<AppState>;

pub struct AppState {
    pub config: Config,
    /// `Err` when the deployment lacks a spreadsheet id or credentials;
    /// every submission then fails with a server error.
    pub appender: Result<Arc<dyn RowAppender>, ConfigError>,
    pub limiter: SubmissionRateLimiter,
}
