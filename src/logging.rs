//! Log subscriber setup and request logging.

use axum::{extract::Request, middleware::Next, response::Response};
use tracing::debug;

#[derive(clap::ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

/// Initialize logging based on the specified format.
pub fn init_logging(format: LogFormat) {
    match format {
        LogFormat::Pretty => tracing_subscriber::fmt::init(),
        LogFormat::Json => tracing_subscriber::fmt().json().init(),
        LogFormat::Compact => tracing_subscriber::fmt().compact().init(),
    }
}

/// Middleware that records every incoming request.
pub async fn log_requests(request: Request, next: Next) -> Response {
    debug!(
        method = %request.method(),
        path = %request.uri().path(),
        "incoming http request"
    );
    next.run(request).await
}
