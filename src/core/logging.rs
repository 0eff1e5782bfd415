//! Logging setup and request logging middleware

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;
use chrono::Utc;
use tracing_subscriber::EnvFilter;

/// Install the global `tracing` subscriber.
///
/// `RUST_LOG` wins over `default_filter`. Calling this twice is harmless.
pub fn init_tracing(default_filter: &str) {
	let filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
	let _ = tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_target(false)
		.try_init();
}

/// Logs method, path, status and duration of every request.
pub async fn log_requests(request: Request, next: Next) -> Response {
	let start = Utc::now();
	let method = request.method().clone();
	let path = request.uri().path().to_string();

	let response = next.run(request).await;

	let duration = Utc::now().signed_duration_since(start);
	let status = response.status().as_u16();
	let elapsed_ms = duration.num_milliseconds();

	if response.status().is_server_error() {
		tracing::error!(%method, %path, status, elapsed_ms, "request failed");
	} else {
		tracing::info!(%method, %path, status, elapsed_ms, "request completed");
	}

	response
}
