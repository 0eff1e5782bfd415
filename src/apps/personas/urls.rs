use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::put;

use super::views;
use crate::state::AppState;

/// Slack on top of the image ceiling for the remaining form fields
const FORM_OVERHEAD: usize = 64 * 1024;

pub fn routes(max_image_bytes: usize) -> Router<AppState> {
	Router::new().route(
		"/personas/{id}",
		put(views::update).layer(DefaultBodyLimit::max(max_image_bytes + FORM_OVERHEAD)),
	)
}
