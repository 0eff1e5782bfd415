//! Root URL configuration

use axum::Router;
use axum::middleware;

use crate::apps::{auth, citas, especialistas, historias, pacientes, personas, registros};
use crate::core::error::Error;
use crate::core::logging::log_requests;
use crate::state::AppState;

/// Build the full application router.
pub fn routes(state: AppState) -> Router {
	let max_image_bytes = state.settings.media.max_image_bytes;
	Router::new()
		.merge(auth::urls::routes())
		.merge(personas::urls::routes(max_image_bytes))
		.merge(pacientes::urls::routes())
		.merge(especialistas::urls::routes())
		.merge(citas::urls::routes())
		.merge(historias::urls::routes())
		.merge(registros::urls::routes())
		.fallback(not_found)
		.layer(middleware::from_fn(log_requests))
		.with_state(state)
}

async fn not_found() -> Error {
	Error::NotFound("Route not found".to_string())
}
