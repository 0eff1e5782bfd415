use axum::Router;
use axum::routing::{get, patch};

use super::views;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
	Router::new()
		.route("/citas", get(views::list).post(views::create))
		.route(
			"/citas/{id}",
			get(views::retrieve)
				.put(views::update)
				.delete(views::destroy),
		)
		.route("/citas/{id}/completar", patch(views::complete))
		.route("/citas/{id}/cancelar", patch(views::cancel))
		.route("/citas/paciente/{id}", get(views::by_patient))
		.route("/citas/especialista/{id}", get(views::by_specialist))
}
