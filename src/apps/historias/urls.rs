use axum::Router;
use axum::routing::get;

use super::views;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
	Router::new()
		.route("/historias-clinicas", get(views::list).post(views::create))
		.route(
			"/historias-clinicas/{id}",
			get(views::retrieve)
				.put(views::update)
				.delete(views::destroy),
		)
		.route("/historias-clinicas/paciente/{id}", get(views::by_patient))
}
