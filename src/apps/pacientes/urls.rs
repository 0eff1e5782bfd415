use axum::Router;
use axum::routing::get;

use super::views;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
	Router::new()
		.route("/pacientes", get(views::list).post(views::create))
		.route(
			"/pacientes/{id}",
			get(views::retrieve)
				.put(views::update)
				.delete(views::destroy),
		)
}
