use axum::Router;
use axum::routing::{get, post};

use super::views;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
	Router::new()
		.route("/login", post(views::login))
		.route("/logout", post(views::logout))
		.route("/user/profile", get(views::profile))
		.route("/user/refreshtoken", post(views::refresh))
		.route("/2fa/generate", post(views::generate_two_factor))
		.route("/2fa/verify", post(views::verify_two_factor))
		.route("/2fa/disable", post(views::disable_two_factor))
}
