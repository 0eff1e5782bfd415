use axum::Json;
use axum::extract::State;
use http::StatusCode;

use super::serializers::{
	LoginRequest, LoginResponse, ProfileResponse, RefreshRequest, TokenResponse,
	TwoFactorCodeRequest, TwoFactorSetup,
};
use super::service;
use crate::core::error::{Error, Result};
use crate::core::extract::ValidatedJson;
use crate::core::gate::{AnyRole, Guard};
use crate::core::response::MessageResponse;
use crate::state::AppState;

/// POST /login
pub async fn login(
	State(state): State<AppState>,
	ValidatedJson(request): ValidatedJson<LoginRequest>,
) -> Result<Json<LoginResponse>> {
	Ok(Json(service::login(&state, request).await?))
}

/// POST /logout
///
/// Tokens are stateless; clients discard them.
pub async fn logout() -> (StatusCode, Json<MessageResponse>) {
	(StatusCode::OK, Json(MessageResponse::new("Logged out")))
}

/// POST /user/refreshtoken
pub async fn refresh(
	State(state): State<AppState>,
	ValidatedJson(request): ValidatedJson<RefreshRequest>,
) -> Result<Json<TokenResponse>> {
	let token = service::refresh_access_token(&state, &request.refresh_token).await?;
	Ok(Json(TokenResponse { token }))
}

/// GET /user/profile
pub async fn profile(
	State(state): State<AppState>,
	guard: Guard<AnyRole>,
) -> Result<Json<ProfileResponse>> {
	Ok(Json(service::profile(&state, guard.user().persona_id).await?))
}

/// POST /2fa/generate
pub async fn generate_two_factor(
	State(state): State<AppState>,
	guard: Guard<AnyRole>,
) -> Result<Json<TwoFactorSetup>> {
	let setup = service::generate_two_factor(&state, guard.user().persona_id).await?;
	Ok(Json(setup))
}

/// POST /2fa/verify
pub async fn verify_two_factor(
	State(state): State<AppState>,
	guard: Guard<AnyRole>,
	ValidatedJson(request): ValidatedJson<TwoFactorCodeRequest>,
) -> Result<Json<MessageResponse>> {
	if service::confirm_two_factor(&state, guard.user().persona_id, &request.code).await? {
		Ok(Json(MessageResponse::new(
			"Two-factor authentication enabled",
		)))
	} else {
		Err(Error::Validation("Invalid 2FA code".to_string()))
	}
}

/// POST /2fa/disable
pub async fn disable_two_factor(
	State(state): State<AppState>,
	guard: Guard<AnyRole>,
) -> Result<Json<MessageResponse>> {
	service::disable_two_factor(&state, guard.user().persona_id).await?;
	Ok(Json(MessageResponse::new(
		"Two-factor authentication disabled",
	)))
}
