use axum::Json;
use axum::extract::State;
use http::StatusCode;

use super::serializers::{
	CreateEspecialistaRequest, EspecialistaResponse, UpdateEspecialistaRequest,
};
use super::service;
use crate::core::error::Result;
use crate::core::extract::{PathId, ValidatedJson};
use crate::core::gate::{AdminOnly, AdminOrSpecialist, AnyRole, Guard};
use crate::core::response::MessageResponse;
use crate::state::AppState;

/// POST /especialistas
pub async fn create(
	State(state): State<AppState>,
	_guard: Guard<AdminOnly>,
	ValidatedJson(request): ValidatedJson<CreateEspecialistaRequest>,
) -> Result<(StatusCode, Json<EspecialistaResponse>)> {
	let created = service::create(&state, request).await?;
	Ok((StatusCode::CREATED, Json(created)))
}

/// GET /especialistas
pub async fn list(
	State(state): State<AppState>,
	_guard: Guard<AnyRole>,
) -> Result<Json<Vec<EspecialistaResponse>>> {
	Ok(Json(service::list(&state).await?))
}

/// GET /especialistas/{id}
pub async fn retrieve(
	State(state): State<AppState>,
	_guard: Guard<AnyRole>,
	PathId(id): PathId,
) -> Result<Json<EspecialistaResponse>> {
	Ok(Json(service::get(&state, id).await?))
}

/// PUT /especialistas/{id}
pub async fn update(
	State(state): State<AppState>,
	guard: Guard<AdminOrSpecialist>,
	PathId(id): PathId,
	ValidatedJson(request): ValidatedJson<UpdateEspecialistaRequest>,
) -> Result<Json<EspecialistaResponse>> {
	Ok(Json(
		service::update(&state, guard.user(), id, request).await?,
	))
}

/// DELETE /especialistas/{id}
pub async fn destroy(
	State(state): State<AppState>,
	_guard: Guard<AdminOnly>,
	PathId(id): PathId,
) -> Result<Json<MessageResponse>> {
	service::delete(&state, id).await?;
	Ok(Json(MessageResponse::new("Specialist deleted")))
}
