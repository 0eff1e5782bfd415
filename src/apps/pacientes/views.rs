use axum::Json;
use axum::extract::State;
use http::StatusCode;

use super::serializers::{CreatePacienteRequest, PacienteResponse, UpdatePacienteRequest};
use super::service;
use crate::core::error::Result;
use crate::core::extract::{PathId, ValidatedJson};
use crate::core::gate::{AdminOnly, AdminOrPatient, AdminOrSpecialist, AnyRole, Guard};
use crate::core::response::MessageResponse;
use crate::state::AppState;

/// POST /pacientes (public registration)
pub async fn create(
	State(state): State<AppState>,
	ValidatedJson(request): ValidatedJson<CreatePacienteRequest>,
) -> Result<(StatusCode, Json<PacienteResponse>)> {
	let created = service::create(&state, request).await?;
	Ok((StatusCode::CREATED, Json(created)))
}

/// GET /pacientes
pub async fn list(
	State(state): State<AppState>,
	_guard: Guard<AdminOrSpecialist>,
) -> Result<Json<Vec<PacienteResponse>>> {
	Ok(Json(service::list(&state).await?))
}

/// GET /pacientes/{id}
pub async fn retrieve(
	State(state): State<AppState>,
	_guard: Guard<AnyRole>,
	PathId(id): PathId,
) -> Result<Json<PacienteResponse>> {
	Ok(Json(service::get(&state, id).await?))
}

/// PUT /pacientes/{id}
pub async fn update(
	State(state): State<AppState>,
	guard: Guard<AdminOrPatient>,
	PathId(id): PathId,
	ValidatedJson(request): ValidatedJson<UpdatePacienteRequest>,
) -> Result<Json<PacienteResponse>> {
	Ok(Json(
		service::update(&state, guard.user(), id, request).await?,
	))
}

/// DELETE /pacientes/{id}
pub async fn destroy(
	State(state): State<AppState>,
	_guard: Guard<AdminOnly>,
	PathId(id): PathId,
) -> Result<Json<MessageResponse>> {
	service::delete(&state, id).await?;
	Ok(Json(MessageResponse::new("Patient deleted")))
}
