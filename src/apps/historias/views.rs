use axum::Json;
use axum::extract::State;
use http::StatusCode;

use super::models::HistoriaClinica;
use super::serializers::{CreateHistoriaRequest, HistoriaDetalle, UpdateHistoriaRequest};
use super::service;
use crate::core::error::Result;
use crate::core::extract::{PathId, ValidatedJson};
use crate::core::gate::{AdminOnly, AdminOrSpecialist, AnyRole, Guard, SpecialistOnly};
use crate::core::response::MessageResponse;
use crate::state::AppState;

/// POST /historias-clinicas
pub async fn create(
	State(state): State<AppState>,
	_guard: Guard<SpecialistOnly>,
	ValidatedJson(request): ValidatedJson<CreateHistoriaRequest>,
) -> Result<(StatusCode, Json<HistoriaClinica>)> {
	let historia = service::create(&state, request).await?;
	Ok((StatusCode::CREATED, Json(historia)))
}

/// GET /historias-clinicas
pub async fn list(
	State(state): State<AppState>,
	_guard: Guard<AdminOrSpecialist>,
) -> Result<Json<Vec<HistoriaDetalle>>> {
	Ok(Json(service::list(&state).await?))
}

/// GET /historias-clinicas/{id}
pub async fn retrieve(
	State(state): State<AppState>,
	_guard: Guard<AnyRole>,
	PathId(id): PathId,
) -> Result<Json<HistoriaDetalle>> {
	Ok(Json(service::get(&state, id).await?))
}

/// GET /historias-clinicas/paciente/{id}
pub async fn by_patient(
	State(state): State<AppState>,
	_guard: Guard<AnyRole>,
	PathId(id): PathId,
) -> Result<Json<HistoriaDetalle>> {
	Ok(Json(service::get_by_patient(&state, id).await?))
}

/// PUT /historias-clinicas/{id}
pub async fn update(
	State(state): State<AppState>,
	_guard: Guard<AdminOrSpecialist>,
	PathId(id): PathId,
	ValidatedJson(request): ValidatedJson<UpdateHistoriaRequest>,
) -> Result<Json<HistoriaClinica>> {
	Ok(Json(service::update(&state, id, request).await?))
}

/// DELETE /historias-clinicas/{id}
pub async fn destroy(
	State(state): State<AppState>,
	_guard: Guard<AdminOnly>,
	PathId(id): PathId,
) -> Result<Json<MessageResponse>> {
	service::delete(&state, id).await?;
	Ok(Json(MessageResponse::new("Clinical history deleted")))
}
