use axum::Json;
use axum::extract::State;
use http::StatusCode;

use super::models::Cita;
use super::scheduler;
use super::serializers::{CitaDetalle, CreateCitaRequest, UpdateCitaRequest};
use crate::core::error::Result;
use crate::core::extract::{PathId, ValidatedJson};
use crate::core::gate::{AdminOrSpecialist, AnyRole, Guard, SpecialistOnly};
use crate::core::response::MessageResponse;
use crate::state::AppState;

/// POST /citas
pub async fn create(
	State(state): State<AppState>,
	_guard: Guard<AnyRole>,
	ValidatedJson(request): ValidatedJson<CreateCitaRequest>,
) -> Result<(StatusCode, Json<Cita>)> {
	let cita = scheduler::create(&state, request).await?;
	Ok((StatusCode::CREATED, Json(cita)))
}

/// GET /citas
pub async fn list(
	State(state): State<AppState>,
	_guard: Guard<AdminOrSpecialist>,
) -> Result<Json<Vec<CitaDetalle>>> {
	Ok(Json(scheduler::list(&state).await?))
}

/// GET /citas/{id}
pub async fn retrieve(
	State(state): State<AppState>,
	_guard: Guard<AnyRole>,
	PathId(id): PathId,
) -> Result<Json<CitaDetalle>> {
	Ok(Json(scheduler::get(&state, id).await?))
}

/// PUT /citas/{id}
pub async fn update(
	State(state): State<AppState>,
	_guard: Guard<AnyRole>,
	PathId(id): PathId,
	ValidatedJson(request): ValidatedJson<UpdateCitaRequest>,
) -> Result<Json<Cita>> {
	Ok(Json(scheduler::update(&state, id, request).await?))
}

/// PATCH /citas/{id}/completar
pub async fn complete(
	State(state): State<AppState>,
	_guard: Guard<SpecialistOnly>,
	PathId(id): PathId,
) -> Result<Json<Cita>> {
	Ok(Json(scheduler::complete(&state, id).await?))
}

/// PATCH /citas/{id}/cancelar
pub async fn cancel(
	State(state): State<AppState>,
	_guard: Guard<AnyRole>,
	PathId(id): PathId,
) -> Result<Json<Cita>> {
	Ok(Json(scheduler::cancel(&state, id).await?))
}

/// DELETE /citas/{id}
pub async fn destroy(
	State(state): State<AppState>,
	_guard: Guard<AdminOrSpecialist>,
	PathId(id): PathId,
) -> Result<Json<MessageResponse>> {
	scheduler::delete(&state, id).await?;
	Ok(Json(MessageResponse::new("Appointment deleted")))
}

/// GET /citas/paciente/{id}
pub async fn by_patient(
	State(state): State<AppState>,
	_guard: Guard<AnyRole>,
	PathId(id): PathId,
) -> Result<Json<Vec<CitaDetalle>>> {
	Ok(Json(scheduler::list_by_patient(&state, id).await?))
}

/// GET /citas/especialista/{id}
pub async fn by_specialist(
	State(state): State<AppState>,
	_guard: Guard<AnyRole>,
	PathId(id): PathId,
) -> Result<Json<Vec<CitaDetalle>>> {
	Ok(Json(scheduler::list_by_specialist(&state, id).await?))
}
