use axum::Json;
use axum::extract::State;
use http::StatusCode;

use super::models::RegistroClinico;
use super::ownership;
use super::serializers::{CreateRegistroRequest, RegistroQuery, UpdateRegistroRequest};
use crate::core::error::Result;
use crate::core::extract::{PathId, QueryParams, ValidatedJson};
use crate::core::gate::{AdminOrSpecialist, Guard, SpecialistOnly};
use crate::core::response::MessageResponse;
use crate::state::AppState;

/// POST /registros-clinicos
pub async fn create(
	State(state): State<AppState>,
	guard: Guard<SpecialistOnly>,
	ValidatedJson(request): ValidatedJson<CreateRegistroRequest>,
) -> Result<(StatusCode, Json<RegistroClinico>)> {
	let registro = ownership::create(&state, guard.user(), request).await?;
	Ok((StatusCode::CREATED, Json(registro)))
}

/// GET /registros-clinicos[?historyId=]
pub async fn list(
	State(state): State<AppState>,
	_guard: Guard<AdminOrSpecialist>,
	QueryParams(query): QueryParams<RegistroQuery>,
) -> Result<Json<Vec<RegistroClinico>>> {
	let registros = match query.history_id {
		Some(history_id) => ownership::list_by_history(&state, history_id).await?,
		None => ownership::list(&state).await?,
	};
	Ok(Json(registros))
}

/// GET /registros-clinicos/{id}
pub async fn retrieve(
	State(state): State<AppState>,
	_guard: Guard<AdminOrSpecialist>,
	PathId(id): PathId,
) -> Result<Json<RegistroClinico>> {
	Ok(Json(ownership::get(&state, id).await?))
}

/// PUT /registros-clinicos/{id}
pub async fn update(
	State(state): State<AppState>,
	guard: Guard<AdminOrSpecialist>,
	PathId(id): PathId,
	ValidatedJson(request): ValidatedJson<UpdateRegistroRequest>,
) -> Result<Json<RegistroClinico>> {
	Ok(Json(
		ownership::update(&state, guard.user(), id, request).await?,
	))
}

/// DELETE /registros-clinicos/{id}
pub async fn destroy(
	State(state): State<AppState>,
	guard: Guard<AdminOrSpecialist>,
	PathId(id): PathId,
) -> Result<Json<MessageResponse>> {
	ownership::delete(&state, guard.user(), id).await?;
	Ok(Json(MessageResponse::new("Clinical record deleted")))
}
