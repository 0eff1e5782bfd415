use chrono::Utc;
use uuid::Uuid;

use super::models::Especialista;
use super::serializers::{
	CreateEspecialistaRequest, EspecialistaResponse, UpdateEspecialistaRequest,
};
use crate::apps::personas::models::Role;
use crate::apps::personas::serializers::PersonaResponse;
use crate::apps::personas::service::{PersonaPatch, new_persona, patch_persona, retire_persona};
use crate::core::error::{Error, Result};
use crate::core::gate::AuthUser;
use crate::db::StoreTx;
use crate::state::AppState;

fn not_found() -> Error {
	Error::NotFound("Specialist not found".to_string())
}

pub async fn with_persona(
	tx: &mut dyn StoreTx,
	especialista: Especialista,
) -> Result<EspecialistaResponse> {
	let persona = tx.persona(especialista.persona_id).await?;
	Ok(EspecialistaResponse {
		especialista,
		persona: persona.map(PersonaResponse::from),
	})
}

/// Create persona and especialista in one unit of work.
pub async fn create(
	state: &AppState,
	request: CreateEspecialistaRequest,
) -> Result<EspecialistaResponse> {
	let persona = new_persona(
		state,
		request.username,
		request.email,
		request.password,
		Role::Specialist,
	)
	.await?;
	let especialista = Especialista::new(persona.id, request.specialty);

	let mut tx = state.store.begin().await?;
	tx.insert_persona(&persona).await?;
	tx.insert_especialista(&especialista).await?;
	tx.commit().await?;

	tracing::info!(especialista_id = %especialista.id, "specialist registered");
	Ok(EspecialistaResponse {
		especialista,
		persona: Some(PersonaResponse::from(persona)),
	})
}

pub async fn get(state: &AppState, id: Uuid) -> Result<EspecialistaResponse> {
	let mut tx = state.store.begin().await?;
	let especialista = tx.especialista(id).await?.ok_or_else(not_found)?;
	with_persona(tx.as_mut(), especialista).await
}

pub async fn list(state: &AppState) -> Result<Vec<EspecialistaResponse>> {
	let mut tx = state.store.begin().await?;
	let especialistas = tx.especialistas().await?;
	let mut out = Vec::with_capacity(especialistas.len());
	for especialista in especialistas {
		out.push(with_persona(tx.as_mut(), especialista).await?);
	}
	Ok(out)
}

/// Specialists may only update their own record.
pub async fn update(
	state: &AppState,
	requester: &AuthUser,
	id: Uuid,
	request: UpdateEspecialistaRequest,
) -> Result<EspecialistaResponse> {
	let UpdateEspecialistaRequest {
		username,
		email,
		password,
		specialty,
	} = request;
	let patch = PersonaPatch::prepare(state, username, email, password).await?;

	let mut tx = state.store.begin().await?;
	let mut especialista = tx.especialista(id).await?.ok_or_else(not_found)?;
	if !requester.is_admin() && especialista.persona_id != requester.persona_id {
		return Err(Error::Forbidden(
			"You can only update your own specialist record".to_string(),
		));
	}

	if let Some(specialty) = specialty {
		especialista.specialty = specialty;
	}
	especialista.updated_at = Utc::now();
	tx.update_especialista(&especialista).await?;

	let persona = patch_persona(tx.as_mut(), especialista.persona_id, patch).await?;
	tx.commit().await?;

	tracing::info!(especialista_id = %especialista.id, "specialist updated");
	Ok(EspecialistaResponse {
		especialista,
		persona: persona.map(PersonaResponse::from),
	})
}

pub async fn delete(state: &AppState, id: Uuid) -> Result<()> {
	let mut tx = state.store.begin().await?;
	let especialista = tx.especialista(id).await?.ok_or_else(not_found)?;
	if !tx.soft_delete_especialista(id, Utc::now()).await? {
		return Err(not_found());
	}
	retire_persona(tx.as_mut(), especialista.persona_id).await?;
	tx.commit().await?;

	tracing::info!(especialista_id = %id, "specialist deleted");
	Ok(())
}
