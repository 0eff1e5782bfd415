//! Clinical record ownership
//!
//! Only the specialist who authored a record, or an administrator, may edit
//! or delete it. The requester's specialist profile is resolved from the
//! persona id carried in the access token.

use chrono::Utc;
use uuid::Uuid;

use super::models::RegistroClinico;
use super::serializers::{CreateRegistroRequest, UpdateRegistroRequest};
use crate::core::error::{Error, Result};
use crate::core::gate::AuthUser;
use crate::db::StoreTx;
use crate::state::AppState;

fn not_found() -> Error {
	Error::NotFound("Clinical record not found".to_string())
}

/// Fails with `Forbidden` unless `requester` may modify `registro`.
async fn ensure_owner(
	tx: &mut dyn StoreTx,
	requester: &AuthUser,
	registro: &RegistroClinico,
) -> Result<()> {
	if requester.is_admin() {
		return Ok(());
	}
	let author = tx.especialista_by_persona(requester.persona_id).await?;
	match author {
		Some(especialista) if especialista.id == registro.specialist_id => Ok(()),
		_ => {
			tracing::info!(
				registro_id = %registro.id,
				persona_id = %requester.persona_id,
				"clinical record change refused: not the author"
			);
			Err(Error::Forbidden(
				"Only the author of a clinical record may modify it".to_string(),
			))
		}
	}
}

pub async fn create(
	state: &AppState,
	requester: &AuthUser,
	request: CreateRegistroRequest,
) -> Result<RegistroClinico> {
	let mut tx = state.store.begin().await?;
	if tx.historia(request.history_id).await?.is_none() {
		return Err(Error::NotFound("Clinical history not found".to_string()));
	}
	let specialist_id = match request.specialist_id {
		Some(id) => tx.especialista(id).await?.map(|e| e.id),
		None => tx
			.especialista_by_persona(requester.persona_id)
			.await?
			.map(|e| e.id),
	}
	.ok_or_else(|| Error::NotFound("Specialist not found".to_string()))?;

	let now = Utc::now();
	let registro = RegistroClinico {
		id: Uuid::new_v4(),
		history_id: request.history_id,
		specialist_id,
		diagnosis: request.diagnosis,
		treatment: request.treatment,
		observations: request.observations,
		created_at: now,
		updated_at: now,
		deleted_at: None,
	};
	tx.insert_registro(&registro).await?;
	tx.commit().await?;

	tracing::info!(registro_id = %registro.id, history_id = %registro.history_id, "clinical record added");
	Ok(registro)
}

pub async fn update(
	state: &AppState,
	requester: &AuthUser,
	id: Uuid,
	request: UpdateRegistroRequest,
) -> Result<RegistroClinico> {
	let mut tx = state.store.begin().await?;
	let mut registro = tx.registro(id).await?.ok_or_else(not_found)?;
	ensure_owner(tx.as_mut(), requester, &registro).await?;

	if let Some(diagnosis) = request.diagnosis {
		registro.diagnosis = diagnosis;
	}
	if request.treatment.is_some() {
		registro.treatment = request.treatment;
	}
	if request.observations.is_some() {
		registro.observations = request.observations;
	}
	registro.updated_at = Utc::now();
	tx.update_registro(&registro).await?;
	tx.commit().await?;

	tracing::info!(registro_id = %id, "clinical record updated");
	Ok(registro)
}

pub async fn delete(state: &AppState, requester: &AuthUser, id: Uuid) -> Result<()> {
	let mut tx = state.store.begin().await?;
	let registro = tx.registro(id).await?.ok_or_else(not_found)?;
	ensure_owner(tx.as_mut(), requester, &registro).await?;

	if !tx.soft_delete_registro(id, Utc::now()).await? {
		return Err(not_found());
	}
	tx.commit().await?;

	tracing::info!(registro_id = %id, "clinical record deleted");
	Ok(())
}

pub async fn get(state: &AppState, id: Uuid) -> Result<RegistroClinico> {
	let mut tx = state.store.begin().await?;
	tx.registro(id).await?.ok_or_else(not_found)
}

pub async fn list(state: &AppState) -> Result<Vec<RegistroClinico>> {
	let mut tx = state.store.begin().await?;
	tx.registros().await
}

/// Records of one history, newest first.
pub async fn list_by_history(state: &AppState, history_id: Uuid) -> Result<Vec<RegistroClinico>> {
	let mut tx = state.store.begin().await?;
	if tx.historia(history_id).await?.is_none() {
		return Err(Error::NotFound("Clinical history not found".to_string()));
	}
	tx.registros_by_historia(history_id).await
}
