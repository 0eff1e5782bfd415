use chrono::Utc;
use uuid::Uuid;

use super::models::HistoriaClinica;
use super::serializers::{CreateHistoriaRequest, HistoriaDetalle, UpdateHistoriaRequest};
use crate::core::error::{Error, Result, conflict_message};
use crate::db::StoreTx;
use crate::state::AppState;

fn not_found() -> Error {
	Error::NotFound("Clinical history not found".to_string())
}

async fn detalle(tx: &mut dyn StoreTx, historia: HistoriaClinica) -> Result<HistoriaDetalle> {
	let paciente = tx.paciente(historia.patient_id).await?;
	let registros_clinicos = tx.registros_by_historia(historia.id).await?;
	Ok(HistoriaDetalle {
		historia,
		paciente,
		registros_clinicos,
	})
}

/// First one wins: a patient with a history gets `Conflict`.
pub async fn create(state: &AppState, request: CreateHistoriaRequest) -> Result<HistoriaClinica> {
	let mut tx = state.store.begin().await?;
	if tx.paciente(request.patient_id).await?.is_none() {
		return Err(Error::NotFound("Patient not found".to_string()));
	}
	if tx.historia_by_paciente(request.patient_id).await?.is_some() {
		return Err(Error::Conflict(conflict_message(Some(
			"historias_clinicas_patient_unique",
		))));
	}

	let now = Utc::now();
	let historia = HistoriaClinica {
		id: Uuid::new_v4(),
		patient_id: request.patient_id,
		age: request.age,
		sex: request.sex,
		race: request.race,
		address: request.address,
		conditions: request.conditions,
		background: request.background,
		created_at: now,
		updated_at: now,
	};
	tx.insert_historia(&historia).await?;
	tx.commit().await?;

	tracing::info!(historia_id = %historia.id, patient_id = %historia.patient_id, "clinical history opened");
	Ok(historia)
}

pub async fn get(state: &AppState, id: Uuid) -> Result<HistoriaDetalle> {
	let mut tx = state.store.begin().await?;
	let historia = tx.historia(id).await?.ok_or_else(not_found)?;
	detalle(tx.as_mut(), historia).await
}

pub async fn get_by_patient(state: &AppState, patient_id: Uuid) -> Result<HistoriaDetalle> {
	let mut tx = state.store.begin().await?;
	let historia = tx
		.historia_by_paciente(patient_id)
		.await?
		.ok_or_else(|| Error::NotFound("This patient has no clinical history".to_string()))?;
	detalle(tx.as_mut(), historia).await
}

pub async fn list(state: &AppState) -> Result<Vec<HistoriaDetalle>> {
	let mut tx = state.store.begin().await?;
	let historias = tx.historias().await?;
	let mut out = Vec::with_capacity(historias.len());
	for historia in historias {
		out.push(detalle(tx.as_mut(), historia).await?);
	}
	Ok(out)
}

pub async fn update(
	state: &AppState,
	id: Uuid,
	request: UpdateHistoriaRequest,
) -> Result<HistoriaClinica> {
	let mut tx = state.store.begin().await?;
	let mut historia = tx.historia(id).await?.ok_or_else(not_found)?;

	if let Some(age) = request.age {
		historia.age = age;
	}
	if let Some(sex) = request.sex {
		historia.sex = sex;
	}
	if request.race.is_some() {
		historia.race = request.race;
	}
	if request.address.is_some() {
		historia.address = request.address;
	}
	if request.conditions.is_some() {
		historia.conditions = request.conditions;
	}
	if request.background.is_some() {
		historia.background = request.background;
	}
	historia.updated_at = Utc::now();
	tx.update_historia(&historia).await?;
	tx.commit().await?;

	tracing::info!(historia_id = %id, "clinical history updated");
	Ok(historia)
}

/// Removes the history and its records for good.
pub async fn delete(state: &AppState, id: Uuid) -> Result<()> {
	let mut tx = state.store.begin().await?;
	if !tx.delete_historia(id).await? {
		return Err(not_found());
	}
	tx.commit().await?;
	tracing::info!(historia_id = %id, "clinical history deleted");
	Ok(())
}
