//! Appointment scheduler
//!
//! A specialist holds at most one live, non-cancelled appointment per
//! (date, time). Every check-then-write runs in one unit of work; on
//! PostgreSQL the partial unique index `citas_agenda_unica` backs the
//! application check against concurrent inserts.

use chrono::{NaiveDate, NaiveTime, Utc};
use uuid::Uuid;

use super::models::{Cita, CitaStatus};
use super::serializers::{CitaDetalle, CreateCitaRequest, UpdateCitaRequest};
use crate::apps::especialistas::service as especialistas;
use crate::apps::pacientes::service as pacientes;
use crate::core::error::{Error, Result, conflict_message};
use crate::core::validators::{parse_date, parse_time};
use crate::db::StoreTx;
use crate::state::AppState;

fn not_found() -> Error {
	Error::NotFound("Appointment not found".to_string())
}

fn schedule_conflict() -> Error {
	Error::Conflict(conflict_message(Some("citas_agenda_unica")))
}

async fn ensure_participants(
	tx: &mut dyn StoreTx,
	patient_id: Option<Uuid>,
	specialist_id: Option<Uuid>,
) -> Result<()> {
	if let Some(id) = patient_id {
		if tx.paciente(id).await?.is_none() {
			return Err(Error::NotFound("Patient not found".to_string()));
		}
	}
	if let Some(id) = specialist_id {
		if tx.especialista(id).await?.is_none() {
			return Err(Error::NotFound("Specialist not found".to_string()));
		}
	}
	Ok(())
}

async fn ensure_slot_free(
	tx: &mut dyn StoreTx,
	specialist_id: Uuid,
	date: NaiveDate,
	time: NaiveTime,
	exclude: Option<Uuid>,
) -> Result<()> {
	if let Some(existing) = tx
		.conflicting_cita(specialist_id, date, time, exclude)
		.await?
	{
		tracing::info!(
			%specialist_id, %date, %time, existing = %existing.id,
			"appointment slot already taken"
		);
		return Err(schedule_conflict());
	}
	Ok(())
}

pub async fn create(state: &AppState, request: CreateCitaRequest) -> Result<Cita> {
	let date = parse_date(&request.date)?;
	let time = parse_time(&request.time)?;
	let status = match request.status.as_deref() {
		Some(raw) => raw.parse::<CitaStatus>()?,
		None => CitaStatus::Pending,
	};

	let mut tx = state.store.begin().await?;
	ensure_participants(
		tx.as_mut(),
		Some(request.patient_id),
		Some(request.specialist_id),
	)
	.await?;
	if status.holds_slot() {
		ensure_slot_free(tx.as_mut(), request.specialist_id, date, time, None).await?;
	}

	let now = Utc::now();
	let cita = Cita {
		id: Uuid::new_v4(),
		date,
		time,
		status,
		patient_id: request.patient_id,
		specialist_id: request.specialist_id,
		created_at: now,
		updated_at: now,
		deleted_at: None,
	};
	tx.insert_cita(&cita).await?;
	tx.commit().await?;

	tracing::info!(cita_id = %cita.id, specialist_id = %cita.specialist_id, %date, %time, "appointment booked");
	Ok(cita)
}

/// Merge `request` into the stored appointment.
///
/// A status equal to the current one is a no-op here; any other status
/// change must be an allowed transition. Completion is only reachable
/// through [`complete`], whose route is restricted to specialists.
pub async fn update(state: &AppState, id: Uuid, request: UpdateCitaRequest) -> Result<Cita> {
	let date = request.date.as_deref().map(parse_date).transpose()?;
	let time = request.time.as_deref().map(parse_time).transpose()?;
	let status = request
		.status
		.as_deref()
		.map(str::parse::<CitaStatus>)
		.transpose()?;

	let mut tx = state.store.begin().await?;
	let mut cita = tx.cita(id).await?.ok_or_else(not_found)?;
	ensure_participants(tx.as_mut(), request.patient_id, request.specialist_id).await?;

	if let Some(next) = status {
		if next == CitaStatus::Completed && cita.status != CitaStatus::Completed {
			return Err(Error::Forbidden(
				"Appointments are completed through PATCH /citas/{id}/completar".to_string(),
			));
		}
		if next != cita.status && !cita.status.can_transition_to(next) {
			return Err(Error::Conflict(format!(
				"Cannot change appointment status from {} to {}",
				cita.status, next
			)));
		}
		cita.status = next;
	}
	if let Some(date) = date {
		cita.date = date;
	}
	if let Some(time) = time {
		cita.time = time;
	}
	if let Some(patient_id) = request.patient_id {
		cita.patient_id = patient_id;
	}
	if let Some(specialist_id) = request.specialist_id {
		cita.specialist_id = specialist_id;
	}

	if cita.status.holds_slot() {
		ensure_slot_free(tx.as_mut(), cita.specialist_id, cita.date, cita.time, Some(id)).await?;
	}

	cita.updated_at = Utc::now();
	tx.update_cita(&cita).await?;
	tx.commit().await?;

	tracing::info!(cita_id = %id, status = %cita.status, "appointment updated");
	Ok(cita)
}

async fn transition(state: &AppState, id: Uuid, next: CitaStatus) -> Result<Cita> {
	let mut tx = state.store.begin().await?;
	let mut cita = tx.cita(id).await?.ok_or_else(not_found)?;
	if !cita.status.can_transition_to(next) {
		return Err(Error::Conflict(format!(
			"Cannot change appointment status from {} to {}",
			cita.status, next
		)));
	}
	cita.status = next;
	cita.updated_at = Utc::now();
	tx.update_cita(&cita).await?;
	tx.commit().await?;

	tracing::info!(cita_id = %id, status = %next, "appointment status changed");
	Ok(cita)
}

/// `pending -> completed`
pub async fn complete(state: &AppState, id: Uuid) -> Result<Cita> {
	transition(state, id, CitaStatus::Completed).await
}

/// `pending | completed -> cancelled`; frees the slot
pub async fn cancel(state: &AppState, id: Uuid) -> Result<Cita> {
	transition(state, id, CitaStatus::Cancelled).await
}

pub async fn delete(state: &AppState, id: Uuid) -> Result<()> {
	let mut tx = state.store.begin().await?;
	if !tx.soft_delete_cita(id, Utc::now()).await? {
		return Err(not_found());
	}
	tx.commit().await?;
	tracing::info!(cita_id = %id, "appointment deleted");
	Ok(())
}

#[derive(Clone, Copy)]
struct Include {
	paciente: bool,
	especialista: bool,
}

const BOTH: Include = Include {
	paciente: true,
	especialista: true,
};

async fn detalle(tx: &mut dyn StoreTx, cita: Cita, include: Include) -> Result<CitaDetalle> {
	let mut paciente = None;
	if include.paciente {
		if let Some(p) = tx.paciente(cita.patient_id).await? {
			paciente = Some(pacientes::with_persona(tx, p).await?);
		}
	}
	let mut especialista = None;
	if include.especialista {
		if let Some(e) = tx.especialista(cita.specialist_id).await? {
			especialista = Some(especialistas::with_persona(tx, e).await?);
		}
	}
	Ok(CitaDetalle {
		cita,
		paciente,
		especialista,
	})
}

async fn detalles(
	tx: &mut dyn StoreTx,
	citas: Vec<Cita>,
	include: Include,
) -> Result<Vec<CitaDetalle>> {
	let mut out = Vec::with_capacity(citas.len());
	for cita in citas {
		out.push(detalle(tx, cita, include).await?);
	}
	Ok(out)
}

pub async fn get(state: &AppState, id: Uuid) -> Result<CitaDetalle> {
	let mut tx = state.store.begin().await?;
	let cita = tx.cita(id).await?.ok_or_else(not_found)?;
	detalle(tx.as_mut(), cita, BOTH).await
}

pub async fn list(state: &AppState) -> Result<Vec<CitaDetalle>> {
	let mut tx = state.store.begin().await?;
	let citas = tx.citas().await?;
	detalles(tx.as_mut(), citas, BOTH).await
}

/// A patient's appointments, each with its specialist.
pub async fn list_by_patient(state: &AppState, patient_id: Uuid) -> Result<Vec<CitaDetalle>> {
	let mut tx = state.store.begin().await?;
	ensure_participants(tx.as_mut(), Some(patient_id), None).await?;
	let citas = tx.citas_by_paciente(patient_id).await?;
	let include = Include {
		paciente: false,
		especialista: true,
	};
	detalles(tx.as_mut(), citas, include).await
}

/// A specialist's appointments, each with its patient.
pub async fn list_by_specialist(
	state: &AppState,
	specialist_id: Uuid,
) -> Result<Vec<CitaDetalle>> {
	let mut tx = state.store.begin().await?;
	ensure_participants(tx.as_mut(), None, Some(specialist_id)).await?;
	let citas = tx.citas_by_especialista(specialist_id).await?;
	let include = Include {
		paciente: true,
		especialista: false,
	};
	detalles(tx.as_mut(), citas, include).await
}
