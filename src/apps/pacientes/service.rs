//! Patient registration and maintenance
//!
//! The persona and its paciente row are always written in the same unit of
//! work, so a failure on either leaves no trace of the other.

use chrono::Utc;
use uuid::Uuid;

use super::models::Paciente;
use super::serializers::{CreatePacienteRequest, PacienteResponse, UpdatePacienteRequest};
use crate::apps::personas::models::Role;
use crate::apps::personas::serializers::PersonaResponse;
use crate::apps::personas::service::{PersonaPatch, new_persona, patch_persona, retire_persona};
use crate::core::error::{Error, Result};
use crate::core::gate::AuthUser;
use crate::db::StoreTx;
use crate::state::AppState;

fn not_found() -> Error {
	Error::NotFound("Patient not found".to_string())
}

/// Attach the persona's public fields to `paciente`.
pub async fn with_persona(tx: &mut dyn StoreTx, paciente: Paciente) -> Result<PacienteResponse> {
	let persona = tx.persona(paciente.persona_id).await?;
	Ok(PacienteResponse {
		paciente,
		persona: persona.map(PersonaResponse::from),
	})
}

pub async fn create(state: &AppState, request: CreatePacienteRequest) -> Result<PacienteResponse> {
	let persona = new_persona(
		state,
		request.username,
		request.email,
		request.password,
		Role::Patient,
	)
	.await?;
	let paciente = Paciente::new(
		persona.id,
		request.first_name,
		request.last_name,
		request.phone,
		request.national_id,
	);

	let mut tx = state.store.begin().await?;
	tx.insert_persona(&persona).await?;
	tx.insert_paciente(&paciente).await?;
	tx.commit().await?;

	tracing::info!(paciente_id = %paciente.id, persona_id = %persona.id, "patient registered");
	Ok(PacienteResponse {
		paciente,
		persona: Some(PersonaResponse::from(persona)),
	})
}

pub async fn get(state: &AppState, id: Uuid) -> Result<PacienteResponse> {
	let mut tx = state.store.begin().await?;
	let paciente = tx.paciente(id).await?.ok_or_else(not_found)?;
	with_persona(tx.as_mut(), paciente).await
}

pub async fn list(state: &AppState) -> Result<Vec<PacienteResponse>> {
	let mut tx = state.store.begin().await?;
	let pacientes = tx.pacientes().await?;
	let mut out = Vec::with_capacity(pacientes.len());
	for paciente in pacientes {
		out.push(with_persona(tx.as_mut(), paciente).await?);
	}
	Ok(out)
}

/// Update own fields and persona fields together.
///
/// Patients may only update their own record.
pub async fn update(
	state: &AppState,
	requester: &AuthUser,
	id: Uuid,
	request: UpdatePacienteRequest,
) -> Result<PacienteResponse> {
	let UpdatePacienteRequest {
		username,
		email,
		password,
		first_name,
		last_name,
		phone,
		national_id,
	} = request;
	let patch = PersonaPatch::prepare(state, username, email, password).await?;

	let mut tx = state.store.begin().await?;
	let mut paciente = tx.paciente(id).await?.ok_or_else(not_found)?;
	if !requester.is_admin() && paciente.persona_id != requester.persona_id {
		return Err(Error::Forbidden(
			"You can only update your own patient record".to_string(),
		));
	}

	if let Some(first_name) = first_name {
		paciente.first_name = first_name;
	}
	if let Some(last_name) = last_name {
		paciente.last_name = last_name;
	}
	if let Some(phone) = phone {
		paciente.phone = phone;
	}
	if let Some(national_id) = national_id {
		paciente.national_id = national_id;
	}
	paciente.updated_at = Utc::now();
	tx.update_paciente(&paciente).await?;

	let persona = patch_persona(tx.as_mut(), paciente.persona_id, patch).await?;
	tx.commit().await?;

	tracing::info!(paciente_id = %paciente.id, "patient updated");
	Ok(PacienteResponse {
		paciente,
		persona: persona.map(PersonaResponse::from),
	})
}

/// Soft-delete the patient, then its persona.
pub async fn delete(state: &AppState, id: Uuid) -> Result<()> {
	let mut tx = state.store.begin().await?;
	let paciente = tx.paciente(id).await?.ok_or_else(not_found)?;
	let now = Utc::now();
	if !tx.soft_delete_paciente(id, now).await? {
		return Err(not_found());
	}
	retire_persona(tx.as_mut(), paciente.persona_id).await?;
	tx.commit().await?;

	tracing::info!(paciente_id = %id, "patient deleted");
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::config::settings::Settings;
	use crate::db::{MemoryStore, Store, Table};
	use rstest::*;
	use std::sync::Arc;

	fn state_with(store: MemoryStore) -> AppState {
		let mut settings = Settings::default();
		settings.auth.argon2_memory_kib = 1024;
		settings.auth.argon2_iterations = 1;
		AppState::new(settings, Arc::new(store) as Arc<dyn Store>).unwrap()
	}

	fn request(username: &str, email: &str, national_id: &str) -> CreatePacienteRequest {
		CreatePacienteRequest {
			username: username.into(),
			email: email.into(),
			password: "secret1".into(),
			first_name: "Ana".into(),
			last_name: "Perez".into(),
			phone: "+5312345678".into(),
			national_id: national_id.into(),
		}
	}

	fn as_user(response: &PacienteResponse) -> AuthUser {
		AuthUser {
			persona_id: response.paciente.persona_id,
			email: "ignored@clinic.test".into(),
			role: Role::Patient,
		}
	}

	#[rstest]
	#[tokio::test]
	async fn test_create_forces_patient_role() {
		let state = state_with(MemoryStore::new());
		let created = create(&state, request("ana", "ana@clinic.test", "85010112345"))
			.await
			.unwrap();

		let persona = created.persona.unwrap();
		assert_eq!(persona.role, Role::Patient);
		assert_eq!(persona.id, created.paciente.persona_id);
	}

	#[rstest]
	#[tokio::test]
	async fn test_failed_second_insert_leaves_nothing() {
		let store = MemoryStore::new();
		store.fail_inserts_into(Table::Pacientes);
		let state = state_with(store.clone());

		let err = create(&state, request("ana", "ana@clinic.test", "85010112345"))
			.await
			.unwrap_err();
		assert!(matches!(err, Error::Database(_)));
		assert_eq!(store.row_count(Table::Personas).await, 0);
		assert_eq!(store.row_count(Table::Pacientes).await, 0);
	}

	#[rstest]
	#[case("ana", "other@clinic.test", "99999999999")]
	#[case("other", "ana@clinic.test", "99999999999")]
	#[case("other", "other@clinic.test", "85010112345")]
	#[tokio::test]
	async fn test_duplicates_conflict(
		#[case] username: &str,
		#[case] email: &str,
		#[case] national_id: &str,
	) {
		let store = MemoryStore::new();
		let state = state_with(store.clone());
		create(&state, request("ana", "ana@clinic.test", "85010112345"))
			.await
			.unwrap();

		let err = create(&state, request(username, email, national_id))
			.await
			.unwrap_err();
		assert!(matches!(err, Error::Conflict(_)));
		assert_eq!(store.row_count(Table::Personas).await, 1);
	}

	#[rstest]
	#[tokio::test]
	async fn test_update_touches_both_rows() {
		let state = state_with(MemoryStore::new());
		let created = create(&state, request("ana", "ana@clinic.test", "85010112345"))
			.await
			.unwrap();

		let updated = update(
			&state,
			&as_user(&created),
			created.paciente.id,
			UpdatePacienteRequest {
				phone: Some("5551234567".into()),
				email: Some("ana.perez@clinic.test".into()),
				..Default::default()
			},
		)
		.await
		.unwrap();

		assert_eq!(updated.paciente.phone, "5551234567");
		assert_eq!(updated.persona.unwrap().email, "ana.perez@clinic.test");
	}

	#[rstest]
	#[tokio::test]
	async fn test_patient_cannot_update_someone_else() {
		let state = state_with(MemoryStore::new());
		let ana = create(&state, request("ana", "ana@clinic.test", "85010112345"))
			.await
			.unwrap();
		let bob = create(&state, request("bob", "bob@clinic.test", "85010154321"))
			.await
			.unwrap();

		let err = update(
			&state,
			&as_user(&bob),
			ana.paciente.id,
			UpdatePacienteRequest::default(),
		)
		.await
		.unwrap_err();
		assert!(matches!(err, Error::Forbidden(_)));
	}

	#[rstest]
	#[tokio::test]
	async fn test_delete_retires_persona_and_tolerates_missing_one() {
		let state = state_with(MemoryStore::new());
		let created = create(&state, request("ana", "ana@clinic.test", "85010112345"))
			.await
			.unwrap();

		// persona removed out of band
		let mut tx = state.store.begin().await.unwrap();
		tx.soft_delete_persona(created.paciente.persona_id, Utc::now())
			.await
			.unwrap();
		tx.commit().await.unwrap();

		delete(&state, created.paciente.id).await.unwrap();
		let err = get(&state, created.paciente.id).await.unwrap_err();
		assert!(matches!(err, Error::NotFound(_)));
		let err = delete(&state, created.paciente.id).await.unwrap_err();
		assert!(matches!(err, Error::NotFound(_)));
	}
}
