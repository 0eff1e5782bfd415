//! Storage engine abstraction
//!
//! A [`Store`] opens all-or-nothing units of work. Everything written through a
//! [`StoreTx`] becomes visible only after [`StoreTx::commit`]; dropping the
//! transaction discards it. Read accessors never return soft-deleted rows.
//!
//! Implementations must enforce the same constraints as the relational schema:
//! unique username/email/national id among live rows, one persona per
//! role record, one clinical history per patient, existing foreign keys, and
//! the appointment slot index (no two live, non-cancelled appointments share
//! specialist, date and time).

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use uuid::Uuid;

use crate::apps::citas::models::Cita;
use crate::apps::especialistas::models::Especialista;
use crate::apps::historias::models::HistoriaClinica;
use crate::apps::pacientes::models::Paciente;
use crate::apps::personas::models::Persona;
use crate::apps::registros::models::RegistroClinico;
use crate::core::error::Result;

/// Transactional storage engine
#[async_trait]
pub trait Store: Send + Sync {
	/// Open a new unit of work.
	async fn begin(&self) -> Result<Box<dyn StoreTx>>;
}

/// One unit of work against the store
#[async_trait]
pub trait StoreTx: Send {
	/// Make every change of this unit of work durable.
	async fn commit(self: Box<Self>) -> Result<()>;

	// personas
	async fn insert_persona(&mut self, persona: &Persona) -> Result<()>;
	async fn persona(&mut self, id: Uuid) -> Result<Option<Persona>>;
	async fn persona_by_email(&mut self, email: &str) -> Result<Option<Persona>>;
	async fn update_persona(&mut self, persona: &Persona) -> Result<()>;
	/// Returns `false` when no live persona had that id.
	async fn soft_delete_persona(&mut self, id: Uuid, at: DateTime<Utc>) -> Result<bool>;

	// pacientes
	async fn insert_paciente(&mut self, paciente: &Paciente) -> Result<()>;
	async fn paciente(&mut self, id: Uuid) -> Result<Option<Paciente>>;
	async fn paciente_by_persona(&mut self, persona_id: Uuid) -> Result<Option<Paciente>>;
	async fn pacientes(&mut self) -> Result<Vec<Paciente>>;
	async fn update_paciente(&mut self, paciente: &Paciente) -> Result<()>;
	async fn soft_delete_paciente(&mut self, id: Uuid, at: DateTime<Utc>) -> Result<bool>;

	// especialistas
	async fn insert_especialista(&mut self, especialista: &Especialista) -> Result<()>;
	async fn especialista(&mut self, id: Uuid) -> Result<Option<Especialista>>;
	async fn especialista_by_persona(&mut self, persona_id: Uuid) -> Result<Option<Especialista>>;
	async fn especialistas(&mut self) -> Result<Vec<Especialista>>;
	async fn update_especialista(&mut self, especialista: &Especialista) -> Result<()>;
	async fn soft_delete_especialista(&mut self, id: Uuid, at: DateTime<Utc>) -> Result<bool>;

	// historias clinicas
	async fn insert_historia(&mut self, historia: &HistoriaClinica) -> Result<()>;
	async fn historia(&mut self, id: Uuid) -> Result<Option<HistoriaClinica>>;
	async fn historia_by_paciente(&mut self, patient_id: Uuid) -> Result<Option<HistoriaClinica>>;
	async fn historias(&mut self) -> Result<Vec<HistoriaClinica>>;
	async fn update_historia(&mut self, historia: &HistoriaClinica) -> Result<()>;
	/// Physically removes the history together with its records.
	async fn delete_historia(&mut self, id: Uuid) -> Result<bool>;

	// registros clinicos
	async fn insert_registro(&mut self, registro: &RegistroClinico) -> Result<()>;
	async fn registro(&mut self, id: Uuid) -> Result<Option<RegistroClinico>>;
	async fn registros(&mut self) -> Result<Vec<RegistroClinico>>;
	/// Records of one history, newest first.
	async fn registros_by_historia(&mut self, history_id: Uuid) -> Result<Vec<RegistroClinico>>;
	async fn update_registro(&mut self, registro: &RegistroClinico) -> Result<()>;
	async fn soft_delete_registro(&mut self, id: Uuid, at: DateTime<Utc>) -> Result<bool>;

	// citas
	async fn insert_cita(&mut self, cita: &Cita) -> Result<()>;
	async fn cita(&mut self, id: Uuid) -> Result<Option<Cita>>;
	async fn citas(&mut self) -> Result<Vec<Cita>>;
	async fn citas_by_paciente(&mut self, patient_id: Uuid) -> Result<Vec<Cita>>;
	async fn citas_by_especialista(&mut self, specialist_id: Uuid) -> Result<Vec<Cita>>;
	/// A live, non-cancelled appointment holding the slot, other than `exclude`.
	async fn conflicting_cita(
		&mut self,
		specialist_id: Uuid,
		date: NaiveDate,
		time: NaiveTime,
		exclude: Option<Uuid>,
	) -> Result<Option<Cita>>;
	async fn update_cita(&mut self, cita: &Cita) -> Result<()>;
	async fn soft_delete_cita(&mut self, id: Uuid, at: DateTime<Utc>) -> Result<bool>;
}
