//! In-memory storage engine
//!
//! Units of work are serialized by an owned async mutex. Each transaction
//! works on a private copy of the tables and swaps it in on commit, so a
//! dropped transaction leaves no trace. The relational constraints of the
//! PostgreSQL schema are enforced here as well.
//!
//! Failures can be injected per table with [`MemoryStore::fail_inserts_into`],
//! which is how the atomicity of multi-row writes is exercised in tests.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use uuid::Uuid;

use crate::apps::citas::models::Cita;
use crate::apps::especialistas::models::Especialista;
use crate::apps::historias::models::HistoriaClinica;
use crate::apps::pacientes::models::Paciente;
use crate::apps::personas::models::Persona;
use crate::apps::registros::models::RegistroClinico;
use crate::core::error::{Error, Result, conflict_message};
use crate::db::store::{Store, StoreTx};

/// Table names, used for failure injection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
	Personas,
	Pacientes,
	Especialistas,
	HistoriasClinicas,
	RegistrosClinicos,
	Citas,
}

#[derive(Debug, Clone, Default)]
struct Tables {
	personas: HashMap<Uuid, Persona>,
	pacientes: HashMap<Uuid, Paciente>,
	especialistas: HashMap<Uuid, Especialista>,
	historias: HashMap<Uuid, HistoriaClinica>,
	registros: HashMap<Uuid, RegistroClinico>,
	citas: HashMap<Uuid, Cita>,
}

/// Process-local store
#[derive(Clone, Default)]
pub struct MemoryStore {
	tables: Arc<AsyncMutex<Tables>>,
	faults: Arc<Mutex<HashSet<Table>>>,
}

impl MemoryStore {
	pub fn new() -> Self {
		Self::default()
	}

	/// Make every subsequent insert into `table` fail with a database error.
	pub fn fail_inserts_into(&self, table: Table) {
		self.faults.lock().insert(table);
	}

	/// Undo every injected failure.
	pub fn clear_faults(&self) {
		self.faults.lock().clear();
	}

	/// Row counts including soft-deleted rows.
	pub async fn row_count(&self, table: Table) -> usize {
		let tables = self.tables.lock().await;
		match table {
			Table::Personas => tables.personas.len(),
			Table::Pacientes => tables.pacientes.len(),
			Table::Especialistas => tables.especialistas.len(),
			Table::HistoriasClinicas => tables.historias.len(),
			Table::RegistrosClinicos => tables.registros.len(),
			Table::Citas => tables.citas.len(),
		}
	}
}

#[async_trait]
impl Store for MemoryStore {
	async fn begin(&self) -> Result<Box<dyn StoreTx>> {
		let guard = self.tables.clone().lock_owned().await;
		let working = guard.clone();
		Ok(Box::new(MemoryTx {
			guard,
			working,
			faults: self.faults.clone(),
		}))
	}
}

struct MemoryTx {
	guard: OwnedMutexGuard<Tables>,
	working: Tables,
	faults: Arc<Mutex<HashSet<Table>>>,
}

impl MemoryTx {
	fn check_fault(&self, table: Table) -> Result<()> {
		if self.faults.lock().contains(&table) {
			return Err(Error::Database(format!("injected failure on {:?}", table)));
		}
		Ok(())
	}

	fn live_persona(&self, id: Uuid) -> bool {
		self.working
			.personas
			.get(&id)
			.is_some_and(|p| p.deleted_at.is_none())
	}

	fn live_paciente(&self, id: Uuid) -> bool {
		self.working
			.pacientes
			.get(&id)
			.is_some_and(|p| p.deleted_at.is_none())
	}

	fn live_especialista(&self, id: Uuid) -> bool {
		self.working
			.especialistas
			.get(&id)
			.is_some_and(|e| e.deleted_at.is_none())
	}

	fn check_persona_unique(&self, persona: &Persona) -> Result<()> {
		for other in self.working.personas.values() {
			if other.id == persona.id || other.deleted_at.is_some() {
				continue;
			}
			if other.username == persona.username {
				return Err(Error::Conflict(conflict_message(Some(
					"personas_username_unique",
				))));
			}
			if other.email == persona.email {
				return Err(Error::Conflict(conflict_message(Some(
					"personas_email_unique",
				))));
			}
		}
		Ok(())
	}

	fn check_paciente(&self, paciente: &Paciente) -> Result<()> {
		if !self.live_persona(paciente.persona_id) {
			return Err(missing_reference());
		}
		for other in self.working.pacientes.values() {
			if other.id == paciente.id || other.deleted_at.is_some() {
				continue;
			}
			if other.persona_id == paciente.persona_id {
				return Err(Error::Conflict(conflict_message(None)));
			}
			if other.national_id == paciente.national_id {
				return Err(Error::Conflict(conflict_message(Some(
					"pacientes_national_id_unique",
				))));
			}
		}
		Ok(())
	}

	fn check_especialista(&self, especialista: &Especialista) -> Result<()> {
		if !self.live_persona(especialista.persona_id) {
			return Err(missing_reference());
		}
		let taken = self.working.especialistas.values().any(|other| {
			other.id != especialista.id
				&& other.deleted_at.is_none()
				&& other.persona_id == especialista.persona_id
		});
		if taken {
			return Err(Error::Conflict(conflict_message(None)));
		}
		Ok(())
	}

	fn check_cita(&self, cita: &Cita) -> Result<()> {
		if !self.live_paciente(cita.patient_id) || !self.live_especialista(cita.specialist_id) {
			return Err(missing_reference());
		}
		if self.working.citas.values().any(|other| cita.collides_with(other)) {
			return Err(Error::Conflict(conflict_message(Some("citas_agenda_unica"))));
		}
		Ok(())
	}
}

fn missing_reference() -> Error {
	Error::NotFound("Referenced entity not found".to_string())
}

fn live<T: Clone>(row: Option<&T>, deleted: impl Fn(&T) -> bool) -> Option<T> {
	row.filter(|r| !deleted(r)).cloned()
}

#[async_trait]
impl StoreTx for MemoryTx {
	async fn commit(self: Box<Self>) -> Result<()> {
		let MemoryTx {
			mut guard, working, ..
		} = *self;
		*guard = working;
		Ok(())
	}

	async fn insert_persona(&mut self, persona: &Persona) -> Result<()> {
		self.check_fault(Table::Personas)?;
		self.check_persona_unique(persona)?;
		self.working.personas.insert(persona.id, persona.clone());
		Ok(())
	}

	async fn persona(&mut self, id: Uuid) -> Result<Option<Persona>> {
		Ok(live(self.working.personas.get(&id), |p| p.deleted_at.is_some()))
	}

	async fn persona_by_email(&mut self, email: &str) -> Result<Option<Persona>> {
		Ok(self
			.working
			.personas
			.values()
			.find(|p| p.deleted_at.is_none() && p.email == email)
			.cloned())
	}

	async fn update_persona(&mut self, persona: &Persona) -> Result<()> {
		if !self.live_persona(persona.id) {
			return Err(Error::NotFound("Persona not found".to_string()));
		}
		self.check_persona_unique(persona)?;
		self.working.personas.insert(persona.id, persona.clone());
		Ok(())
	}

	async fn soft_delete_persona(&mut self, id: Uuid, at: DateTime<Utc>) -> Result<bool> {
		match self.working.personas.get_mut(&id) {
			Some(p) if p.deleted_at.is_none() => {
				p.deleted_at = Some(at);
				Ok(true)
			}
			_ => Ok(false),
		}
	}

	async fn insert_paciente(&mut self, paciente: &Paciente) -> Result<()> {
		self.check_fault(Table::Pacientes)?;
		self.check_paciente(paciente)?;
		self.working.pacientes.insert(paciente.id, paciente.clone());
		Ok(())
	}

	async fn paciente(&mut self, id: Uuid) -> Result<Option<Paciente>> {
		Ok(live(self.working.pacientes.get(&id), |p| p.deleted_at.is_some()))
	}

	async fn paciente_by_persona(&mut self, persona_id: Uuid) -> Result<Option<Paciente>> {
		Ok(self
			.working
			.pacientes
			.values()
			.find(|p| p.deleted_at.is_none() && p.persona_id == persona_id)
			.cloned())
	}

	async fn pacientes(&mut self) -> Result<Vec<Paciente>> {
		let mut rows: Vec<Paciente> = self
			.working
			.pacientes
			.values()
			.filter(|p| p.deleted_at.is_none())
			.cloned()
			.collect();
		rows.sort_by_key(|p| p.created_at);
		Ok(rows)
	}

	async fn update_paciente(&mut self, paciente: &Paciente) -> Result<()> {
		if !self.live_paciente(paciente.id) {
			return Err(Error::NotFound("Paciente not found".to_string()));
		}
		self.check_paciente(paciente)?;
		self.working.pacientes.insert(paciente.id, paciente.clone());
		Ok(())
	}

	async fn soft_delete_paciente(&mut self, id: Uuid, at: DateTime<Utc>) -> Result<bool> {
		match self.working.pacientes.get_mut(&id) {
			Some(p) if p.deleted_at.is_none() => {
				p.deleted_at = Some(at);
				Ok(true)
			}
			_ => Ok(false),
		}
	}

	async fn insert_especialista(&mut self, especialista: &Especialista) -> Result<()> {
		self.check_fault(Table::Especialistas)?;
		self.check_especialista(especialista)?;
		self.working
			.especialistas
			.insert(especialista.id, especialista.clone());
		Ok(())
	}

	async fn especialista(&mut self, id: Uuid) -> Result<Option<Especialista>> {
		Ok(live(self.working.especialistas.get(&id), |e| {
			e.deleted_at.is_some()
		}))
	}

	async fn especialista_by_persona(&mut self, persona_id: Uuid) -> Result<Option<Especialista>> {
		Ok(self
			.working
			.especialistas
			.values()
			.find(|e| e.deleted_at.is_none() && e.persona_id == persona_id)
			.cloned())
	}

	async fn especialistas(&mut self) -> Result<Vec<Especialista>> {
		let mut rows: Vec<Especialista> = self
			.working
			.especialistas
			.values()
			.filter(|e| e.deleted_at.is_none())
			.cloned()
			.collect();
		rows.sort_by_key(|e| e.created_at);
		Ok(rows)
	}

	async fn update_especialista(&mut self, especialista: &Especialista) -> Result<()> {
		if !self.live_especialista(especialista.id) {
			return Err(Error::NotFound("Especialista not found".to_string()));
		}
		self.check_especialista(especialista)?;
		self.working
			.especialistas
			.insert(especialista.id, especialista.clone());
		Ok(())
	}

	async fn soft_delete_especialista(&mut self, id: Uuid, at: DateTime<Utc>) -> Result<bool> {
		match self.working.especialistas.get_mut(&id) {
			Some(e) if e.deleted_at.is_none() => {
				e.deleted_at = Some(at);
				Ok(true)
			}
			_ => Ok(false),
		}
	}

	async fn insert_historia(&mut self, historia: &HistoriaClinica) -> Result<()> {
		self.check_fault(Table::HistoriasClinicas)?;
		if !self.live_paciente(historia.patient_id) {
			return Err(missing_reference());
		}
		if self
			.working
			.historias
			.values()
			.any(|h| h.patient_id == historia.patient_id)
		{
			return Err(Error::Conflict(conflict_message(Some(
				"historias_clinicas_patient_unique",
			))));
		}
		self.working.historias.insert(historia.id, historia.clone());
		Ok(())
	}

	async fn historia(&mut self, id: Uuid) -> Result<Option<HistoriaClinica>> {
		Ok(self.working.historias.get(&id).cloned())
	}

	async fn historia_by_paciente(&mut self, patient_id: Uuid) -> Result<Option<HistoriaClinica>> {
		Ok(self
			.working
			.historias
			.values()
			.find(|h| h.patient_id == patient_id)
			.cloned())
	}

	async fn historias(&mut self) -> Result<Vec<HistoriaClinica>> {
		let mut rows: Vec<HistoriaClinica> = self.working.historias.values().cloned().collect();
		rows.sort_by_key(|h| h.created_at);
		Ok(rows)
	}

	async fn update_historia(&mut self, historia: &HistoriaClinica) -> Result<()> {
		if !self.working.historias.contains_key(&historia.id) {
			return Err(Error::NotFound("Historia clinica not found".to_string()));
		}
		self.working.historias.insert(historia.id, historia.clone());
		Ok(())
	}

	async fn delete_historia(&mut self, id: Uuid) -> Result<bool> {
		if self.working.historias.remove(&id).is_none() {
			return Ok(false);
		}
		self.working.registros.retain(|_, r| r.history_id != id);
		Ok(true)
	}

	async fn insert_registro(&mut self, registro: &RegistroClinico) -> Result<()> {
		self.check_fault(Table::RegistrosClinicos)?;
		if !self.working.historias.contains_key(&registro.history_id)
			|| !self.live_especialista(registro.specialist_id)
		{
			return Err(missing_reference());
		}
		self.working.registros.insert(registro.id, registro.clone());
		Ok(())
	}

	async fn registro(&mut self, id: Uuid) -> Result<Option<RegistroClinico>> {
		Ok(live(self.working.registros.get(&id), |r| r.deleted_at.is_some()))
	}

	async fn registros(&mut self) -> Result<Vec<RegistroClinico>> {
		let mut rows: Vec<RegistroClinico> = self
			.working
			.registros
			.values()
			.filter(|r| r.deleted_at.is_none())
			.cloned()
			.collect();
		rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
		Ok(rows)
	}

	async fn registros_by_historia(&mut self, history_id: Uuid) -> Result<Vec<RegistroClinico>> {
		let mut rows: Vec<RegistroClinico> = self
			.working
			.registros
			.values()
			.filter(|r| r.deleted_at.is_none() && r.history_id == history_id)
			.cloned()
			.collect();
		rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
		Ok(rows)
	}

	async fn update_registro(&mut self, registro: &RegistroClinico) -> Result<()> {
		match self.working.registros.get_mut(&registro.id) {
			Some(existing) if existing.deleted_at.is_none() => {
				existing.diagnosis = registro.diagnosis.clone();
				existing.treatment = registro.treatment.clone();
				existing.observations = registro.observations.clone();
				existing.updated_at = registro.updated_at;
				Ok(())
			}
			_ => Err(Error::NotFound("Registro clinico not found".to_string())),
		}
	}

	async fn soft_delete_registro(&mut self, id: Uuid, at: DateTime<Utc>) -> Result<bool> {
		match self.working.registros.get_mut(&id) {
			Some(r) if r.deleted_at.is_none() => {
				r.deleted_at = Some(at);
				Ok(true)
			}
			_ => Ok(false),
		}
	}

	async fn insert_cita(&mut self, cita: &Cita) -> Result<()> {
		self.check_fault(Table::Citas)?;
		self.check_cita(cita)?;
		self.working.citas.insert(cita.id, cita.clone());
		Ok(())
	}

	async fn cita(&mut self, id: Uuid) -> Result<Option<Cita>> {
		Ok(live(self.working.citas.get(&id), |c| c.deleted_at.is_some()))
	}

	async fn citas(&mut self) -> Result<Vec<Cita>> {
		Ok(sorted_citas(
			self.working
				.citas
				.values()
				.filter(|c| c.deleted_at.is_none()),
		))
	}

	async fn citas_by_paciente(&mut self, patient_id: Uuid) -> Result<Vec<Cita>> {
		Ok(sorted_citas(self.working.citas.values().filter(|c| {
			c.deleted_at.is_none() && c.patient_id == patient_id
		})))
	}

	async fn citas_by_especialista(&mut self, specialist_id: Uuid) -> Result<Vec<Cita>> {
		Ok(sorted_citas(self.working.citas.values().filter(|c| {
			c.deleted_at.is_none() && c.specialist_id == specialist_id
		})))
	}

	async fn conflicting_cita(
		&mut self,
		specialist_id: Uuid,
		date: NaiveDate,
		time: NaiveTime,
		exclude: Option<Uuid>,
	) -> Result<Option<Cita>> {
		Ok(self
			.working
			.citas
			.values()
			.find(|c| {
				Some(c.id) != exclude
					&& c.deleted_at.is_none()
					&& c.status.holds_slot()
					&& c.specialist_id == specialist_id
					&& c.date == date
					&& c.time == time
			})
			.cloned())
	}

	async fn update_cita(&mut self, cita: &Cita) -> Result<()> {
		if self.cita(cita.id).await?.is_none() {
			return Err(Error::NotFound("Cita not found".to_string()));
		}
		self.check_cita(cita)?;
		self.working.citas.insert(cita.id, cita.clone());
		Ok(())
	}

	async fn soft_delete_cita(&mut self, id: Uuid, at: DateTime<Utc>) -> Result<bool> {
		match self.working.citas.get_mut(&id) {
			Some(c) if c.deleted_at.is_none() => {
				c.deleted_at = Some(at);
				Ok(true)
			}
			_ => Ok(false),
		}
	}
}

fn sorted_citas<'a>(rows: impl Iterator<Item = &'a Cita>) -> Vec<Cita> {
	let mut rows: Vec<Cita> = rows.cloned().collect();
	rows.sort_by_key(|c| (c.date, c.time));
	rows
}
