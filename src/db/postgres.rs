//! PostgreSQL storage engine
//!
//! Every unit of work is a database transaction. The partial unique index
//! `citas_agenda_unica` is the authoritative guard for the scheduling
//! invariant; its violations surface as [`Error::Conflict`].

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{Postgres, Transaction};
use std::time::Duration;
use uuid::Uuid;

use crate::apps::citas::models::Cita;
use crate::apps::especialistas::models::Especialista;
use crate::apps::historias::models::HistoriaClinica;
use crate::apps::pacientes::models::Paciente;
use crate::apps::personas::models::{Persona, TwoFactor};
use crate::apps::registros::models::RegistroClinico;
use crate::config::settings::DatabaseSettings;
use crate::core::error::{Error, Result};
use crate::db::store::{Store, StoreTx};

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

const PERSONA_COLUMNS: &str = "id, username, password_hash, email, role, image, \
	two_factor_state, two_factor_secret, created_at, updated_at, deleted_at";
const PACIENTE_COLUMNS: &str = "id, persona_id, first_name, last_name, phone, national_id, \
	created_at, updated_at, deleted_at";
const ESPECIALISTA_COLUMNS: &str =
	"id, persona_id, specialty, created_at, updated_at, deleted_at";
const HISTORIA_COLUMNS: &str = "id, patient_id, age, sex, race, address, conditions, background, \
	created_at, updated_at";
const REGISTRO_COLUMNS: &str = "id, history_id, specialist_id, diagnosis, treatment, observations, \
	created_at, updated_at, deleted_at";
const CITA_COLUMNS: &str =
	"id, date, time, status, patient_id, specialist_id, created_at, updated_at, deleted_at";

/// Store backed by a PostgreSQL connection pool
#[derive(Clone)]
pub struct PgStore {
	pool: PgPool,
}

impl PgStore {
	/// Connect to `url` using the configured pool limits.
	pub async fn connect(url: &str, settings: &DatabaseSettings) -> Result<Self> {
		let pool = PgPoolOptions::new()
			.max_connections(settings.max_connections)
			.min_connections(settings.min_connections)
			.acquire_timeout(Duration::from_secs(settings.acquire_timeout_secs))
			.idle_timeout(Duration::from_secs(settings.idle_timeout_secs))
			.connect(url)
			.await?;
		tracing::info!(max_connections = settings.max_connections, "database pool ready");
		Ok(Self { pool })
	}

	pub fn from_pool(pool: PgPool) -> Self {
		Self { pool }
	}

	/// Apply the embedded migrations.
	pub async fn migrate(&self) -> Result<()> {
		MIGRATOR
			.run(&self.pool)
			.await
			.map_err(|e| Error::Database(format!("migration failed: {}", e)))
	}
}

#[async_trait]
impl Store for PgStore {
	async fn begin(&self) -> Result<Box<dyn StoreTx>> {
		let tx = self.pool.begin().await?;
		Ok(Box::new(PgTx { tx }))
	}
}

struct PgTx {
	tx: Transaction<'static, Postgres>,
}

#[derive(sqlx::FromRow)]
struct PersonaRow {
	id: Uuid,
	username: String,
	password_hash: String,
	email: String,
	role: String,
	image: Option<String>,
	two_factor_state: String,
	two_factor_secret: Option<String>,
	created_at: DateTime<Utc>,
	updated_at: DateTime<Utc>,
	deleted_at: Option<DateTime<Utc>>,
}

impl TryFrom<PersonaRow> for Persona {
	type Error = Error;

	fn try_from(row: PersonaRow) -> Result<Self> {
		Ok(Persona {
			id: row.id,
			username: row.username,
			password_hash: row.password_hash,
			email: row.email,
			role: row.role.parse()?,
			image: row.image,
			two_factor: TwoFactor::from_parts(&row.two_factor_state, row.two_factor_secret)?,
			created_at: row.created_at,
			updated_at: row.updated_at,
			deleted_at: row.deleted_at,
		})
	}
}

#[derive(sqlx::FromRow)]
struct HistoriaRow {
	id: Uuid,
	patient_id: Uuid,
	age: i32,
	sex: String,
	race: Option<String>,
	address: Option<String>,
	conditions: Option<String>,
	background: Option<String>,
	created_at: DateTime<Utc>,
	updated_at: DateTime<Utc>,
}

impl TryFrom<HistoriaRow> for HistoriaClinica {
	type Error = Error;

	fn try_from(row: HistoriaRow) -> Result<Self> {
		Ok(HistoriaClinica {
			id: row.id,
			patient_id: row.patient_id,
			age: row.age,
			sex: row.sex.parse()?,
			race: row.race,
			address: row.address,
			conditions: row.conditions,
			background: row.background,
			created_at: row.created_at,
			updated_at: row.updated_at,
		})
	}
}

#[derive(sqlx::FromRow)]
struct CitaRow {
	id: Uuid,
	date: NaiveDate,
	time: NaiveTime,
	status: String,
	patient_id: Uuid,
	specialist_id: Uuid,
	created_at: DateTime<Utc>,
	updated_at: DateTime<Utc>,
	deleted_at: Option<DateTime<Utc>>,
}

impl TryFrom<CitaRow> for Cita {
	type Error = Error;

	fn try_from(row: CitaRow) -> Result<Self> {
		Ok(Cita {
			id: row.id,
			date: row.date,
			time: row.time,
			status: row
				.status
				.parse()
				.map_err(|_| Error::Internal(format!("unknown appointment status '{}'", row.status)))?,
			patient_id: row.patient_id,
			specialist_id: row.specialist_id,
			created_at: row.created_at,
			updated_at: row.updated_at,
			deleted_at: row.deleted_at,
		})
	}
}

fn convert_all<R, T>(rows: Vec<R>) -> Result<Vec<T>>
where
	T: TryFrom<R, Error = Error>,
{
	rows.into_iter().map(T::try_from).collect()
}

fn ensure_updated(rows_affected: u64, what: &str) -> Result<()> {
	if rows_affected == 0 {
		return Err(Error::NotFound(format!("{} not found", what)));
	}
	Ok(())
}

#[async_trait]
impl StoreTx for PgTx {
	async fn commit(self: Box<Self>) -> Result<()> {
		self.tx.commit().await?;
		Ok(())
	}

	async fn insert_persona(&mut self, persona: &Persona) -> Result<()> {
		sqlx::query(&format!(
			"INSERT INTO personas ({}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
			PERSONA_COLUMNS
		))
		.bind(persona.id)
		.bind(&persona.username)
		.bind(&persona.password_hash)
		.bind(&persona.email)
		.bind(persona.role.as_str())
		.bind(&persona.image)
		.bind(persona.two_factor.state_name())
		.bind(persona.two_factor.secret())
		.bind(persona.created_at)
		.bind(persona.updated_at)
		.bind(persona.deleted_at)
		.execute(&mut *self.tx)
		.await?;
		Ok(())
	}

	async fn persona(&mut self, id: Uuid) -> Result<Option<Persona>> {
		sqlx::query_as::<_, PersonaRow>(&format!(
			"SELECT {} FROM personas WHERE id = $1 AND deleted_at IS NULL",
			PERSONA_COLUMNS
		))
		.bind(id)
		.fetch_optional(&mut *self.tx)
		.await?
		.map(Persona::try_from)
		.transpose()
	}

	async fn persona_by_email(&mut self, email: &str) -> Result<Option<Persona>> {
		sqlx::query_as::<_, PersonaRow>(&format!(
			"SELECT {} FROM personas WHERE email = $1 AND deleted_at IS NULL",
			PERSONA_COLUMNS
		))
		.bind(email)
		.fetch_optional(&mut *self.tx)
		.await?
		.map(Persona::try_from)
		.transpose()
	}

	async fn update_persona(&mut self, persona: &Persona) -> Result<()> {
		let result = sqlx::query(
			"UPDATE personas SET username = $2, password_hash = $3, email = $4, image = $5, \
			 two_factor_state = $6, two_factor_secret = $7, updated_at = $8 \
			 WHERE id = $1 AND deleted_at IS NULL",
		)
		.bind(persona.id)
		.bind(&persona.username)
		.bind(&persona.password_hash)
		.bind(&persona.email)
		.bind(&persona.image)
		.bind(persona.two_factor.state_name())
		.bind(persona.two_factor.secret())
		.bind(persona.updated_at)
		.execute(&mut *self.tx)
		.await?;
		ensure_updated(result.rows_affected(), "Persona")
	}

	async fn soft_delete_persona(&mut self, id: Uuid, at: DateTime<Utc>) -> Result<bool> {
		// Row lock first so a concurrent update cannot resurrect the persona
		let locked = sqlx::query("SELECT id FROM personas WHERE id = $1 AND deleted_at IS NULL FOR UPDATE")
			.bind(id)
			.fetch_optional(&mut *self.tx)
			.await?;
		if locked.is_none() {
			return Ok(false);
		}
		let result = sqlx::query("UPDATE personas SET deleted_at = $2 WHERE id = $1")
			.bind(id)
			.bind(at)
			.execute(&mut *self.tx)
			.await?;
		Ok(result.rows_affected() > 0)
	}

	async fn insert_paciente(&mut self, paciente: &Paciente) -> Result<()> {
		sqlx::query(&format!(
			"INSERT INTO pacientes ({}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
			PACIENTE_COLUMNS
		))
		.bind(paciente.id)
		.bind(paciente.persona_id)
		.bind(&paciente.first_name)
		.bind(&paciente.last_name)
		.bind(&paciente.phone)
		.bind(&paciente.national_id)
		.bind(paciente.created_at)
		.bind(paciente.updated_at)
		.bind(paciente.deleted_at)
		.execute(&mut *self.tx)
		.await?;
		Ok(())
	}

	async fn paciente(&mut self, id: Uuid) -> Result<Option<Paciente>> {
		Ok(sqlx::query_as::<_, Paciente>(&format!(
			"SELECT {} FROM pacientes WHERE id = $1 AND deleted_at IS NULL",
			PACIENTE_COLUMNS
		))
		.bind(id)
		.fetch_optional(&mut *self.tx)
		.await?)
	}

	async fn paciente_by_persona(&mut self, persona_id: Uuid) -> Result<Option<Paciente>> {
		Ok(sqlx::query_as::<_, Paciente>(&format!(
			"SELECT {} FROM pacientes WHERE persona_id = $1 AND deleted_at IS NULL",
			PACIENTE_COLUMNS
		))
		.bind(persona_id)
		.fetch_optional(&mut *self.tx)
		.await?)
	}

	async fn pacientes(&mut self) -> Result<Vec<Paciente>> {
		Ok(sqlx::query_as::<_, Paciente>(&format!(
			"SELECT {} FROM pacientes WHERE deleted_at IS NULL ORDER BY created_at",
			PACIENTE_COLUMNS
		))
		.fetch_all(&mut *self.tx)
		.await?)
	}

	async fn update_paciente(&mut self, paciente: &Paciente) -> Result<()> {
		let result = sqlx::query(
			"UPDATE pacientes SET first_name = $2, last_name = $3, phone = $4, national_id = $5, \
			 updated_at = $6 WHERE id = $1 AND deleted_at IS NULL",
		)
		.bind(paciente.id)
		.bind(&paciente.first_name)
		.bind(&paciente.last_name)
		.bind(&paciente.phone)
		.bind(&paciente.national_id)
		.bind(paciente.updated_at)
		.execute(&mut *self.tx)
		.await?;
		ensure_updated(result.rows_affected(), "Paciente")
	}

	async fn soft_delete_paciente(&mut self, id: Uuid, at: DateTime<Utc>) -> Result<bool> {
		let result =
			sqlx::query("UPDATE pacientes SET deleted_at = $2 WHERE id = $1 AND deleted_at IS NULL")
				.bind(id)
				.bind(at)
				.execute(&mut *self.tx)
				.await?;
		Ok(result.rows_affected() > 0)
	}

	async fn insert_especialista(&mut self, especialista: &Especialista) -> Result<()> {
		sqlx::query(&format!(
			"INSERT INTO especialistas ({}) VALUES ($1, $2, $3, $4, $5, $6)",
			ESPECIALISTA_COLUMNS
		))
		.bind(especialista.id)
		.bind(especialista.persona_id)
		.bind(&especialista.specialty)
		.bind(especialista.created_at)
		.bind(especialista.updated_at)
		.bind(especialista.deleted_at)
		.execute(&mut *self.tx)
		.await?;
		Ok(())
	}

	async fn especialista(&mut self, id: Uuid) -> Result<Option<Especialista>> {
		Ok(sqlx::query_as::<_, Especialista>(&format!(
			"SELECT {} FROM especialistas WHERE id = $1 AND deleted_at IS NULL",
			ESPECIALISTA_COLUMNS
		))
		.bind(id)
		.fetch_optional(&mut *self.tx)
		.await?)
	}

	async fn especialista_by_persona(&mut self, persona_id: Uuid) -> Result<Option<Especialista>> {
		Ok(sqlx::query_as::<_, Especialista>(&format!(
			"SELECT {} FROM especialistas WHERE persona_id = $1 AND deleted_at IS NULL",
			ESPECIALISTA_COLUMNS
		))
		.bind(persona_id)
		.fetch_optional(&mut *self.tx)
		.await?)
	}

	async fn especialistas(&mut self) -> Result<Vec<Especialista>> {
		Ok(sqlx::query_as::<_, Especialista>(&format!(
			"SELECT {} FROM especialistas WHERE deleted_at IS NULL ORDER BY created_at",
			ESPECIALISTA_COLUMNS
		))
		.fetch_all(&mut *self.tx)
		.await?)
	}

	async fn update_especialista(&mut self, especialista: &Especialista) -> Result<()> {
		let result = sqlx::query(
			"UPDATE especialistas SET specialty = $2, updated_at = $3 \
			 WHERE id = $1 AND deleted_at IS NULL",
		)
		.bind(especialista.id)
		.bind(&especialista.specialty)
		.bind(especialista.updated_at)
		.execute(&mut *self.tx)
		.await?;
		ensure_updated(result.rows_affected(), "Especialista")
	}

	async fn soft_delete_especialista(&mut self, id: Uuid, at: DateTime<Utc>) -> Result<bool> {
		let result = sqlx::query(
			"UPDATE especialistas SET deleted_at = $2 WHERE id = $1 AND deleted_at IS NULL",
		)
		.bind(id)
		.bind(at)
		.execute(&mut *self.tx)
		.await?;
		Ok(result.rows_affected() > 0)
	}

	async fn insert_historia(&mut self, historia: &HistoriaClinica) -> Result<()> {
		sqlx::query(&format!(
			"INSERT INTO historias_clinicas ({}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
			HISTORIA_COLUMNS
		))
		.bind(historia.id)
		.bind(historia.patient_id)
		.bind(historia.age)
		.bind(historia.sex.as_str())
		.bind(&historia.race)
		.bind(&historia.address)
		.bind(&historia.conditions)
		.bind(&historia.background)
		.bind(historia.created_at)
		.bind(historia.updated_at)
		.execute(&mut *self.tx)
		.await?;
		Ok(())
	}

	async fn historia(&mut self, id: Uuid) -> Result<Option<HistoriaClinica>> {
		sqlx::query_as::<_, HistoriaRow>(&format!(
			"SELECT {} FROM historias_clinicas WHERE id = $1",
			HISTORIA_COLUMNS
		))
		.bind(id)
		.fetch_optional(&mut *self.tx)
		.await?
		.map(HistoriaClinica::try_from)
		.transpose()
	}

	async fn historia_by_paciente(&mut self, patient_id: Uuid) -> Result<Option<HistoriaClinica>> {
		sqlx::query_as::<_, HistoriaRow>(&format!(
			"SELECT {} FROM historias_clinicas WHERE patient_id = $1",
			HISTORIA_COLUMNS
		))
		.bind(patient_id)
		.fetch_optional(&mut *self.tx)
		.await?
		.map(HistoriaClinica::try_from)
		.transpose()
	}

	async fn historias(&mut self) -> Result<Vec<HistoriaClinica>> {
		let rows = sqlx::query_as::<_, HistoriaRow>(&format!(
			"SELECT {} FROM historias_clinicas ORDER BY created_at",
			HISTORIA_COLUMNS
		))
		.fetch_all(&mut *self.tx)
		.await?;
		convert_all(rows)
	}

	async fn update_historia(&mut self, historia: &HistoriaClinica) -> Result<()> {
		let result = sqlx::query(
			"UPDATE historias_clinicas SET age = $2, sex = $3, race = $4, address = $5, \
			 conditions = $6, background = $7, updated_at = $8 WHERE id = $1",
		)
		.bind(historia.id)
		.bind(historia.age)
		.bind(historia.sex.as_str())
		.bind(&historia.race)
		.bind(&historia.address)
		.bind(&historia.conditions)
		.bind(&historia.background)
		.bind(historia.updated_at)
		.execute(&mut *self.tx)
		.await?;
		ensure_updated(result.rows_affected(), "Historia clinica")
	}

	async fn delete_historia(&mut self, id: Uuid) -> Result<bool> {
		let result = sqlx::query("DELETE FROM historias_clinicas WHERE id = $1")
			.bind(id)
			.execute(&mut *self.tx)
			.await?;
		Ok(result.rows_affected() > 0)
	}

	async fn insert_registro(&mut self, registro: &RegistroClinico) -> Result<()> {
		sqlx::query(&format!(
			"INSERT INTO registros_clinicos ({}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
			REGISTRO_COLUMNS
		))
		.bind(registro.id)
		.bind(registro.history_id)
		.bind(registro.specialist_id)
		.bind(&registro.diagnosis)
		.bind(&registro.treatment)
		.bind(&registro.observations)
		.bind(registro.created_at)
		.bind(registro.updated_at)
		.bind(registro.deleted_at)
		.execute(&mut *self.tx)
		.await?;
		Ok(())
	}

	async fn registro(&mut self, id: Uuid) -> Result<Option<RegistroClinico>> {
		Ok(sqlx::query_as::<_, RegistroClinico>(&format!(
			"SELECT {} FROM registros_clinicos WHERE id = $1 AND deleted_at IS NULL",
			REGISTRO_COLUMNS
		))
		.bind(id)
		.fetch_optional(&mut *self.tx)
		.await?)
	}

	async fn registros(&mut self) -> Result<Vec<RegistroClinico>> {
		Ok(sqlx::query_as::<_, RegistroClinico>(&format!(
			"SELECT {} FROM registros_clinicos WHERE deleted_at IS NULL ORDER BY created_at DESC",
			REGISTRO_COLUMNS
		))
		.fetch_all(&mut *self.tx)
		.await?)
	}

	async fn registros_by_historia(&mut self, history_id: Uuid) -> Result<Vec<RegistroClinico>> {
		Ok(sqlx::query_as::<_, RegistroClinico>(&format!(
			"SELECT {} FROM registros_clinicos WHERE history_id = $1 AND deleted_at IS NULL \
			 ORDER BY created_at DESC",
			REGISTRO_COLUMNS
		))
		.bind(history_id)
		.fetch_all(&mut *self.tx)
		.await?)
	}

	async fn update_registro(&mut self, registro: &RegistroClinico) -> Result<()> {
		let result = sqlx::query(
			"UPDATE registros_clinicos SET diagnosis = $2, treatment = $3, observations = $4, \
			 updated_at = $5 WHERE id = $1 AND deleted_at IS NULL",
		)
		.bind(registro.id)
		.bind(&registro.diagnosis)
		.bind(&registro.treatment)
		.bind(&registro.observations)
		.bind(registro.updated_at)
		.execute(&mut *self.tx)
		.await?;
		ensure_updated(result.rows_affected(), "Registro clinico")
	}

	async fn soft_delete_registro(&mut self, id: Uuid, at: DateTime<Utc>) -> Result<bool> {
		let result = sqlx::query(
			"UPDATE registros_clinicos SET deleted_at = $2 WHERE id = $1 AND deleted_at IS NULL",
		)
		.bind(id)
		.bind(at)
		.execute(&mut *self.tx)
		.await?;
		Ok(result.rows_affected() > 0)
	}

	async fn insert_cita(&mut self, cita: &Cita) -> Result<()> {
		sqlx::query(&format!(
			"INSERT INTO citas ({}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
			CITA_COLUMNS
		))
		.bind(cita.id)
		.bind(cita.date)
		.bind(cita.time)
		.bind(cita.status.as_str())
		.bind(cita.patient_id)
		.bind(cita.specialist_id)
		.bind(cita.created_at)
		.bind(cita.updated_at)
		.bind(cita.deleted_at)
		.execute(&mut *self.tx)
		.await?;
		Ok(())
	}

	async fn cita(&mut self, id: Uuid) -> Result<Option<Cita>> {
		sqlx::query_as::<_, CitaRow>(&format!(
			"SELECT {} FROM citas WHERE id = $1 AND deleted_at IS NULL",
			CITA_COLUMNS
		))
		.bind(id)
		.fetch_optional(&mut *self.tx)
		.await?
		.map(Cita::try_from)
		.transpose()
	}

	async fn citas(&mut self) -> Result<Vec<Cita>> {
		let rows = sqlx::query_as::<_, CitaRow>(&format!(
			"SELECT {} FROM citas WHERE deleted_at IS NULL ORDER BY date, time",
			CITA_COLUMNS
		))
		.fetch_all(&mut *self.tx)
		.await?;
		convert_all(rows)
	}

	async fn citas_by_paciente(&mut self, patient_id: Uuid) -> Result<Vec<Cita>> {
		let rows = sqlx::query_as::<_, CitaRow>(&format!(
			"SELECT {} FROM citas WHERE patient_id = $1 AND deleted_at IS NULL ORDER BY date, time",
			CITA_COLUMNS
		))
		.bind(patient_id)
		.fetch_all(&mut *self.tx)
		.await?;
		convert_all(rows)
	}

	async fn citas_by_especialista(&mut self, specialist_id: Uuid) -> Result<Vec<Cita>> {
		let rows = sqlx::query_as::<_, CitaRow>(&format!(
			"SELECT {} FROM citas WHERE specialist_id = $1 AND deleted_at IS NULL \
			 ORDER BY date, time",
			CITA_COLUMNS
		))
		.bind(specialist_id)
		.fetch_all(&mut *self.tx)
		.await?;
		convert_all(rows)
	}

	async fn conflicting_cita(
		&mut self,
		specialist_id: Uuid,
		date: NaiveDate,
		time: NaiveTime,
		exclude: Option<Uuid>,
	) -> Result<Option<Cita>> {
		// FOR UPDATE serializes concurrent reschedules of an existing slot;
		// fresh inserts are still guarded by citas_agenda_unica.
		sqlx::query_as::<_, CitaRow>(&format!(
			"SELECT {} FROM citas WHERE specialist_id = $1 AND date = $2 AND time = $3 \
			 AND status <> 'cancelled' AND deleted_at IS NULL \
			 AND ($4::uuid IS NULL OR id <> $4) LIMIT 1 FOR UPDATE",
			CITA_COLUMNS
		))
		.bind(specialist_id)
		.bind(date)
		.bind(time)
		.bind(exclude)
		.fetch_optional(&mut *self.tx)
		.await?
		.map(Cita::try_from)
		.transpose()
	}

	async fn update_cita(&mut self, cita: &Cita) -> Result<()> {
		let result = sqlx::query(
			"UPDATE citas SET date = $2, time = $3, status = $4, patient_id = $5, \
			 specialist_id = $6, updated_at = $7 WHERE id = $1 AND deleted_at IS NULL",
		)
		.bind(cita.id)
		.bind(cita.date)
		.bind(cita.time)
		.bind(cita.status.as_str())
		.bind(cita.patient_id)
		.bind(cita.specialist_id)
		.bind(cita.updated_at)
		.execute(&mut *self.tx)
		.await?;
		ensure_updated(result.rows_affected(), "Cita")
	}

	async fn soft_delete_cita(&mut self, id: Uuid, at: DateTime<Utc>) -> Result<bool> {
		let result =
			sqlx::query("UPDATE citas SET deleted_at = $2 WHERE id = $1 AND deleted_at IS NULL")
				.bind(id)
				.bind(at)
				.execute(&mut *self.tx)
				.await?;
		Ok(result.rows_affected() > 0)
	}
}
