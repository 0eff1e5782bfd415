use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::models::{HistoriaClinica, Sex};
use crate::apps::pacientes::models::Paciente;
use crate::apps::registros::models::RegistroClinico;

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateHistoriaRequest {
	pub patient_id: Uuid,
	#[validate(range(min = 0, max = 150, message = "must be between 0 and 150"))]
	pub age: i32,
	pub sex: Sex,
	pub race: Option<String>,
	pub address: Option<String>,
	pub conditions: Option<String>,
	pub background: Option<String>,
}

/// Demographic fields only; the patient of a history never changes
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateHistoriaRequest {
	#[validate(range(min = 0, max = 150, message = "must be between 0 and 150"))]
	pub age: Option<i32>,
	pub sex: Option<Sex>,
	pub race: Option<String>,
	pub address: Option<String>,
	pub conditions: Option<String>,
	pub background: Option<String>,
}

/// History with its patient and records (newest first)
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoriaDetalle {
	#[serde(flatten)]
	pub historia: HistoriaClinica,
	pub paciente: Option<Paciente>,
	pub registros_clinicos: Vec<RegistroClinico>,
}
