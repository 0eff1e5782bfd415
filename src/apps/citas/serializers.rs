use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::models::Cita;
use crate::apps::especialistas::serializers::EspecialistaResponse;
use crate::apps::pacientes::serializers::PacienteResponse;

/// `date` is `YYYY-MM-DD`; `time` is `HH:MM` or `HH:MM:SS`
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateCitaRequest {
	pub date: String,
	pub time: String,
	#[serde(default)]
	pub status: Option<String>,
	pub patient_id: Uuid,
	pub specialist_id: Uuid,
}

/// Partial update; absent fields keep their current value
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCitaRequest {
	pub date: Option<String>,
	pub time: Option<String>,
	pub status: Option<String>,
	pub patient_id: Option<Uuid>,
	pub specialist_id: Option<Uuid>,
}

/// Appointment with its participants
#[derive(Debug, Clone, Serialize)]
pub struct CitaDetalle {
	#[serde(flatten)]
	pub cita: Cita,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub paciente: Option<PacienteResponse>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub especialista: Option<EspecialistaResponse>,
}
