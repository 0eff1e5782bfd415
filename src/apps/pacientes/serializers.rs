use serde::{Deserialize, Serialize};
use validator::Validate;

use super::models::Paciente;
use crate::apps::personas::serializers::PersonaResponse;
use crate::core::validators::{validate_national_id, validate_not_blank, validate_phone};

/// Registration body; the role is always `patient`
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreatePacienteRequest {
	#[validate(length(min = 1, max = 150, message = "must be 1 to 150 characters"))]
	pub username: String,
	#[validate(email(message = "must be a valid email"))]
	pub email: String,
	#[validate(length(min = 6, message = "must be at least 6 characters"))]
	pub password: String,
	#[validate(custom(function = "validate_not_blank"))]
	pub first_name: String,
	#[validate(custom(function = "validate_not_blank"))]
	pub last_name: String,
	#[validate(custom(function = "validate_phone"))]
	pub phone: String,
	#[validate(custom(function = "validate_national_id"))]
	pub national_id: String,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePacienteRequest {
	#[validate(length(min = 1, max = 150, message = "must be 1 to 150 characters"))]
	pub username: Option<String>,
	#[validate(email(message = "must be a valid email"))]
	pub email: Option<String>,
	#[validate(length(min = 6, message = "must be at least 6 characters"))]
	pub password: Option<String>,
	#[validate(custom(function = "validate_not_blank"))]
	pub first_name: Option<String>,
	#[validate(custom(function = "validate_not_blank"))]
	pub last_name: Option<String>,
	#[validate(custom(function = "validate_phone"))]
	pub phone: Option<String>,
	#[validate(custom(function = "validate_national_id"))]
	pub national_id: Option<String>,
}

/// Paciente with its persona's public fields
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PacienteResponse {
	#[serde(flatten)]
	pub paciente: Paciente,
	pub persona: Option<PersonaResponse>,
}
