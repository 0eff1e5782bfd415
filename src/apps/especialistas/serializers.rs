use serde::{Deserialize, Serialize};
use validator::Validate;

use super::models::Especialista;
use crate::apps::personas::serializers::PersonaResponse;
use crate::core::validators::validate_not_blank;

/// Body for `POST /especialistas`; the role is always `specialist`
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateEspecialistaRequest {
	#[validate(length(min = 1, max = 150, message = "must be 1 to 150 characters"))]
	pub username: String,
	#[validate(email(message = "must be a valid email"))]
	pub email: String,
	#[validate(length(min = 6, message = "must be at least 6 characters"))]
	pub password: String,
	#[validate(custom(function = "validate_not_blank"))]
	pub specialty: String,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEspecialistaRequest {
	#[validate(length(min = 1, max = 150, message = "must be 1 to 150 characters"))]
	pub username: Option<String>,
	#[validate(email(message = "must be a valid email"))]
	pub email: Option<String>,
	#[validate(length(min = 6, message = "must be at least 6 characters"))]
	pub password: Option<String>,
	#[validate(custom(function = "validate_not_blank"))]
	pub specialty: Option<String>,
}

/// Especialista with its persona's public fields
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct EspecialistaResponse {
	#[serde(flatten)]
	pub especialista: Especialista,
	pub persona: Option<PersonaResponse>,
}
