use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::core::validators::validate_not_blank;

/// `specialistId` defaults to the requesting specialist
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateRegistroRequest {
	pub history_id: Uuid,
	pub specialist_id: Option<Uuid>,
	#[validate(custom(function = "validate_not_blank"))]
	pub diagnosis: String,
	pub treatment: Option<String>,
	pub observations: Option<String>,
}

/// Text fields only; the history and author never change
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRegistroRequest {
	#[validate(custom(function = "validate_not_blank"))]
	pub diagnosis: Option<String>,
	pub treatment: Option<String>,
	pub observations: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistroQuery {
	pub history_id: Option<Uuid>,
}
