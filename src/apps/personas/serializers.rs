use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;
use validator::Validate;

use super::models::{Persona, Role};

/// Public view of a persona; never carries the password hash or 2FA secret
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PersonaResponse {
	pub id: Uuid,
	pub username: String,
	pub email: String,
	pub role: Role,
	pub image: Option<String>,
	pub two_factor_enabled: bool,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
}

impl From<&Persona> for PersonaResponse {
	fn from(persona: &Persona) -> Self {
		Self {
			id: persona.id,
			username: persona.username.clone(),
			email: persona.email.clone(),
			role: persona.role,
			image: persona.image.clone(),
			two_factor_enabled: persona.two_factor.is_enabled(),
			created_at: persona.created_at,
			updated_at: persona.updated_at,
		}
	}
}

impl From<Persona> for PersonaResponse {
	fn from(persona: Persona) -> Self {
		Self::from(&persona)
	}
}

/// Fields accepted by `PUT /personas/{id}` (multipart form)
#[derive(Debug, Default, Validate)]
pub struct PersonaForm {
	#[validate(length(min = 1, max = 150, message = "must be 1 to 150 characters"))]
	pub username: Option<String>,
	#[validate(email(message = "must be a valid email"))]
	pub email: Option<String>,
	#[validate(length(min = 6, message = "must be at least 6 characters"))]
	pub password: Option<String>,
	pub image: Option<UploadedImage>,
}

#[derive(Debug)]
pub struct UploadedImage {
	pub file_name: String,
	pub content: Vec<u8>,
}
