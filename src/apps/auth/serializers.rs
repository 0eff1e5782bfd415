use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::apps::especialistas::models::Especialista;
use crate::apps::pacientes::models::Paciente;
use crate::apps::personas::serializers::PersonaResponse;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
	#[validate(email(message = "must be a valid email"))]
	pub email: String,
	#[validate(length(min = 1, message = "is required"))]
	pub password: String,
	#[serde(default, alias = "token", alias = "code")]
	pub two_factor_code: Option<String>,
}

/// Result of a login attempt
#[derive(Debug, Serialize, PartialEq)]
#[serde(untagged)]
pub enum LoginResponse {
	#[serde(rename_all = "camelCase")]
	Tokens { token: String, refresh_token: String },
	TwoFactorRequired {
		#[serde(rename = "requires2FA")]
		requires_2fa: bool,
		#[serde(rename = "personId")]
		persona_id: Uuid,
	},
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
	#[validate(length(min = 1, message = "is required"))]
	pub refresh_token: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
	pub token: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct TwoFactorCodeRequest {
	#[serde(alias = "token")]
	#[validate(length(min = 1, message = "is required"))]
	pub code: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TwoFactorSetup {
	/// QR image of the provisioning URL, as an SVG data URI
	pub qr_payload: String,
	pub secret: String,
	pub otpauth_url: String,
}

/// Persona with its role record
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
	#[serde(flatten)]
	pub persona: PersonaResponse,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub paciente: Option<Paciente>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub especialista: Option<Especialista>,
}
