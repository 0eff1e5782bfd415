//! Especialista model

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Clinician-role extension of a persona
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Especialista {
	pub id: Uuid,
	pub persona_id: Uuid,
	pub specialty: String,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
	#[serde(skip)]
	pub deleted_at: Option<DateTime<Utc>>,
}

impl Especialista {
	pub fn new(persona_id: Uuid, specialty: String) -> Self {
		let now = Utc::now();
		Self {
			id: Uuid::new_v4(),
			persona_id,
			specialty,
			created_at: now,
			updated_at: now,
			deleted_at: None,
		}
	}
}
