//! Paciente model

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Patient-role extension of a persona
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Paciente {
	pub id: Uuid,
	pub persona_id: Uuid,
	pub first_name: String,
	pub last_name: String,
	pub phone: String,
	pub national_id: String,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
	#[serde(skip)]
	pub deleted_at: Option<DateTime<Utc>>,
}

impl Paciente {
	pub fn new(
		persona_id: Uuid,
		first_name: String,
		last_name: String,
		phone: String,
		national_id: String,
	) -> Self {
		let now = Utc::now();
		Self {
			id: Uuid::new_v4(),
			persona_id,
			first_name,
			last_name,
			phone,
			national_id,
			created_at: now,
			updated_at: now,
			deleted_at: None,
		}
	}
}
