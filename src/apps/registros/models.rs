//! RegistroClinico model

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// One clinical encounter inside a history, authored by one specialist
///
/// `history_id` and `specialist_id` never change after creation.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct RegistroClinico {
	pub id: Uuid,
	pub history_id: Uuid,
	pub specialist_id: Uuid,
	pub diagnosis: String,
	pub treatment: Option<String>,
	pub observations: Option<String>,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
	#[serde(skip)]
	pub deleted_at: Option<DateTime<Utc>>,
}
