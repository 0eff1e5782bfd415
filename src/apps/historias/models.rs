//! HistoriaClinica model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use crate::core::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sex {
	Male,
	Female,
	Other,
}

impl Sex {
	pub fn as_str(&self) -> &'static str {
		match self {
			Sex::Male => "male",
			Sex::Female => "female",
			Sex::Other => "other",
		}
	}
}

impl FromStr for Sex {
	type Err = Error;

	fn from_str(s: &str) -> Result<Self> {
		match s {
			"male" => Ok(Sex::Male),
			"female" => Ok(Sex::Female),
			"other" => Ok(Sex::Other),
			other => Err(Error::Internal(format!("unknown sex '{}'", other))),
		}
	}
}

/// A patient's single clinical history
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoriaClinica {
	pub id: Uuid,
	pub patient_id: Uuid,
	pub age: i32,
	pub sex: Sex,
	pub race: Option<String>,
	pub address: Option<String>,
	pub conditions: Option<String>,
	pub background: Option<String>,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
}
