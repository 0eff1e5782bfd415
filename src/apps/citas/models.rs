//! Cita (appointment) model

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::core::error::{Error, Result};

/// Appointment status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CitaStatus {
	#[default]
	Pending,
	Completed,
	Cancelled,
}

impl CitaStatus {
	pub fn as_str(&self) -> &'static str {
		match self {
			CitaStatus::Pending => "pending",
			CitaStatus::Completed => "completed",
			CitaStatus::Cancelled => "cancelled",
		}
	}

	/// Whether an appointment in this status occupies its slot.
	pub fn holds_slot(&self) -> bool {
		!matches!(self, CitaStatus::Cancelled)
	}

	/// Allowed lifecycle moves.
	///
	/// # Examples
	///
	/// ```
	/// use clinica::apps::citas::models::CitaStatus;
	///
	/// assert!(CitaStatus::Pending.can_transition_to(CitaStatus::Completed));
	/// assert!(CitaStatus::Completed.can_transition_to(CitaStatus::Cancelled));
	/// assert!(!CitaStatus::Cancelled.can_transition_to(CitaStatus::Completed));
	/// assert!(!CitaStatus::Pending.can_transition_to(CitaStatus::Pending));
	/// ```
	pub fn can_transition_to(&self, next: CitaStatus) -> bool {
		matches!(
			(self, next),
			(CitaStatus::Pending, CitaStatus::Completed)
				| (CitaStatus::Pending, CitaStatus::Cancelled)
				| (CitaStatus::Completed, CitaStatus::Cancelled)
		)
	}
}

impl fmt::Display for CitaStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for CitaStatus {
	type Err = Error;

	fn from_str(s: &str) -> Result<Self> {
		match s {
			"pending" => Ok(CitaStatus::Pending),
			"completed" => Ok(CitaStatus::Completed),
			"cancelled" => Ok(CitaStatus::Cancelled),
			other => Err(Error::Validation(format!("'status' is invalid: {}", other))),
		}
	}
}

/// Scheduled appointment between one patient and one specialist
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Cita {
	pub id: Uuid,
	pub date: NaiveDate,
	#[serde(with = "hhmmss")]
	pub time: NaiveTime,
	pub status: CitaStatus,
	pub patient_id: Uuid,
	pub specialist_id: Uuid,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
	#[serde(skip)]
	pub deleted_at: Option<DateTime<Utc>>,
}

impl Cita {
	/// True when `other` is a live appointment occupying the same slot.
	pub fn collides_with(&self, other: &Cita) -> bool {
		self.id != other.id
			&& self.specialist_id == other.specialist_id
			&& self.date == other.date
			&& self.time == other.time
			&& self.status.holds_slot()
			&& other.status.holds_slot()
			&& self.deleted_at.is_none()
			&& other.deleted_at.is_none()
	}
}

mod hhmmss {
	use chrono::NaiveTime;
	use serde::Serializer;

	pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.collect_str(&time.format("%H:%M:%S"))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	fn cita(specialist_id: Uuid, status: CitaStatus) -> Cita {
		Cita {
			id: Uuid::new_v4(),
			date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
			time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
			status,
			patient_id: Uuid::new_v4(),
			specialist_id,
			created_at: Utc::now(),
			updated_at: Utc::now(),
			deleted_at: None,
		}
	}

	#[rstest]
	fn test_cancelled_appointments_do_not_collide() {
		let specialist = Uuid::new_v4();
		let first = cita(specialist, CitaStatus::Pending);
		let second = cita(specialist, CitaStatus::Pending);
		assert!(first.collides_with(&second));

		let cancelled = cita(specialist, CitaStatus::Cancelled);
		assert!(!first.collides_with(&cancelled));
	}

	#[rstest]
	fn test_other_specialist_does_not_collide() {
		let first = cita(Uuid::new_v4(), CitaStatus::Pending);
		let second = cita(Uuid::new_v4(), CitaStatus::Completed);
		assert!(!first.collides_with(&second));
	}

	#[rstest]
	fn test_time_serializes_with_seconds() {
		let json = serde_json::to_value(cita(Uuid::new_v4(), CitaStatus::Pending)).unwrap();
		assert_eq!(json["time"], "09:00:00");
		assert_eq!(json["date"], "2025-06-01");
		assert_eq!(json["status"], "pending");
	}
}
