//! Persona model
//!
//! Root identity shared by every user role. Role-specific data lives in
//! `Paciente` and `Especialista`, which reference a persona by id.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::core::error::{Error, Result};

/// Closed set of user roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
	Patient,
	Specialist,
	Admin,
}

impl Role {
	pub fn as_str(&self) -> &'static str {
		match self {
			Role::Patient => "patient",
			Role::Specialist => "specialist",
			Role::Admin => "admin",
		}
	}
}

impl fmt::Display for Role {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for Role {
	type Err = Error;

	fn from_str(s: &str) -> Result<Self> {
		match s {
			"patient" => Ok(Role::Patient),
			"specialist" => Ok(Role::Specialist),
			"admin" => Ok(Role::Admin),
			other => Err(Error::Internal(format!("unknown role '{}'", other))),
		}
	}
}

/// Two-factor enrollment state
///
/// The shared secret only exists while enrollment is pending or after it has
/// been confirmed. Abandoning enrollment leaves the state `Pending` until the
/// user generates a new secret or disables 2FA.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TwoFactor {
	#[default]
	NotEnrolled,
	Pending { secret: String },
	Enabled { secret: String },
}

impl TwoFactor {
	pub fn state_name(&self) -> &'static str {
		match self {
			TwoFactor::NotEnrolled => "not_enrolled",
			TwoFactor::Pending { .. } => "pending",
			TwoFactor::Enabled { .. } => "enabled",
		}
	}

	pub fn secret(&self) -> Option<&str> {
		match self {
			TwoFactor::NotEnrolled => None,
			TwoFactor::Pending { secret } | TwoFactor::Enabled { secret } => Some(secret),
		}
	}

	pub fn is_enabled(&self) -> bool {
		matches!(self, TwoFactor::Enabled { .. })
	}

	/// Rebuild the state from its stored columns.
	///
	/// # Examples
	///
	/// ```
	/// use clinica::apps::personas::models::TwoFactor;
	///
	/// let state = TwoFactor::from_parts("enabled", Some("JBSWY3DPEHPK3PXP".into())).unwrap();
	/// assert!(state.is_enabled());
	/// assert!(TwoFactor::from_parts("pending", None).is_err());
	/// ```
	pub fn from_parts(state: &str, secret: Option<String>) -> Result<Self> {
		match (state, secret) {
			("not_enrolled", None) => Ok(TwoFactor::NotEnrolled),
			("pending", Some(secret)) => Ok(TwoFactor::Pending { secret }),
			("enabled", Some(secret)) => Ok(TwoFactor::Enabled { secret }),
			(state, secret) => Err(Error::Internal(format!(
				"inconsistent two-factor state '{}' (secret present: {})",
				state,
				secret.is_some()
			))),
		}
	}
}

/// Persona record
///
/// Deliberately not `Serialize`: responses go through
/// [`PersonaResponse`](super::serializers::PersonaResponse), which omits the
/// password hash and the 2FA secret.
#[derive(Debug, Clone, PartialEq)]
pub struct Persona {
	pub id: Uuid,
	pub username: String,
	pub password_hash: String,
	pub email: String,
	pub role: Role,
	pub image: Option<String>,
	pub two_factor: TwoFactor,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
	pub deleted_at: Option<DateTime<Utc>>,
}

impl Persona {
	/// Build a new persona with a fresh id. `password_hash` must already be hashed.
	pub fn new(username: String, password_hash: String, email: String, role: Role) -> Self {
		let now = Utc::now();
		Self {
			id: Uuid::new_v4(),
			username,
			password_hash,
			email,
			role,
			image: None,
			two_factor: TwoFactor::NotEnrolled,
			created_at: now,
			updated_at: now,
			deleted_at: None,
		}
	}
}
