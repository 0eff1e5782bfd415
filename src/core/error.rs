//! Application error type
//!
//! Every domain failure is raised as a single [`Error`] carrying a message and
//! an HTTP status. The [`IntoResponse`] implementation renders it as
//! `{"status": ..., "message": ...}`.

use axum::Json;
use axum::response::{IntoResponse, Response};
use http::StatusCode;
use serde::Serialize;

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Typed application error
#[derive(Debug, thiserror::Error)]
pub enum Error {
	/// Malformed or missing input
	#[error("{0}")]
	Validation(String),

	/// Referenced entity does not exist
	#[error("{0}")]
	NotFound(String),

	/// Missing or invalid credentials
	#[error("{0}")]
	Unauthorized(String),

	/// Authenticated but not allowed by role or ownership
	#[error("{0}")]
	Forbidden(String),

	/// Uniqueness or scheduling invariant violated
	#[error("{0}")]
	Conflict(String),

	/// Storage engine failure
	#[error("Database error: {0}")]
	Database(String),

	/// Anything else
	#[error("{0}")]
	Internal(String),
}

impl Error {
	/// HTTP status code for this error kind.
	///
	/// # Examples
	///
	/// ```
	/// use clinica::core::error::Error;
	/// use http::StatusCode;
	///
	/// assert_eq!(Error::Conflict("taken".into()).status_code(), StatusCode::CONFLICT);
	/// assert_eq!(Error::Database("down".into()).status_code(), StatusCode::INTERNAL_SERVER_ERROR);
	/// ```
	pub fn status_code(&self) -> StatusCode {
		match self {
			Error::Validation(_) => StatusCode::BAD_REQUEST,
			Error::NotFound(_) => StatusCode::NOT_FOUND,
			Error::Unauthorized(_) => StatusCode::UNAUTHORIZED,
			Error::Forbidden(_) => StatusCode::FORBIDDEN,
			Error::Conflict(_) => StatusCode::CONFLICT,
			Error::Database(_) | Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
		}
	}

	/// Message exposed to clients. Server-side failures never leak details.
	pub fn public_message(&self) -> String {
		match self {
			Error::Database(_) | Error::Internal(_) => "Internal server error".to_string(),
			other => other.to_string(),
		}
	}
}

/// JSON body for error responses
#[derive(Debug, Serialize)]
pub struct ErrorBody {
	pub status: &'static str,
	pub message: String,
}

impl IntoResponse for Error {
	fn into_response(self) -> Response {
		let status = self.status_code();
		if status.is_server_error() {
			tracing::error!(status = status.as_u16(), error = %self, "request failed");
		} else {
			tracing::debug!(status = status.as_u16(), error = %self, "request rejected");
		}

		let body = ErrorBody {
			status: if status.is_client_error() { "fail" } else { "error" },
			message: self.public_message(),
		};
		(status, Json(body)).into_response()
	}
}

impl From<validator::ValidationErrors> for Error {
	fn from(errors: validator::ValidationErrors) -> Self {
		let mut fields: Vec<String> = errors
			.field_errors()
			.into_iter()
			.map(|(field, errs)| {
				let detail = errs
					.iter()
					.filter_map(|e| e.message.as_ref().map(|m| m.to_string()))
					.next()
					.unwrap_or_else(|| "is invalid".to_string());
				format!("'{}' {}", field, detail)
			})
			.collect();
		fields.sort();
		Error::Validation(format!("Validation failed: {}", fields.join(", ")))
	}
}

impl From<sqlx::Error> for Error {
	fn from(err: sqlx::Error) -> Self {
		match &err {
			sqlx::Error::RowNotFound => Error::NotFound("Record not found".to_string()),
			sqlx::Error::Database(db_err) => match db_err.code().as_deref() {
				// unique_violation
				Some("23505") => Error::Conflict(conflict_message(db_err.constraint())),
				// foreign_key_violation
				Some("23503") => Error::NotFound("Referenced entity not found".to_string()),
				_ => Error::Database(err.to_string()),
			},
			_ => Error::Database(err.to_string()),
		}
	}
}

pub(crate) fn conflict_message(constraint: Option<&str>) -> String {
	match constraint {
		Some("citas_agenda_unica") => {
			"Schedule conflict: the specialist already has an appointment at that time".to_string()
		}
		Some("personas_username_unique") => "Username already in use".to_string(),
		Some("personas_email_unique") => "Email already registered".to_string(),
		Some("pacientes_national_id_unique") => "National id already registered".to_string(),
		Some("historias_clinicas_patient_unique") => {
			"The patient already has a clinical history".to_string()
		}
		_ => "Resource already exists".to_string(),
	}
}
