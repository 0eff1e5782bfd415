//! Input validators shared by the request serializers

use chrono::{NaiveDate, NaiveTime};
use once_cell::sync::Lazy;
use regex::Regex;
use validator::ValidationError;

use crate::core::error::{Error, Result};

static DATE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9]{4}-[0-9]{2}-[0-9]{2}$").unwrap());
static TIME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9]{2}:[0-5][0-9](:[0-5][0-9])?$").unwrap());
static PHONE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\+?[0-9]{7,15}$").unwrap());
static NATIONAL_ID_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9]{11}$").unwrap());

/// Parse an ISO calendar date (`YYYY-MM-DD`).
///
/// # Examples
///
/// ```
/// use clinica::core::validators::parse_date;
///
/// assert!(parse_date("2025-06-01").is_ok());
/// assert!(parse_date("2025-02-30").is_err());
/// assert!(parse_date("2025-6-1").is_err());
/// ```
pub fn parse_date(value: &str) -> Result<NaiveDate> {
	if !DATE_RE.is_match(value) {
		return Err(Error::Validation(
			"'date' must use the YYYY-MM-DD format".to_string(),
		));
	}
	NaiveDate::parse_from_str(value, "%Y-%m-%d")
		.map_err(|_| Error::Validation(format!("'date' is not a calendar date: {}", value)))
}

/// Parse a time of day (`HH:MM` or `HH:MM:SS`).
///
/// # Examples
///
/// ```
/// use clinica::core::validators::parse_time;
///
/// assert_eq!(parse_time("09:00").unwrap(), parse_time("09:00:00").unwrap());
/// assert!(parse_time("24:00").is_err());
/// assert!(parse_time("9:00").is_err());
/// ```
pub fn parse_time(value: &str) -> Result<NaiveTime> {
	if !TIME_RE.is_match(value) {
		return Err(Error::Validation(
			"'time' must use the HH:MM or HH:MM:SS format".to_string(),
		));
	}
	let format = if value.len() == 5 { "%H:%M" } else { "%H:%M:%S" };
	NaiveTime::parse_from_str(value, format)
		.map_err(|_| Error::Validation(format!("'time' is not a valid time of day: {}", value)))
}

pub fn validate_phone(value: &str) -> std::result::Result<(), ValidationError> {
	if PHONE_RE.is_match(value) {
		Ok(())
	} else {
		Err(ValidationError::new("phone")
			.with_message("must be 7 to 15 digits, optionally prefixed with '+'".into()))
	}
}

pub fn validate_national_id(value: &str) -> std::result::Result<(), ValidationError> {
	if NATIONAL_ID_RE.is_match(value) {
		Ok(())
	} else {
		Err(ValidationError::new("national_id").with_message("must be exactly 11 digits".into()))
	}
}

pub fn validate_not_blank(value: &str) -> std::result::Result<(), ValidationError> {
	if value.trim().is_empty() {
		Err(ValidationError::new("blank").with_message("must not be blank".into()))
	} else {
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	#[case("+5312345678", true)]
	#[case("5312345678", true)]
	#[case("+53 1234 5678", false)]
	#[case("12345", false)]
	#[case("+٥٣١٢٣٤٥٦٧٨", false)]
	#[case("٨٥٠١٠١١٢٣٤٥", false)]
	fn test_phone(#[case] phone: &str, #[case] valid: bool) {
		assert_eq!(validate_phone(phone).is_ok(), valid);
	}

	#[rstest]
	#[case("85010112345", true)]
	#[case("8501011234", false)]
	#[case("8501011234a", false)]
	#[case("٨٥٠١٠١١٢٣٤٥", false)]
	fn test_national_id(#[case] id: &str, #[case] valid: bool) {
		assert_eq!(validate_national_id(id).is_ok(), valid);
	}

	#[rstest]
	#[case("09:00")]
	#[case("23:59:59")]
	fn test_valid_times(#[case] value: &str) {
		assert!(parse_time(value).is_ok());
	}

	#[rstest]
	#[case("09:60")]
	#[case("25:00")]
	#[case("09:00:00:00")]
	#[case("٠٩:٠٠")]
	#[case("")]
	fn test_invalid_times(#[case] value: &str) {
		assert!(matches!(parse_time(value), Err(Error::Validation(_))));
	}

	#[rstest]
	fn test_leap_day() {
		assert!(parse_date("2024-02-29").is_ok());
		assert!(parse_date("2025-02-29").is_err());
	}
}
