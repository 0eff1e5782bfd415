//! TOTP enrollment and verification (RFC 6238, SHA-1, 6 digits, 30 s steps)

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use data_encoding::BASE32_NOPAD;
use qrcode::QrCode;
use qrcode::render::svg;
use rand::RngCore;
use std::time::{SystemTime, UNIX_EPOCH};
use url::Url;

use crate::core::error::{Error, Result};

const SECRET_BYTES: usize = 20;
const DIGITS: u32 = 6;

/// Generates secrets, provisioning URLs and QR images, and checks codes
#[derive(Debug, Clone)]
pub struct TotpManager {
	issuer: String,
	step: u64,
	skew: u64,
}

impl TotpManager {
	pub fn new(issuer: impl Into<String>) -> Self {
		Self {
			issuer: issuer.into(),
			step: 30,
			skew: 1,
		}
	}

	/// Fresh 160-bit secret, base32 without padding.
	pub fn generate_secret(&self) -> String {
		let mut bytes = [0u8; SECRET_BYTES];
		rand::thread_rng().fill_bytes(&mut bytes);
		BASE32_NOPAD.encode(&bytes)
	}

	/// `otpauth://totp/{issuer}:{account}?secret=..&issuer=..` provisioning URL.
	///
	/// # Examples
	///
	/// ```
	/// use clinica::apps::auth::totp::TotpManager;
	///
	/// let manager = TotpManager::new("Clinica");
	/// let url = manager.otpauth_url("ana@clinic.test", "JBSWY3DPEHPK3PXP").unwrap();
	/// assert!(url.starts_with("otpauth://totp/Clinica:ana@clinic.test?"));
	/// assert!(url.contains("secret=JBSWY3DPEHPK3PXP"));
	/// ```
	pub fn otpauth_url(&self, account: &str, secret: &str) -> Result<String> {
		let mut url = Url::parse("otpauth://totp/")
			.map_err(|e| Error::Internal(format!("otpauth url: {}", e)))?;
		url.path_segments_mut()
			.map_err(|_| Error::Internal("otpauth url has no path".to_string()))?
			.clear()
			.push(&format!("{}:{}", self.issuer, account));
		url.query_pairs_mut()
			.append_pair("secret", secret)
			.append_pair("issuer", &self.issuer)
			.append_pair("algorithm", "SHA1")
			.append_pair("digits", &DIGITS.to_string())
			.append_pair("period", &self.step.to_string());
		Ok(url.to_string())
	}

	/// QR code of `payload` as an SVG data URI.
	pub fn qr_data_uri(&self, payload: &str) -> Result<String> {
		let code = QrCode::new(payload.as_bytes())
			.map_err(|e| Error::Internal(format!("qr encoding failed: {}", e)))?;
		let image = code
			.render::<svg::Color>()
			.min_dimensions(200, 200)
			.build();
		Ok(format!("data:image/svg+xml;base64,{}", STANDARD.encode(image)))
	}

	/// Code for `secret` at unix time `timestamp`.
	pub fn code_at(&self, secret: &str, timestamp: u64) -> Result<String> {
		let key = decode_secret(secret)?;
		Ok(totp_lite::totp_custom::<totp_lite::Sha1>(
			self.step, DIGITS, &key, timestamp,
		))
	}

	/// Checks `code` against the current step and its immediate neighbours.
	pub fn verify(&self, secret: &str, code: &str) -> Result<bool> {
		let code = code.trim();
		if code.len() != DIGITS as usize || !code.bytes().all(|b| b.is_ascii_digit()) {
			return Ok(false);
		}

		let key = decode_secret(secret)?;
		let now = unix_now();
		let window = self.skew * self.step;
		let mut timestamp = now.saturating_sub(window);
		while timestamp <= now + window {
			if totp_lite::totp_custom::<totp_lite::Sha1>(self.step, DIGITS, &key, timestamp) == code {
				return Ok(true);
			}
			timestamp += self.step;
		}
		Ok(false)
	}
}

fn decode_secret(secret: &str) -> Result<Vec<u8>> {
	BASE32_NOPAD
		.decode(secret.as_bytes())
		.map_err(|e| Error::Internal(format!("stored 2FA secret is not base32: {}", e)))
}

pub(crate) fn unix_now() -> u64 {
	SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.map(|d| d.as_secs())
		.unwrap_or_default()
}
