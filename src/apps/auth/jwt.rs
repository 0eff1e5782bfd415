use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::apps::personas::models::{Persona, Role};
use crate::config::settings::AuthSettings;
use crate::core::error::{Error, Result};

/// JWT claims carried by access and refresh tokens
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Claims {
	/// Persona id
	pub sub: String,
	pub email: String,
	pub role: Role,
	pub iat: i64,
	pub exp: i64,
}

impl Claims {
	/// Claims for `persona` expiring after `expires_in`.
	pub fn new(persona: &Persona, expires_in: Duration) -> Self {
		let now = Utc::now();
		Self {
			sub: persona.id.to_string(),
			email: persona.email.clone(),
			role: persona.role,
			iat: now.timestamp(),
			exp: (now + expires_in).timestamp(),
		}
	}

	pub fn is_expired(&self) -> bool {
		Utc::now().timestamp() > self.exp
	}

	/// Subject as a persona id.
	pub fn persona_id(&self) -> Result<Uuid> {
		Uuid::parse_str(&self.sub)
			.map_err(|_| Error::Unauthorized("Token subject is not a valid id".to_string()))
	}
}

/// HS256 signer/verifier for one secret
pub struct JwtAuth {
	encoding_key: EncodingKey,
	decoding_key: DecodingKey,
	validation: Validation,
}

impl JwtAuth {
	/// Creates a new handler with the given secret key.
	///
	/// # Examples
	///
	/// ```
	/// use clinica::apps::auth::jwt::JwtAuth;
	///
	/// let jwt_auth = JwtAuth::new(b"my-secret-key-12345");
	/// assert!(jwt_auth.decode("not.a.token").is_err());
	/// ```
	pub fn new(secret: &[u8]) -> Self {
		let mut validation = Validation::default();
		validation.leeway = 0;
		Self {
			encoding_key: EncodingKey::from_secret(secret),
			decoding_key: DecodingKey::from_secret(secret),
			validation,
		}
	}

	pub fn encode(&self, claims: &Claims) -> Result<String> {
		encode(&Header::default(), claims, &self.encoding_key)
			.map_err(|e| Error::Internal(format!("token encoding failed: {}", e)))
	}

	/// Decodes and validates signature and expiry.
	pub fn decode(&self, token: &str) -> Result<Claims> {
		let claims = decode::<Claims>(token, &self.decoding_key, &self.validation)
			.map(|data| data.claims)
			.map_err(|e| Error::Unauthorized(format!("Invalid token: {}", e)))?;

		if claims.is_expired() {
			return Err(Error::Unauthorized("Token expired".to_string()));
		}

		Ok(claims)
	}
}

/// Access/refresh token pair
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
	pub token: String,
	pub refresh_token: String,
}

/// Issues and verifies both token kinds
///
/// Access and refresh tokens are signed with distinct secrets, so one kind is
/// never accepted in place of the other.
pub struct TokenService {
	access: JwtAuth,
	refresh: JwtAuth,
	access_ttl: Duration,
	refresh_ttl: Duration,
}

impl TokenService {
	pub fn new(
		access_secret: &[u8],
		refresh_secret: &[u8],
		access_ttl: Duration,
		refresh_ttl: Duration,
	) -> Self {
		Self {
			access: JwtAuth::new(access_secret),
			refresh: JwtAuth::new(refresh_secret),
			access_ttl,
			refresh_ttl,
		}
	}

	pub fn from_settings(settings: &AuthSettings) -> Self {
		Self::new(
			settings.access_secret.as_bytes(),
			settings.refresh_secret.as_bytes(),
			Duration::seconds(settings.access_ttl_secs),
			Duration::seconds(settings.refresh_ttl_secs),
		)
	}

	pub fn issue_access(&self, persona: &Persona) -> Result<String> {
		self.access.encode(&Claims::new(persona, self.access_ttl))
	}

	pub fn issue_pair(&self, persona: &Persona) -> Result<TokenPair> {
		Ok(TokenPair {
			token: self.issue_access(persona)?,
			refresh_token: self.refresh.encode(&Claims::new(persona, self.refresh_ttl))?,
		})
	}

	pub fn verify_access(&self, token: &str) -> Result<Claims> {
		self.access.decode(token)
	}

	pub fn verify_refresh(&self, token: &str) -> Result<Claims> {
		self.refresh.decode(token)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::*;

	#[fixture]
	fn service() -> TokenService {
		TokenService::new(
			b"access-secret",
			b"refresh-secret",
			Duration::hours(1),
			Duration::days(7),
		)
	}

	#[fixture]
	fn persona() -> Persona {
		Persona::new(
			"dr_house".to_string(),
			"$argon2id$placeholder".to_string(),
			"house@clinic.test".to_string(),
			Role::Specialist,
		)
	}

	#[rstest]
	fn test_pair_round_trip(service: TokenService, persona: Persona) {
		let pair = service.issue_pair(&persona).unwrap();

		let access = service.verify_access(&pair.token).unwrap();
		assert_eq!(access.persona_id().unwrap(), persona.id);
		assert_eq!(access.role, Role::Specialist);
		assert_eq!(access.exp - access.iat, 3600);

		let refresh = service.verify_refresh(&pair.refresh_token).unwrap();
		assert_eq!(refresh.email, "house@clinic.test");
		assert_eq!(refresh.exp - refresh.iat, 7 * 24 * 3600);
	}

	#[rstest]
	fn test_token_kinds_are_not_interchangeable(service: TokenService, persona: Persona) {
		let pair = service.issue_pair(&persona).unwrap();

		assert!(service.verify_access(&pair.refresh_token).is_err());
		assert!(service.verify_refresh(&pair.token).is_err());
	}

	#[rstest]
	fn test_expired_token_is_rejected(persona: Persona) {
		let service = TokenService::new(b"a", b"r", Duration::seconds(-10), Duration::days(7));
		let token = service.issue_access(&persona).unwrap();

		let err = service.verify_access(&token).unwrap_err();
		assert!(matches!(err, Error::Unauthorized(_)));
	}
}
