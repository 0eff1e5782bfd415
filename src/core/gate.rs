//! Role-based route guard
//!
//! Handlers declare their allow-list in the extractor type:
//!
//! ```ignore
//! async fn list_pacientes(Guard(user, ..): Guard<AdminOrSpecialist>) -> ...
//! ```
//!
//! Verification is stateless: only the access token's signature, expiry and
//! role claim are consulted.

use axum::extract::FromRequestParts;
use http::header::AUTHORIZATION;
use http::request::Parts;
use std::marker::PhantomData;
use uuid::Uuid;

use crate::apps::auth::jwt::TokenService;
use crate::apps::personas::models::Role;
use crate::core::error::{Error, Result};
use crate::state::AppState;

/// Authenticated caller attached to a request
#[derive(Debug, Clone, PartialEq)]
pub struct AuthUser {
	pub persona_id: Uuid,
	pub email: String,
	pub role: Role,
}

impl AuthUser {
	pub fn is_admin(&self) -> bool {
		self.role == Role::Admin
	}
}

/// Static allow-list of roles for a route
pub trait AllowList: Send + Sync + 'static {
	const ROLES: &'static [Role];
}

macro_rules! allow_list {
	($($(#[$meta:meta])* $name:ident => [$($role:ident),+];)+) => {
		$(
			$(#[$meta])*
			pub struct $name;

			impl AllowList for $name {
				const ROLES: &'static [Role] = &[$(Role::$role),+];
			}
		)+
	};
}

allow_list! {
	/// Any authenticated persona
	AnyRole => [Patient, Specialist, Admin];
	AdminOnly => [Admin];
	SpecialistOnly => [Specialist];
	AdminOrSpecialist => [Admin, Specialist];
	AdminOrPatient => [Admin, Patient];
}

/// Extractor that authenticates the caller and checks its role against `R`
pub struct Guard<R: AllowList>(pub AuthUser, pub PhantomData<fn() -> R>);

impl<R: AllowList> Guard<R> {
	pub fn user(&self) -> &AuthUser {
		&self.0
	}

	pub fn into_user(self) -> AuthUser {
		self.0
	}
}

impl<R: AllowList> FromRequestParts<AppState> for Guard<R> {
	type Rejection = Error;

	async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
		let header = parts
			.headers
			.get(AUTHORIZATION)
			.and_then(|value| value.to_str().ok());
		let user = authenticate(header, &state.tokens)?;
		authorize(&user, R::ROLES)?;
		Ok(Guard(user, PhantomData))
	}
}

/// Token from an `Authorization` header value; the `Bearer ` prefix is optional.
pub fn bearer_token(header: &str) -> Option<&str> {
	let token = header
		.strip_prefix("Bearer ")
		.or_else(|| header.strip_prefix("bearer "))
		.unwrap_or(header)
		.trim();
	(!token.is_empty()).then_some(token)
}

/// Resolve the caller from the raw `Authorization` header.
pub fn authenticate(header: Option<&str>, tokens: &TokenService) -> Result<AuthUser> {
	let token = header
		.and_then(bearer_token)
		.ok_or_else(|| Error::Forbidden("Login required".to_string()))?;

	let claims = tokens.verify_access(token).map_err(|e| {
		tracing::debug!(error = %e, "access token rejected");
		Error::Forbidden("Permission denied".to_string())
	})?;
	let persona_id = claims
		.persona_id()
		.map_err(|_| Error::Forbidden("Permission denied".to_string()))?;

	Ok(AuthUser {
		persona_id,
		email: claims.email,
		role: claims.role,
	})
}

pub fn authorize(user: &AuthUser, allowed: &[Role]) -> Result<()> {
	if allowed.contains(&user.role) {
		Ok(())
	} else {
		tracing::debug!(persona_id = %user.persona_id, role = %user.role, "role not allowed");
		Err(Error::Forbidden(
			"You do not have permission to perform this action".to_string(),
		))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::apps::personas::models::Persona;
	use chrono::Duration;
	use rstest::*;

	#[fixture]
	fn tokens() -> TokenService {
		TokenService::new(b"access", b"refresh", Duration::hours(1), Duration::days(7))
	}

	fn token_for(tokens: &TokenService, role: Role) -> (Persona, String) {
		let persona = Persona::new("u".into(), "h".into(), "u@clinic.test".into(), role);
		let token = tokens.issue_access(&persona).unwrap();
		(persona, token)
	}

	#[rstest]
	#[case("Bearer abc", Some("abc"))]
	#[case("abc", Some("abc"))]
	#[case("Bearer ", None)]
	#[case("", None)]
	fn test_bearer_token(#[case] header: &str, #[case] expected: Option<&str>) {
		assert_eq!(bearer_token(header), expected);
	}

	#[rstest]
	fn test_missing_header_requires_login(tokens: TokenService) {
		let err = authenticate(None, &tokens).unwrap_err();
		assert!(matches!(err, Error::Forbidden(ref m) if m == "Login required"));
	}

	#[rstest]
	fn test_bad_signature_is_denied(tokens: TokenService) {
		let other = TokenService::new(b"other", b"x", Duration::hours(1), Duration::days(1));
		let (_, token) = token_for(&other, Role::Admin);

		let err = authenticate(Some(&format!("Bearer {}", token)), &tokens).unwrap_err();
		assert!(matches!(err, Error::Forbidden(ref m) if m == "Permission denied"));
	}

	#[rstest]
	fn test_bare_token_accepted(tokens: TokenService) {
		let (persona, token) = token_for(&tokens, Role::Patient);
		let user = authenticate(Some(&token), &tokens).unwrap();
		assert_eq!(user.persona_id, persona.id);
		assert_eq!(user.role, Role::Patient);
	}

	#[rstest]
	#[case(Role::Admin, true)]
	#[case(Role::Specialist, true)]
	#[case(Role::Patient, false)]
	fn test_admin_or_specialist(tokens: TokenService, #[case] role: Role, #[case] allowed: bool) {
		let (_, token) = token_for(&tokens, role);
		let user = authenticate(Some(&token), &tokens).unwrap();
		assert_eq!(authorize(&user, AdminOrSpecialist::ROLES).is_ok(), allowed);
	}
}
