//! Authentication service
//!
//! Login issues an access/refresh pair, or a two-factor challenge when the
//! persona has 2FA enabled and no code was supplied. Two-factor enrollment
//! moves a persona through `NotEnrolled -> Pending -> Enabled`.

use uuid::Uuid;

use super::hasher::verify_password;
use super::serializers::{LoginRequest, LoginResponse, ProfileResponse, TwoFactorSetup};
use crate::apps::personas::models::{Persona, TwoFactor};
use crate::apps::personas::serializers::PersonaResponse;
use crate::core::error::{Error, Result};
use crate::state::AppState;

fn invalid_credentials() -> Error {
	Error::Unauthorized("Invalid credentials".to_string())
}

pub async fn login(state: &AppState, request: LoginRequest) -> Result<LoginResponse> {
	let persona = {
		let mut tx = state.store.begin().await?;
		tx.persona_by_email(&request.email).await?
	};
	let Some(persona) = persona else {
		tracing::debug!("login with unknown email");
		return Err(invalid_credentials());
	};

	let matches = verify_password(
		state.hasher.clone(),
		request.password,
		persona.password_hash.clone(),
	)
	.await?;
	if !matches {
		tracing::debug!(persona_id = %persona.id, "login with wrong password");
		return Err(invalid_credentials());
	}

	if let TwoFactor::Enabled { secret } = &persona.two_factor {
		let Some(code) = request.two_factor_code.as_deref() else {
			return Ok(LoginResponse::TwoFactorRequired {
				requires_2fa: true,
				persona_id: persona.id,
			});
		};
		if !state.totp.verify(secret, code)? {
			tracing::info!(persona_id = %persona.id, "login rejected: invalid 2FA code");
			return Err(Error::Unauthorized("Invalid 2FA code".to_string()));
		}
	}

	let pair = state.tokens.issue_pair(&persona)?;
	tracing::info!(persona_id = %persona.id, role = %persona.role, "login succeeded");
	Ok(LoginResponse::Tokens {
		token: pair.token,
		refresh_token: pair.refresh_token,
	})
}

/// Issue a new access token from a refresh token.
pub async fn refresh_access_token(state: &AppState, refresh_token: &str) -> Result<String> {
	let claims = state.tokens.verify_refresh(refresh_token).map_err(|e| {
		tracing::debug!(error = %e, "refresh token rejected");
		Error::Unauthorized("Invalid or expired refresh token".to_string())
	})?;
	let persona_id = claims.persona_id()?;

	let persona = load_persona(state, persona_id)
		.await
		.map_err(|_| Error::Unauthorized("User not found".to_string()))?;
	state.tokens.issue_access(&persona)
}

pub async fn profile(state: &AppState, persona_id: Uuid) -> Result<ProfileResponse> {
	let mut tx = state.store.begin().await?;
	let persona = tx
		.persona(persona_id)
		.await?
		.ok_or_else(|| Error::NotFound("User not found".to_string()))?;
	let paciente = tx.paciente_by_persona(persona_id).await?;
	let especialista = tx.especialista_by_persona(persona_id).await?;

	Ok(ProfileResponse {
		persona: PersonaResponse::from(persona),
		paciente,
		especialista,
	})
}

/// Start (or restart) enrollment with a new secret.
pub async fn generate_two_factor(state: &AppState, persona_id: Uuid) -> Result<TwoFactorSetup> {
	let mut tx = state.store.begin().await?;
	let mut persona = tx
		.persona(persona_id)
		.await?
		.ok_or_else(|| Error::NotFound("User not found".to_string()))?;
	if persona.two_factor.is_enabled() {
		return Err(Error::Conflict(
			"Two-factor authentication is already enabled".to_string(),
		));
	}

	let secret = state.totp.generate_secret();
	let otpauth_url = state.totp.otpauth_url(&persona.email, &secret)?;
	let qr_payload = state.totp.qr_data_uri(&otpauth_url)?;

	persona.two_factor = TwoFactor::Pending {
		secret: secret.clone(),
	};
	persona.updated_at = chrono::Utc::now();
	tx.update_persona(&persona).await?;
	tx.commit().await?;

	tracing::info!(%persona_id, "two-factor enrollment started");
	Ok(TwoFactorSetup {
		qr_payload,
		secret,
		otpauth_url,
	})
}

/// Confirm enrollment. `Ok(false)` when the code does not match; state is
/// left unchanged in that case.
pub async fn confirm_two_factor(state: &AppState, persona_id: Uuid, code: &str) -> Result<bool> {
	let mut tx = state.store.begin().await?;
	let mut persona = tx
		.persona(persona_id)
		.await?
		.ok_or_else(|| Error::NotFound("User not found".to_string()))?;

	let TwoFactor::Pending { secret } = &persona.two_factor else {
		return Err(Error::Validation(
			"Two-factor enrollment has not been started".to_string(),
		));
	};
	if !state.totp.verify(secret, code)? {
		tracing::info!(%persona_id, "two-factor confirmation failed");
		return Ok(false);
	}

	persona.two_factor = TwoFactor::Enabled {
		secret: secret.clone(),
	};
	persona.updated_at = chrono::Utc::now();
	tx.update_persona(&persona).await?;
	tx.commit().await?;

	tracing::info!(%persona_id, "two-factor authentication enabled");
	Ok(true)
}

pub async fn disable_two_factor(state: &AppState, persona_id: Uuid) -> Result<()> {
	let mut tx = state.store.begin().await?;
	let mut persona = tx
		.persona(persona_id)
		.await?
		.ok_or_else(|| Error::NotFound("User not found".to_string()))?;

	persona.two_factor = TwoFactor::NotEnrolled;
	persona.updated_at = chrono::Utc::now();
	tx.update_persona(&persona).await?;
	tx.commit().await?;

	tracing::info!(%persona_id, "two-factor authentication disabled");
	Ok(())
}

async fn load_persona(state: &AppState, persona_id: Uuid) -> Result<Persona> {
	let mut tx = state.store.begin().await?;
	tx.persona(persona_id)
		.await?
		.ok_or_else(|| Error::NotFound("User not found".to_string()))
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::apps::auth::totp::unix_now;
	use crate::apps::personas::models::Role;
	use crate::apps::personas::service::new_persona;
	use crate::config::settings::Settings;
	use crate::db::{MemoryStore, Store};
	use chrono::Utc;
	use rstest::*;
	use std::sync::Arc;

	fn state() -> AppState {
		let mut settings = Settings::default();
		settings.auth.argon2_memory_kib = 1024;
		settings.auth.argon2_iterations = 1;
		let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
		AppState::new(settings, store).unwrap()
	}

	#[fixture]
	async fn seeded() -> (AppState, Persona) {
		let state = state();
		let persona = new_persona(
			&state,
			"house".into(),
			"house@clinic.test".into(),
			"vicodin1".into(),
			Role::Specialist,
		)
		.await
		.unwrap();
		let mut tx = state.store.begin().await.unwrap();
		tx.insert_persona(&persona).await.unwrap();
		tx.commit().await.unwrap();
		(state, persona)
	}

	fn login_request(email: &str, password: &str, code: Option<String>) -> LoginRequest {
		LoginRequest {
			email: email.into(),
			password: password.into(),
			two_factor_code: code,
		}
	}

	#[rstest]
	#[tokio::test]
	async fn test_login_then_refresh(#[future] seeded: (AppState, Persona)) {
		let (state, persona) = seeded.await;

		let LoginResponse::Tokens {
			token,
			refresh_token,
		} = login(&state, login_request("house@clinic.test", "vicodin1", None))
			.await
			.unwrap()
		else {
			panic!("expected tokens");
		};
		assert_eq!(
			state.tokens.verify_access(&token).unwrap().persona_id().unwrap(),
			persona.id
		);

		let fresh = refresh_access_token(&state, &refresh_token).await.unwrap();
		assert_eq!(state.tokens.verify_access(&fresh).unwrap().role, Role::Specialist);

		// flip the first signature character
		let (head, signature) = refresh_token.rsplit_once('.').unwrap();
		let first = if signature.starts_with('A') { 'B' } else { 'A' };
		let tampered = format!("{}.{}{}", head, first, &signature[1..]);
		let err = refresh_access_token(&state, &tampered).await.unwrap_err();
		assert!(matches!(err, Error::Unauthorized(_)));
	}

	#[rstest]
	#[case("house@clinic.test", "wrong-password")]
	#[case("nobody@clinic.test", "vicodin1")]
	#[tokio::test]
	async fn test_bad_credentials_look_the_same(
		#[future] seeded: (AppState, Persona),
		#[case] email: &str,
		#[case] password: &str,
	) {
		let (state, _) = seeded.await;
		let err = login(&state, login_request(email, password, None))
			.await
			.unwrap_err();
		assert!(matches!(err, Error::Unauthorized(ref m) if m == "Invalid credentials"));
	}

	#[rstest]
	#[tokio::test]
	async fn test_soft_deleted_persona_cannot_login(#[future] seeded: (AppState, Persona)) {
		let (state, persona) = seeded.await;
		let mut tx = state.store.begin().await.unwrap();
		tx.soft_delete_persona(persona.id, Utc::now()).await.unwrap();
		tx.commit().await.unwrap();

		let err = login(&state, login_request("house@clinic.test", "vicodin1", None))
			.await
			.unwrap_err();
		assert!(matches!(err, Error::Unauthorized(_)));
	}

	#[rstest]
	#[tokio::test]
	async fn test_two_factor_round_trip(#[future] seeded: (AppState, Persona)) {
		let (state, persona) = seeded.await;

		let setup = generate_two_factor(&state, persona.id).await.unwrap();
		assert!(setup.qr_payload.starts_with("data:image/svg+xml;base64,"));
		assert!(setup.otpauth_url.contains(&setup.secret));

		// a wrong code keeps the enrollment pending
		let wrong = ["000000", "111111", "222222", "333333"]
			.into_iter()
			.find(|c| !state.totp.verify(&setup.secret, c).unwrap())
			.unwrap();
		assert!(!confirm_two_factor(&state, persona.id, wrong).await.unwrap());

		let code = state.totp.code_at(&setup.secret, unix_now()).unwrap();
		assert!(confirm_two_factor(&state, persona.id, &code).await.unwrap());

		let challenge = login(&state, login_request("house@clinic.test", "vicodin1", None))
			.await
			.unwrap();
		assert_eq!(
			challenge,
			LoginResponse::TwoFactorRequired {
				requires_2fa: true,
				persona_id: persona.id,
			}
		);

		let code = state.totp.code_at(&setup.secret, unix_now()).unwrap();
		let tokens = login(
			&state,
			login_request("house@clinic.test", "vicodin1", Some(code)),
		)
		.await
		.unwrap();
		assert!(matches!(tokens, LoginResponse::Tokens { .. }));

		disable_two_factor(&state, persona.id).await.unwrap();
		let plain = login(&state, login_request("house@clinic.test", "vicodin1", None))
			.await
			.unwrap();
		assert!(matches!(plain, LoginResponse::Tokens { .. }));
	}

	#[rstest]
	#[tokio::test]
	async fn test_confirm_without_enrollment(#[future] seeded: (AppState, Persona)) {
		let (state, persona) = seeded.await;
		let err = confirm_two_factor(&state, persona.id, "123456")
			.await
			.unwrap_err();
		assert!(matches!(err, Error::Validation(_)));
	}
}
