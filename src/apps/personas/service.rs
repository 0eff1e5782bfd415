//! Persona writes shared by the role apps, and the profile update operation

use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use super::models::{Persona, Role};
use super::serializers::{PersonaForm, PersonaResponse};
use crate::apps::auth::hasher::hash_password;
use crate::core::error::{Error, Result};
use crate::core::gate::AuthUser;
use crate::db::StoreTx;
use crate::state::AppState;

/// Pending changes to a persona row; the password is already hashed
#[derive(Debug, Default, Clone)]
pub struct PersonaPatch {
	pub username: Option<String>,
	pub email: Option<String>,
	pub password_hash: Option<String>,
	pub image: Option<String>,
}

impl PersonaPatch {
	/// Hash `password` (if any) outside of any unit of work.
	pub async fn prepare(
		state: &AppState,
		username: Option<String>,
		email: Option<String>,
		password: Option<String>,
	) -> Result<Self> {
		let password_hash = match password {
			Some(password) => Some(hash_password(state.hasher.clone(), password).await?),
			None => None,
		};
		Ok(Self {
			username,
			email,
			password_hash,
			image: None,
		})
	}

	pub fn is_empty(&self) -> bool {
		self.username.is_none()
			&& self.email.is_none()
			&& self.password_hash.is_none()
			&& self.image.is_none()
	}

	pub fn apply_to(self, persona: &mut Persona) {
		if let Some(username) = self.username {
			persona.username = username;
		}
		if let Some(email) = self.email {
			persona.email = email;
		}
		if let Some(hash) = self.password_hash {
			persona.password_hash = hash;
		}
		if let Some(image) = self.image {
			persona.image = Some(image);
		}
		persona.updated_at = Utc::now();
	}
}

/// Build a persona with a freshly hashed password and a forced role.
pub async fn new_persona(
	state: &AppState,
	username: String,
	email: String,
	password: String,
	role: Role,
) -> Result<Persona> {
	let hash = hash_password(state.hasher.clone(), password).await?;
	Ok(Persona::new(username, hash, email, role))
}

/// Apply `patch` to the persona inside `tx`.
///
/// An empty patch against a missing persona is not an error; a non-empty one is.
pub async fn patch_persona(
	tx: &mut dyn StoreTx,
	persona_id: Uuid,
	patch: PersonaPatch,
) -> Result<Option<Persona>> {
	let Some(mut persona) = tx.persona(persona_id).await? else {
		if patch.is_empty() {
			return Ok(None);
		}
		return Err(Error::NotFound("Persona not found".to_string()));
	};
	if patch.is_empty() {
		return Ok(Some(persona));
	}
	patch.apply_to(&mut persona);
	tx.update_persona(&persona).await?;
	Ok(Some(persona))
}

/// Soft-delete the persona, skipping silently when it is already gone.
pub async fn retire_persona(tx: &mut dyn StoreTx, persona_id: Uuid) -> Result<()> {
	if !tx.soft_delete_persona(persona_id, Utc::now()).await? {
		tracing::debug!(%persona_id, "linked persona already absent; skipping");
	}
	Ok(())
}

/// Update username, email, password and profile image of a persona.
///
/// Allowed for administrators and for the persona itself.
pub async fn update_persona(
	state: &AppState,
	requester: &AuthUser,
	persona_id: Uuid,
	form: PersonaForm,
) -> Result<PersonaResponse> {
	if !requester.is_admin() && requester.persona_id != persona_id {
		return Err(Error::Forbidden(
			"You can only update your own profile".to_string(),
		));
	}
	form.validate()?;

	let PersonaForm {
		username,
		email,
		password,
		image,
	} = form;
	let mut patch = PersonaPatch::prepare(state, username, email, password).await?;

	if let Some(upload) = &image {
		let path = state
			.images
			.save_profile_image(&upload.file_name, &upload.content)
			.await?;
		patch.image = Some(path);
	}
	let new_image = patch.image.clone();

	let outcome = async {
		let mut tx = state.store.begin().await?;
		let previous = tx
			.persona(persona_id)
			.await?
			.ok_or_else(|| Error::NotFound("Persona not found".to_string()))?;
		let updated = patch_persona(tx.as_mut(), persona_id, patch)
			.await?
			.ok_or_else(|| Error::NotFound("Persona not found".to_string()))?;
		tx.commit().await?;
		Ok::<_, Error>((previous.image, updated))
	}
	.await;

	match outcome {
		Ok((previous_image, updated)) => {
			if let (Some(old), Some(_)) = (previous_image, &new_image) {
				if let Err(e) = state.images.delete(&old).await {
					tracing::warn!(path = %old, error = %e, "could not remove replaced image");
				}
			}
			tracing::info!(%persona_id, "persona updated");
			Ok(PersonaResponse::from(updated))
		}
		Err(err) => {
			if let Some(path) = new_image {
				if let Err(e) = state.images.delete(&path).await {
					tracing::warn!(path = %path, error = %e, "could not remove orphaned image");
				}
			}
			Err(err)
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::apps::personas::serializers::UploadedImage;
	use crate::config::settings::Settings;
	use crate::db::{MemoryStore, Store};
	use crate::storage::LocalImageStorage;
	use rstest::*;
	use std::sync::Arc;
	use tempfile::TempDir;

	struct Fixture {
		state: AppState,
		persona: Persona,
		_media: TempDir,
	}

	fn requester(persona: &Persona) -> AuthUser {
		AuthUser {
			persona_id: persona.id,
			email: persona.email.clone(),
			role: persona.role,
		}
	}

	#[fixture]
	async fn fixture() -> Fixture {
		let media = TempDir::new().unwrap();
		let mut settings = Settings::default();
		settings.auth.argon2_memory_kib = 1024;
		settings.auth.argon2_iterations = 1;
		let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
		let images = Arc::new(LocalImageStorage::new(media.path(), 1024));
		let state = AppState::with_images(settings, store, images).unwrap();

		let persona = new_persona(
			&state,
			"ana".into(),
			"ana@clinic.test".into(),
			"secret1".into(),
			Role::Patient,
		)
		.await
		.unwrap();
		let mut tx = state.store.begin().await.unwrap();
		tx.insert_persona(&persona).await.unwrap();
		tx.commit().await.unwrap();

		Fixture {
			state,
			persona,
			_media: media,
		}
	}

	#[rstest]
	#[tokio::test]
	async fn test_self_update_with_image(#[future] fixture: Fixture) {
		let f = fixture.await;
		let form = PersonaForm {
			email: Some("ana.p@clinic.test".into()),
			image: Some(UploadedImage {
				file_name: "me.png".into(),
				content: b"png-bytes".to_vec(),
			}),
			..Default::default()
		};

		let updated = update_persona(&f.state, &requester(&f.persona), f.persona.id, form)
			.await
			.unwrap();

		assert_eq!(updated.email, "ana.p@clinic.test");
		let image = updated.image.unwrap();
		assert!(image.starts_with("images/profile/"));
		assert!(f._media.path().join(image).exists());
	}

	#[rstest]
	#[tokio::test]
	async fn test_other_persona_is_forbidden(#[future] fixture: Fixture) {
		let f = fixture.await;
		let stranger = AuthUser {
			persona_id: Uuid::new_v4(),
			email: "x@clinic.test".into(),
			role: Role::Specialist,
		};

		let err = update_persona(&f.state, &stranger, f.persona.id, PersonaForm::default())
			.await
			.unwrap_err();
		assert!(matches!(err, Error::Forbidden(_)));
	}

	#[rstest]
	#[tokio::test]
	async fn test_password_change_rehashes(#[future] fixture: Fixture) {
		let f = fixture.await;
		let admin = AuthUser {
			persona_id: Uuid::new_v4(),
			email: "root@clinic.test".into(),
			role: Role::Admin,
		};
		let form = PersonaForm {
			password: Some("n3w-password".into()),
			..Default::default()
		};
		update_persona(&f.state, &admin, f.persona.id, form)
			.await
			.unwrap();

		let mut tx = f.state.store.begin().await.unwrap();
		let stored = tx.persona(f.persona.id).await.unwrap().unwrap();
		assert_ne!(stored.password_hash, f.persona.password_hash);
		assert!(f.state.hasher.verify("n3w-password", &stored.password_hash).unwrap());
	}

	#[rstest]
	#[tokio::test]
	async fn test_invalid_email_rejected(#[future] fixture: Fixture) {
		let f = fixture.await;
		let form = PersonaForm {
			email: Some("not-an-email".into()),
			..Default::default()
		};
		let err = update_persona(&f.state, &requester(&f.persona), f.persona.id, form)
			.await
			.unwrap_err();
		assert!(matches!(err, Error::Validation(_)));
	}

	#[rstest]
	#[case("ñ".repeat(100), true)]
	#[case("ñ".repeat(150), true)]
	#[case("n".repeat(151), false)]
	#[case(String::new(), false)]
	#[tokio::test]
	async fn test_username_length_counts_characters(
		#[future] fixture: Fixture,
		#[case] username: String,
		#[case] accepted: bool,
	) {
		let f = fixture.await;
		let form = PersonaForm {
			username: Some(username),
			..Default::default()
		};
		let outcome = update_persona(&f.state, &requester(&f.persona), f.persona.id, form).await;
		match outcome {
			Ok(_) => assert!(accepted),
			Err(err) => {
				assert!(!accepted);
				assert!(matches!(err, Error::Validation(_)));
			}
		}
	}

	#[rstest]
	#[tokio::test]
	async fn test_failed_update_removes_new_image(#[future] fixture: Fixture) {
		let f = fixture.await;
		let admin = AuthUser {
			persona_id: Uuid::new_v4(),
			email: "root@clinic.test".into(),
			role: Role::Admin,
		};
		let form = PersonaForm {
			image: Some(UploadedImage {
				file_name: "me.png".into(),
				content: b"png-bytes".to_vec(),
			}),
			..Default::default()
		};

		let err = update_persona(&f.state, &admin, Uuid::new_v4(), form)
			.await
			.unwrap_err();
		assert!(matches!(err, Error::NotFound(_)));

		let profile_dir = f._media.path().join("images/profile");
		let leftovers = std::fs::read_dir(&profile_dir)
			.map(|entries| entries.count())
			.unwrap_or(0);
		assert_eq!(leftovers, 0);
	}
}
