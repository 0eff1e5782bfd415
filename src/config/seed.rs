//! Startup seeding

use crate::apps::personas::models::Role;
use crate::apps::personas::service::new_persona;
use crate::core::error::Result;
use crate::state::AppState;

/// Create the configured administrator unless a persona already owns its email.
///
/// Returns `true` when a persona was inserted.
pub async fn seed_admin(state: &AppState) -> Result<bool> {
	let Some(admin) = state.settings.admin.clone() else {
		tracing::debug!("no admin account configured");
		return Ok(false);
	};

	let existing = {
		let mut tx = state.store.begin().await?;
		tx.persona_by_email(&admin.email).await?
	};
	if existing.is_some() {
		tracing::debug!(email = %admin.email, "admin account already present");
		return Ok(false);
	}

	let persona = new_persona(state, admin.username, admin.email, admin.password, Role::Admin).await?;
	let mut tx = state.store.begin().await?;
	tx.insert_persona(&persona).await?;
	tx.commit().await?;

	tracing::info!(persona_id = %persona.id, email = %persona.email, "admin account created");
	Ok(true)
}
