use std::sync::Arc;

use crate::apps::auth::hasher::{Argon2Hasher, PasswordHasher};
use crate::apps::auth::jwt::TokenService;
use crate::apps::auth::totp::TotpManager;
use crate::config::settings::Settings;
use crate::core::error::Result;
use crate::db::Store;
use crate::storage::{ImageStorage, LocalImageStorage};

/// Shared, immutable per-process state handed to every handler
#[derive(Clone)]
pub struct AppState {
	pub store: Arc<dyn Store>,
	pub tokens: Arc<TokenService>,
	pub hasher: Arc<dyn PasswordHasher>,
	pub totp: Arc<TotpManager>,
	pub images: Arc<dyn ImageStorage>,
	pub settings: Arc<Settings>,
}

impl AppState {
	/// Build the collaborators described by `settings` around `store`.
	pub fn new(settings: Settings, store: Arc<dyn Store>) -> Result<Self> {
		let images = Arc::new(LocalImageStorage::new(
			settings.media.root.clone(),
			settings.media.max_image_bytes,
		));
		Self::with_images(settings, store, images)
	}

	pub fn with_images(
		settings: Settings,
		store: Arc<dyn Store>,
		images: Arc<dyn ImageStorage>,
	) -> Result<Self> {
		let hasher = Argon2Hasher::with_params(
			settings.auth.argon2_memory_kib,
			settings.auth.argon2_iterations,
			settings.auth.argon2_parallelism,
		)?;
		Ok(Self {
			store,
			tokens: Arc::new(TokenService::from_settings(&settings.auth)),
			hasher: Arc::new(hasher),
			totp: Arc::new(TotpManager::new(settings.auth.totp_issuer.clone())),
			images,
			settings: Arc::new(settings),
		})
	}
}
