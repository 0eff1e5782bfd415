use argon2::{Algorithm, Argon2, Params, Version};
use std::sync::Arc;

use crate::core::error::{Error, Result};

/// Password hasher trait
///
/// Implement this trait to plug in a different hashing algorithm.
///
/// # Examples
///
/// ```
/// use clinica::apps::auth::hasher::{Argon2Hasher, PasswordHasher};
///
/// let hasher = Argon2Hasher::with_params(1024, 1, 1).unwrap();
/// let hash = hasher.hash("s3cret-pass").unwrap();
///
/// assert!(hasher.verify("s3cret-pass", &hash).unwrap());
/// assert!(!hasher.verify("wrong", &hash).unwrap());
/// ```
pub trait PasswordHasher: Send + Sync {
	/// Hashes a password into a PHC string
	fn hash(&self, password: &str) -> Result<String>;

	/// Verifies a password against a PHC string
	///
	/// `Ok(false)` on mismatch; `Err` only when the stored hash is unreadable.
	fn verify(&self, password: &str, hash: &str) -> Result<bool>;
}

/// Argon2id password hasher
pub struct Argon2Hasher {
	params: Params,
}

impl Argon2Hasher {
	/// Hasher with the argon2 crate's default cost parameters
	pub fn new() -> Self {
		Self {
			params: Params::default(),
		}
	}

	/// Hasher with explicit memory (KiB), iteration and lane costs
	pub fn with_params(memory_kib: u32, iterations: u32, parallelism: u32) -> Result<Self> {
		let params = Params::new(memory_kib, iterations, parallelism, None)
			.map_err(|e| Error::Internal(format!("invalid argon2 parameters: {}", e)))?;
		Ok(Self { params })
	}

	fn argon2(&self) -> Argon2<'static> {
		Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
	}
}

impl Default for Argon2Hasher {
	fn default() -> Self {
		Self::new()
	}
}

impl PasswordHasher for Argon2Hasher {
	fn hash(&self, password: &str) -> Result<String> {
		use argon2::password_hash::{PasswordHasher as _, SaltString};
		use rand::RngCore;

		let mut salt_bytes = [0u8; 16];
		rand::thread_rng().fill_bytes(&mut salt_bytes);

		let salt =
			SaltString::encode_b64(&salt_bytes).map_err(|e| Error::Internal(e.to_string()))?;

		self.argon2()
			.hash_password(password.as_bytes(), &salt)
			.map(|hash| hash.to_string())
			.map_err(|e| Error::Internal(e.to_string()))
	}

	fn verify(&self, password: &str, hash: &str) -> Result<bool> {
		use argon2::password_hash::{PasswordHash, PasswordVerifier};

		let parsed_hash = PasswordHash::new(hash).map_err(|e| Error::Internal(e.to_string()))?;

		Ok(self
			.argon2()
			.verify_password(password.as_bytes(), &parsed_hash)
			.is_ok())
	}
}

/// Hash on the blocking pool so request workers are not stalled.
pub async fn hash_password(hasher: Arc<dyn PasswordHasher>, password: String) -> Result<String> {
	tokio::task::spawn_blocking(move || hasher.hash(&password))
		.await
		.map_err(|e| Error::Internal(format!("hashing task failed: {}", e)))?
}

/// Verify on the blocking pool.
pub async fn verify_password(
	hasher: Arc<dyn PasswordHasher>,
	password: String,
	hash: String,
) -> Result<bool> {
	tokio::task::spawn_blocking(move || hasher.verify(&password, &hash))
		.await
		.map_err(|e| Error::Internal(format!("verification task failed: {}", e)))?
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::*;

	#[fixture]
	fn hasher() -> Argon2Hasher {
		Argon2Hasher::with_params(1024, 1, 1).unwrap()
	}

	#[rstest]
	fn test_hash_is_salted(hasher: Argon2Hasher) {
		let first = hasher.hash("password123").unwrap();
		let second = hasher.hash("password123").unwrap();

		assert_ne!(first, second);
		assert!(first.starts_with("$argon2id$"));
		assert!(hasher.verify("password123", &first).unwrap());
		assert!(hasher.verify("password123", &second).unwrap());
	}

	#[rstest]
	fn test_malformed_hash_is_an_error(hasher: Argon2Hasher) {
		assert!(hasher.verify("password123", "not-a-phc-string").is_err());
	}

	#[rstest]
	#[tokio::test]
	async fn test_blocking_helpers(hasher: Argon2Hasher) {
		let hasher: Arc<dyn PasswordHasher> = Arc::new(hasher);
		let hash = hash_password(hasher.clone(), "p4ss".to_string()).await.unwrap();

		assert!(verify_password(hasher.clone(), "p4ss".into(), hash.clone()).await.unwrap());
		assert!(!verify_password(hasher, "nope".into(), hash).await.unwrap());
	}
}
