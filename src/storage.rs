//! Profile image storage
//!
//! Uploaded images are validated (size ceiling, extension allow-list) and
//! written under `images/profile/<uuid>.<ext>` relative to the media root.
//! Personas store only that relative path.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use uuid::Uuid;

use crate::core::error::{Error, Result};

pub const ALLOWED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif"];
const PROFILE_DIR: &str = "images/profile";

/// Image storage backend
#[async_trait]
pub trait ImageStorage: Send + Sync {
	/// Store an uploaded profile image and return its relative path.
	async fn save_profile_image(&self, file_name: &str, content: &[u8]) -> Result<String>;

	/// Remove a previously stored image. Missing files are ignored.
	async fn delete(&self, relative_path: &str) -> Result<()>;
}

/// Local file system image storage
#[derive(Debug, Clone)]
pub struct LocalImageStorage {
	base_path: PathBuf,
	max_bytes: usize,
}

impl LocalImageStorage {
	pub fn new(base_path: impl Into<PathBuf>, max_bytes: usize) -> Self {
		Self {
			base_path: base_path.into(),
			max_bytes,
		}
	}

	pub fn base_path(&self) -> &Path {
		&self.base_path
	}

	fn get_path(&self, name: &str) -> Result<PathBuf> {
		let relative = Path::new(name);
		if relative.is_absolute()
			|| relative
				.components()
				.any(|c| matches!(c, std::path::Component::ParentDir))
		{
			return Err(Error::Validation("Invalid file path".to_string()));
		}
		Ok(self.base_path.join(relative))
	}
}

/// Lowercased extension of `file_name` when it is an accepted image type.
///
/// # Examples
///
/// ```
/// use clinica::storage::image_extension;
///
/// assert_eq!(image_extension("me.JPG").unwrap(), "jpg");
/// assert!(image_extension("notes.pdf").is_err());
/// assert!(image_extension("noext").is_err());
/// ```
pub fn image_extension(file_name: &str) -> Result<String> {
	let extension = Path::new(file_name)
		.extension()
		.and_then(|e| e.to_str())
		.map(|e| e.to_ascii_lowercase())
		.ok_or_else(|| Error::Validation("Image file must have an extension".to_string()))?;

	if !ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
		return Err(Error::Validation(format!(
			"Unsupported image type '{}'; allowed: {}",
			extension,
			ALLOWED_EXTENSIONS.join(", ")
		)));
	}
	Ok(extension)
}

#[async_trait]
impl ImageStorage for LocalImageStorage {
	async fn save_profile_image(&self, file_name: &str, content: &[u8]) -> Result<String> {
		if content.is_empty() {
			return Err(Error::Validation("Image file is empty".to_string()));
		}
		if content.len() > self.max_bytes {
			return Err(Error::Validation(format!(
				"Image exceeds the {} byte limit",
				self.max_bytes
			)));
		}
		let extension = image_extension(file_name)?;

		let name = format!("{}/{}.{}", PROFILE_DIR, Uuid::new_v4(), extension);
		let path = self.get_path(&name)?;

		if let Some(parent) = path.parent() {
			fs::create_dir_all(parent)
				.await
				.map_err(|e| Error::Internal(format!("cannot create {}: {}", parent.display(), e)))?;
		}
		fs::write(&path, content)
			.await
			.map_err(|e| Error::Internal(format!("cannot write {}: {}", path.display(), e)))?;

		tracing::debug!(path = %name, bytes = content.len(), "profile image stored");
		Ok(name)
	}

	async fn delete(&self, relative_path: &str) -> Result<()> {
		let path = self.get_path(relative_path)?;
		match fs::remove_file(&path).await {
			Ok(()) => Ok(()),
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
			Err(e) => Err(Error::Internal(format!(
				"cannot delete {}: {}",
				path.display(),
				e
			))),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::*;
	use tempfile::TempDir;

	#[fixture]
	fn media() -> TempDir {
		TempDir::new().unwrap()
	}

	#[rstest]
	#[tokio::test]
	async fn test_save_writes_under_profile_dir(media: TempDir) {
		let storage = LocalImageStorage::new(media.path(), 1024);

		let name = storage
			.save_profile_image("avatar.PNG", b"\x89PNG fake")
			.await
			.unwrap();

		assert!(name.starts_with("images/profile/"));
		assert!(name.ends_with(".png"));
		let stored = std::fs::read(media.path().join(&name)).unwrap();
		assert_eq!(stored, b"\x89PNG fake");
	}

	#[rstest]
	#[tokio::test]
	async fn test_oversized_image_rejected(media: TempDir) {
		let storage = LocalImageStorage::new(media.path(), 4);

		let err = storage
			.save_profile_image("a.jpg", b"too large")
			.await
			.unwrap_err();
		assert!(matches!(err, Error::Validation(_)));
	}

	#[rstest]
	#[tokio::test]
	async fn test_delete_is_idempotent(media: TempDir) {
		let storage = LocalImageStorage::new(media.path(), 1024);
		let name = storage.save_profile_image("a.gif", b"GIF89a").await.unwrap();

		storage.delete(&name).await.unwrap();
		storage.delete(&name).await.unwrap();
		assert!(!media.path().join(&name).exists());
	}

	#[rstest]
	#[tokio::test]
	async fn test_traversal_rejected(media: TempDir) {
		let storage = LocalImageStorage::new(media.path(), 1024);
		assert!(storage.delete("../etc/passwd").await.is_err());
	}
}
