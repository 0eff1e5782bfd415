//! Settings
//!
//! Layered configuration, lowest priority first:
//! 1. Built-in defaults
//! 2. TOML file at `CLINICA_SETTINGS`, or `settings/<CLINICA_ENV>.toml`
//!    (profile defaults to `local`) when it exists
//! 3. Environment variables with the `CLINICA_` prefix, nested keys separated
//!    by a double underscore (`CLINICA_DATABASE__URL`, `CLINICA_SERVER__PORT`)

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};

const ENV_PREFIX: &str = "CLINICA_";
const DEFAULT_ACCESS_SECRET: &str = "insecure-access-secret-change-me";
const DEFAULT_REFRESH_SECRET: &str = "insecure-refresh-secret-change-me";

/// Error type for settings loading
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
	#[error("IO error reading {path}: {source}")]
	Io {
		path: PathBuf,
		source: std::io::Error,
	},

	#[error("TOML error: {0}")]
	Toml(#[from] toml::de::Error),

	#[error("Serialization error: {0}")]
	Serialize(#[from] toml::ser::Error),

	#[error("Invalid settings: {0}")]
	Invalid(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
	pub debug: bool,
	pub server: ServerSettings,
	pub database: DatabaseSettings,
	pub auth: AuthSettings,
	pub media: MediaSettings,
	pub logging: LoggingSettings,
	/// Administrator created at startup when no persona has its email
	#[serde(skip_serializing_if = "Option::is_none")]
	pub admin: Option<AdminSeed>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerSettings {
	pub host: String,
	pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DatabaseSettings {
	/// PostgreSQL URL; the in-memory store is used when absent
	#[serde(skip_serializing_if = "Option::is_none")]
	pub url: Option<String>,
	pub max_connections: u32,
	pub min_connections: u32,
	pub acquire_timeout_secs: u64,
	pub idle_timeout_secs: u64,
	pub run_migrations: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AuthSettings {
	pub access_secret: String,
	pub refresh_secret: String,
	pub access_ttl_secs: i64,
	pub refresh_ttl_secs: i64,
	pub totp_issuer: String,
	/// Argon2 memory cost in KiB
	pub argon2_memory_kib: u32,
	pub argon2_iterations: u32,
	pub argon2_parallelism: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MediaSettings {
	pub root: PathBuf,
	pub max_image_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingSettings {
	/// `EnvFilter` directive used when `RUST_LOG` is unset
	pub filter: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AdminSeed {
	pub username: String,
	pub email: String,
	pub password: String,
}

impl Default for Settings {
	fn default() -> Self {
		Self {
			debug: false,
			server: ServerSettings::default(),
			database: DatabaseSettings::default(),
			auth: AuthSettings::default(),
			media: MediaSettings::default(),
			logging: LoggingSettings::default(),
			admin: None,
		}
	}
}

impl Default for ServerSettings {
	fn default() -> Self {
		Self {
			host: "0.0.0.0".to_string(),
			port: 3000,
		}
	}
}

impl Default for DatabaseSettings {
	fn default() -> Self {
		Self {
			url: None,
			max_connections: 10,
			min_connections: 1,
			acquire_timeout_secs: 30,
			idle_timeout_secs: 600,
			run_migrations: true,
		}
	}
}

impl Default for AuthSettings {
	fn default() -> Self {
		Self {
			access_secret: DEFAULT_ACCESS_SECRET.to_string(),
			refresh_secret: DEFAULT_REFRESH_SECRET.to_string(),
			access_ttl_secs: 3600,
			refresh_ttl_secs: 7 * 24 * 3600,
			totp_issuer: "Clinica".to_string(),
			argon2_memory_kib: 19 * 1024,
			argon2_iterations: 2,
			argon2_parallelism: 1,
		}
	}
}

impl Default for MediaSettings {
	fn default() -> Self {
		Self {
			root: PathBuf::from("media"),
			max_image_bytes: 5 * 1024 * 1024,
		}
	}
}

impl Default for LoggingSettings {
	fn default() -> Self {
		Self {
			filter: "info,sqlx=warn".to_string(),
		}
	}
}

impl Settings {
	/// Load settings from the process environment.
	pub fn load() -> Result<Self, SettingsError> {
		let vars: HashMap<String, String> = env::vars().collect();
		let path = match vars.get("CLINICA_SETTINGS") {
			Some(path) => Some(PathBuf::from(path)),
			None => {
				let profile = vars
					.get("CLINICA_ENV")
					.map(String::as_str)
					.unwrap_or("local");
				let candidate = Path::new("settings").join(format!("{}.toml", profile));
				candidate.exists().then_some(candidate)
			}
		};
		Self::from_sources(path.as_deref(), &vars)
	}

	/// Merge defaults, an optional TOML file and `CLINICA_*` variables.
	pub fn from_sources(
		file: Option<&Path>,
		vars: &HashMap<String, String>,
	) -> Result<Self, SettingsError> {
		let toml::Value::Table(mut merged) = toml::Value::try_from(Settings::default())? else {
			return Err(SettingsError::Invalid("defaults did not serialize to a table".into()));
		};

		if let Some(path) = file {
			let content = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
				path: path.to_path_buf(),
				source,
			})?;
			let table: toml::Table = toml::from_str(&content)?;
			merge_tables(&mut merged, table);
		}

		merge_tables(&mut merged, env_table(vars));

		let settings: Settings = toml::Value::Table(merged).try_into()?;
		settings.validate()?;
		Ok(settings)
	}

	pub fn validate(&self) -> Result<(), SettingsError> {
		if self.auth.access_secret.is_empty() || self.auth.refresh_secret.is_empty() {
			return Err(SettingsError::Invalid("token secrets must not be empty".into()));
		}
		if self.auth.access_secret == self.auth.refresh_secret {
			return Err(SettingsError::Invalid(
				"access and refresh secrets must differ".into(),
			));
		}
		if self.auth.access_ttl_secs <= 0 || self.auth.refresh_ttl_secs <= 0 {
			return Err(SettingsError::Invalid("token lifetimes must be positive".into()));
		}
		if self.database.min_connections > self.database.max_connections {
			return Err(SettingsError::Invalid(
				"database.min_connections exceeds max_connections".into(),
			));
		}
		Ok(())
	}

	/// True while either token secret is still the built-in placeholder.
	pub fn uses_default_secrets(&self) -> bool {
		self.auth.access_secret == DEFAULT_ACCESS_SECRET
			|| self.auth.refresh_secret == DEFAULT_REFRESH_SECRET
	}

	pub fn bind_address(&self) -> String {
		format!("{}:{}", self.server.host, self.server.port)
	}
}

fn env_table(vars: &HashMap<String, String>) -> toml::Table {
	let mut table = toml::Table::new();
	for (key, raw) in vars {
		let Some(rest) = key.strip_prefix(ENV_PREFIX) else {
			continue;
		};
		if rest == "ENV" || rest == "SETTINGS" || rest.is_empty() {
			continue;
		}

		let path: Vec<String> = rest.split("__").map(|s| s.to_ascii_lowercase()).collect();
		let mut cursor = &mut table;
		for segment in &path[..path.len() - 1] {
			let entry = cursor
				.entry(segment.clone())
				.or_insert_with(|| toml::Value::Table(toml::Table::new()));
			if !entry.is_table() {
				*entry = toml::Value::Table(toml::Table::new());
			}
			let toml::Value::Table(next) = entry else {
				unreachable!("entry was just made a table");
			};
			cursor = next;
		}
		cursor.insert(path[path.len() - 1].clone(), parse_env_value(raw));
	}
	table
}

fn parse_env_value(raw: &str) -> toml::Value {
	if let Ok(b) = raw.parse::<bool>() {
		return toml::Value::Boolean(b);
	}
	if let Ok(i) = raw.parse::<i64>() {
		return toml::Value::Integer(i);
	}
	toml::Value::String(raw.to_string())
}

fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
	for (key, value) in overlay {
		match (base.get_mut(&key), value) {
			(Some(toml::Value::Table(existing)), toml::Value::Table(incoming)) => {
				merge_tables(existing, incoming)
			}
			(_, value) => {
				base.insert(key, value);
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use std::io::Write;

	fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
		pairs
			.iter()
			.map(|(k, v)| (k.to_string(), v.to_string()))
			.collect()
	}

	#[rstest]
	fn test_defaults_without_sources() {
		let settings = Settings::from_sources(None, &HashMap::new()).unwrap();
		assert_eq!(settings, Settings::default());
		assert_eq!(settings.auth.access_ttl_secs, 3600);
		assert_eq!(settings.media.max_image_bytes, 5 * 1024 * 1024);
		assert!(settings.uses_default_secrets());
	}

	#[rstest]
	fn test_env_overrides_file() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		writeln!(
			file,
			"[server]\nport = 8080\n\n[database]\nurl = \"postgres://file/db\"\nmax_connections = 4"
		)
		.unwrap();

		let env = vars(&[
			("CLINICA_SERVER__PORT", "9090"),
			("CLINICA_AUTH__TOTP_ISSUER", "Clinica Central"),
			("CLINICA_DEBUG", "true"),
			("UNRELATED", "x"),
		]);
		let settings = Settings::from_sources(Some(file.path()), &env).unwrap();

		assert_eq!(settings.server.port, 9090);
		assert_eq!(settings.database.url.as_deref(), Some("postgres://file/db"));
		assert_eq!(settings.database.max_connections, 4);
		assert_eq!(settings.auth.totp_issuer, "Clinica Central");
		assert!(settings.debug);
	}

	#[rstest]
	fn test_admin_seed_from_env() {
		let env = vars(&[
			("CLINICA_ADMIN__USERNAME", "root"),
			("CLINICA_ADMIN__EMAIL", "root@clinic.test"),
			("CLINICA_ADMIN__PASSWORD", "changeme"),
		]);
		let settings = Settings::from_sources(None, &env).unwrap();
		let admin = settings.admin.unwrap();
		assert_eq!(admin.email, "root@clinic.test");
	}

	#[rstest]
	fn test_identical_secrets_rejected() {
		let env = vars(&[
			("CLINICA_AUTH__ACCESS_SECRET", "same"),
			("CLINICA_AUTH__REFRESH_SECRET", "same"),
		]);
		let err = Settings::from_sources(None, &env).unwrap_err();
		assert!(matches!(err, SettingsError::Invalid(_)));
	}
}
