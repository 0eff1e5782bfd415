//! clinica-api server entry point
//!
//! Settings come from `CLINICA_SETTINGS` or `settings/<CLINICA_ENV>.toml`,
//! overridden by `CLINICA_*` environment variables. Without a database URL
//! the server runs on the in-memory store.

use std::sync::Arc;

use anyhow::Context;
use clinica::config::seed::seed_admin;
use clinica::config::settings::Settings;
use clinica::core::logging::init_tracing;
use clinica::db::{MemoryStore, PgStore, Store};
use clinica::{AppState, routes};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	let settings = Settings::load().context("failed to load settings")?;
	init_tracing(&settings.logging.filter);

	if settings.uses_default_secrets() {
		tracing::warn!("running with the built-in JWT secrets; set CLINICA_AUTH__ACCESS_SECRET and CLINICA_AUTH__REFRESH_SECRET");
	}

	let store: Arc<dyn Store> = match settings.database.url.as_deref() {
		Some(url) => {
			let store = PgStore::connect(url, &settings.database)
				.await
				.context("failed to connect to the database")?;
			if settings.database.run_migrations {
				store.migrate().await.context("failed to run migrations")?;
				tracing::info!("migrations applied");
			}
			Arc::new(store)
		}
		None => {
			tracing::warn!("no database url configured; using the in-memory store");
			Arc::new(MemoryStore::new())
		}
	};

	let address = settings.bind_address();
	let state = AppState::new(settings, store).context("failed to build application state")?;
	seed_admin(&state)
		.await
		.context("failed to seed the admin account")?;

	let listener = TcpListener::bind(&address)
		.await
		.with_context(|| format!("failed to bind {}", address))?;
	tracing::info!(%address, "server listening");

	axum::serve(listener, routes(state))
		.with_graceful_shutdown(shutdown_signal())
		.await
		.context("server error")?;

	tracing::info!("server stopped");
	Ok(())
}

async fn shutdown_signal() {
	if let Err(e) = tokio::signal::ctrl_c().await {
		tracing::error!(error = %e, "failed to listen for the shutdown signal");
		std::future::pending::<()>().await;
	}
	tracing::info!("shutdown signal received");
}
