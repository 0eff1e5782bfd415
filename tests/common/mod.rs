//! Shared harness: the full router over an in-memory store

#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use clinica::config::seed::seed_admin;
use clinica::config::settings::{AdminSeed, Settings};
use clinica::db::{MemoryStore, Store};
use clinica::{AppState, routes};
use http::{Method, Request, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

pub const ADMIN_EMAIL: &str = "admin@clinic.test";
pub const ADMIN_PASSWORD: &str = "admin-pass";

pub struct TestApp {
	pub router: Router,
	pub state: AppState,
	pub store: MemoryStore,
}

impl TestApp {
	pub async fn new() -> Self {
		let mut settings = Settings::default();
		settings.auth.argon2_memory_kib = 1024;
		settings.auth.argon2_iterations = 1;
		settings.media.root = std::env::temp_dir().join(format!("clinica-{}", uuid::Uuid::new_v4()));
		settings.admin = Some(AdminSeed {
			username: "admin".into(),
			email: ADMIN_EMAIL.into(),
			password: ADMIN_PASSWORD.into(),
		});

		let store = MemoryStore::new();
		let state = AppState::new(settings, Arc::new(store.clone()) as Arc<dyn Store>).unwrap();
		seed_admin(&state).await.unwrap();

		Self {
			router: routes(state.clone()),
			state,
			store,
		}
	}

	pub async fn request(
		&self,
		method: Method,
		uri: &str,
		token: Option<&str>,
		body: Option<Value>,
	) -> (StatusCode, Value) {
		let mut builder = Request::builder().method(method).uri(uri);
		if let Some(token) = token {
			builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
		}
		let request = match body {
			Some(body) => builder
				.header(header::CONTENT_TYPE, "application/json")
				.body(Body::from(body.to_string()))
				.unwrap(),
			None => builder.body(Body::empty()).unwrap(),
		};

		let response = self.router.clone().oneshot(request).await.unwrap();
		let status = response.status();
		let bytes = response.into_body().collect().await.unwrap().to_bytes();
		let value = if bytes.is_empty() {
			Value::Null
		} else {
			serde_json::from_slice(&bytes).unwrap()
		};
		(status, value)
	}

	/// Log in and return the access token.
	pub async fn login(&self, email: &str, password: &str) -> String {
		let (status, body) = self
			.request(
				Method::POST,
				"/login",
				None,
				Some(json!({ "email": email, "password": password })),
			)
			.await;
		assert_eq!(status, StatusCode::OK, "login failed: {}", body);
		body["token"].as_str().unwrap().to_string()
	}

	pub async fn admin_token(&self) -> String {
		self.login(ADMIN_EMAIL, ADMIN_PASSWORD).await
	}

	/// Register a patient through the public endpoint; returns the paciente body.
	pub async fn register_patient(&self, username: &str, national_id: &str) -> Value {
		let (status, body) = self
			.request(
				Method::POST,
				"/pacientes",
				None,
				Some(json!({
					"username": username,
					"email": format!("{}@clinic.test", username),
					"password": "secret1",
					"firstName": "Ana",
					"lastName": "Perez",
					"phone": "+5312345678",
					"nationalId": national_id,
				})),
			)
			.await;
		assert_eq!(status, StatusCode::CREATED, "{}", body);
		body
	}

	/// Create a specialist as admin; returns the especialista body.
	pub async fn create_specialist(&self, admin: &str, username: &str, specialty: &str) -> Value {
		let (status, body) = self
			.request(
				Method::POST,
				"/especialistas",
				Some(admin),
				Some(json!({
					"username": username,
					"email": format!("{}@clinic.test", username),
					"password": "secret1",
					"specialty": specialty,
				})),
			)
			.await;
		assert_eq!(status, StatusCode::CREATED, "{}", body);
		body
	}
}
