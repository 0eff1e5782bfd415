use axum::Json;
use axum::extract::{Multipart, State};

use super::serializers::{PersonaForm, PersonaResponse, UploadedImage};
use super::service;
use crate::core::error::{Error, Result};
use crate::core::extract::PathId;
use crate::core::gate::{AnyRole, Guard};
use crate::state::AppState;

/// PUT /personas/{id}
pub async fn update(
	State(state): State<AppState>,
	guard: Guard<AnyRole>,
	PathId(id): PathId,
	multipart: Multipart,
) -> Result<Json<PersonaResponse>> {
	let form = read_form(multipart).await?;
	let persona = service::update_persona(&state, guard.user(), id, form).await?;
	Ok(Json(persona))
}

async fn read_form(mut multipart: Multipart) -> Result<PersonaForm> {
	let mut form = PersonaForm::default();
	while let Some(field) = multipart
		.next_field()
		.await
		.map_err(|e| Error::Validation(e.body_text()))?
	{
		let name = field.name().unwrap_or_default().to_string();
		match name.as_str() {
			"image" => {
				let file_name = field
					.file_name()
					.map(str::to_string)
					.ok_or_else(|| Error::Validation("'image' must be a file".to_string()))?;
				let content = field
					.bytes()
					.await
					.map_err(|e| Error::Validation(e.body_text()))?;
				form.image = Some(UploadedImage {
					file_name,
					content: content.to_vec(),
				});
			}
			"username" | "email" | "password" => {
				let value = field
					.text()
					.await
					.map_err(|e| Error::Validation(e.body_text()))?;
				let slot = match name.as_str() {
					"username" => &mut form.username,
					"email" => &mut form.email,
					_ => &mut form.password,
				};
				*slot = Some(value);
			}
			other => {
				tracing::debug!(field = other, "ignoring unknown form field");
			}
		}
	}
	Ok(form)
}
