//! Extractors whose rejections use the crate's error body

use axum::Json;
use axum::extract::{FromRequest, FromRequestParts, Path, Query, Request};
use http::request::Parts;
use serde::de::DeserializeOwned;
use uuid::Uuid;
use validator::Validate;

use crate::core::error::{Error, Result};

/// JSON body that is deserialized and then validated
pub struct ValidatedJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidatedJson<T>
where
	S: Send + Sync,
	T: DeserializeOwned + Validate,
{
	type Rejection = Error;

	async fn from_request(req: Request, state: &S) -> Result<Self> {
		let Json(value) = Json::<T>::from_request(req, state)
			.await
			.map_err(|rejection| Error::Validation(rejection.body_text()))?;
		value.validate()?;
		Ok(ValidatedJson(value))
	}
}

/// Single `{id}` path parameter
pub struct PathId(pub Uuid);

impl<S> FromRequestParts<S> for PathId
where
	S: Send + Sync,
{
	type Rejection = Error;

	async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self> {
		let Path(raw) = Path::<String>::from_request_parts(parts, state)
			.await
			.map_err(|rejection| Error::Validation(rejection.body_text()))?;
		let id = Uuid::parse_str(&raw)
			.map_err(|_| Error::Validation(format!("'{}' is not a valid id", raw)))?;
		Ok(PathId(id))
	}
}

/// Query string parameters
pub struct QueryParams<T>(pub T);

impl<S, T> FromRequestParts<S> for QueryParams<T>
where
	S: Send + Sync,
	T: DeserializeOwned,
{
	type Rejection = Error;

	async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self> {
		let Query(value) = Query::<T>::from_request_parts(parts, state)
			.await
			.map_err(|rejection| Error::Validation(rejection.body_text()))?;
		Ok(QueryParams(value))
	}
}
