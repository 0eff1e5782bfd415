//! Multipart persona updates

mod common;

use axum::body::Body;
use common::TestApp;
use http::{Method, Request, StatusCode, header};
use http_body_util::BodyExt;
use rstest::*;
use serde_json::Value;
use tower::ServiceExt;

const BOUNDARY: &str = "clinica-boundary";

fn multipart_body(fields: &[(&str, &str)], image: Option<(&str, &[u8])>) -> Vec<u8> {
	let mut body = Vec::new();
	for (name, value) in fields {
		body.extend_from_slice(
			format!(
				"--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
				BOUNDARY, name, value
			)
			.as_bytes(),
		);
	}
	if let Some((file_name, content)) = image {
		body.extend_from_slice(
			format!(
				"--{}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"{}\"\r\nContent-Type: application/octet-stream\r\n\r\n",
				BOUNDARY, file_name
			)
			.as_bytes(),
		);
		body.extend_from_slice(content);
		body.extend_from_slice(b"\r\n");
	}
	body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
	body
}

async fn put_form(app: &TestApp, uri: &str, token: &str, body: Vec<u8>) -> (StatusCode, Value) {
	let request = Request::builder()
		.method(Method::PUT)
		.uri(uri)
		.header(header::AUTHORIZATION, format!("Bearer {}", token))
		.header(
			header::CONTENT_TYPE,
			format!("multipart/form-data; boundary={}", BOUNDARY),
		)
		.body(Body::from(body))
		.unwrap();
	let response = app.router.clone().oneshot(request).await.unwrap();
	let status = response.status();
	let bytes = response.into_body().collect().await.unwrap().to_bytes();
	(status, serde_json::from_slice(&bytes).unwrap())
}

#[rstest]
#[tokio::test]
async fn test_self_update_with_image() {
	let app = TestApp::new().await;
	let paciente = app.register_patient("p1", "85010112345").await;
	let token = app.login("p1@clinic.test", "secret1").await;
	let uri = format!("/personas/{}", paciente["personaId"].as_str().unwrap());

	let body = multipart_body(&[("username", "ana")], Some(("me.png", &b"\x89PNG"[..])));
	let (status, persona) = put_form(&app, &uri, &token, body).await;
	assert_eq!(status, StatusCode::OK, "{}", persona);
	assert_eq!(persona["username"], "ana");
	let image = persona["image"].as_str().unwrap();
	assert!(image.starts_with("images/profile/"));
	assert!(image.ends_with(".png"));
}

#[rstest]
#[tokio::test]
async fn test_rejects_foreign_persona_and_bad_extension() {
	let app = TestApp::new().await;
	let ana = app.register_patient("p1", "85010112345").await;
	app.register_patient("p2", "85010154321").await;
	let other = app.login("p2@clinic.test", "secret1").await;
	let uri = format!("/personas/{}", ana["personaId"].as_str().unwrap());

	let (status, _) = put_form(&app, &uri, &other, multipart_body(&[("username", "x")], None)).await;
	assert_eq!(status, StatusCode::FORBIDDEN);

	let own = app.login("p1@clinic.test", "secret1").await;
	let body = multipart_body(&[], Some(("notes.txt", &b"hello"[..])));
	let (status, _) = put_form(&app, &uri, &own, body).await;
	assert_eq!(status, StatusCode::BAD_REQUEST);
}
