//! Role gate behaviour at the HTTP boundary

mod common;

use common::TestApp;
use http::{Method, StatusCode};
use rstest::*;
use serde_json::json;

#[rstest]
#[case(Method::GET, "/pacientes")]
#[case(Method::GET, "/citas")]
#[case(Method::GET, "/historias-clinicas")]
#[case(Method::GET, "/registros-clinicos")]
#[case(Method::GET, "/user/profile")]
#[tokio::test]
async fn test_missing_token_is_forbidden(#[case] method: Method, #[case] uri: &str) {
	let app = TestApp::new().await;
	let (status, body) = app.request(method, uri, None, None).await;
	assert_eq!(status, StatusCode::FORBIDDEN);
	assert_eq!(body["message"], "Login required");
}

#[rstest]
#[tokio::test]
async fn test_garbage_token_is_forbidden() {
	let app = TestApp::new().await;
	let (status, body) = app
		.request(Method::GET, "/pacientes", Some("not-a-jwt"), None)
		.await;
	assert_eq!(status, StatusCode::FORBIDDEN);
	assert_eq!(body["message"], "Permission denied");
}

#[rstest]
#[case(Method::GET, "/pacientes")]
#[case(Method::GET, "/citas")]
#[case(Method::GET, "/registros-clinicos")]
#[tokio::test]
async fn test_patient_role_is_refused(#[case] method: Method, #[case] uri: &str) {
	let app = TestApp::new().await;
	app.register_patient("p1", "85010112345").await;
	let token = app.login("p1@clinic.test", "secret1").await;

	let (status, _) = app.request(method, uri, Some(token.as_str()), None).await;
	assert_eq!(status, StatusCode::FORBIDDEN);
}

#[rstest]
#[tokio::test]
async fn test_only_admin_creates_specialists() {
	let app = TestApp::new().await;
	app.register_patient("p1", "85010112345").await;
	let token = app.login("p1@clinic.test", "secret1").await;

	let (status, _) = app
		.request(
			Method::POST,
			"/especialistas",
			Some(token.as_str()),
			Some(json!({
				"username": "s1",
				"email": "s1@clinic.test",
				"password": "secret1",
				"specialty": "Cardiology",
			})),
		)
		.await;
	assert_eq!(status, StatusCode::FORBIDDEN);
}

#[rstest]
#[tokio::test]
async fn test_validation_and_unknown_routes() {
	let app = TestApp::new().await;
	let (status, body) = app
		.request(
			Method::POST,
			"/pacientes",
			None,
			Some(json!({
				"username": "p1",
				"email": "not-an-email",
				"password": "secret1",
				"firstName": "Ana",
				"lastName": "Perez",
				"phone": "12",
				"nationalId": "123",
			})),
		)
		.await;
	assert_eq!(status, StatusCode::BAD_REQUEST);
	assert_eq!(body["status"], "fail");

	let admin = app.admin_token().await;
	let (status, _) = app
		.request(Method::GET, "/pacientes/not-a-uuid", Some(admin.as_str()), None)
		.await;
	assert_eq!(status, StatusCode::BAD_REQUEST);

	let (status, _) = app.request(Method::GET, "/nowhere", None, None).await;
	assert_eq!(status, StatusCode::NOT_FOUND);
}

#[rstest]
#[case("+5312345678", "٨٥٠١٠١١٢٣٤٥")]
#[case("+٥٣١٢٣٤٥٦٧٨", "85010112345")]
#[tokio::test]
async fn test_non_ascii_digits_rejected(#[case] phone: &str, #[case] national_id: &str) {
	let app = TestApp::new().await;
	let (status, _) = app
		.request(
			Method::POST,
			"/pacientes",
			None,
			Some(json!({
				"username": "p1",
				"email": "p1@clinic.test",
				"password": "secret1",
				"firstName": "Ana",
				"lastName": "Perez",
				"phone": phone,
				"nationalId": national_id,
			})),
		)
		.await;
	assert_eq!(status, StatusCode::BAD_REQUEST);
}
