//! End-to-end clinic workflow over HTTP

mod common;

use common::TestApp;
use http::{Method, StatusCode};
use rstest::*;
use serde_json::json;

#[rstest]
#[tokio::test]
async fn test_booking_collision_then_completion() {
	let app = TestApp::new().await;
	let admin = app.admin_token().await;

	let paciente = app.register_patient("p1", "85010112345").await;
	assert_eq!(paciente["persona"]["role"], "patient");
	let especialista = app.create_specialist(&admin, "s1", "Cardiology").await;
	let patient = app.login("p1@clinic.test", "secret1").await;
	let specialist = app.login("s1@clinic.test", "secret1").await;

	let booking = json!({
		"date": "2025-06-01",
		"time": "09:00",
		"patientId": paciente["id"],
		"specialistId": especialista["id"],
	});
	let (status, cita) = app
		.request(Method::POST, "/citas", Some(patient.as_str()), Some(booking.clone()))
		.await;
	assert_eq!(status, StatusCode::CREATED, "{}", cita);
	assert_eq!(cita["status"], "pending");
	assert_eq!(cita["time"], "09:00:00");

	let (status, body) = app
		.request(Method::POST, "/citas", Some(patient.as_str()), Some(booking))
		.await;
	assert_eq!(status, StatusCode::CONFLICT);
	assert_eq!(body["status"], "fail");

	// patients cannot complete appointments, through either route
	let uri = format!("/citas/{}", cita["id"].as_str().unwrap());
	let (status, _) = app
		.request(
			Method::PUT,
			&uri,
			Some(patient.as_str()),
			Some(json!({ "status": "completed" })),
		)
		.await;
	assert_eq!(status, StatusCode::FORBIDDEN);
	let (status, unchanged) = app.request(Method::GET, &uri, Some(patient.as_str()), None).await;
	assert_eq!(status, StatusCode::OK);
	assert_eq!(unchanged["status"], "pending");

	let uri = format!("/citas/{}/completar", cita["id"].as_str().unwrap());
	let (status, _) = app.request(Method::PATCH, &uri, Some(patient.as_str()), None).await;
	assert_eq!(status, StatusCode::FORBIDDEN);

	let (status, done) = app
		.request(Method::PATCH, &uri, Some(specialist.as_str()), None)
		.await;
	assert_eq!(status, StatusCode::OK, "{}", done);
	assert_eq!(done["status"], "completed");

	let uri = format!("/citas/paciente/{}", paciente["id"].as_str().unwrap());
	let (status, list) = app.request(Method::GET, &uri, Some(patient.as_str()), None).await;
	assert_eq!(status, StatusCode::OK);
	assert_eq!(list.as_array().unwrap().len(), 1);
}

#[rstest]
#[tokio::test]
async fn test_history_and_records() {
	let app = TestApp::new().await;
	let admin = app.admin_token().await;
	let paciente = app.register_patient("p1", "85010112345").await;
	app.create_specialist(&admin, "s1", "Cardiology").await;
	app.create_specialist(&admin, "s2", "Neurology").await;
	let author = app.login("s1@clinic.test", "secret1").await;
	let colleague = app.login("s2@clinic.test", "secret1").await;

	let history = json!({
		"patientId": paciente["id"],
		"age": 40,
		"sex": "female",
		"background": "Asthma",
	});
	let (status, historia) = app
		.request(
			Method::POST,
			"/historias-clinicas",
			Some(author.as_str()),
			Some(history.clone()),
		)
		.await;
	assert_eq!(status, StatusCode::CREATED, "{}", historia);
	let (status, _) = app
		.request(Method::POST, "/historias-clinicas", Some(author.as_str()), Some(history))
		.await;
	assert_eq!(status, StatusCode::CONFLICT);

	let history_id = historia["id"].as_str().unwrap();
	let (status, registro) = app
		.request(
			Method::POST,
			"/registros-clinicos",
			Some(author.as_str()),
			Some(json!({ "historyId": history_id, "diagnosis": "Flu" })),
		)
		.await;
	assert_eq!(status, StatusCode::CREATED, "{}", registro);

	let uri = format!("/registros-clinicos/{}", registro["id"].as_str().unwrap());
	let edit = json!({ "diagnosis": "Bronchitis" });
	let (status, _) = app
		.request(Method::PUT, &uri, Some(colleague.as_str()), Some(edit.clone()))
		.await;
	assert_eq!(status, StatusCode::FORBIDDEN);
	let (status, updated) = app
		.request(Method::PUT, &uri, Some(author.as_str()), Some(edit))
		.await;
	assert_eq!(status, StatusCode::OK);
	assert_eq!(updated["diagnosis"], "Bronchitis");

	let uri = format!("/registros-clinicos?historyId={}", history_id);
	let (status, list) = app.request(Method::GET, &uri, Some(colleague.as_str()), None).await;
	assert_eq!(status, StatusCode::OK);
	assert_eq!(list.as_array().unwrap().len(), 1);

	let uri = format!("/historias-clinicas/paciente/{}", paciente["id"].as_str().unwrap());
	let (status, detalle) = app.request(Method::GET, &uri, Some(author.as_str()), None).await;
	assert_eq!(status, StatusCode::OK);
	assert_eq!(detalle["registrosClinicos"].as_array().unwrap().len(), 1);
}

#[rstest]
#[tokio::test]
async fn test_patient_deletion() {
	let app = TestApp::new().await;
	let admin = app.admin_token().await;
	let paciente = app.register_patient("p1", "85010112345").await;

	let uri = format!("/pacientes/{}", paciente["id"].as_str().unwrap());
	let (status, body) = app.request(Method::DELETE, &uri, Some(admin.as_str()), None).await;
	assert_eq!(status, StatusCode::OK);
	assert_eq!(body["message"], "Patient deleted");

	let (status, _) = app.request(Method::GET, &uri, Some(admin.as_str()), None).await;
	assert_eq!(status, StatusCode::NOT_FOUND);

	let (status, _) = app
		.request(
			Method::POST,
			"/login",
			None,
			Some(json!({ "email": "p1@clinic.test", "password": "secret1" })),
		)
		.await;
	assert_eq!(status, StatusCode::UNAUTHORIZED);
}
