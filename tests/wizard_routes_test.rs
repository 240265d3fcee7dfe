mod common;

use actix_web::{http::StatusCode, test};
use serde_json::{json, Value};
use serial_test::serial;

use common::{app_state, create_app, kerala_payload, FakeBackend, Reply};
use itinerary_planner::middleware::owner::OWNER_HEADER;

async fn start_backend() -> FakeBackend {
    FakeBackend::start(Reply::Json(kerala_payload(7)), Reply::Status(500)).await
}

#[actix_rt::test]
#[serial]
async fn test_full_wizard_flow_and_save() {
    let backend = start_backend().await;
    let app = test::init_service(create_app(app_state(&backend.config()))).await;

    let req = test::TestRequest::post().uri("/api/wizard/sessions").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(resp).await;
    let id = body["id"].as_str().unwrap().to_string();
    assert_eq!(body["step"]["name"], "tripBasics");
    assert_eq!(body["request"]["groupSize"], 1);
    assert_eq!(body["itinerary"], Value::Null);

    // empty basics are rejected with field errors
    let req = test::TestRequest::post()
        .uri(&format!("/api/wizard/sessions/{}/advance", id))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["fieldErrors"]["destination"], "Please enter a destination");

    let req = test::TestRequest::patch()
        .uri(&format!("/api/wizard/sessions/{}/request", id))
        .set_json(json!({
            "destination": "Kerala, India",
            "startDate": "2025-03-01",
            "endDate": "2025-03-05",
            "groupSize": 2,
            "budgetAmount": 8000,
            "travelStyle": ["cultural", "foodie"]
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());
    let body: Value = test::read_body_json(resp).await;
    assert!(body["fieldErrors"].get("destination").is_none());

    let req = test::TestRequest::post()
        .uri(&format!("/api/wizard/sessions/{}/advance", id))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["step"]["name"], "preferences");

    let req = test::TestRequest::post()
        .uri(&format!("/api/wizard/sessions/{}/advance", id))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["step"]["name"], "generationResults");
    assert_eq!(body["step"]["status"], "ready");
    assert_eq!(body["generating"], false);
    assert_eq!(body["itinerary"]["dayPlans"].as_array().unwrap().len(), 5);
    assert_eq!(body["itinerary"]["provenance"]["tier"], "ml");
    assert_eq!(body["perPersonCost"], 14000);
    assert_eq!(
        body["mapLinks"][0][0],
        "https://www.google.com/maps/search/?api=1&query=Fort+Kochi+kerala"
    );

    let req = test::TestRequest::post()
        .uri(&format!("/api/wizard/sessions/{}/save", id))
        .insert_header((OWNER_HEADER, "user-42"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let saved: Value = test::read_body_json(resp).await;
    assert_eq!(saved["id"], "saved-1");
    assert_eq!(saved["totalBudget"], 16000);
    assert_eq!(saved["ownerId"], "user-42");

    // a successful save starts the form over
    let req = test::TestRequest::get()
        .uri(&format!("/api/wizard/sessions/{}", id))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["itinerary"], Value::Null);
    assert_eq!(body["request"]["destination"], "");

    let req = test::TestRequest::get()
        .uri("/api/itineraries?owner_id=user-42")
        .to_request();
    let list: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(list.as_array().unwrap().len(), 1);
    assert_eq!(list[0]["destination"], "Kerala, India");

    let req = test::TestRequest::delete()
        .uri("/api/itineraries/saved-1")
        .insert_header((OWNER_HEADER, "user-42"))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NO_CONTENT);

    let req = test::TestRequest::delete()
        .uri("/api/itineraries/saved-1")
        .insert_header((OWNER_HEADER, "user-42"))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

    backend.stop().await;
}

#[actix_rt::test]
#[serial]
async fn test_edit_flow_updates_existing_record() {
    let backend = start_backend().await;
    let app = test::init_service(create_app(app_state(&backend.config()))).await;

    let req = test::TestRequest::post()
        .uri("/api/wizard/sessions")
        .set_json(json!({
            "editing": {
                "_id": "665f1c",
                "title": "Kerala - 5 Days",
                "destination": "Kerala, India",
                "start_date": "2025-03-01",
                "end_date": "2025-03-05",
                "duration": 5,
                "day_plans": [],
                "user_id": "user-42",
                "group_size": 2,
                "budget_per_person": 8000,
                "interests": ["cultural"]
            }
        }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let id = body["id"].as_str().unwrap().to_string();
    assert_eq!(body["editingId"], "665f1c");
    assert_eq!(body["request"]["groupSize"], 2);
    assert_eq!(body["step"]["name"], "tripBasics");

    for expected in ["preferences", "generationResults"] {
        let req = test::TestRequest::post()
            .uri(&format!("/api/wizard/sessions/{}/advance", id))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["step"]["name"], expected);
    }

    let req = test::TestRequest::post()
        .uri(&format!("/api/wizard/sessions/{}/regenerate", id))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["step"]["status"], "ready");
    assert_eq!(body["itinerary"]["id"], "665f1c");
    assert_eq!(body["itinerary"]["dayPlans"].as_array().unwrap().len(), 5);
    assert_eq!(backend.ml_calls(), 2);

    let req = test::TestRequest::post()
        .uri(&format!("/api/wizard/sessions/{}/save", id))
        .insert_header((OWNER_HEADER, "user-42"))
        .to_request();
    let saved: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(saved["id"], "665f1c");

    let stored = backend.saved.lock().unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0]["_id"], "665f1c");

    drop(stored);
    backend.stop().await;
}

#[actix_rt::test]
#[serial]
async fn test_save_failure_keeps_itinerary() {
    let backend = start_backend().await;
    let mut config = backend.config();
    config.itineraries_path = "/api/missing-endpoint".to_string();
    let app = test::init_service(create_app(app_state(&config))).await;

    let req = test::TestRequest::post().uri("/api/wizard/sessions").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let id = body["id"].as_str().unwrap().to_string();

    let req = test::TestRequest::patch()
        .uri(&format!("/api/wizard/sessions/{}/request", id))
        .set_json(json!({
            "destination": "Kerala",
            "startDate": "2025-03-01",
            "endDate": "2025-03-05",
            "travelStyle": ["nature"]
        }))
        .to_request();
    test::call_service(&app, req).await;

    for _ in 0..2 {
        let req = test::TestRequest::post()
            .uri(&format!("/api/wizard/sessions/{}/advance", id))
            .to_request();
        test::call_service(&app, req).await;
    }

    let req = test::TestRequest::post()
        .uri(&format!("/api/wizard/sessions/{}/save", id))
        .insert_header((OWNER_HEADER, "user-42"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Failed to save itinerary. Please try again.");

    let req = test::TestRequest::get()
        .uri(&format!("/api/wizard/sessions/{}", id))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["itinerary"]["dayPlans"].as_array().unwrap().len(), 5);
    assert_eq!(body["error"], "Failed to save itinerary. Please try again.");
    assert_eq!(body["saving"], false);

    backend.stop().await;
}

#[actix_rt::test]
#[serial]
async fn test_regenerate_respects_wizard_gates() {
    let backend = start_backend().await;
    let app = test::init_service(create_app(app_state(&backend.config()))).await;

    let req = test::TestRequest::post().uri("/api/wizard/sessions").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let id = body["id"].as_str().unwrap().to_string();

    let req = test::TestRequest::patch()
        .uri(&format!("/api/wizard/sessions/{}/request", id))
        .set_json(json!({ "startDate": "2025-01-10", "endDate": "2025-01-12" }))
        .to_request();
    test::call_service(&app, req).await;

    let req = test::TestRequest::post()
        .uri(&format!("/api/wizard/sessions/{}/regenerate", id))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    assert_eq!(backend.ml_calls(), 0);

    let req = test::TestRequest::get()
        .uri(&format!("/api/wizard/sessions/{}", id))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["step"]["name"], "tripBasics");

    let req = test::TestRequest::patch()
        .uri(&format!("/api/wizard/sessions/{}/request", id))
        .set_json(json!({
            "destination": "Kerala",
            "startDate": "2025-03-01",
            "endDate": "2025-03-05",
            "travelStyle": ["cultural"]
        }))
        .to_request();
    test::call_service(&app, req).await;
    for _ in 0..2 {
        let req = test::TestRequest::post()
            .uri(&format!("/api/wizard/sessions/{}/advance", id))
            .to_request();
        test::call_service(&app, req).await;
    }
    assert_eq!(backend.ml_calls(), 1);

    // the request was broken after generating
    let req = test::TestRequest::patch()
        .uri(&format!("/api/wizard/sessions/{}/request", id))
        .set_json(json!({ "destination": "", "startDate": "2025-01-10" }))
        .to_request();
    test::call_service(&app, req).await;

    let req = test::TestRequest::post()
        .uri(&format!("/api/wizard/sessions/{}/regenerate", id))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["fieldErrors"]["destination"], "Please enter a destination");
    assert_eq!(body["fieldErrors"]["startDate"], "Start date cannot be in the past");
    assert_eq!(backend.ml_calls(), 1);

    // and the old itinerary no longer matches the trip
    let req = test::TestRequest::post()
        .uri(&format!("/api/wizard/sessions/{}/save", id))
        .insert_header((OWNER_HEADER, "user-42"))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CONFLICT);
    assert!(backend.saved.lock().unwrap().is_empty());

    backend.stop().await;
}

#[actix_rt::test]
#[serial]
async fn test_unknown_session_and_missing_owner() {
    let backend = start_backend().await;
    let app = test::init_service(create_app(app_state(&backend.config()))).await;

    let req = test::TestRequest::get()
        .uri("/api/wizard/sessions/9b2e8f8e-3c1a-4d4b-9d0e-0c6f2a7e5b11")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let req = test::TestRequest::post().uri("/api/wizard/sessions").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let id = body["id"].as_str().unwrap().to_string();

    let req = test::TestRequest::post()
        .uri(&format!("/api/wizard/sessions/{}/save", id))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::post()
        .uri(&format!("/api/wizard/sessions/{}/save", id))
        .insert_header((OWNER_HEADER, "user-42"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let req = test::TestRequest::delete()
        .uri(&format!("/api/wizard/sessions/{}", id))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NO_CONTENT);

    let req = test::TestRequest::post()
        .uri(&format!("/api/wizard/sessions/{}/back", id))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

    backend.stop().await;
}

#[actix_rt::test]
async fn test_health_reports_sessions() {
    let state = app_state(&itinerary_planner::config::PlannerConfig::default());
    let app = test::init_service(create_app(state)).await;

    let req = test::TestRequest::get().uri("/health").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["active_sessions"], 0);
    assert_eq!(body["services"]["planner_backend"]["status"], "skipped");
}
