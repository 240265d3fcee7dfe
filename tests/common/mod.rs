#![allow(dead_code)]

use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use actix_web::{dev::ServerHandle, web, App, HttpRequest, HttpResponse, HttpServer};
use chrono::NaiveDate;
use serde_json::{json, Value};

use itinerary_planner::{
    config::PlannerConfig,
    routes::{self, AppState, SessionStore},
    services::{
        generation_service::GenerationOrchestrator, persistence_gateway::HttpItineraryGateway,
    },
};

/// Nothing listens here; requests fail with a connection error.
pub const UNREACHABLE_URL: &str = "http://127.0.0.1:1";

pub fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 2, 1).unwrap()
}

/// How a fake generation endpoint answers.
#[derive(Clone)]
pub enum Reply {
    Json(Value),
    Status(u16),
    Slow(Duration, Value),
}

struct FakeState {
    ml: Reply,
    rule: Reply,
    ml_calls: Arc<AtomicUsize>,
    rule_calls: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<Value>>>,
    saved: Arc<Mutex<Vec<Value>>>,
}

/// Throw-away planner backend bound to a random local port.
pub struct FakeBackend {
    pub url: String,
    pub ml_calls: Arc<AtomicUsize>,
    pub rule_calls: Arc<AtomicUsize>,
    pub requests: Arc<Mutex<Vec<Value>>>,
    pub saved: Arc<Mutex<Vec<Value>>>,
    handle: ServerHandle,
}

impl FakeBackend {
    pub async fn start(ml: Reply, rule: Reply) -> Self {
        let ml_calls = Arc::new(AtomicUsize::new(0));
        let rule_calls = Arc::new(AtomicUsize::new(0));
        let requests = Arc::new(Mutex::new(Vec::new()));
        let saved = Arc::new(Mutex::new(Vec::new()));

        let state = web::Data::new(FakeState {
            ml,
            rule,
            ml_calls: ml_calls.clone(),
            rule_calls: rule_calls.clone(),
            requests: requests.clone(),
            saved: saved.clone(),
        });

        let server = HttpServer::new(move || {
            App::new()
                .app_data(state.clone())
                .route("/api/ml-itineraries/generate-ml", web::post().to(ml_generate))
                .route("/api/itineraries/generate", web::post().to(rule_generate))
                .route("/api/itineraries", web::post().to(save_itinerary))
                .route("/api/itineraries", web::get().to(list_itineraries))
                .route("/api/itineraries/{id}", web::put().to(update_itinerary))
                .route("/api/itineraries/{id}", web::delete().to(delete_itinerary))
                .route("/health", web::get().to(|| async { HttpResponse::Ok().body("OK") }))
        })
        .workers(1)
        .bind(("127.0.0.1", 0))
        .expect("bind fake backend");

        let addr = server.addrs()[0];
        let server = server.run();
        let handle = server.handle();
        actix_rt::spawn(server);

        Self {
            url: format!("http://{}", addr),
            ml_calls,
            rule_calls,
            requests,
            saved,
            handle,
        }
    }

    pub fn config(&self) -> PlannerConfig {
        PlannerConfig::with_api_url(self.url.clone())
    }

    pub fn ml_calls(&self) -> usize {
        self.ml_calls.load(Ordering::SeqCst)
    }

    pub fn rule_calls(&self) -> usize {
        self.rule_calls.load(Ordering::SeqCst)
    }

    pub async fn stop(self) {
        self.handle.stop(false).await;
    }
}

async fn answer(reply: &Reply) -> HttpResponse {
    match reply {
        Reply::Json(body) => HttpResponse::Ok().json(body),
        Reply::Status(code) => HttpResponse::build(
            actix_web::http::StatusCode::from_u16(*code)
                .unwrap_or(actix_web::http::StatusCode::INTERNAL_SERVER_ERROR),
        )
        .json(json!({ "error": format!("fake failure {}", code) })),
        Reply::Slow(delay, body) => {
            actix_rt::time::sleep(*delay).await;
            HttpResponse::Ok().json(body)
        }
    }
}

async fn ml_generate(state: web::Data<FakeState>, body: web::Json<Value>) -> HttpResponse {
    state.ml_calls.fetch_add(1, Ordering::SeqCst);
    state.requests.lock().unwrap().push(body.into_inner());
    answer(&state.ml).await
}

async fn rule_generate(state: web::Data<FakeState>, body: web::Json<Value>) -> HttpResponse {
    state.rule_calls.fetch_add(1, Ordering::SeqCst);
    state.requests.lock().unwrap().push(body.into_inner());
    answer(&state.rule).await
}

// Stored records carry their key as `_id` only, like a document store would.
fn stored(mut record: Value) -> Value {
    if let Some(map) = record.as_object_mut() {
        map.remove("id");
    }
    record
}

async fn save_itinerary(state: web::Data<FakeState>, body: web::Json<Value>) -> HttpResponse {
    let mut saved = state.saved.lock().unwrap();
    let id = format!("saved-{}", saved.len() + 1);
    let mut record = stored(body.into_inner());
    record["_id"] = json!(id);
    saved.push(record);
    HttpResponse::Created().json(json!({ "_id": id }))
}

async fn update_itinerary(
    state: web::Data<FakeState>,
    path: web::Path<String>,
    body: web::Json<Value>,
) -> HttpResponse {
    let mut record = stored(body.into_inner());
    record["_id"] = json!(path.into_inner());
    state.saved.lock().unwrap().push(record.clone());
    HttpResponse::Ok().json(json!({ "success": true, "itinerary": record }))
}

async fn list_itineraries(state: web::Data<FakeState>, req: HttpRequest) -> HttpResponse {
    let owner = req
        .query_string()
        .split('&')
        .find_map(|pair| pair.strip_prefix("owner_id="))
        .unwrap_or_default()
        .to_string();
    let records: Vec<Value> = state
        .saved
        .lock()
        .unwrap()
        .iter()
        .filter(|record| record["ownerId"] == json!(owner))
        .cloned()
        .collect();
    HttpResponse::Ok().json(json!({ "itineraries": records }))
}

async fn delete_itinerary(state: web::Data<FakeState>, path: web::Path<String>) -> HttpResponse {
    let id = path.into_inner();
    let mut saved = state.saved.lock().unwrap();
    let before = saved.len();
    saved.retain(|record| record["_id"] != json!(id));
    if saved.len() == before {
        HttpResponse::NotFound().finish()
    } else {
        HttpResponse::NoContent().finish()
    }
}

/// `days` day plans for Kerala starting 2025-03-01, each with two activities.
pub fn kerala_payload(days: usize) -> Value {
    let day_plans: Vec<Value> = (1..=days)
        .map(|day| {
            json!({
                "day": day,
                "title": format!("Kerala day {}", day),
                "locations": [
                    { "name": "Fort Kochi", "type": "attraction", "approx_time_mins": 90, "rating": 4.6 },
                    { "name": "Kashi Art Cafe", "type": "restaurant", "estimated_cost": 600 }
                ],
                "estimated_cost": 4000
            })
        })
        .collect();

    json!({
        "success": true,
        "itinerary": {
            "title": "Kerala Backwaters",
            "destination": "kerala",
            "duration_days": days,
            "total_cost": 4000 * days,
            "day_plans": day_plans,
            "travel_tips": ["Carry an umbrella"]
        },
        "hotel_recommendations": {
            "recommended_hotels": [
                { "name": "Brunton Boatyard", "city": "Kochi", "state": "Kerala", "rating": 4.7, "price_per_night": 9000 }
            ]
        },
        "ml_features": { "recommendation_confidence": 0.82 }
    })
}

pub fn app_state(config: &PlannerConfig) -> web::Data<AppState> {
    web::Data::new(AppState {
        sessions: SessionStore::with_today(today()),
        orchestrator: GenerationOrchestrator::from_config(config).unwrap(),
        gateway: Box::new(HttpItineraryGateway::from_config(config).unwrap()),
        backend: None,
    })
}

pub fn create_app(
    state: web::Data<AppState>,
) -> App<
    impl actix_web::dev::ServiceFactory<
        actix_web::dev::ServiceRequest,
        Config = (),
        Response = actix_web::dev::ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    App::new().app_data(state).configure(routes::configure)
}
