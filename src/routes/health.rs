use std::{collections::HashMap, env, time::Duration};

use actix_web::{web, HttpResponse, Responder};
use serde::Serialize;

use crate::{routes::AppState, services::backend_client::BackendClient};

const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Serialize)]
struct HealthStatus {
    status: String,
    services: HashMap<String, ServiceStatus>,
    environment: String,
    version: String,
    active_sessions: usize,
}

#[derive(Serialize, Clone)]
struct ServiceStatus {
    status: String,
    details: Option<String>,
}

pub async fn health_check(state: web::Data<AppState>) -> impl Responder {
    let mut health = HealthStatus {
        status: "ok".to_string(),
        services: HashMap::new(),
        environment: env::var("RUST_ENV").unwrap_or("development".to_string()),
        version: env!("CARGO_PKG_VERSION").to_string(),
        active_sessions: state.sessions.len(),
    };

    let backend = match &state.backend {
        Some(client) => check_backend(client).await,
        None => ServiceStatus {
            status: "skipped".to_string(),
            details: Some("No planner backend probe configured".to_string()),
        },
    };
    if backend.status == "error" {
        health.status = "degraded".to_string();
    }
    health
        .services
        .insert("planner_backend".to_string(), backend);

    HttpResponse::Ok().json(health)
}

async fn check_backend(client: &BackendClient) -> ServiceStatus {
    match client.get("/health").timeout(PROBE_TIMEOUT).send().await {
        Ok(response) if response.status().is_success() => ServiceStatus {
            status: "ok".to_string(),
            details: Some(format!("Reached {}", client.url("/health"))),
        },
        Ok(response) => ServiceStatus {
            status: "error".to_string(),
            details: Some(format!("Backend answered {}", response.status())),
        },
        Err(e) => {
            log::warn!("Planner backend health check failed: {}", e);
            ServiceStatus {
                status: "error".to_string(),
                details: Some(format!("Failed to connect: {}", e)),
            }
        }
    }
}
