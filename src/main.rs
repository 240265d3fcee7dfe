use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use env_logger::Env;

use itinerary_planner::{
    config::PlannerConfig,
    routes::{self, AppState, SessionStore},
    services::{
        backend_client::BackendClient, generation_service::GenerationOrchestrator,
        persistence_gateway::HttpItineraryGateway,
    },
};

fn to_io(err: reqwest::Error) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::Other, err)
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    if cfg!(debug_assertions) {
        dotenv::dotenv().ok();
    }

    env_logger::init_from_env(Env::default().default_filter_or("info"));

    let config = PlannerConfig::from_env();
    log::info!(
        "Generation backend {} (timeout {}s)",
        config.api_url,
        config.generation_timeout.as_secs()
    );

    let state = web::Data::new(AppState {
        sessions: SessionStore::new().with_idle_timeout(config.session_ttl),
        orchestrator: GenerationOrchestrator::from_config(&config).map_err(to_io)?,
        gateway: Box::new(HttpItineraryGateway::from_config(&config).map_err(to_io)?),
        backend: Some(BackendClient::new(&config).map_err(to_io)?),
    });

    let sweeper = state.clone();
    actix_web::rt::spawn(async move {
        let mut ticks = actix_web::rt::time::interval(sweeper.sessions.idle_timeout());
        loop {
            ticks.tick().await;
            sweeper.sessions.evict_idle();
        }
    });

    log::info!("Binding to {}:{}", config.host, config.port);

    HttpServer::new(move || {
        App::new()
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allow_any_method()
                    .allow_any_header()
                    .max_age(3600),
            )
            .wrap(Logger::default())
            .app_data(state.clone())
            .configure(routes::configure)
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await
}
