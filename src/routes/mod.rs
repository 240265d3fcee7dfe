pub mod health;
pub mod itinerary;
pub mod wizard;

use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard},
    time::{Duration, Instant},
};

use actix_web::web;
use chrono::NaiveDate;
use uuid::Uuid;

use crate::{
    config::DEFAULT_SESSION_TTL,
    error::WizardError,
    services::{
        backend_client::BackendClient, generation_service::GenerationOrchestrator,
        persistence_gateway::ItineraryGateway,
    },
    wizard::controller::WizardController,
};

struct Session {
    controller: WizardController,
    touched: Instant,
}

/// Wizard sessions kept in process memory. The lock is only ever held for
/// synchronous controller calls, never across a backend request. Sessions
/// left alone for longer than the idle timeout are dropped.
pub struct SessionStore {
    sessions: Mutex<HashMap<Uuid, Session>>,
    idle_timeout: Duration,
    today: Option<NaiveDate>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            idle_timeout: DEFAULT_SESSION_TTL,
            today: None,
        }
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sessions created by this store validate dates against `today`.
    pub fn with_today(today: NaiveDate) -> Self {
        Self {
            today: Some(today),
            ..Self::default()
        }
    }

    pub fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    pub fn idle_timeout(&self) -> Duration {
        self.idle_timeout
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Uuid, Session>> {
        match self.sessions.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn create(&self) -> (Uuid, WizardController) {
        let controller = match self.today {
            Some(today) => WizardController::new().with_today(today),
            None => WizardController::new(),
        };
        (Uuid::new_v4(), controller)
    }

    pub fn insert(&self, id: Uuid, controller: WizardController) {
        let mut sessions = self.lock();
        evict_idle(&mut sessions, self.idle_timeout);
        sessions.insert(
            id,
            Session {
                controller,
                touched: Instant::now(),
            },
        );
    }

    pub fn with_session<R>(
        &self,
        id: &Uuid,
        f: impl FnOnce(&mut WizardController) -> R,
    ) -> Result<R, WizardError> {
        let mut sessions = self.lock();
        let expired = sessions
            .get(id)
            .map(|session| session.touched.elapsed() > self.idle_timeout)
            .ok_or(WizardError::UnknownSession)?;
        if expired {
            sessions.remove(id);
            log::info!("Wizard session {} expired", id);
            return Err(WizardError::UnknownSession);
        }

        let session = sessions.get_mut(id).ok_or(WizardError::UnknownSession)?;
        session.touched = Instant::now();
        Ok(f(&mut session.controller))
    }

    pub fn remove(&self, id: &Uuid) -> Option<WizardController> {
        self.lock().remove(id).map(|session| session.controller)
    }

    /// Drop every session idle past the timeout. Returns how many were dropped.
    pub fn evict_idle(&self) -> usize {
        evict_idle(&mut self.lock(), self.idle_timeout)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn evict_idle(sessions: &mut HashMap<Uuid, Session>, idle_timeout: Duration) -> usize {
    let before = sessions.len();
    sessions.retain(|_, session| session.touched.elapsed() <= idle_timeout);
    let evicted = before - sessions.len();
    if evicted > 0 {
        log::info!("Evicted {} idle wizard sessions", evicted);
    }
    evicted
}

pub struct AppState {
    pub sessions: SessionStore,
    pub orchestrator: GenerationOrchestrator,
    pub gateway: Box<dyn ItineraryGateway>,
    /// Used by the health check; `None` skips the backend probe.
    pub backend: Option<BackendClient>,
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health::health_check))
        .service(
            web::scope("/api")
                .service(
                    web::scope("/wizard/sessions")
                        .route("", web::post().to(wizard::create_session))
                        .route("/{id}", web::get().to(wizard::get_session))
                        .route("/{id}", web::delete().to(wizard::delete_session))
                        .route("/{id}/request", web::patch().to(wizard::update_request))
                        .route("/{id}/advance", web::post().to(wizard::advance))
                        .route("/{id}/back", web::post().to(wizard::back))
                        .route("/{id}/regenerate", web::post().to(wizard::regenerate))
                        .route("/{id}/save", web::post().to(wizard::save)),
                )
                .service(
                    web::scope("/itineraries")
                        .route("", web::get().to(itinerary::list))
                        .route("/{id}", web::delete().to(itinerary::delete)),
                ),
        );
}
