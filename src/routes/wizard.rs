use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::WizardError,
    middleware::owner::OwnerId,
    models::{saved::SavedItinerary, trip_request::TripRequestPatch},
    routes::AppState,
    wizard::controller::{AdvanceOutcome, GenerationJob, WizardView},
};

#[derive(Debug, Default, Deserialize)]
pub struct CreateSession {
    #[serde(default)]
    pub editing: Option<SavedItinerary>,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub id: Uuid,
    #[serde(flatten)]
    pub view: WizardView,
}

fn respond(id: Uuid, view: WizardView) -> HttpResponse {
    HttpResponse::Ok().json(SessionResponse { id, view })
}

/*
    POST /api/wizard/sessions
*/
pub async fn create_session(
    state: web::Data<AppState>,
    body: Option<web::Json<CreateSession>>,
) -> HttpResponse {
    let body = body.map(web::Json::into_inner).unwrap_or_default();
    let (id, mut controller) = state.sessions.create();
    controller.rehydrate(body.editing.as_ref());

    let view = controller.view();
    state.sessions.insert(id, controller);
    log::info!("Created wizard session {}", id);

    HttpResponse::Created().json(SessionResponse { id, view })
}

/*
    GET /api/wizard/sessions/{id}
*/
pub async fn get_session(
    path: web::Path<Uuid>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, WizardError> {
    let id = path.into_inner();
    let view = state.sessions.with_session(&id, |wizard| wizard.view())?;
    Ok(respond(id, view))
}

/*
    DELETE /api/wizard/sessions/{id}
*/
pub async fn delete_session(
    path: web::Path<Uuid>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, WizardError> {
    let id = path.into_inner();
    state
        .sessions
        .remove(&id)
        .ok_or(WizardError::UnknownSession)?;
    Ok(HttpResponse::NoContent().finish())
}

/*
    PATCH /api/wizard/sessions/{id}/request
*/
pub async fn update_request(
    path: web::Path<Uuid>,
    patch: web::Json<TripRequestPatch>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, WizardError> {
    let id = path.into_inner();
    let view = state.sessions.with_session(&id, |wizard| {
        wizard.update(patch.into_inner());
        wizard.view()
    })?;
    Ok(respond(id, view))
}

/*
    POST /api/wizard/sessions/{id}/advance
*/
pub async fn advance(
    path: web::Path<Uuid>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, WizardError> {
    let id = path.into_inner();
    let (outcome, view) = state.sessions.with_session(&id, |wizard| {
        let outcome = wizard.advance();
        (outcome, wizard.view())
    })?;

    match outcome {
        AdvanceOutcome::Invalid(_) => {
            Ok(HttpResponse::UnprocessableEntity().json(SessionResponse { id, view }))
        }
        AdvanceOutcome::Generate(job) => run_generation(&state, id, job).await,
        AdvanceOutcome::Moved(_) | AdvanceOutcome::Unchanged => Ok(respond(id, view)),
    }
}

/*
    POST /api/wizard/sessions/{id}/back
*/
pub async fn back(
    path: web::Path<Uuid>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, WizardError> {
    let id = path.into_inner();
    let view = state.sessions.with_session(&id, |wizard| {
        wizard.back();
        wizard.view()
    })?;
    Ok(respond(id, view))
}

/*
    POST /api/wizard/sessions/{id}/regenerate
*/
pub async fn regenerate(
    path: web::Path<Uuid>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, WizardError> {
    let id = path.into_inner();
    let (outcome, view) = state.sessions.with_session(&id, |wizard| {
        wizard.regenerate().map(|outcome| (outcome, wizard.view()))
    })??;

    match outcome {
        AdvanceOutcome::Generate(job) => run_generation(&state, id, job).await,
        AdvanceOutcome::Invalid(_) => {
            Ok(HttpResponse::UnprocessableEntity().json(SessionResponse { id, view }))
        }
        AdvanceOutcome::Moved(_) | AdvanceOutcome::Unchanged => Ok(respond(id, view)),
    }
}

// The session lock is released while the tiers run; a newer attempt started in
// the meantime makes this one stale and its outcome is dropped on commit.
async fn run_generation(
    state: &AppState,
    id: Uuid,
    job: GenerationJob,
) -> Result<HttpResponse, WizardError> {
    let outcome = job.run(&state.orchestrator).await;
    let view = state.sessions.with_session(&id, |wizard| {
        wizard.complete_generation(job.ticket, outcome);
        wizard.view()
    })?;
    Ok(respond(id, view))
}

/*
    POST /api/wizard/sessions/{id}/save
*/
pub async fn save(
    path: web::Path<Uuid>,
    owner: OwnerId,
    state: web::Data<AppState>,
) -> Result<HttpResponse, WizardError> {
    let id = path.into_inner();
    let job = state
        .sessions
        .with_session(&id, |wizard| wizard.begin_save(Some(owner.as_str())))??;

    let outcome = job.run(state.gateway.as_ref()).await;
    let saved = state
        .sessions
        .with_session(&id, |wizard| wizard.finish_save(outcome))??;

    log::info!("Saved itinerary {:?} for session {}", saved.id(), id);
    Ok(HttpResponse::Ok().json(saved))
}
