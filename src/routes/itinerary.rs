use actix_web::{web, HttpResponse};

use crate::{error::GatewayError, middleware::owner::OwnerId, routes::AppState};

/*
    GET /api/itineraries
*/
pub async fn list(owner: OwnerId, state: web::Data<AppState>) -> Result<HttpResponse, GatewayError> {
    let itineraries = state.gateway.list_itineraries(owner.as_str()).await?;
    Ok(HttpResponse::Ok().json(itineraries))
}

/*
    DELETE /api/itineraries/{id}
*/
pub async fn delete(
    path: web::Path<String>,
    owner: OwnerId,
    state: web::Data<AppState>,
) -> Result<HttpResponse, GatewayError> {
    let id = path.into_inner();
    state.gateway.delete_itinerary(&id, owner.as_str()).await?;
    log::info!("Deleted itinerary {} for {}", id, owner.as_str());
    Ok(HttpResponse::NoContent().finish())
}
