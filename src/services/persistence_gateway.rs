use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::{
    config::PlannerConfig, error::GatewayError, models::saved::SavedItinerary,
    services::backend_client::BackendClient,
};

/// Storage for finished itineraries. The planner never persists anything
/// itself; every call goes to the backend that owns the records.
#[async_trait]
pub trait ItineraryGateway: Send + Sync {
    async fn save_itinerary(&self, record: &SavedItinerary) -> Result<SavedItinerary, GatewayError>;

    async fn update_itinerary(
        &self,
        id: &str,
        record: &SavedItinerary,
    ) -> Result<SavedItinerary, GatewayError>;

    async fn list_itineraries(&self, owner_id: &str) -> Result<Vec<SavedItinerary>, GatewayError>;

    async fn delete_itinerary(&self, id: &str, owner_id: &str) -> Result<(), GatewayError>;
}

pub struct HttpItineraryGateway {
    client: BackendClient,
    path: String,
}

impl HttpItineraryGateway {
    pub fn new(client: BackendClient, path: impl Into<String>) -> Self {
        Self {
            client,
            path: path.into(),
        }
    }

    pub fn from_config(config: &PlannerConfig) -> Result<Self, reqwest::Error> {
        Ok(Self::new(
            BackendClient::new(config)?,
            config.itineraries_path.clone(),
        ))
    }

    fn record_path(&self, id: &str) -> String {
        format!("{}/{}", self.path, id)
    }
}

#[async_trait]
impl ItineraryGateway for HttpItineraryGateway {
    async fn save_itinerary(&self, record: &SavedItinerary) -> Result<SavedItinerary, GatewayError> {
        let response = self.client.post(&self.path).json(record).send().await?;
        let payload = read_json(response).await?;
        decode_record(payload, record)
    }

    async fn update_itinerary(
        &self,
        id: &str,
        record: &SavedItinerary,
    ) -> Result<SavedItinerary, GatewayError> {
        let response = self
            .client
            .put(&self.record_path(id))
            .json(record)
            .send()
            .await?;
        let payload = read_json(response).await?;
        decode_record(payload, record)
    }

    async fn list_itineraries(&self, owner_id: &str) -> Result<Vec<SavedItinerary>, GatewayError> {
        let response = self
            .client
            .get(&self.path)
            .query(&[("owner_id", owner_id)])
            .send()
            .await?;
        let payload = read_json(response).await?;

        let list = match payload {
            Value::Array(_) => payload,
            Value::Object(mut map) => map
                .remove("itineraries")
                .or_else(|| map.remove("data"))
                .unwrap_or(Value::Array(Vec::new())),
            other => {
                return Err(GatewayError::Decode(format!(
                    "expected a list of itineraries, got {}",
                    other
                )))
            }
        };

        decode(list)
    }

    async fn delete_itinerary(&self, id: &str, owner_id: &str) -> Result<(), GatewayError> {
        let response = self
            .client
            .delete(&self.record_path(id))
            .query(&[("owner_id", owner_id)])
            .send()
            .await?;
        check_status(response).await.map(|_| ())
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, GatewayError> {
    let status = response.status();
    if status == StatusCode::NOT_FOUND {
        return Err(GatewayError::NotFound);
    }
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        log::error!("Itinerary backend returned {}: {}", status, body);
        return Err(GatewayError::Status {
            status: status.as_u16(),
            body,
        });
    }
    Ok(response)
}

async fn read_json(response: reqwest::Response) -> Result<Value, GatewayError> {
    let response = check_status(response).await?;
    let text = response.text().await?;
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(&text).map_err(|e| GatewayError::Decode(e.to_string()))
}

fn decode<T: DeserializeOwned>(value: Value) -> Result<T, GatewayError> {
    serde_json::from_value(value).map_err(|e| GatewayError::Decode(e.to_string()))
}

// Backends answer a write with the stored record, a `{ itinerary: .. }` wrapper,
// or just `{ _id }`. Whatever is missing is taken from what was sent.
fn decode_record(payload: Value, sent: &SavedItinerary) -> Result<SavedItinerary, GatewayError> {
    let payload = match payload {
        Value::Object(mut map) if map.contains_key("itinerary") => {
            map.remove("itinerary").unwrap_or(Value::Null)
        }
        other => other,
    };

    let is_full_record = payload
        .as_object()
        .map(|map| map.contains_key("dayPlans") || map.contains_key("day_plans"))
        .unwrap_or(false);
    if is_full_record {
        return decode(payload);
    }

    let mut stored = sent.clone();
    match &payload {
        Value::Null => {}
        Value::Object(map) => {
            let id = map
                .get("_id")
                .or_else(|| map.get("id"))
                .and_then(Value::as_str);
            if let Some(id) = id {
                stored.itinerary.id = Some(id.to_string());
            }
        }
        other => {
            return Err(GatewayError::Decode(format!(
                "unexpected save response: {}",
                other
            )))
        }
    }

    Ok(stored)
}
