//! HTTP plumbing shared by the remote generation tiers and the persistence
//! gateway.
//!
//! All calls go to the single planner backend configured through
//! `PLANNER_API_URL`. A bearer token is attached when `PLANNER_API_TOKEN` is
//! set. Generation calls carry the long generation timeout; a timeout surfaces
//! as [`TierError::Timeout`] so the fallback chain can move on.

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Serialize;
use serde_json::Value;

use crate::{config::PlannerConfig, error::TierError};

#[derive(Clone)]
pub struct BackendClient {
    http_client: Client,
    base_url: String,
    api_token: Option<String>,
}

impl BackendClient {
    pub fn new(config: &PlannerConfig) -> Result<Self, reqwest::Error> {
        let http_client = Client::builder()
            .timeout(config.generation_timeout)
            .build()?;

        Ok(Self {
            http_client,
            base_url: config.api_url.trim_end_matches('/').to_string(),
            api_token: config.api_token.clone(),
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn get(&self, path: &str) -> RequestBuilder {
        self.authorize(self.http_client.get(self.url(path)))
    }

    pub fn post(&self, path: &str) -> RequestBuilder {
        self.authorize(self.http_client.post(self.url(path)))
    }

    pub fn put(&self, path: &str) -> RequestBuilder {
        self.authorize(self.http_client.put(self.url(path)))
    }

    pub fn delete(&self, path: &str) -> RequestBuilder {
        self.authorize(self.http_client.delete(self.url(path)))
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_token {
            Some(token) => request.header("Authorization", format!("Bearer {}", token)),
            None => request,
        }
    }

    /// POST a generation request and return the JSON object the backend
    /// answered with. Non-2xx statuses, transport failures and non-object
    /// bodies all come back as a [`TierError`].
    pub async fn post_generation<T: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<Value, TierError> {
        let response = self
            .post(path)
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await?;

        let response = classify_status(response).await?;
        let payload: Value = response.json().await?;

        if !payload.is_object() {
            return Err(TierError::Malformed(format!(
                "expected a JSON object, got {}",
                json_kind(&payload)
            )));
        }

        Ok(payload)
    }
}

async fn classify_status(response: Response) -> Result<Response, TierError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    Err(status_error(status, body))
}

fn status_error(status: StatusCode, body: String) -> TierError {
    if status.is_client_error() {
        TierError::Client {
            status: status.as_u16(),
            body,
        }
    } else {
        TierError::Server {
            status: status.as_u16(),
            body,
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
