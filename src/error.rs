use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

/// Failure of a single generation tier. Every variant advances the fallback
/// chain; the class decides whether local synthesis may take over.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TierError {
    #[error("backend rejected request with status {status}: {body}")]
    Client { status: u16, body: String },

    #[error("backend failed with status {status}: {body}")]
    Server { status: u16, body: String },

    #[error("backend did not answer in time")]
    Timeout,

    #[error("backend not reachable: {0}")]
    Network(String),

    #[error("backend returned an unsuccessful response: {0}")]
    Rejected(String),

    #[error("backend returned a malformed payload: {0}")]
    Malformed(String),
}

impl TierError {
    /// True when the backend could not be reached at all or fell over on its
    /// side (network, timeout, 5xx).
    pub fn is_unreachable(&self) -> bool {
        matches!(
            self,
            TierError::Server { .. } | TierError::Timeout | TierError::Network(_)
        )
    }
}

impl From<reqwest::Error> for TierError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TierError::Timeout
        } else if err.is_decode() {
            TierError::Malformed(err.to_string())
        } else {
            TierError::Network(err.to_string())
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum GenerationError {
    #[error("Invalid trip duration of {0} days. Please select valid dates.")]
    InvalidDuration(i64),

    #[error("Please select both a start and an end date.")]
    MissingDates,

    #[error("Failed to generate itinerary: {last}")]
    AllTiersFailed { last: TierError },

    #[error("Failed to read generated itinerary: {0}")]
    Normalization(String),
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("request failed with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("failed to decode response: {0}")]
    Decode(String),

    #[error("itinerary not found")]
    NotFound,
}

#[derive(Debug, Error)]
pub enum WizardError {
    #[error("there is no generated itinerary to save")]
    NothingToSave,

    #[error("the trip changed since the itinerary was generated; regenerate before saving")]
    StaleItinerary,

    #[error("regenerating is only available once the preferences step is complete")]
    RegenerateUnavailable,

    #[error("Failed to save itinerary. Please try again.")]
    Gateway(#[from] GatewayError),

    #[error("wizard session not found")]
    UnknownSession,
}

impl ResponseError for WizardError {
    fn status_code(&self) -> StatusCode {
        match self {
            WizardError::NothingToSave
            | WizardError::StaleItinerary
            | WizardError::RegenerateUnavailable => StatusCode::CONFLICT,
            WizardError::Gateway(_) => StatusCode::BAD_GATEWAY,
            WizardError::UnknownSession => StatusCode::NOT_FOUND,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({ "error": self.to_string() }))
    }
}

impl ResponseError for GatewayError {
    fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::NotFound => StatusCode::NOT_FOUND,
            _ => StatusCode::BAD_GATEWAY,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({ "error": self.to_string() }))
    }
}
