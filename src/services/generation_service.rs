use std::time::Duration;

use async_trait::async_trait;
use chrono::{Duration as Days, NaiveDate, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{
    config::PlannerConfig,
    error::{GenerationError, TierError},
    models::{
        itinerary::{CanonicalItinerary, GenerationTier, Provenance},
        trip_request::TripRequest,
    },
    services::{backend_client::BackendClient, normalizer},
};

const DEFAULT_BACKEND_BUDGET: i64 = 25000;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct GenerationPreferences {
    pub theme: String,
    pub budget: i64,
    pub interests: Vec<String>,
}

/// Body sent to every remote tier.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct GenerationRequest {
    pub destination: String,
    pub duration_days: u32,
    pub start_date: NaiveDate,
    pub preferences: GenerationPreferences,
    pub budget: i64,
    pub trip_type: String,
    pub group_size: u32,
}

impl GenerationRequest {
    /// Shape a wizard request for the backends. Requests whose duration is
    /// outside the supported range never leave the client.
    pub fn from_trip(request: &TripRequest) -> Result<Self, GenerationError> {
        let duration_days = request.validated_duration()?;
        let start_date = request.start_date.ok_or(GenerationError::MissingDates)?;

        let lead_style = request.lead_style();
        let budget = if request.budget_amount > 0 {
            request.budget_amount
        } else {
            DEFAULT_BACKEND_BUDGET
        };

        Ok(Self {
            destination: destination_key(&request.destination),
            duration_days,
            start_date,
            preferences: GenerationPreferences {
                theme: lead_style
                    .map(|style| style.backend_theme())
                    .unwrap_or("leisure")
                    .to_string(),
                budget,
                interests: request
                    .travel_style
                    .iter()
                    .map(|style| style.as_str().to_string())
                    .collect(),
            },
            budget,
            trip_type: lead_style
                .map(|style| style.backend_trip_type())
                .unwrap_or("leisure")
                .to_string(),
            group_size: request.group_size.max(1),
        })
    }

    pub fn end_date(&self) -> NaiveDate {
        self.start_date + Days::days(i64::from(self.duration_days) - 1)
    }
}

/// "Kerala, India" -> "kerala"
pub fn destination_key(destination: &str) -> String {
    destination
        .split(',')
        .next()
        .unwrap_or("")
        .trim()
        .to_lowercase()
}

/// One candidate backend in the fallback chain.
#[async_trait]
pub trait ItineraryTier: Send + Sync {
    fn tier(&self) -> GenerationTier;

    async fn generate(&self, request: &GenerationRequest) -> Result<Value, TierError>;
}

/// ML-ranked or rule-based generation endpoint on the planner backend.
pub struct RemoteTier {
    tier: GenerationTier,
    path: String,
    client: BackendClient,
}

impl RemoteTier {
    pub fn ml(client: BackendClient, path: impl Into<String>) -> Self {
        Self {
            tier: GenerationTier::Ml,
            path: path.into(),
            client,
        }
    }

    pub fn rule_based(client: BackendClient, path: impl Into<String>) -> Self {
        Self {
            tier: GenerationTier::RuleBased,
            path: path.into(),
            client,
        }
    }
}

#[async_trait]
impl ItineraryTier for RemoteTier {
    fn tier(&self) -> GenerationTier {
        self.tier
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<Value, TierError> {
        let payload = self.client.post_generation(&self.path, request).await?;
        check_success(payload)
    }
}

// A tier succeeded when its top-level payload is not an error; content quality
// is the normalizer's problem.
fn check_success(payload: Value) -> Result<Value, TierError> {
    if payload.get("success").and_then(Value::as_bool) == Some(false) {
        let message = payload
            .get("error")
            .and_then(Value::as_str)
            .unwrap_or("backend returned an unsuccessful response")
            .to_string();
        return Err(TierError::Rejected(message));
    }

    if payload.get("itinerary").is_none() {
        if let Some(message) = payload.get("error").and_then(Value::as_str) {
            return Err(TierError::Rejected(message.to_string()));
        }
    }

    Ok(payload)
}

/// Client-side synthesis used when the remote backends cannot be reached.
/// Produces one city tour and one market visit per requested day.
#[derive(Debug, Clone)]
pub struct LocalTier {
    day_cost: i64,
}

impl LocalTier {
    pub fn new(day_cost: i64) -> Self {
        Self {
            day_cost: day_cost.max(0),
        }
    }

    pub fn synthesize(&self, request: &GenerationRequest) -> Value {
        let destination = &request.destination;
        let days = request.duration_days;
        let day_cost = self.day_cost;

        let day_plans: Vec<Value> = (0..days)
            .map(|index| {
                let date = request.start_date + Days::days(i64::from(index));
                json!({
                    "day": index + 1,
                    "date": date.format("%Y-%m-%d").to_string(),
                    "title": format!("Day {} - Explore {}", index + 1, destination),
                    "locations": [
                        {
                            "name": format!("{} City Tour", destination),
                            "type": "attraction",
                            "description": format!("Explore the main attractions and landmarks of {}", destination),
                            "duration_hours": 4,
                            "rating": 4.0,
                            "best_time": "morning",
                            "estimated_cost": day_cost * 3 / 10
                        },
                        {
                            "name": "Local Markets & Shopping",
                            "type": "shopping",
                            "description": format!("Visit local markets and shopping areas in {}", destination),
                            "duration_hours": 3,
                            "rating": 4.0,
                            "best_time": "afternoon",
                            "estimated_cost": day_cost / 5
                        }
                    ],
                    "notes": format!("Basic exploration day in {}. Consider local transportation and weather.", destination),
                    "estimated_cost": day_cost
                })
            })
            .collect();

        let total_days = i64::from(days);
        let accommodation = day_cost * 2 / 5 * total_days;
        let food = day_cost * 6 / 25 * total_days;
        let activities = day_cost / 5 * total_days;
        let total_cost = day_cost * total_days;

        json!({
            "title": format!("{} - {} Days (Basic Plan)", destination, days),
            "destination": destination,
            "start_date": request.start_date.format("%Y-%m-%d").to_string(),
            "end_date": request.end_date().format("%Y-%m-%d").to_string(),
            "duration_days": days,
            "theme": "Basic Exploration",
            "total_cost": total_cost,
            "dayPlans": day_plans,
            "hotels": [],
            "travel_tips": [
                format!("Research local customs and traditions in {}", destination),
                "Try local cuisine and specialties",
                "Carry necessary documents and emergency contacts",
                "Book accommodations in advance"
            ],
            "cost_breakdown": {
                "accommodation": accommodation,
                "food": food,
                "activities": activities,
                "transportation": total_cost - accommodation - food - activities
            }
        })
    }
}

#[async_trait]
impl ItineraryTier for LocalTier {
    fn tier(&self) -> GenerationTier {
        GenerationTier::Local
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<Value, TierError> {
        Ok(self.synthesize(request))
    }
}

/// Drives the ordered tier list: remote tiers one after the other, then local
/// synthesis when the last remote failure means the backend is unreachable.
pub struct GenerationOrchestrator {
    tiers: Vec<Box<dyn ItineraryTier>>,
    local: LocalTier,
    tier_timeout: Duration,
}

impl GenerationOrchestrator {
    pub fn new(tiers: Vec<Box<dyn ItineraryTier>>, local: LocalTier, tier_timeout: Duration) -> Self {
        Self {
            tiers,
            local,
            tier_timeout,
        }
    }

    /// ML tier first, rule-based second, both against the configured backend.
    pub fn from_config(config: &PlannerConfig) -> Result<Self, reqwest::Error> {
        let client = BackendClient::new(config)?;
        let tiers: Vec<Box<dyn ItineraryTier>> = vec![
            Box::new(RemoteTier::ml(client.clone(), config.ml_generate_path.clone())),
            Box::new(RemoteTier::rule_based(client, config.rule_generate_path.clone())),
        ];

        Ok(Self::new(
            tiers,
            LocalTier::new(config.local_day_cost),
            config.generation_timeout,
        ))
    }

    pub async fn generate(&self, request: &TripRequest) -> Result<CanonicalItinerary, GenerationError> {
        let shape = GenerationRequest::from_trip(request)?;
        let mut last_error: Option<TierError> = None;

        for tier in &self.tiers {
            let kind = tier.tier();
            log::info!(
                "Attempting {} generation for {} ({} days)",
                kind.label(),
                shape.destination,
                shape.duration_days
            );

            let outcome = match tokio::time::timeout(self.tier_timeout, tier.generate(&shape)).await {
                Ok(outcome) => outcome,
                Err(_) => Err(TierError::Timeout),
            };

            match outcome {
                Ok(payload) => {
                    log::info!("{} generation succeeded", kind.label());
                    return self.finish(&payload, kind, request);
                }
                Err(err) => {
                    log::warn!("{} generation failed: {}", kind.label(), err);
                    last_error = Some(err);
                }
            }
        }

        match last_error {
            Some(err) if !err.is_unreachable() => {
                log::error!("All generation tiers failed, last error: {}", err);
                Err(GenerationError::AllTiersFailed { last: err })
            }
            _ => {
                log::warn!(
                    "Generation backends unreachable, synthesizing a basic itinerary for {}",
                    shape.destination
                );
                let payload = self.local.synthesize(&shape);
                self.finish(&payload, GenerationTier::Local, request)
            }
        }
    }

    fn finish(
        &self,
        payload: &Value,
        tier: GenerationTier,
        request: &TripRequest,
    ) -> Result<CanonicalItinerary, GenerationError> {
        let mut itinerary = normalizer::try_normalize(payload, request)?;

        if itinerary.id.is_none() {
            itinerary.id = Some(Uuid::new_v4().to_string());
        }
        itinerary.provenance = Some(Provenance {
            tier,
            ml_powered: tier == GenerationTier::Ml,
            confidence: payload_confidence(payload).unwrap_or(tier.default_confidence()),
            generated_at: Some(Utc::now()),
        });

        Ok(itinerary)
    }
}

fn payload_confidence(payload: &Value) -> Option<f64> {
    let itinerary = payload.get("itinerary").unwrap_or(payload);
    [
        itinerary.get("confidence"),
        itinerary.get("recommendation_confidence"),
        payload.pointer("/ml_features/recommendation_confidence"),
    ]
    .into_iter()
    .flatten()
    .filter_map(Value::as_f64)
    .find(|c| (0.0..=1.0).contains(c))
}
