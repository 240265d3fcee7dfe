use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

pub const DEFAULT_RATING: f64 = 4.5;
pub const DEFAULT_ACTIVITY_HOURS: f64 = 2.0;
const MAPS_SEARCH_URL: &str = "https://www.google.com/maps/search/";

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ActivityCategory {
    #[default]
    Attraction,
    Restaurant,
    Hotel,
    Other,
}

impl ActivityCategory {
    /// Map a free-form backend label onto the fixed categories.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "attraction" | "sightseeing" | "landmark" | "monument" | "temple" | "museum"
            | "culture" | "nature" | "beach" => ActivityCategory::Attraction,
            "restaurant" | "food" | "dining" | "cafe" | "meal" => ActivityCategory::Restaurant,
            "hotel" | "accommodation" | "lodging" | "resort" | "stay" => ActivityCategory::Hotel,
            _ => ActivityCategory::Other,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

/// What a map link for an activity should search for, in resolution order.
#[derive(Debug, Clone, PartialEq)]
pub enum MapQuery {
    Coordinates(Coordinates),
    Address(String),
    FreeText(String),
}

impl MapQuery {
    pub fn query_string(&self) -> String {
        match self {
            MapQuery::Coordinates(c) => format!("{},{}", c.lat, c.lng),
            MapQuery::Address(address) => address.clone(),
            MapQuery::FreeText(text) => text.clone(),
        }
    }

    pub fn maps_url(&self) -> String {
        let query = self.query_string();
        match Url::parse_with_params(MAPS_SEARCH_URL, &[("api", "1"), ("query", query.as_str())]) {
            Ok(url) => url.to_string(),
            Err(_) => MAPS_SEARCH_URL.to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct LocationActivity {
    pub name: String,
    pub category: ActivityCategory,
    pub description: String,
    pub duration_hours: f64,
    pub rating: f64,
    pub estimated_cost: i64,
    pub coordinates: Option<Coordinates>,
    pub address: Option<String>,
    pub best_time: Option<String>,
}

impl LocationActivity {
    pub fn map_query(&self, destination: &str) -> MapQuery {
        if let Some(coordinates) = self.coordinates {
            return MapQuery::Coordinates(coordinates);
        }
        if let Some(address) = self.address.as_ref().filter(|a| !a.trim().is_empty()) {
            return MapQuery::Address(address.clone());
        }
        MapQuery::FreeText(format!("{} {}", self.name, destination).trim().to_string())
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct DayPlan {
    pub day: u32,
    pub date: Option<NaiveDate>,
    pub title: String,
    pub location: Option<String>,
    pub description: Option<String>,
    #[serde(alias = "locations")]
    pub activities: Vec<LocationActivity>,
    pub notes: Option<String>,
    pub estimated_cost: i64,
    pub highlights: Vec<String>,
    pub meals_included: Vec<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct HotelOption {
    pub id: Option<String>,
    pub name: String,
    pub location: String,
    pub rating: f64,
    pub price_per_night: i64,
    pub total_cost: i64,
    pub amenities: Vec<String>,
    pub description: String,
    pub review_count: u32,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GenerationTier {
    Ml,
    RuleBased,
    Local,
}

impl GenerationTier {
    pub fn label(&self) -> &'static str {
        match self {
            GenerationTier::Ml => "ml",
            GenerationTier::RuleBased => "rule-based",
            GenerationTier::Local => "local",
        }
    }

    pub fn default_confidence(&self) -> f64 {
        match self {
            GenerationTier::Ml | GenerationTier::RuleBased => 0.9,
            GenerationTier::Local => 0.5,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Provenance {
    pub tier: GenerationTier,
    pub ml_powered: bool,
    pub confidence: f64,
    pub generated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct CostBreakdown {
    pub accommodation: i64,
    pub food: i64,
    pub activities: i64,
    pub transportation: i64,
}

impl CostBreakdown {
    /// Split a trip total 40/25/20/15 across accommodation, food, activities
    /// and transportation.
    pub fn from_total(total: i64) -> Self {
        let share = |pct: f64| (total as f64 * pct).round() as i64;
        Self {
            accommodation: share(0.40),
            food: share(0.25),
            activities: share(0.20),
            transportation: share(0.15),
        }
    }

    pub fn total(&self) -> i64 {
        self.accommodation + self.food + self.activities + self.transportation
    }
}

/// The single itinerary shape every view renders from.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct CanonicalItinerary {
    #[serde(alias = "_id")]
    pub id: Option<String>,
    pub title: String,
    pub destination: String,
    #[serde(alias = "start_date")]
    pub start_date: Option<NaiveDate>,
    #[serde(alias = "end_date")]
    pub end_date: Option<NaiveDate>,
    pub duration: u32,
    pub theme: String,
    #[serde(alias = "total_cost")]
    pub total_cost: i64,
    pub cost_breakdown: CostBreakdown,
    #[serde(alias = "day_plans", alias = "days")]
    pub day_plans: Vec<DayPlan>,
    pub hotels: Vec<HotelOption>,
    #[serde(alias = "travel_tips")]
    pub travel_tips: Vec<String>,
    pub provenance: Option<Provenance>,
}

impl CanonicalItinerary {
    /// Days the request asked for that the backend did not deliver.
    pub fn missing_days(&self) -> u32 {
        self.duration.saturating_sub(self.day_plans.len() as u32)
    }

    pub fn per_person_cost(&self, group_size: u32) -> i64 {
        (self.total_cost as f64 / f64::from(group_size.max(1))).round() as i64
    }

    pub fn activity_count(&self) -> usize {
        self.day_plans.iter().map(|day| day.activities.len()).sum()
    }
}
