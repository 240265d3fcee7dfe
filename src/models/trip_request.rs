use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize};

use crate::error::GenerationError;

pub const MIN_TRIP_DAYS: i64 = 1;
pub const MAX_TRIP_DAYS: i64 = 30;
pub const DEFAULT_BUDGET: i64 = 5000;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TravelStyle {
    Adventure,
    Relaxation,
    Cultural,
    Foodie,
    Shopping,
    Nature,
    Photography,
    Spiritual,
}

impl TravelStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            TravelStyle::Adventure => "adventure",
            TravelStyle::Relaxation => "relaxation",
            TravelStyle::Cultural => "cultural",
            TravelStyle::Foodie => "foodie",
            TravelStyle::Shopping => "shopping",
            TravelStyle::Nature => "nature",
            TravelStyle::Photography => "photography",
            TravelStyle::Spiritual => "spiritual",
        }
    }

    /// Theme understood by the generation backends.
    pub fn backend_theme(&self) -> &'static str {
        match self {
            TravelStyle::Cultural => "culture",
            TravelStyle::Relaxation => "nature",
            TravelStyle::Adventure => "adventure",
            _ => "leisure",
        }
    }

    pub fn backend_trip_type(&self) -> &'static str {
        match self {
            TravelStyle::Adventure => "adventure",
            _ => "leisure",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum AccommodationType {
    Hotel,
    Resort,
    Homestay,
    Hostel,
    Villa,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TripPace {
    Relaxed,
    #[default]
    Moderate,
    Adventure,
}

/// The in-progress request a wizard session builds up.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct TripRequest {
    pub destination: String,
    #[serde(alias = "start_date")]
    pub start_date: Option<NaiveDate>,
    #[serde(alias = "end_date")]
    pub end_date: Option<NaiveDate>,
    #[serde(alias = "group_size")]
    pub group_size: u32,
    #[serde(alias = "budget_amount", alias = "budget")]
    pub budget_amount: i64,
    /// In the order the user picked them; the first one sets the theme.
    #[serde(alias = "travel_style", deserialize_with = "lenient_tags")]
    pub travel_style: Vec<TravelStyle>,
    #[serde(deserialize_with = "lenient_tag_set")]
    pub accommodation: BTreeSet<AccommodationType>,
    pub pace: TripPace,
    #[serde(alias = "include_hidden_gems")]
    pub include_hidden_gems: bool,
    #[serde(alias = "include_popular")]
    pub include_popular: bool,
}

impl Default for TripRequest {
    fn default() -> Self {
        Self {
            destination: String::new(),
            start_date: None,
            end_date: None,
            group_size: 1,
            budget_amount: DEFAULT_BUDGET,
            travel_style: Vec::new(),
            accommodation: BTreeSet::new(),
            pace: TripPace::default(),
            include_hidden_gems: true,
            include_popular: true,
        }
    }
}

impl TripRequest {
    /// Inclusive day span between start and end date.
    pub fn duration_days(&self) -> Option<i64> {
        match (self.start_date, self.end_date) {
            (Some(start), Some(end)) => Some((end - start).num_days() + 1),
            _ => None,
        }
    }

    /// Duration checked against the supported trip length.
    pub fn validated_duration(&self) -> Result<u32, GenerationError> {
        let days = self.duration_days().ok_or(GenerationError::MissingDates)?;
        if !(MIN_TRIP_DAYS..=MAX_TRIP_DAYS).contains(&days) {
            return Err(GenerationError::InvalidDuration(days));
        }
        Ok(days as u32)
    }

    pub fn toggle_travel_style(&mut self, style: TravelStyle) {
        match self.travel_style.iter().position(|picked| *picked == style) {
            Some(index) => {
                self.travel_style.remove(index);
            }
            None => self.travel_style.push(style),
        }
    }

    pub fn lead_style(&self) -> Option<TravelStyle> {
        self.travel_style.first().copied()
    }

    pub fn toggle_accommodation(&mut self, kind: AccommodationType) {
        if !self.accommodation.remove(&kind) {
            self.accommodation.insert(kind);
        }
    }

    /// Same destination and dates, the fields a generated day plan depends on.
    pub fn same_trip(&self, other: &TripRequest) -> bool {
        self.destination.trim() == other.destination.trim()
            && self.start_date == other.start_date
            && self.end_date == other.end_date
    }

    pub fn total_budget(&self) -> i64 {
        self.budget_amount * i64::from(self.group_size.max(1))
    }

    pub fn apply(&mut self, patch: TripRequestPatch) {
        if let Some(destination) = patch.destination {
            self.destination = destination;
        }
        if let Some(start_date) = patch.start_date {
            self.start_date = Some(start_date);
        }
        if let Some(end_date) = patch.end_date {
            self.end_date = Some(end_date);
        }
        if let Some(group_size) = patch.group_size {
            self.group_size = group_size;
        }
        if let Some(budget_amount) = patch.budget_amount {
            self.budget_amount = budget_amount;
        }
        if let Some(travel_style) = patch.travel_style {
            self.travel_style = dedup_in_order(travel_style);
        }
        if let Some(accommodation) = patch.accommodation {
            self.accommodation = accommodation;
        }
        if let Some(pace) = patch.pace {
            self.pace = pace;
        }
        if let Some(include_hidden_gems) = patch.include_hidden_gems {
            self.include_hidden_gems = include_hidden_gems;
        }
        if let Some(include_popular) = patch.include_popular {
            self.include_popular = include_popular;
        }
    }
}

/// Partial field update coming from the UI; absent fields are left alone.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TripRequestPatch {
    pub destination: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub group_size: Option<u32>,
    pub budget_amount: Option<i64>,
    pub travel_style: Option<Vec<TravelStyle>>,
    pub accommodation: Option<BTreeSet<AccommodationType>>,
    pub pace: Option<TripPace>,
    pub include_hidden_gems: Option<bool>,
    pub include_popular: Option<bool>,
}

impl TripRequestPatch {
    /// Names of the fields this patch touches, used to clear stale field errors.
    pub fn touched_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.destination.is_some() {
            fields.push("destination");
        }
        if self.start_date.is_some() {
            fields.push("startDate");
        }
        if self.end_date.is_some() {
            fields.push("endDate");
        }
        if self.group_size.is_some() {
            fields.push("groupSize");
        }
        if self.travel_style.is_some() {
            fields.push("travelStyle");
        }
        fields
    }
}

// Saved records come from several client versions; unknown tag values are dropped
// instead of failing the whole record.
pub(crate) fn lenient_tags<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + PartialEq,
{
    let values: Option<Vec<serde_json::Value>> = Option::deserialize(deserializer)?;
    let tags: Vec<T> = values
        .unwrap_or_default()
        .into_iter()
        .filter_map(|value| serde_json::from_value(value).ok())
        .collect();
    Ok(dedup_in_order(tags))
}

pub(crate) fn lenient_tag_set<'de, D, T>(deserializer: D) -> Result<BTreeSet<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Ord,
{
    let tags: Vec<T> = lenient_tags(deserializer)?;
    Ok(tags.into_iter().collect())
}

fn dedup_in_order<T: PartialEq>(tags: Vec<T>) -> Vec<T> {
    let mut unique = Vec::with_capacity(tags.len());
    for tag in tags {
        if !unique.contains(&tag) {
            unique.push(tag);
        }
    }
    unique
}
