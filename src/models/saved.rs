use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{
    itinerary::CanonicalItinerary,
    trip_request::{
        lenient_tag_set, lenient_tags, AccommodationType, TravelStyle, TripPace, TripRequest, DEFAULT_BUDGET,
    },
};

/// An itinerary as exchanged with the persistence backend: the canonical
/// itinerary plus the request fields needed to reopen it for editing.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SavedItinerary {
    #[serde(flatten)]
    pub itinerary: CanonicalItinerary,
    #[serde(alias = "owner_id", alias = "user_id", alias = "userId", default)]
    pub owner_id: Option<String>,
    #[serde(alias = "group_size", default)]
    pub group_size: Option<u32>,
    #[serde(alias = "budget_per_person", alias = "budgetAmount", default)]
    pub budget_per_person: Option<i64>,
    #[serde(alias = "total_budget", default)]
    pub total_budget: Option<i64>,
    #[serde(alias = "travel_style", alias = "interests", deserialize_with = "lenient_tags", default)]
    pub travel_style: Vec<TravelStyle>,
    #[serde(deserialize_with = "lenient_tag_set", default)]
    pub accommodation: BTreeSet<AccommodationType>,
    #[serde(default)]
    pub pace: Option<TripPace>,
    #[serde(alias = "include_hidden_gems", default)]
    pub include_hidden_gems: Option<bool>,
    #[serde(alias = "include_popular", default)]
    pub include_popular: Option<bool>,
    #[serde(alias = "created_at", default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(alias = "updated_at", default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl SavedItinerary {
    /// Record to hand to the persistence backend for the current form.
    pub fn from_form(
        request: &TripRequest,
        itinerary: &CanonicalItinerary,
        owner_id: Option<&str>,
    ) -> Self {
        let mut itinerary = itinerary.clone();
        itinerary.destination = request.destination.clone();
        itinerary.start_date = request.start_date;
        itinerary.end_date = request.end_date;
        if let Ok(duration) = request.validated_duration() {
            itinerary.duration = duration;
        }

        Self {
            itinerary,
            owner_id: owner_id.map(str::to_string),
            group_size: Some(request.group_size),
            budget_per_person: Some(request.budget_amount),
            total_budget: Some(request.total_budget()),
            travel_style: request.travel_style.clone(),
            accommodation: request.accommodation.clone(),
            pace: Some(request.pace),
            include_hidden_gems: Some(request.include_hidden_gems),
            include_popular: Some(request.include_popular),
            created_at: None,
            updated_at: None,
        }
    }

    /// Rebuild the wizard request this record was created from. Missing
    /// fields take the form defaults.
    pub fn to_trip_request(&self) -> TripRequest {
        let defaults = TripRequest::default();

        TripRequest {
            destination: self.itinerary.destination.clone(),
            start_date: self.itinerary.start_date,
            end_date: self.itinerary.end_date,
            group_size: self.group_size.filter(|size| *size > 0).unwrap_or(defaults.group_size),
            budget_amount: self
                .budget_per_person
                .filter(|budget| *budget > 0)
                .unwrap_or(DEFAULT_BUDGET),
            travel_style: self.travel_style.clone(),
            accommodation: self.accommodation.clone(),
            pace: self.pace.unwrap_or(defaults.pace),
            include_hidden_gems: self
                .include_hidden_gems
                .unwrap_or(defaults.include_hidden_gems),
            include_popular: self.include_popular.unwrap_or(defaults.include_popular),
        }
    }

    pub fn id(&self) -> Option<&str> {
        self.itinerary.id.as_deref()
    }
}
