//! Response normalization.
//!
//! The generation backends have drifted over time: the same itinerary can come
//! back as `dayPlans`, `day_plans` or `days`, with activities under
//! `locations` or `activities`, snake or camel case keys, durations in hours,
//! minutes or free text. Everything downstream renders from
//! [`CanonicalItinerary`], so this module is the only place that knows about
//! those variants. Each concept is resolved from an ordered list of candidate
//! keys where the first present one wins.
//!
//! Normalization never fails on content. Anomalies are corrected (excess days
//! are truncated, numbers get defaults) and logged.

use std::sync::OnceLock;

use chrono::{Duration, NaiveDate};
use regex::Regex;
use serde_json::{Map, Value};

use crate::{
    error::GenerationError,
    models::{
        itinerary::{
            ActivityCategory, CanonicalItinerary, Coordinates, CostBreakdown, DayPlan,
            HotelOption, LocationActivity, DEFAULT_ACTIVITY_HOURS, DEFAULT_RATING,
        },
        trip_request::TripRequest,
    },
};

const DAY_LIST_KEYS: &[&str] = &["dayPlans", "day_plans", "days"];
const ACTIVITY_LIST_KEYS: &[&str] = &["locations", "activities"];
const HOTEL_LIST_KEYS: &[&str] = &["hotels", "recommended_hotels"];
const TRAVEL_TIP_KEYS: &[&str] = &["travel_tips", "travelTips"];
const TOTAL_COST_KEYS: &[&str] = &[
    "total_cost",
    "totalCost",
    "total_estimated_cost",
    "estimated_total_cost",
];
const HOURS_KEYS: &[&str] = &["duration_hours", "durationHours", "duration"];
const MINUTES_KEYS: &[&str] = &["approx_time_mins", "duration_mins", "durationMinutes"];
const ACTIVITY_COST_KEYS: &[&str] = &["estimated_cost", "estimatedCost", "cost"];

/// Outcome of comparing the returned day count with the requested duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayCountReconciliation {
    Exact,
    Truncated { requested: usize, returned: usize },
    Short { requested: usize, returned: usize },
}

/// Map an arbitrary backend payload (bare itinerary or `{success, itinerary,
/// hotel_recommendations}` envelope) onto the canonical model.
pub fn normalize(raw: &Value, request: &TripRequest) -> CanonicalItinerary {
    let (body, envelope) = unwrap_envelope(raw);

    let destination = text(body, &["destination"])
        .unwrap_or_else(|| request.destination.trim().to_string());
    let start_date = date(body, &["start_date", "startDate"]).or(request.start_date);
    let end_date = date(body, &["end_date", "endDate"]).or(request.end_date);

    let raw_days = first_array(body, DAY_LIST_KEYS);
    let duration = request
        .validated_duration()
        .ok()
        .or_else(|| {
            number(body, &["duration_days", "durationDays", "duration"])
                .filter(|days| *days >= 1.0)
                .map(|days| days.round() as u32)
        })
        .unwrap_or(raw_days.len() as u32);

    let total_cost = number(body, TOTAL_COST_KEYS)
        .map(|cost| cost.round() as i64)
        .unwrap_or(0);

    let (kept_days, reconciliation) = reconcile_day_count(raw_days, duration as usize);
    match reconciliation {
        DayCountReconciliation::Truncated { requested, returned } => log::warn!(
            "Duration mismatch: requested {} days, got {} days; dropping the extra days",
            requested,
            returned
        ),
        DayCountReconciliation::Short { requested, returned } => log::warn!(
            "Short itinerary: requested {} days, got {} days",
            requested,
            returned
        ),
        DayCountReconciliation::Exact => {}
    }

    let day_plans = kept_days
        .iter()
        .enumerate()
        .map(|(index, day)| {
            normalize_day(day, index, &DayContext {
                destination: &destination,
                start_date,
                total_cost,
                duration,
            })
        })
        .collect();

    let hotels = hotel_candidates(body, envelope)
        .iter()
        .map(normalize_hotel)
        .collect();

    let travel_tips = first_array(body, TRAVEL_TIP_KEYS)
        .iter()
        .filter_map(|tip| tip.as_str().map(str::to_string))
        .collect();

    let cost_breakdown = field(body, &["cost_breakdown", "costBreakdown"])
        .and_then(explicit_breakdown)
        .unwrap_or_else(|| CostBreakdown::from_total(total_cost));

    let theme = text(body, &["theme"]).unwrap_or_else(|| {
        request
            .lead_style()
            .map(|style| style.backend_theme().to_string())
            .unwrap_or_default()
    });

    let title = text(body, &["title"])
        .unwrap_or_else(|| format!("{} - {} Days", destination, duration));

    CanonicalItinerary {
        id: text(body, &["id", "_id"]),
        title,
        destination,
        start_date,
        end_date,
        duration,
        theme,
        total_cost,
        cost_breakdown,
        day_plans,
        hotels,
        travel_tips,
        provenance: None,
    }
}

/// Same as [`normalize`] but refuses payloads that are not JSON objects at all.
pub fn try_normalize(
    raw: &Value,
    request: &TripRequest,
) -> Result<CanonicalItinerary, GenerationError> {
    if !raw.is_object() {
        return Err(GenerationError::Normalization(
            "itinerary payload is not an object".to_string(),
        ));
    }
    Ok(normalize(raw, request))
}

/// Keep at most `requested` days. Fewer days are passed through untouched.
pub fn reconcile_day_count<T>(days: &[T], requested: usize) -> (&[T], DayCountReconciliation) {
    let returned = days.len();
    if returned > requested {
        (
            &days[..requested],
            DayCountReconciliation::Truncated { requested, returned },
        )
    } else if returned < requested {
        (days, DayCountReconciliation::Short { requested, returned })
    } else {
        (days, DayCountReconciliation::Exact)
    }
}

struct DayContext<'a> {
    destination: &'a str,
    start_date: Option<NaiveDate>,
    total_cost: i64,
    duration: u32,
}

fn normalize_day(day: &Value, index: usize, ctx: &DayContext<'_>) -> DayPlan {
    let day_number = number(day, &["day", "day_number", "dayNumber"])
        .filter(|n| *n >= 1.0)
        .map(|n| n as u32)
        .unwrap_or(index as u32 + 1);

    let location = text(day, &["location", "city"]);
    let title = text(day, &["title", "theme"]).unwrap_or_else(|| match &location {
        Some(place) => format!("Day {} in {}", day_number, place),
        None => format!("Day {}", day_number),
    });

    let date = date(day, &["date"]).or_else(|| {
        ctx.start_date
            .map(|start| start + Duration::days(index as i64))
    });

    let estimated_cost = number(day, &["estimated_cost", "estimatedCost"])
        .map(|cost| cost.round() as i64)
        .unwrap_or_else(|| {
            if ctx.duration > 0 {
                (ctx.total_cost as f64 / f64::from(ctx.duration)).round() as i64
            } else {
                0
            }
        });

    let raw_activities = first_array(day, ACTIVITY_LIST_KEYS);
    let activity_count = raw_activities.len();
    let activities = raw_activities
        .iter()
        .map(|activity| normalize_activity(activity, ctx.destination, estimated_cost, activity_count))
        .collect();

    DayPlan {
        day: day_number,
        date,
        title,
        location,
        description: text(day, &["description", "summary"]),
        activities,
        notes: text(day, &["notes"]),
        estimated_cost,
        highlights: strings(day, &["highlights"]),
        meals_included: strings(day, &["meals_included", "mealsIncluded"]),
    }
}

fn normalize_activity(
    activity: &Value,
    destination: &str,
    day_cost: i64,
    activity_count: usize,
) -> LocationActivity {
    let name = text(activity, &["name", "activity", "place", "title"])
        .unwrap_or_else(|| format!("Explore {}", destination));

    let category = text(activity, &["category", "type"])
        .map(|label| ActivityCategory::from_label(&label))
        .unwrap_or_default();

    let estimated_cost = number(activity, ACTIVITY_COST_KEYS)
        .map(|cost| cost.round() as i64)
        .unwrap_or_else(|| {
            if activity_count > 0 {
                (day_cost as f64 / activity_count as f64).round() as i64
            } else {
                0
            }
        });

    let rating = number(activity, &["rating"])
        .map(|rating| rating.clamp(0.0, 5.0))
        .unwrap_or(DEFAULT_RATING);

    LocationActivity {
        name,
        category,
        description: text(activity, &["description", "details"]).unwrap_or_default(),
        duration_hours: activity_hours(activity),
        rating,
        estimated_cost,
        coordinates: field(activity, &["coordinates", "coords"]).and_then(coordinates),
        address: text(activity, &["address"]),
        best_time: text(activity, &["best_time", "bestTime", "time"]),
    }
}

/// Explicit hours, then minutes rounded to whole hours (at least one), then
/// the two hour default.
fn activity_hours(activity: &Value) -> f64 {
    if let Some(hours) = field(activity, HOURS_KEYS).and_then(parse_hours) {
        return hours;
    }
    if let Some(minutes) = number(activity, MINUTES_KEYS).filter(|m| *m > 0.0) {
        return (minutes / 60.0).round().max(1.0);
    }
    DEFAULT_ACTIVITY_HOURS
}

fn parse_hours(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|h| *h > 0.0),
        Value::String(s) => parse_duration_text(s),
        _ => None,
    }
}

// "2 hours", "1.5 hrs", "90 mins", "3"
fn parse_duration_text(text: &str) -> Option<f64> {
    static DURATION_RE: OnceLock<Option<Regex>> = OnceLock::new();
    let re = DURATION_RE
        .get_or_init(|| Regex::new(r"(?i)(\d+(?:\.\d+)?)\s*(h|hr|hrs|hour|hours|m|min|mins|minute|minutes)?\b").ok())
        .as_ref()?;

    let caps = re.captures(text)?;
    let amount: f64 = caps.get(1)?.as_str().parse().ok()?;
    let is_minutes = caps
        .get(2)
        .map(|unit| unit.as_str().to_lowercase().starts_with('m'))
        .unwrap_or(false);

    let hours = if is_minutes {
        (amount / 60.0).round().max(1.0)
    } else {
        amount
    };
    Some(hours).filter(|h| *h > 0.0)
}

fn coordinates(value: &Value) -> Option<Coordinates> {
    let (lat, lng) = match value {
        Value::Array(pair) if pair.len() == 2 => (pair[0].as_f64()?, pair[1].as_f64()?),
        Value::Object(obj) => (
            obj.get("lat").and_then(Value::as_f64)?,
            obj.get("lng")
                .or_else(|| obj.get("lon"))
                .and_then(Value::as_f64)?,
        ),
        _ => return None,
    };

    // [0, 0] is what placeholder generators emit when they know nothing.
    if lat == 0.0 && lng == 0.0 {
        return None;
    }
    Some(Coordinates { lat, lng })
}

fn hotel_candidates<'a>(body: &'a Value, envelope: Option<&'a Value>) -> &'a [Value] {
    let own = first_array(body, HOTEL_LIST_KEYS);
    if !own.is_empty() {
        return own;
    }

    envelope
        .map(|env| {
            let nested = field(env, &["hotel_recommendations"])
                .map(|recs| first_array(recs, HOTEL_LIST_KEYS))
                .unwrap_or(&[]);
            if nested.is_empty() {
                first_array(env, HOTEL_LIST_KEYS)
            } else {
                nested
            }
        })
        .unwrap_or(&[])
}

fn normalize_hotel(hotel: &Value) -> HotelOption {
    let location = text(hotel, &["location", "address"]).unwrap_or_else(|| {
        let city = text(hotel, &["city"]).unwrap_or_default();
        let state = text(hotel, &["state"]).unwrap_or_default();
        format!("{}, {}", city, state)
            .trim_matches(|c: char| c == ',' || c.is_whitespace())
            .to_string()
    });

    HotelOption {
        id: text(hotel, &["id", "_id"]),
        name: text(hotel, &["name"]).unwrap_or_else(|| "Recommended stay".to_string()),
        location,
        rating: number(hotel, &["rating"])
            .map(|rating| rating.clamp(0.0, 5.0))
            .unwrap_or(DEFAULT_RATING),
        price_per_night: whole(hotel, &["price_per_night", "pricePerNight"]),
        total_cost: whole(hotel, &["total_cost_with_tax", "total_cost", "totalCost"]),
        amenities: strings(hotel, &["amenities"]),
        description: text(hotel, &["description"]).unwrap_or_default(),
        review_count: number(hotel, &["review_count", "reviewCount"])
            .filter(|count| *count >= 0.0)
            .map(|count| count as u32)
            .unwrap_or(0),
    }
}

fn explicit_breakdown(value: &Value) -> Option<CostBreakdown> {
    let breakdown = CostBreakdown {
        accommodation: number(value, &["accommodation"])?.round() as i64,
        food: number(value, &["food"])?.round() as i64,
        activities: number(value, &["activities"])?.round() as i64,
        transportation: number(value, &["transportation"])?.round() as i64,
    };
    Some(breakdown)
}

fn unwrap_envelope(raw: &Value) -> (&Value, Option<&Value>) {
    match raw.get("itinerary") {
        Some(inner) if inner.is_object() => (inner, Some(raw)),
        _ => (raw, None),
    }
}

/// First key present with a non-null value.
fn field<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    let obj: &Map<String, Value> = value.as_object()?;
    keys.iter()
        .filter_map(|key| obj.get(*key))
        .find(|v| !v.is_null())
}

fn first_array<'a>(value: &'a Value, keys: &[&str]) -> &'a [Value] {
    let Some(obj) = value.as_object() else {
        return &[];
    };
    keys.iter()
        .filter_map(|key| obj.get(*key))
        .find_map(|v| v.as_array())
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

fn text(value: &Value, keys: &[&str]) -> Option<String> {
    field(value, keys)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn number(value: &Value, keys: &[&str]) -> Option<f64> {
    field(value, keys).and_then(|v| match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    })
    .filter(|n| n.is_finite())
}

fn whole(value: &Value, keys: &[&str]) -> i64 {
    number(value, keys).map(|n| n.round() as i64).unwrap_or(0)
}

fn strings(value: &Value, keys: &[&str]) -> Vec<String> {
    first_array(value, keys)
        .iter()
        .filter_map(|v| v.as_str().map(str::to_string))
        .collect()
}

fn date(value: &Value, keys: &[&str]) -> Option<NaiveDate> {
    let raw = text(value, keys)?;
    let day_part = raw.get(..10).unwrap_or(&raw);
    NaiveDate::parse_from_str(day_part, "%Y-%m-%d").ok()
}
