use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::models::trip_request::{TripRequest, MAX_TRIP_DAYS};

/// Field name (as the UI knows it) to user-facing message.
pub type FieldErrors = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Validation {
    pub valid: bool,
    pub field_errors: FieldErrors,
}

impl Validation {
    fn from_errors(field_errors: FieldErrors) -> Self {
        Self {
            valid: field_errors.is_empty(),
            field_errors,
        }
    }
}

/// Destination and dates. `today` is the first day a trip may start on.
pub fn validate_trip_basics(request: &TripRequest, today: NaiveDate) -> Validation {
    let mut errors = FieldErrors::new();

    if request.destination.trim().is_empty() {
        errors.insert("destination".into(), "Please enter a destination".into());
    }

    match request.start_date {
        None => {
            errors.insert("startDate".into(), "Please select start date".into());
        }
        Some(start) if start < today => {
            errors.insert("startDate".into(), "Start date cannot be in the past".into());
        }
        Some(_) => {}
    }

    match (request.start_date, request.end_date) {
        (_, None) => {
            errors.insert("endDate".into(), "Please select end date".into());
        }
        (Some(start), Some(end)) if end < start => {
            errors.insert("endDate".into(), "End date must be after start date".into());
        }
        (Some(_), Some(_)) => {
            if let Some(days) = request.duration_days().filter(|days| *days > MAX_TRIP_DAYS) {
                errors.insert(
                    "endDate".into(),
                    format!("Trips can be at most {} days (selected {})", MAX_TRIP_DAYS, days),
                );
            }
        }
        (None, Some(_)) => {}
    }

    Validation::from_errors(errors)
}

pub fn validate_preferences(request: &TripRequest) -> Validation {
    let mut errors = FieldErrors::new();

    if request.travel_style.is_empty() {
        errors.insert(
            "travelStyle".into(),
            "Please select at least one travel style".into(),
        );
    }
    if request.group_size < 1 {
        errors.insert("groupSize".into(), "Group size must be at least 1".into());
    }

    Validation::from_errors(errors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::trip_request::TravelStyle;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn today() -> NaiveDate {
        date("2025-02-01")
    }

    fn basics(start: &str, end: &str) -> TripRequest {
        TripRequest {
            destination: "Kerala".into(),
            start_date: Some(date(start)),
            end_date: Some(date(end)),
            ..Default::default()
        }
    }

    #[test]
    fn test_valid_basics() {
        let result = validate_trip_basics(&basics("2025-03-01", "2025-03-05"), today());
        assert!(result.valid);
        assert!(result.field_errors.is_empty());
    }

    #[test]
    fn test_empty_form_reports_every_field() {
        let result = validate_trip_basics(&TripRequest::default(), today());
        assert!(!result.valid);
        assert_eq!(result.field_errors["destination"], "Please enter a destination");
        assert_eq!(result.field_errors["startDate"], "Please select start date");
        assert_eq!(result.field_errors["endDate"], "Please select end date");
    }

    #[test]
    fn test_date_ordering_and_past_start() {
        let reversed = validate_trip_basics(&basics("2025-03-05", "2025-03-01"), today());
        assert_eq!(reversed.field_errors["endDate"], "End date must be after start date");

        let past = validate_trip_basics(&basics("2025-01-10", "2025-01-12"), today());
        assert_eq!(past.field_errors["startDate"], "Start date cannot be in the past");

        let same_day = validate_trip_basics(&basics("2025-02-01", "2025-02-01"), today());
        assert!(same_day.valid);
    }

    #[test]
    fn test_trip_longer_than_thirty_days() {
        let result = validate_trip_basics(&basics("2025-03-01", "2025-03-31"), today());
        assert!(!result.valid);
        assert!(result.field_errors.contains_key("endDate"));
    }

    #[test]
    fn test_preferences() {
        let mut request = TripRequest::default();
        let result = validate_preferences(&request);
        assert_eq!(
            result.field_errors["travelStyle"],
            "Please select at least one travel style"
        );

        request.travel_style.push(TravelStyle::Nature);
        request.group_size = 0;
        let result = validate_preferences(&request);
        assert_eq!(result.field_errors.len(), 1);
        assert_eq!(result.field_errors["groupSize"], "Group size must be at least 1");
    }
}
