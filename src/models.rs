// Canonical search model shared by providers, ranking and the orchestrator

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_CABIN_CLASS: &str = "economy";
pub const DEFAULT_SORT_BY: &str = "best_value";
pub const DEFAULT_SORT_ORDER: &str = "asc";

/// Layout every canonical flight datetime is rendered in, e.g. `2025-12-15T06:00:00+07:00`.
pub const CANONICAL_DATETIME_LAYOUT: &str = "%Y-%m-%dT%H:%M:%S%:z";
pub const DATE_LAYOUT: &str = "%Y-%m-%d";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("invalid {field}: {value:?} is not a YYYY-MM-DD date")]
    InvalidDate { field: &'static str, value: String },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    pub origin: String,
    pub destination: String,
    pub departure_date: String,
    #[serde(default)]
    pub return_date: Option<String>,
    #[serde(default)]
    pub passengers: u32,
    #[serde(default)]
    pub cabin_class: String,
    #[serde(default)]
    pub filters: Filters,
    #[serde(default)]
    pub sort_by: String,
    #[serde(default)]
    pub sort_order: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Filters {
    pub price_min: i64,
    pub price_max: i64,
    pub max_stops: u32,
    pub airlines: Vec<String>,
    pub departure_time_range: String,
    pub arrival_time_range: String,
    pub max_duration_minutes: u32,
}

impl SearchRequest {
    /// Validates the dates and fills in defaults. Running it twice is a no-op,
    /// so the cache key of a normalized request is stable.
    pub fn normalize(mut self) -> Result<Self, ValidationError> {
        validate_date("departureDate", &self.departure_date)?;
        if let Some(return_date) = &self.return_date {
            validate_date("returnDate", return_date)?;
        }

        self.filters.airlines.sort();

        if self.passengers == 0 {
            self.passengers = 1;
        }
        if self.cabin_class.is_empty() {
            self.cabin_class = DEFAULT_CABIN_CLASS.to_string();
        }
        if self.sort_by.is_empty() {
            self.sort_by = DEFAULT_SORT_BY.to_string();
        }
        if self.sort_order.is_empty() {
            self.sort_order = DEFAULT_SORT_ORDER.to_string();
        }

        Ok(self)
    }
}

fn validate_date(field: &'static str, value: &str) -> Result<NaiveDate, ValidationError> {
    NaiveDate::parse_from_str(value, DATE_LAYOUT).map_err(|_| ValidationError::InvalidDate {
        field,
        value: value.to_string(),
    })
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Baggage {
    pub carry_on: Option<String>,
    pub checked: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Airline {
    pub name: String,
    pub code: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventPoint {
    pub airport: String,
    pub city: String,
    pub datetime: String,
    pub timestamp: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlightDuration {
    pub total_minutes: u32,
    pub formatted: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    pub amount: i64,
    pub currency: String,
    pub formatted: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flight {
    pub id: String,
    pub provider: String,
    pub airline: Airline,
    pub flight_number: String,
    pub departure: EventPoint,
    pub arrival: EventPoint,
    pub duration: FlightDuration,
    pub stops: u32,
    pub price: Price,
    pub available_seats: u32,
    pub cabin_class: String,
    pub aircraft: Option<String>,
    pub amenities: Option<Vec<String>>,
    pub baggage: Baggage,
}

impl Flight {
    pub fn amenity_count(&self) -> usize {
        self.amenities.as_ref().map_or(0, Vec::len)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    pub total_results: usize,
    pub providers_queried: usize,
    pub providers_succeeded: usize,
    pub providers_failed: usize,
    pub search_time_ms: u64,
    pub cache_hit: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    #[serde(rename = "search_criteria")]
    pub criteria: SearchRequest,
    pub metadata: Metadata,
    pub flights: Vec<Flight>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> SearchRequest {
        SearchRequest {
            origin: "CGK".to_string(),
            destination: "DPS".to_string(),
            departure_date: "2025-12-15".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_normalize_applies_defaults() {
        let mut req = request();
        req.filters.airlines = vec!["Lion Air".to_string(), "AirAsia".to_string()];

        let normalized = req.normalize().unwrap();
        assert_eq!(normalized.passengers, 1);
        assert_eq!(normalized.cabin_class, "economy");
        assert_eq!(normalized.sort_by, "best_value");
        assert_eq!(normalized.sort_order, "asc");
        assert_eq!(normalized.filters.airlines, vec!["AirAsia", "Lion Air"]);
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let once = request().normalize().unwrap();
        let twice = once.clone().normalize().unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_normalize_rejects_bad_dates() {
        let mut req = request();
        req.departure_date = "15-12-2025".to_string();
        assert_eq!(
            req.normalize().unwrap_err(),
            ValidationError::InvalidDate {
                field: "departureDate",
                value: "15-12-2025".to_string()
            }
        );

        let mut req = request();
        req.return_date = Some("2025-13-01".to_string());
        assert!(matches!(
            req.normalize(),
            Err(ValidationError::InvalidDate { field: "returnDate", .. })
        ));
    }

    #[test]
    fn test_request_deserializes_with_optional_blocks() {
        let json = r#"{
            "origin": "CGK",
            "destination": "DPS",
            "departureDate": "2025-12-15",
            "filters": { "priceMax": 1500000, "airlines": ["Garuda Indonesia"] }
        }"#;

        let req: SearchRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.return_date, None);
        assert_eq!(req.filters.price_max, 1_500_000);
        assert_eq!(req.filters.price_min, 0);
        assert_eq!(req.filters.airlines, vec!["Garuda Indonesia"]);
    }
}
