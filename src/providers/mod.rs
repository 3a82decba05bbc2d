// Provider adapters: each maps its own wire schema into the canonical Flight

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, TimeZone};
use chrono_tz::Tz;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::{
    context::SearchContext,
    fetch_simulator::{FetchError, FetchSimulator, ProviderDescriptor},
    models::{Baggage, EventPoint, Flight, SearchRequest, CANONICAL_DATETIME_LAYOUT, DATE_LAYOUT},
};

mod airasia;
mod batik_air;
mod garuda_indonesia;
mod lion_air;

pub use airasia::AirAsiaProvider;
pub use batik_air::BatikAirProvider;
pub use garuda_indonesia::GarudaIndonesiaProvider;
pub use lion_air::LionAirProvider;

pub const UNKNOWN_CITY: &str = "Unknown city";

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("malformed {provider} payload: {source}")]
    Payload {
        provider: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("provider task for {provider} aborted: {reason}")]
    TaskAborted { provider: String, reason: String },
}

/// One unreliable flight data source.
#[async_trait]
pub trait FlightProvider: Send + Sync + 'static {
    fn descriptor(&self) -> &ProviderDescriptor;

    async fn fetch(
        &self,
        query: &SearchRequest,
        ctx: &SearchContext,
    ) -> Result<Vec<Flight>, ProviderError>;
}

/// The four simulated airlines in registration order.
pub fn default_providers(simulator: Arc<FetchSimulator>) -> Vec<Arc<dyn FlightProvider>> {
    vec![
        Arc::new(AirAsiaProvider::new(simulator.clone())),
        Arc::new(BatikAirProvider::new(simulator.clone())),
        Arc::new(GarudaIndonesiaProvider::new(simulator.clone())),
        Arc::new(LionAirProvider::new(simulator)),
    ]
}

pub(crate) async fn load_payload<T: DeserializeOwned>(
    simulator: &FetchSimulator,
    descriptor: &ProviderDescriptor,
    ctx: &SearchContext,
) -> Result<T, ProviderError> {
    let data = simulator.fetch(descriptor, ctx).await?;
    serde_json::from_slice(&data).map_err(|source| ProviderError::Payload {
        provider: descriptor.name.clone(),
        source,
    })
}

// airport code, city, timezone
const AIRPORTS: &[(&str, &str, Tz)] = &[
    ("CGK", "Jakarta", chrono_tz::Asia::Jakarta),
    ("DPS", "Denpasar", chrono_tz::Asia::Makassar),
    ("SOC", "Kabupaten Boyolali", chrono_tz::Asia::Jakarta),
    ("SUB", "Surabaya", chrono_tz::Asia::Jakarta),
    ("UPG", "Kabupaten Maros", chrono_tz::Asia::Jakarta),
];

pub fn city_for(airport: &str) -> &'static str {
    AIRPORTS
        .iter()
        .find(|(code, _, _)| *code == airport)
        .map_or(UNKNOWN_CITY, |(_, city, _)| city)
}

pub fn timezone_for(airport: &str) -> Tz {
    AIRPORTS
        .iter()
        .find(|(code, _, _)| *code == airport)
        .map_or(Tz::UTC, |(_, _, tz)| *tz)
}

/// Renders `at` in the airport's local time using the canonical layout.
pub fn format_local_datetime<Z: TimeZone>(at: &DateTime<Z>, airport: &str) -> String {
    at.with_timezone(&timezone_for(airport))
        .format(CANONICAL_DATETIME_LAYOUT)
        .to_string()
}

pub fn event_point(airport: &str, city: &str, at: &DateTime<FixedOffset>) -> EventPoint {
    EventPoint {
        airport: airport.to_string(),
        city: city.to_string(),
        datetime: format_local_datetime(at, airport),
        timestamp: at.timestamp(),
    }
}

/// `<flight number>_<airline without non-word characters>`, e.g. `QZ520_AirAsia`.
pub fn flight_id(airline: &str, flight_number: &str) -> String {
    let airline: String = airline
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_')
        .collect();
    format!("{flight_number}_{airline}")
}

pub fn format_duration(total_minutes: u32) -> String {
    format!("{:02}h {:02}m", total_minutes / 60, total_minutes % 60)
}

/// Parses labels such as `1h 45m`; anything unreadable counts as zero.
pub fn parse_duration_label(label: &str) -> u32 {
    let parts: Vec<&str> = label.split_whitespace().collect();
    if parts.len() < 2 {
        return 0;
    }
    let hours = parts[0].trim_end_matches('h').parse::<u32>().unwrap_or(0);
    let minutes = parts[1].trim_end_matches('m').parse::<u32>().unwrap_or(0);
    hours * 60 + minutes
}

/// Indonesian grouping: `IDR 1.250.000`.
pub fn format_price(amount: i64, currency: &str) -> String {
    let digits = amount.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(c);
    }
    let sign = if amount < 0 { "-" } else { "" };
    format!("{currency} {sign}{grouped}")
}

pub fn title_case(s: &str) -> String {
    s.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// Splits notes like `7kg cabin, 20kg checked` into carry-on and checked parts.
pub fn parse_baggage_note(note: &str) -> Baggage {
    let parts: Vec<&str> = note.split(',').collect();
    if parts.len() < 2 {
        return Baggage::default();
    }
    Baggage {
        carry_on: Some(title_case(parts[0])),
        checked: Some(title_case(parts[1])),
    }
}

/// Origin, destination, calendar date of departure (in its own offset) and seats.
pub fn matches_query(
    query: &SearchRequest,
    origin: &str,
    destination: &str,
    departure: &DateTime<FixedOffset>,
    seats: u32,
) -> bool {
    origin == query.origin
        && destination == query.destination
        && departure.format(DATE_LAYOUT).to_string() == query.departure_date
        && seats >= query.passengers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flight_id_strips_non_word_characters() {
        assert_eq!(flight_id("Garuda Indonesia", "GA400"), "GA400_GarudaIndonesia");
        assert_eq!(flight_id("Lion-Air (JT)", "JT740"), "JT740_LionAirJT");
    }

    #[test]
    fn test_duration_formatting() {
        assert_eq!(format_duration(110), "01h 50m");
        assert_eq!(format_duration(45), "00h 45m");
        assert_eq!(parse_duration_label("1h 45m"), 105);
        assert_eq!(parse_duration_label("3h"), 0);
        assert_eq!(parse_duration_label("xh 10m"), 10);
    }

    #[test]
    fn test_price_formatting() {
        assert_eq!(format_price(1_250_000, "IDR"), "IDR 1.250.000");
        assert_eq!(format_price(650_000, "IDR"), "IDR 650.000");
        assert_eq!(format_price(999, "IDR"), "IDR 999");
        assert_eq!(format_price(0, "IDR"), "IDR 0");
    }

    #[test]
    fn test_baggage_note() {
        let baggage = parse_baggage_note("Cabin baggage only, checked bags ADDITIONAL fee");
        assert_eq!(baggage.carry_on.as_deref(), Some("Cabin Baggage Only"));
        assert_eq!(baggage.checked.as_deref(), Some("Checked Bags Additional Fee"));
        assert_eq!(parse_baggage_note("7kg cabin only"), Baggage::default());
    }

    #[test]
    fn test_airport_table() {
        assert_eq!(city_for("CGK"), "Jakarta");
        assert_eq!(city_for("XXX"), UNKNOWN_CITY);
        assert_eq!(timezone_for("DPS"), chrono_tz::Asia::Makassar);
        assert_eq!(timezone_for("XXX"), Tz::UTC);
    }

    #[test]
    fn test_local_datetime_uses_arrival_timezone() {
        let at = DateTime::parse_from_rfc3339("2025-12-15T06:00:00+07:00").unwrap();
        assert_eq!(format_local_datetime(&at, "DPS"), "2025-12-15T07:00:00+08:00");
        assert_eq!(format_local_datetime(&at, "CGK"), "2025-12-15T06:00:00+07:00");
    }

    #[test]
    fn test_matches_query_compares_calendar_date() {
        let query = SearchRequest {
            origin: "CGK".to_string(),
            destination: "DPS".to_string(),
            departure_date: "2025-12-15".to_string(),
            passengers: 2,
            ..Default::default()
        };
        let late_evening = DateTime::parse_from_rfc3339("2025-12-15T23:30:00+07:00").unwrap();
        let next_day = DateTime::parse_from_rfc3339("2025-12-16T00:30:00+07:00").unwrap();

        assert!(matches_query(&query, "CGK", "DPS", &late_evening, 2));
        assert!(!matches_query(&query, "CGK", "DPS", &next_day, 2));
        assert!(!matches_query(&query, "CGK", "DPS", &late_evening, 1));
        assert!(!matches_query(&query, "CGK", "SUB", &late_evening, 9));
    }
}
