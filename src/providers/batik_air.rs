use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use serde::Deserialize;

use super::{
    city_for, event_point, flight_id, format_price, load_payload, matches_query,
    parse_baggage_note, parse_duration_label, FlightProvider, ProviderError,
};
use crate::{
    context::SearchContext,
    fetch_simulator::{FetchSimulator, ProviderDescriptor},
    models::{Airline, Flight, FlightDuration, Price, SearchRequest, DEFAULT_CABIN_CLASS},
};

// e.g. 2025-12-15T07:15:00+0700
const DATETIME_LAYOUT: &str = "%Y-%m-%dT%H:%M:%S%z";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BatikAirResponse {
    #[allow(dead_code)]
    code: i32,
    #[allow(dead_code)]
    message: String,
    results: Vec<BatikAirFlight>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BatikAirFlight {
    flight_number: String,
    airline_name: String,
    #[serde(rename = "airlineIATA")]
    airline_iata: String,
    origin: String,
    destination: String,
    departure_date_time: String,
    arrival_date_time: String,
    travel_time: String,
    number_of_stops: u32,
    fare: BatikAirFare,
    seats_available: u32,
    #[serde(default)]
    aircraft_model: String,
    #[serde(default)]
    baggage_info: String,
    #[serde(default)]
    onboard_services: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BatikAirFare {
    total_price: i64,
    currency_code: String,
}

pub struct BatikAirProvider {
    descriptor: ProviderDescriptor,
    simulator: Arc<FetchSimulator>,
}

impl BatikAirProvider {
    pub fn new(simulator: Arc<FetchSimulator>) -> Self {
        Self {
            descriptor: ProviderDescriptor::new(
                "BatikAir",
                100,
                (200, 400),
                "batik_air_search_response.json",
            ),
            simulator,
        }
    }

    fn to_flight(
        &self,
        raw: BatikAirFlight,
        departure: DateTime<FixedOffset>,
        arrival: DateTime<FixedOffset>,
    ) -> Flight {
        let price = raw.fare.total_price;

        Flight {
            id: flight_id(&raw.airline_name, &raw.flight_number),
            provider: self.descriptor.name.clone(),
            airline: Airline {
                name: raw.airline_name,
                code: raw.airline_iata,
            },
            departure: event_point(&raw.origin, city_for(&raw.origin), &departure),
            arrival: event_point(&raw.destination, city_for(&raw.destination), &arrival),
            duration: FlightDuration {
                total_minutes: parse_duration_label(&raw.travel_time),
                formatted: raw.travel_time,
            },
            stops: raw.number_of_stops,
            price: Price {
                amount: price,
                formatted: format_price(price, &raw.fare.currency_code),
                currency: raw.fare.currency_code,
            },
            available_seats: raw.seats_available,
            cabin_class: DEFAULT_CABIN_CLASS.to_string(),
            aircraft: Some(raw.aircraft_model),
            amenities: Some(raw.onboard_services),
            baggage: parse_baggage_note(&raw.baggage_info),
            flight_number: raw.flight_number,
        }
    }
}

#[async_trait]
impl FlightProvider for BatikAirProvider {
    fn descriptor(&self) -> &ProviderDescriptor {
        &self.descriptor
    }

    async fn fetch(
        &self,
        query: &SearchRequest,
        ctx: &SearchContext,
    ) -> Result<Vec<Flight>, ProviderError> {
        let response: BatikAirResponse =
            load_payload(&self.simulator, &self.descriptor, ctx).await?;

        let mut flights = Vec::new();
        for raw in response.results {
            // Records with unreadable times are skipped
            let (Ok(departure), Ok(arrival)) = (
                DateTime::parse_from_str(&raw.departure_date_time, DATETIME_LAYOUT),
                DateTime::parse_from_str(&raw.arrival_date_time, DATETIME_LAYOUT),
            ) else {
                continue;
            };

            if matches_query(
                query,
                &raw.origin,
                &raw.destination,
                &departure,
                raw.seats_available,
            ) {
                flights.push(self.to_flight(raw, departure, arrival));
            }
        }

        Ok(flights)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        cache::TtlCache,
        fetch_simulator::{test_support::RecordingSleeper, StaticFixtureSource},
    };

    const PAYLOAD: &str = r#"{
        "code": 200,
        "message": "OK",
        "results": [
            {
                "flightNumber": "ID6514", "airlineName": "Batik Air", "airlineIATA": "ID",
                "origin": "CGK", "destination": "DPS",
                "departureDateTime": "2025-12-15T07:15:00+0700",
                "arrivalDateTime": "2025-12-15T10:00:00+0800",
                "travelTime": "1h 45m", "numberOfStops": 0,
                "fare": { "basePrice": 980000, "taxes": 120000, "totalPrice": 1100000,
                          "currencyCode": "IDR", "class": "Y" },
                "seatsAvailable": 32, "aircraftModel": "Airbus A320",
                "baggageInfo": "7kg cabin, 20kg checked",
                "onboardServices": ["Snack", "Entertainment"]
            },
            {
                "flightNumber": "ID6520", "airlineName": "Batik Air", "airlineIATA": "ID",
                "origin": "CGK", "destination": "DPS",
                "departureDateTime": "15/12/2025 19:00",
                "arrivalDateTime": "2025-12-15T22:10:00+0800",
                "travelTime": "2h 10m", "numberOfStops": 0,
                "fare": { "totalPrice": 1300000, "currencyCode": "IDR" },
                "seatsAvailable": 12
            }
        ]
    }"#;

    fn provider() -> BatikAirProvider {
        let fixtures =
            StaticFixtureSource::new().with_file("batik_air_search_response.json", PAYLOAD);
        let simulator = FetchSimulator::new(Arc::new(TtlCache::default()), Arc::new(fixtures))
            .with_sleeper(Arc::new(RecordingSleeper::default()));
        BatikAirProvider::new(Arc::new(simulator))
    }

    #[tokio::test]
    async fn test_maps_batik_schema_and_skips_bad_times() {
        let query = SearchRequest {
            origin: "CGK".to_string(),
            destination: "DPS".to_string(),
            departure_date: "2025-12-15".to_string(),
            ..Default::default()
        }
        .normalize()
        .unwrap();

        let flights = provider()
            .fetch(&query, &SearchContext::background())
            .await
            .unwrap();

        assert_eq!(flights.len(), 1);
        let flight = &flights[0];
        assert_eq!(flight.id, "ID6514_BatikAir");
        assert_eq!(flight.airline.code, "ID");
        assert_eq!(flight.duration.total_minutes, 105);
        assert_eq!(flight.duration.formatted, "1h 45m");
        assert_eq!(flight.price.amount, 1_100_000);
        assert_eq!(flight.price.formatted, "IDR 1.100.000");
        assert_eq!(flight.departure.datetime, "2025-12-15T07:15:00+07:00");
        assert_eq!(flight.arrival.city, "Denpasar");
        assert_eq!(flight.amenity_count(), 2);
        assert_eq!(flight.aircraft.as_deref(), Some("Airbus A320"));
        assert_eq!(flight.baggage.checked.as_deref(), Some("20kg Checked"));
    }
}
