use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use serde::Deserialize;

use super::{
    city_for, event_point, flight_id, format_duration, format_price, load_payload,
    matches_query, parse_baggage_note, FlightProvider, ProviderError,
};
use crate::{
    context::SearchContext,
    fetch_simulator::{FetchSimulator, ProviderDescriptor},
    models::{Airline, Flight, FlightDuration, Price, SearchRequest},
};

const CURRENCY: &str = "IDR";

#[derive(Debug, Deserialize)]
struct AirAsiaResponse {
    #[allow(dead_code)]
    status: String,
    flights: Vec<AirAsiaFlight>,
}

#[derive(Debug, Deserialize)]
struct AirAsiaFlight {
    flight_code: String,
    airline: String,
    from_airport: String,
    to_airport: String,
    depart_time: DateTime<FixedOffset>,
    arrive_time: DateTime<FixedOffset>,
    duration_hours: f64,
    price_idr: i64,
    seats: u32,
    cabin_class: String,
    #[serde(default)]
    baggage_note: String,
    #[serde(default)]
    stops: Vec<AirAsiaStop>,
}

#[derive(Debug, Deserialize)]
struct AirAsiaStop {
    #[allow(dead_code)]
    airport: String,
}

pub struct AirAsiaProvider {
    descriptor: ProviderDescriptor,
    simulator: Arc<FetchSimulator>,
}

impl AirAsiaProvider {
    pub fn new(simulator: Arc<FetchSimulator>) -> Self {
        Self {
            descriptor: ProviderDescriptor::new(
                "AirAsia",
                90,
                (50, 150),
                "airasia_search_response.json",
            ),
            simulator,
        }
    }

    fn to_flight(&self, raw: AirAsiaFlight) -> Flight {
        // Truncates, so 1.67h becomes 100 minutes
        let total_minutes = (raw.duration_hours * 60.0) as u32;
        // Carrier prefix of the flight code, e.g. "QZ" for QZ520
        let code: String = raw.flight_code.chars().take(2).collect();

        Flight {
            id: flight_id(&raw.airline, &raw.flight_code),
            provider: self.descriptor.name.clone(),
            airline: Airline {
                name: raw.airline,
                code,
            },
            departure: event_point(
                &raw.from_airport,
                city_for(&raw.from_airport),
                &raw.depart_time,
            ),
            arrival: event_point(&raw.to_airport, city_for(&raw.to_airport), &raw.arrive_time),
            duration: FlightDuration {
                total_minutes,
                formatted: format_duration(total_minutes),
            },
            stops: raw.stops.len() as u32,
            price: Price {
                amount: raw.price_idr,
                currency: CURRENCY.to_string(),
                formatted: format_price(raw.price_idr, CURRENCY),
            },
            available_seats: raw.seats,
            cabin_class: raw.cabin_class.to_lowercase(),
            aircraft: None,
            amenities: None,
            baggage: parse_baggage_note(&raw.baggage_note),
            flight_number: raw.flight_code,
        }
    }
}

#[async_trait]
impl FlightProvider for AirAsiaProvider {
    fn descriptor(&self) -> &ProviderDescriptor {
        &self.descriptor
    }

    async fn fetch(
        &self,
        query: &SearchRequest,
        ctx: &SearchContext,
    ) -> Result<Vec<Flight>, ProviderError> {
        let response: AirAsiaResponse =
            load_payload(&self.simulator, &self.descriptor, ctx).await?;

        Ok(response
            .flights
            .into_iter()
            .filter(|f| {
                matches_query(query, &f.from_airport, &f.to_airport, &f.depart_time, f.seats)
            })
            .map(|f| self.to_flight(f))
            .collect())
    }
}
