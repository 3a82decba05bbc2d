use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use serde::Deserialize;

use super::{
    event_point, flight_id, format_duration, format_price, load_payload, matches_query,
    FlightProvider, ProviderError,
};
use crate::{
    context::SearchContext,
    fetch_simulator::{FetchSimulator, ProviderDescriptor},
    models::{
        Airline, Baggage, Flight, FlightDuration, Price, SearchRequest, CANONICAL_DATETIME_LAYOUT,
    },
};

#[derive(Debug, Deserialize)]
struct GarudaResponse {
    #[allow(dead_code)]
    status: String,
    flights: Vec<GarudaFlight>,
}

#[derive(Debug, Deserialize)]
struct GarudaFlight {
    flight_id: String,
    airline: String,
    airline_code: String,
    departure: GarudaEndpoint,
    arrival: GarudaEndpoint,
    duration_minutes: u32,
    stops: u32,
    #[serde(default)]
    aircraft: String,
    price: GarudaPrice,
    available_seats: u32,
    fare_class: String,
    baggage: GarudaBaggage,
    amenities: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct GarudaEndpoint {
    airport: String,
    city: String,
    time: String,
}

#[derive(Debug, Deserialize)]
struct GarudaPrice {
    amount: i64,
    currency: String,
}

// Piece counts
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct GarudaBaggage {
    carry_on: u32,
    checked: u32,
}

pub struct GarudaIndonesiaProvider {
    descriptor: ProviderDescriptor,
    simulator: Arc<FetchSimulator>,
}

impl GarudaIndonesiaProvider {
    pub fn new(simulator: Arc<FetchSimulator>) -> Self {
        Self {
            descriptor: ProviderDescriptor::new(
                "GarudaIndonesia",
                100,
                (50, 100),
                "garuda_indonesia_search_response.json",
            ),
            simulator,
        }
    }

    fn to_flight(
        &self,
        raw: GarudaFlight,
        departure: DateTime<FixedOffset>,
        arrival: DateTime<FixedOffset>,
    ) -> Flight {
        Flight {
            id: flight_id(&raw.airline, &raw.flight_id),
            provider: self.descriptor.name.clone(),
            airline: Airline {
                name: raw.airline,
                code: raw.airline_code,
            },
            departure: event_point(&raw.departure.airport, &raw.departure.city, &departure),
            arrival: event_point(&raw.arrival.airport, &raw.arrival.city, &arrival),
            duration: FlightDuration {
                total_minutes: raw.duration_minutes,
                formatted: format_duration(raw.duration_minutes),
            },
            stops: raw.stops,
            price: Price {
                amount: raw.price.amount,
                formatted: format_price(raw.price.amount, &raw.price.currency),
                currency: raw.price.currency,
            },
            available_seats: raw.available_seats,
            cabin_class: raw.fare_class.to_lowercase(),
            aircraft: Some(raw.aircraft),
            amenities: raw.amenities,
            baggage: Baggage {
                carry_on: Some(raw.baggage.carry_on.to_string()),
                checked: Some(raw.baggage.checked.to_string()),
            },
            flight_number: raw.flight_id,
        }
    }
}

#[async_trait]
impl FlightProvider for GarudaIndonesiaProvider {
    fn descriptor(&self) -> &ProviderDescriptor {
        &self.descriptor
    }

    async fn fetch(
        &self,
        query: &SearchRequest,
        ctx: &SearchContext,
    ) -> Result<Vec<Flight>, ProviderError> {
        let response: GarudaResponse =
            load_payload(&self.simulator, &self.descriptor, ctx).await?;

        let mut flights = Vec::new();
        for raw in response.flights {
            let (Ok(departure), Ok(arrival)) = (
                DateTime::parse_from_str(&raw.departure.time, CANONICAL_DATETIME_LAYOUT),
                DateTime::parse_from_str(&raw.arrival.time, CANONICAL_DATETIME_LAYOUT),
            ) else {
                continue;
            };

            if matches_query(
                query,
                &raw.departure.airport,
                &raw.arrival.airport,
                &departure,
                raw.available_seats,
            ) {
                flights.push(self.to_flight(raw, departure, arrival));
            }
        }

        Ok(flights)
    }
}
