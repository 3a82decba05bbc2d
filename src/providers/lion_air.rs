use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone};
use chrono_tz::Tz;
use serde::Deserialize;

use super::{
    event_point, flight_id, format_duration, format_price, load_payload, matches_query,
    FlightProvider, ProviderError,
};
use crate::{
    context::SearchContext,
    fetch_simulator::{FetchSimulator, ProviderDescriptor},
    models::{Airline, Baggage, Flight, FlightDuration, Price, SearchRequest},
};

// Local wall-clock time; the zone comes from a sibling field
const LOCAL_DATETIME_LAYOUT: &str = "%Y-%m-%dT%H:%M:%S";

const MEALS_INCLUDED: &str = "Meals included";
const WIFI_AVAILABLE: &str = "Wifi available";

#[derive(Debug, Deserialize)]
struct LionAirResponse {
    #[allow(dead_code)]
    success: bool,
    data: LionAirData,
}

#[derive(Debug, Deserialize)]
struct LionAirData {
    available_flights: Vec<LionAirFlight>,
}

#[derive(Debug, Deserialize)]
struct LionAirFlight {
    id: String,
    carrier: LionAirCarrier,
    route: LionAirRoute,
    schedule: LionAirSchedule,
    flight_time: u32,
    pricing: LionAirPricing,
    seats_left: u32,
    #[serde(default)]
    plane_type: String,
    #[serde(default)]
    services: LionAirServices,
    #[serde(default)]
    stop_count: u32,
}

#[derive(Debug, Deserialize)]
struct LionAirCarrier {
    name: String,
    iata: String,
}

#[derive(Debug, Deserialize)]
struct LionAirRoute {
    from: LionAirAirport,
    to: LionAirAirport,
}

#[derive(Debug, Deserialize)]
struct LionAirAirport {
    code: String,
    city: String,
}

#[derive(Debug, Deserialize)]
struct LionAirSchedule {
    departure: String,
    departure_timezone: String,
    arrival: String,
    arrival_timezone: String,
}

#[derive(Debug, Deserialize)]
struct LionAirPricing {
    total: i64,
    currency: String,
    fare_type: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LionAirServices {
    wifi_available: bool,
    meals_included: bool,
    baggage_allowance: LionAirBaggage,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LionAirBaggage {
    cabin: String,
    hold: String,
}

/// Resolves a naive local time in the named IANA zone; unknown zones fall back to UTC.
fn parse_local(value: &str, timezone: &str) -> Option<DateTime<FixedOffset>> {
    let naive = NaiveDateTime::parse_from_str(value, LOCAL_DATETIME_LAYOUT).ok()?;
    let tz = timezone.parse::<Tz>().unwrap_or(Tz::UTC);
    tz.from_local_datetime(&naive)
        .single()
        .map(|at| at.fixed_offset())
}

fn amenities(services: &LionAirServices) -> Option<Vec<String>> {
    let mut amenities = Vec::new();
    if services.meals_included {
        amenities.push(MEALS_INCLUDED.to_string());
    }
    if services.wifi_available {
        amenities.push(WIFI_AVAILABLE.to_string());
    }
    (!amenities.is_empty()).then_some(amenities)
}

pub struct LionAirProvider {
    descriptor: ProviderDescriptor,
    simulator: Arc<FetchSimulator>,
}

impl LionAirProvider {
    pub fn new(simulator: Arc<FetchSimulator>) -> Self {
        Self {
            descriptor: ProviderDescriptor::new(
                "LionAir",
                100,
                (50, 100),
                "lion_air_search_response.json",
            ),
            simulator,
        }
    }

    fn to_flight(
        &self,
        raw: LionAirFlight,
        departure: DateTime<FixedOffset>,
        arrival: DateTime<FixedOffset>,
    ) -> Flight {
        Flight {
            id: flight_id(&raw.carrier.name, &raw.id),
            provider: self.descriptor.name.clone(),
            airline: Airline {
                name: raw.carrier.name,
                code: raw.carrier.iata,
            },
            departure: event_point(&raw.route.from.code, &raw.route.from.city, &departure),
            arrival: event_point(&raw.route.to.code, &raw.route.to.city, &arrival),
            duration: FlightDuration {
                total_minutes: raw.flight_time,
                formatted: format_duration(raw.flight_time),
            },
            stops: raw.stop_count,
            price: Price {
                amount: raw.pricing.total,
                formatted: format_price(raw.pricing.total, &raw.pricing.currency),
                currency: raw.pricing.currency,
            },
            available_seats: raw.seats_left,
            cabin_class: raw.pricing.fare_type.to_lowercase(),
            aircraft: Some(raw.plane_type),
            amenities: amenities(&raw.services),
            baggage: Baggage {
                carry_on: Some(raw.services.baggage_allowance.cabin),
                checked: Some(raw.services.baggage_allowance.hold),
            },
            flight_number: raw.id,
        }
    }
}

#[async_trait]
impl FlightProvider for LionAirProvider {
    fn descriptor(&self) -> &ProviderDescriptor {
        &self.descriptor
    }

    async fn fetch(
        &self,
        query: &SearchRequest,
        ctx: &SearchContext,
    ) -> Result<Vec<Flight>, ProviderError> {
        let response: LionAirResponse =
            load_payload(&self.simulator, &self.descriptor, ctx).await?;

        let mut flights = Vec::new();
        for raw in response.data.available_flights {
            let schedule = &raw.schedule;
            let (Some(departure), Some(arrival)) = (
                parse_local(&schedule.departure, &schedule.departure_timezone),
                parse_local(&schedule.arrival, &schedule.arrival_timezone),
            ) else {
                continue;
            };

            if matches_query(
                query,
                &raw.route.from.code,
                &raw.route.to.code,
                &departure,
                raw.seats_left,
            ) {
                flights.push(self.to_flight(raw, departure, arrival));
            }
        }

        Ok(flights)
    }
}
