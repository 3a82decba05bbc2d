// Post-merge filtering of canonical flights against the request's filters

use chrono::{DateTime, FixedOffset};

use crate::models::{Filters, Flight, CANONICAL_DATETIME_LAYOUT};

fn parse_canonical(value: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_str(value, CANONICAL_DATETIME_LAYOUT).ok()
}

/// Keeps the flights that pass every active predicate, preserving their order.
/// Zero or empty filter values are inactive.
pub fn apply_filters(flights: Vec<Flight>, filters: &Filters) -> Vec<Flight> {
    // Malformed bounds disable their predicate
    let departure_bound = parse_canonical(&filters.departure_time_range);
    let arrival_bound = parse_canonical(&filters.arrival_time_range);

    flights
        .into_iter()
        .filter(|flight| {
            if filters.price_min > 0 && flight.price.amount < filters.price_min {
                return false;
            }
            if filters.price_max > 0 && flight.price.amount > filters.price_max {
                return false;
            }
            if filters.max_stops > 0 && flight.stops > filters.max_stops {
                return false;
            }
            if !filters.airlines.is_empty() && !filters.airlines.contains(&flight.airline.name) {
                return false;
            }
            if filters.max_duration_minutes > 0
                && flight.duration.total_minutes > filters.max_duration_minutes
            {
                return false;
            }

            if let (Some(bound), Some(departs)) =
                (departure_bound, parse_canonical(&flight.departure.datetime))
            {
                if bound > departs {
                    return false;
                }
            }

            if let (Some(bound), Some(arrives)) =
                (arrival_bound, parse_canonical(&flight.arrival.datetime))
            {
                if arrives > bound {
                    return false;
                }
            }

            true
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Airline, EventPoint, FlightDuration, Price};

    fn flight(id: &str, price: i64) -> Flight {
        Flight {
            id: id.to_string(),
            airline: Airline {
                name: "Batik Air".to_string(),
                code: "ID".to_string(),
            },
            price: Price {
                amount: price,
                ..Default::default()
            },
            duration: FlightDuration {
                total_minutes: 110,
                formatted: "01h 50m".to_string(),
            },
            departure: EventPoint {
                datetime: "2025-12-15T06:00:00+07:00".to_string(),
                ..Default::default()
            },
            arrival: EventPoint {
                datetime: "2025-12-15T08:50:00+08:00".to_string(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn ids(flights: &[Flight]) -> Vec<&str> {
        flights.iter().map(|f| f.id.as_str()).collect()
    }

    #[test]
    fn test_price_range() {
        let flights = vec![flight("a", 100), flight("b", 200), flight("c", 300)];
        let filters = Filters {
            price_min: 150,
            price_max: 250,
            ..Default::default()
        };

        assert_eq!(ids(&apply_filters(flights, &filters)), vec!["b"]);
    }

    #[test]
    fn test_empty_filters_keep_everything_in_order() {
        let flights = vec![flight("c", 300), flight("a", 100), flight("b", 200)];
        let kept = apply_filters(flights, &Filters::default());
        assert_eq!(ids(&kept), vec!["c", "a", "b"]);
    }

    #[test]
    fn test_stops_airlines_and_duration() {
        let mut direct = flight("direct", 100);
        let mut one_stop = flight("one_stop", 100);
        one_stop.stops = 2;
        let mut lion = flight("lion", 100);
        lion.airline.name = "Lion Air".to_string();
        direct.duration.total_minutes = 100;

        let filters = Filters {
            max_stops: 1,
            airlines: vec!["Batik Air".to_string()],
            max_duration_minutes: 105,
            ..Default::default()
        };
        let kept = apply_filters(vec![direct, one_stop, lion], &filters);
        assert_eq!(ids(&kept), vec!["direct"]);
    }

    #[test]
    fn test_departure_and_arrival_bounds() {
        let early = flight("early", 100);
        let mut late = flight("late", 100);
        late.departure.datetime = "2025-12-15T18:00:00+07:00".to_string();
        late.arrival.datetime = "2025-12-15T20:50:00+08:00".to_string();

        let after_noon = Filters {
            departure_time_range: "2025-12-15T12:00:00+07:00".to_string(),
            ..Default::default()
        };
        let kept = apply_filters(vec![early.clone(), late.clone()], &after_noon);
        assert_eq!(ids(&kept), vec!["late"]);

        let arrive_by_noon = Filters {
            arrival_time_range: "2025-12-15T12:00:00+08:00".to_string(),
            ..Default::default()
        };
        let kept = apply_filters(vec![early, late], &arrive_by_noon);
        assert_eq!(ids(&kept), vec!["early"]);
    }

    #[test]
    fn test_malformed_bounds_are_ignored() {
        let mut unreadable = flight("unreadable", 100);
        unreadable.departure.datetime = "tomorrow".to_string();

        let filters = Filters {
            departure_time_range: "2025-12-15T12:00:00+07:00".to_string(),
            arrival_time_range: "noon".to_string(),
            ..Default::default()
        };
        let kept = apply_filters(vec![unreadable, flight("early", 100)], &filters);
        assert_eq!(ids(&kept), vec!["unreadable"]);
    }
}
