// Result ordering by the requested key and direction

use std::{cmp::Ordering, str::FromStr};

use chrono::{DateTime, FixedOffset};

use crate::{
    models::{Flight, CANONICAL_DATETIME_LAYOUT},
    scoring::best_value_scores,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    BestValue,
    Price,
    Duration,
    Departure,
    Arrival,
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "best_value" => Ok(SortKey::BestValue),
            "price" => Ok(SortKey::Price),
            "duration" => Ok(SortKey::Duration),
            "departure" => Ok(SortKey::Departure),
            "arrival" => Ok(SortKey::Arrival),
            other => Err(format!("unknown sort key: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    /// Only `desc` reverses; anything else is ascending.
    pub fn parse(s: &str) -> Self {
        if s == "desc" {
            SortOrder::Desc
        } else {
            SortOrder::Asc
        }
    }
}

fn compare_datetimes(a: &str, b: &str) -> Ordering {
    let parse = |s: &str| DateTime::<FixedOffset>::parse_from_str(s, CANONICAL_DATETIME_LAYOUT);
    match (parse(a), parse(b)) {
        (Ok(a), Ok(b)) => a.cmp(&b),
        _ => Ordering::Equal,
    }
}

fn compare_by(key: SortKey, a: &Flight, b: &Flight) -> Ordering {
    match key {
        SortKey::Price => a.price.amount.cmp(&b.price.amount),
        SortKey::Duration => a.duration.total_minutes.cmp(&b.duration.total_minutes),
        SortKey::Departure => compare_datetimes(&a.departure.datetime, &b.departure.datetime),
        SortKey::Arrival => compare_datetimes(&a.arrival.datetime, &b.arrival.datetime),
        SortKey::BestValue => Ordering::Equal,
    }
}

/// Highest score first, whatever the requested order.
fn sort_by_best_value(flights: &mut Vec<Flight>) {
    let scores = best_value_scores(flights);
    let mut scored: Vec<(f64, Flight)> = scores.into_iter().zip(flights.drain(..)).collect();
    scored.sort_by(|(a, _), (b, _)| b.total_cmp(a));
    flights.extend(scored.into_iter().map(|(_, flight)| flight));
}

/// Stable in-place sort. Unknown keys leave the order untouched.
pub fn sort_flights(flights: &mut Vec<Flight>, sort_by: &str, sort_order: &str) {
    if flights.is_empty() {
        return;
    }

    let Ok(key) = sort_by.parse::<SortKey>() else {
        return;
    };

    if key == SortKey::BestValue {
        sort_by_best_value(flights);
        return;
    }

    let order = SortOrder::parse(sort_order);
    flights.sort_by(|a, b| {
        let ordering = compare_by(key, a, b);
        match order {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EventPoint, FlightDuration, Price};

    fn flight(id: &str, price: i64) -> Flight {
        Flight {
            id: id.to_string(),
            price: Price {
                amount: price,
                ..Default::default()
            },
            duration: FlightDuration {
                total_minutes: 100,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn prices(flights: &[Flight]) -> Vec<i64> {
        flights.iter().map(|f| f.price.amount).collect()
    }

    fn ids(flights: &[Flight]) -> Vec<&str> {
        flights.iter().map(|f| f.id.as_str()).collect()
    }

    #[test]
    fn test_price_desc() {
        let mut flights = vec![flight("a", 50), flight("b", 10), flight("c", 30)];
        sort_flights(&mut flights, "price", "desc");
        assert_eq!(prices(&flights), vec![50, 30, 10]);

        sort_flights(&mut flights, "price", "asc");
        assert_eq!(prices(&flights), vec![10, 30, 50]);
    }

    #[test]
    fn test_best_value_ignores_order() {
        let mut flights = vec![flight("pricey", 900), flight("cheap", 100), flight("mid", 500)];
        sort_flights(&mut flights, "best_value", "asc");
        assert_eq!(ids(&flights), vec!["cheap", "mid", "pricey"]);

        let mut reversed = vec![flight("mid", 500), flight("pricey", 900), flight("cheap", 100)];
        sort_flights(&mut reversed, "best_value", "desc");
        assert_eq!(ids(&reversed), vec!["cheap", "mid", "pricey"]);
    }

    #[test]
    fn test_ties_keep_relative_order() {
        let mut flights = vec![flight("x", 20), flight("y", 10), flight("z", 20)];
        sort_flights(&mut flights, "duration", "desc");
        assert_eq!(ids(&flights), vec!["x", "y", "z"]);

        sort_flights(&mut flights, "price", "desc");
        assert_eq!(ids(&flights), vec!["x", "z", "y"]);

        // Equal best-value scores also keep their order
        let mut same = vec![flight("p", 10), flight("q", 10)];
        sort_flights(&mut same, "best_value", "asc");
        assert_eq!(ids(&same), vec!["p", "q"]);
    }

    #[test]
    fn test_departure_uses_instants() {
        let mut late = flight("late", 1);
        late.departure = EventPoint {
            datetime: "2025-12-15T09:00:00+08:00".to_string(),
            ..Default::default()
        };
        let mut early = flight("early", 1);
        early.departure = EventPoint {
            datetime: "2025-12-15T08:30:00+07:00".to_string(),
            ..Default::default()
        };
        // 09:00+08:00 is 08:00+07:00, before 08:30+07:00
        let mut flights = vec![early, late];
        sort_flights(&mut flights, "departure", "asc");
        assert_eq!(ids(&flights), vec!["late", "early"]);
    }

    #[test]
    fn test_unknown_key_and_unparsable_times_are_noops() {
        let mut flights = vec![flight("a", 3), flight("b", 1), flight("c", 2)];
        sort_flights(&mut flights, "seat_pitch", "asc");
        assert_eq!(ids(&flights), vec!["a", "b", "c"]);

        sort_flights(&mut flights, "arrival", "desc");
        assert_eq!(ids(&flights), vec!["a", "b", "c"]);

        let mut empty: Vec<Flight> = Vec::new();
        sort_flights(&mut empty, "price", "asc");
        assert!(empty.is_empty());
    }

    #[test]
    fn test_sort_order_parsing() {
        assert_eq!(SortOrder::parse("desc"), SortOrder::Desc);
        assert_eq!(SortOrder::parse("DESC"), SortOrder::Asc);
        assert_eq!(SortOrder::parse(""), SortOrder::Asc);
        assert!("cheapest".parse::<SortKey>().is_err());
    }
}
