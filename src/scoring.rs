// Best-value scoring: a weighted model over min/max-normalized flight attributes

use crate::models::Flight;

const COST_WEIGHT: f64 = 0.8;
const COMFORT_WEIGHT: f64 = 0.2;
const PAID_BAGGAGE_MARKER: &str = "additional fee";

/// Ranges of every scored attribute across one candidate set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreNormalizer {
    pub price: (i64, i64),
    pub duration: (u32, u32),
    pub stops: (u32, u32),
    pub amenities: (usize, usize),
}

impl ScoreNormalizer {
    /// `None` for an empty candidate set.
    pub fn from_flights(flights: &[Flight]) -> Option<Self> {
        let first = flights.first()?;
        let mut normalizer = Self {
            price: (first.price.amount, first.price.amount),
            duration: (first.duration.total_minutes, first.duration.total_minutes),
            stops: (first.stops, first.stops),
            amenities: (first.amenity_count(), first.amenity_count()),
        };

        for flight in &flights[1..] {
            widen(&mut normalizer.price, flight.price.amount);
            widen(&mut normalizer.duration, flight.duration.total_minutes);
            widen(&mut normalizer.stops, flight.stops);
            widen(&mut normalizer.amenities, flight.amenity_count());
        }

        Some(normalizer)
    }
}

fn widen<T: PartialOrd + Copy>(range: &mut (T, T), value: T) {
    if value < range.0 {
        range.0 = value;
    }
    if value > range.1 {
        range.1 = value;
    }
}

/// Maps `value` into 0..=1 within `(min, max)`; a degenerate range yields 0.
pub fn norm(value: f64, min: f64, max: f64) -> f64 {
    if min == max {
        return 0.0;
    }
    (value - min) / (max - min)
}

fn norm_in<T: Into<f64> + Copy>(value: T, range: (T, T)) -> f64 {
    norm(value.into(), range.0.into(), range.1.into())
}

fn has_free_checked_baggage(flight: &Flight) -> bool {
    flight
        .baggage
        .checked
        .as_deref()
        .is_some_and(|checked| !checked.to_lowercase().contains(PAID_BAGGAGE_MARKER))
}

pub fn score_flight(flight: &Flight, normalizer: &ScoreNormalizer) -> f64 {
    let (min_amenities, max_amenities) = normalizer.amenities;
    let mut positive = norm(
        flight.amenity_count() as f64,
        min_amenities as f64,
        max_amenities as f64,
    );
    if has_free_checked_baggage(flight) {
        positive += 1.0;
    }

    // Unweighted sum, 0..=3
    let negative = norm(
        flight.price.amount as f64,
        normalizer.price.0 as f64,
        normalizer.price.1 as f64,
    ) + norm_in(flight.duration.total_minutes, normalizer.duration)
        + norm_in(flight.stops, normalizer.stops);

    positive * COMFORT_WEIGHT + (1.0 - negative) * COST_WEIGHT
}

/// Scores in the same positions as `flights`.
pub fn best_value_scores(flights: &[Flight]) -> Vec<f64> {
    match ScoreNormalizer::from_flights(flights) {
        Some(normalizer) => flights
            .iter()
            .map(|flight| score_flight(flight, &normalizer))
            .collect(),
        None => Vec::new(),
    }
}
