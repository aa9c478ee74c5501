use chrono::{DateTime, Utc};
use model::{
    eta::EtaResult,
    position::{Coordinates, PositionReport},
};
use utility::geo::round_to;

use crate::liveness::human_age_at;

pub const NOT_MOVING_MESSAGE: &str = "vehicle not moving";

/// Time to reach `destination` in a straight line at the last reported speed.
pub fn estimate_at(
    report: &PositionReport,
    destination: &Coordinates,
    now: DateTime<Utc>,
) -> EtaResult {
    let distance_km = report.distance_km_to(destination);
    if !report.is_moving() || report.speed <= 0.0 {
        return EtaResult {
            distance_km: round_to(distance_km, 2),
            estimated_minutes: None,
            message: Some(NOT_MOVING_MESSAGE.to_owned()),
            last_updated: None,
        };
    }
    let minutes = (distance_km / report.speed * 60.0).round() as i64;
    EtaResult {
        distance_km: round_to(distance_km, 2),
        estimated_minutes: Some(minutes),
        message: None,
        last_updated: Some(human_age_at(&report.timestamp, now)),
    }
}
