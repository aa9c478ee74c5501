use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::Serialize;
use utility::id::Id;

use crate::{position::LocationView, vehicle::Vehicle};

/// Distance and speed figures over an ordered run of reports. All fields are
/// zero when fewer than two reports are available.
#[derive(Debug, Clone, Default, PartialEq, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TrailStats {
    pub total_points: usize,
    pub total_distance_km: f64,
    pub average_speed_kmh: f64,
    pub max_speed_kmh: f64,
    pub duration_minutes: i64,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Trail {
    pub vehicle_id: Id<Vehicle>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub locations: Vec<LocationView>,
    pub stats: TrailStats,
}
