use schemars::JsonSchema;
use serde::Serialize;

use crate::{position::LocationView, route::Route, vehicle::Vehicle, WithId};

/// The most recent report of a single vehicle.
#[derive(Debug, Clone, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LatestPosition {
    #[serde(flatten)]
    pub location: LocationView,
    pub is_stale: bool,
    pub last_updated: String,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LiveLocation {
    pub vehicle: WithId<Vehicle>,
    pub route: Option<WithId<Route>>,
    pub location: LocationView,
    pub is_stale: bool,
    pub last_updated: String,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NearbyVehicle {
    pub vehicle: WithId<Vehicle>,
    pub route: Option<WithId<Route>>,
    pub location: LocationView,
    pub distance_km: f64,
    pub last_updated: String,
}
