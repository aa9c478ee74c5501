use schemars::JsonSchema;
use serde::Serialize;
use utility::id::Id;

use crate::vehicle::Vehicle;

/// Estimated time until a vehicle reaches a destination.
///
/// `estimated_minutes` is `None` when the vehicle is not moving, in which
/// case `message` says so.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct EtaResult {
    pub distance_km: f64,
    #[serialize_always]
    pub estimated_minutes: Option<i64>,
    pub message: Option<String>,
    pub last_updated: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
#[serde(untagged)]
pub enum EstimateOutcome {
    Estimate(EtaResult),
    Failed { error: String },
}

/// One entry of a batch estimate. Failures for a single vehicle are reported
/// in place instead of failing the whole batch.
#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ArrivalEstimate {
    pub vehicle_id: Id<Vehicle>,
    #[serde(flatten)]
    pub outcome: EstimateOutcome,
}
