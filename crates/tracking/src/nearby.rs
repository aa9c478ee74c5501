use chrono::Duration;
use model::{
    position::{Coordinates, PositionReport},
    route::Route,
    vehicle::{Vehicle, VehicleStatus},
    ValidationError,
};
use utility::id::Id;

pub const DEFAULT_RADIUS_KM: f64 = 5.0;

/// A proximity search with the filters applied after vehicle and route data
/// has been joined.
#[derive(Debug, Clone)]
pub struct NearbyQuery {
    pub center: Coordinates,
    pub radius_km: f64,
    pub route_id: Option<Id<Route>>,
    pub status: Option<VehicleStatus>,
    pub limit: Option<usize>,
    /// Maximum report age. Falls back to the configured window.
    pub window: Option<Duration>,
}

impl NearbyQuery {
    pub fn new(center: Coordinates, radius_km: f64) -> Self {
        Self {
            center,
            radius_km,
            route_id: None,
            status: None,
            limit: None,
            window: None,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        self.center.validate()?;
        if !(self.radius_km.is_finite() && self.radius_km > 0.0) {
            return Err(ValidationError::new(
                "radius",
                format!("{} km must be a positive number", self.radius_km),
            ));
        }
        if let Some(window) = self.window {
            if window < Duration::zero() {
                return Err(ValidationError::new("window", "must not be negative"));
            }
        }
        Ok(())
    }

    pub fn matches(&self, vehicle: &Vehicle, report: &PositionReport) -> bool {
        let status_matches = self.status.map_or(true, |status| vehicle.status == status);
        let route_matches = self
            .route_id
            .as_ref()
            .map_or(true, |route_id| report.route_id.as_ref() == Some(route_id));
        status_matches && route_matches
    }
}
