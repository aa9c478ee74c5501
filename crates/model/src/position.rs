use chrono::{DateTime, Duration, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use utility::{
    geo::{self, is_valid_latitude, is_valid_longitude},
    id::{HasId, Id},
};

use crate::{route::Route, vehicle::Vehicle, ExampleData, ValidationError, WithId};

/// Speeds strictly above this many km/h count as moving.
pub const DEFAULT_MOVING_THRESHOLD_KMH: f64 = 5.0;
pub const DEFAULT_MAX_SPEED_KMH: f64 = 200.0;
pub const DEFAULT_ACCURACY_M: f64 = 10.0;
const KMH_TO_MPH: f64 = 0.621371;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if !is_valid_latitude(self.latitude) {
            return Err(ValidationError::new(
                "latitude",
                format!("{} is not within [-90, 90]", self.latitude),
            ));
        }
        if !is_valid_longitude(self.longitude) {
            return Err(ValidationError::new(
                "longitude",
                format!("{} is not within [-180, 180]", self.longitude),
            ));
        }
        Ok(())
    }

    pub fn distance_km_to(&self, other: &Coordinates) -> f64 {
        geo::haversine_distance(
            self.latitude,
            self.longitude,
            other.latitude,
            other.longitude,
        )
    }
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum PositionSource {
    #[default]
    #[serde(alias = "gps")]
    DeviceReported,
    #[serde(alias = "manual")]
    ManuallyEntered,
    #[serde(alias = "estimated")]
    Interpolated,
}

impl PositionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DeviceReported => "device_reported",
            Self::ManuallyEntered => "manually_entered",
            Self::Interpolated => "interpolated",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "device_reported" => Some(Self::DeviceReported),
            "manually_entered" => Some(Self::ManuallyEntered),
            "interpolated" => Some(Self::Interpolated),
            _ => None,
        }
    }
}

/// A position report as submitted by a device or operator, before validation.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RawPositionReport {
    pub vehicle_id: Id<Vehicle>,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub speed: f64,
    #[serde(default)]
    pub heading: f64,
    #[serde(default = "default_accuracy")]
    pub accuracy: f64,
    #[serde(default)]
    pub altitude: Option<f64>,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub source: PositionSource,
    #[serde(default)]
    pub route_id: Option<Id<Route>>,
}

fn default_accuracy() -> f64 {
    DEFAULT_ACCURACY_M
}

/// Bounds every report has to satisfy before it is stored.
#[derive(Debug, Clone, Copy)]
pub struct ReportLimits {
    pub max_speed_kmh: f64,
    /// How far a capture timestamp may lie ahead of the receiving clock.
    pub max_clock_skew: Duration,
}

impl Default for ReportLimits {
    fn default() -> Self {
        Self {
            max_speed_kmh: DEFAULT_MAX_SPEED_KMH,
            max_clock_skew: Duration::minutes(5),
        }
    }
}

/// One GPS sample of one vehicle. Immutable once created: `is_moving` is
/// derived from the speed at construction time and never recomputed.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PositionReport {
    pub vehicle_id: Id<Vehicle>,
    pub latitude: f64,
    pub longitude: f64,
    pub speed: f64,
    pub heading: f64,
    pub accuracy: f64,
    pub altitude: Option<f64>,
    pub timestamp: DateTime<Utc>,
    pub source: PositionSource,
    pub route_id: Option<Id<Route>>,
    is_moving: bool,
}

impl HasId for PositionReport {
    type IdType = i64;
}

impl PositionReport {
    pub fn new(raw: RawPositionReport, moving_threshold_kmh: f64) -> Self {
        let is_moving = raw.speed > moving_threshold_kmh;
        Self {
            vehicle_id: raw.vehicle_id,
            latitude: raw.latitude,
            longitude: raw.longitude,
            speed: raw.speed,
            heading: raw.heading,
            accuracy: raw.accuracy,
            altitude: raw.altitude,
            timestamp: raw.timestamp,
            source: raw.source,
            route_id: raw.route_id,
            is_moving,
        }
    }

    /// Rebuilds a report read back from storage, keeping the stored flag.
    pub fn restore(raw: RawPositionReport, is_moving: bool) -> Self {
        let mut report = Self::new(raw, f64::INFINITY);
        report.is_moving = is_moving;
        report
    }

    pub fn is_moving(&self) -> bool {
        self.is_moving
    }

    pub fn coordinates(&self) -> Coordinates {
        Coordinates::new(self.latitude, self.longitude)
    }

    pub fn distance_km_to(&self, other: &Coordinates) -> f64 {
        self.coordinates().distance_km_to(other)
    }

    pub fn speed_mph(&self) -> f64 {
        geo::round_to(self.speed * KMH_TO_MPH, 1)
    }

    /// Checks every range constraint of a report. `now` is the clock the
    /// timestamp is judged against.
    pub fn validate(
        &self,
        limits: &ReportLimits,
        now: DateTime<Utc>,
    ) -> Result<(), ValidationError> {
        self.coordinates().validate()?;
        if !(self.speed >= 0.0 && self.speed <= limits.max_speed_kmh) {
            return Err(ValidationError::new(
                "speed",
                format!(
                    "{} km/h is not within [0, {}]",
                    self.speed, limits.max_speed_kmh
                ),
            ));
        }
        if !(self.heading >= 0.0 && self.heading < 360.0) {
            return Err(ValidationError::new(
                "heading",
                format!("{} is not within [0, 360)", self.heading),
            ));
        }
        if !(self.accuracy >= 0.0 && self.accuracy.is_finite()) {
            return Err(ValidationError::new(
                "accuracy",
                format!("{} m must be a non-negative number", self.accuracy),
            ));
        }
        if let Some(altitude) = self.altitude {
            if !altitude.is_finite() {
                return Err(ValidationError::new("altitude", "must be finite"));
            }
        }
        if self.timestamp > now + limits.max_clock_skew {
            return Err(ValidationError::new(
                "timestamp",
                format!("{} lies in the future", self.timestamp.to_rfc3339()),
            ));
        }
        Ok(())
    }
}

impl ExampleData for PositionReport {
    fn example_data() -> Self {
        PositionReport::new(
            RawPositionReport {
                vehicle_id: Id::from("NB-1234"),
                latitude: 6.9271,
                longitude: 79.8612,
                speed: 42.0,
                heading: 90.0,
                accuracy: DEFAULT_ACCURACY_M,
                altitude: Some(7.0),
                timestamp: DateTime::UNIX_EPOCH,
                source: PositionSource::DeviceReported,
                route_id: Some(Id::from("138")),
            },
            DEFAULT_MOVING_THRESHOLD_KMH,
        )
    }
}

/// Eight point compass rose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum Compass {
    N,
    NE,
    E,
    SE,
    S,
    SW,
    W,
    NW,
}

impl Compass {
    pub const POINTS: [Compass; 8] = [
        Self::N,
        Self::NE,
        Self::E,
        Self::SE,
        Self::S,
        Self::SW,
        Self::W,
        Self::NW,
    ];

    /// Nearest of the eight points, `round(heading / 45) mod 8`. Headings
    /// outside [0, 360) wrap around; non-finite headings map to north.
    pub fn from_heading(heading: f64) -> Self {
        if !heading.is_finite() {
            return Self::N;
        }
        let index = (heading / 45.0).round().rem_euclid(8.0) as usize;
        Self::POINTS[index % 8]
    }
}

/// A report together with the identifier the store assigned to it.
pub type StoredReport = WithId<PositionReport>;

/// A stored report as handed to clients, with derived display fields.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LocationView {
    pub id: Id<PositionReport>,
    pub vehicle_id: Id<Vehicle>,
    pub latitude: f64,
    pub longitude: f64,
    pub speed: f64,
    pub speed_mph: f64,
    pub heading: f64,
    pub heading_direction: Compass,
    pub accuracy: f64,
    pub altitude: Option<f64>,
    pub timestamp: DateTime<Utc>,
    pub source: PositionSource,
    pub route_id: Option<Id<Route>>,
    pub is_moving: bool,
}

impl LocationView {
    pub fn new(stored: &StoredReport) -> Self {
        let report = &stored.content;
        Self {
            id: stored.id,
            vehicle_id: report.vehicle_id.clone(),
            latitude: report.latitude,
            longitude: report.longitude,
            speed: report.speed,
            speed_mph: report.speed_mph(),
            heading: report.heading,
            heading_direction: Compass::from_heading(report.heading),
            accuracy: report.accuracy,
            altitude: report.altitude,
            timestamp: report.timestamp,
            source: report.source,
            route_id: report.route_id.clone(),
            is_moving: report.is_moving(),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn raw(speed: f64) -> RawPositionReport {
        RawPositionReport {
            vehicle_id: Id::from("bus-1"),
            latitude: 6.9271,
            longitude: 79.8612,
            speed,
            heading: 0.0,
            accuracy: DEFAULT_ACCURACY_M,
            altitude: None,
            timestamp: Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap(),
            source: PositionSource::DeviceReported,
            route_id: None,
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 8, 1, 0).unwrap()
    }

    #[test]
    fn moving_flag_uses_strict_threshold() {
        assert!(!PositionReport::new(raw(5.0), 5.0).is_moving());
        assert!(PositionReport::new(raw(5.1), 5.0).is_moving());
        assert!(!PositionReport::new(raw(0.0), 5.0).is_moving());
    }

    #[test]
    fn restored_reports_keep_their_flag() {
        assert!(PositionReport::restore(raw(0.0), true).is_moving());
        assert!(!PositionReport::restore(raw(80.0), false).is_moving());
    }

    #[test]
    fn rejects_out_of_range_coordinates() {
        let limits = ReportLimits::default();
        for (lat, lon) in [(90.5, 0.0), (-91.0, 0.0), (0.0, 180.1), (0.0, -200.0)] {
            let mut report = raw(10.0);
            report.latitude = lat;
            report.longitude = lon;
            let error = PositionReport::new(report, 5.0)
                .validate(&limits, now())
                .unwrap_err();
            assert!(error.field == "latitude" || error.field == "longitude");
        }
    }

    #[test]
    fn rejects_speed_heading_and_future_timestamps() {
        let limits = ReportLimits::default();

        let too_fast = PositionReport::new(raw(200.5), 5.0);
        assert_eq!(too_fast.validate(&limits, now()).unwrap_err().field, "speed");

        let backwards = PositionReport::new(raw(-1.0), 5.0);
        assert_eq!(backwards.validate(&limits, now()).unwrap_err().field, "speed");

        let mut full_circle = raw(10.0);
        full_circle.heading = 360.0;
        let full_circle = PositionReport::new(full_circle, 5.0);
        assert_eq!(
            full_circle.validate(&limits, now()).unwrap_err().field,
            "heading"
        );

        let mut future = raw(10.0);
        future.timestamp = now() + Duration::minutes(10);
        let future = PositionReport::new(future, 5.0);
        assert_eq!(future.validate(&limits, now()).unwrap_err().field, "timestamp");

        assert!(PositionReport::new(raw(200.0), 5.0)
            .validate(&limits, now())
            .is_ok());
    }

    #[test]
    fn raw_reports_fill_transport_defaults() {
        let raw: RawPositionReport = serde_json::from_str(
            r#"{
                "vehicleId": "bus-7",
                "latitude": 6.9,
                "longitude": 79.9,
                "timestamp": "2024-05-01T08:00:00Z",
                "source": "gps"
            }"#,
        )
        .unwrap();
        assert_eq!(raw.speed, 0.0);
        assert_eq!(raw.heading, 0.0);
        assert_eq!(raw.accuracy, DEFAULT_ACCURACY_M);
        assert_eq!(raw.source, PositionSource::DeviceReported);
        assert!(raw.route_id.is_none());
    }

    #[test]
    fn view_carries_derived_fields() {
        let mut report = raw(100.0);
        report.heading = 100.0;
        let stored = WithId::new(Id::new(7), PositionReport::new(report, 5.0));
        let view = LocationView::new(&stored);
        assert_eq!(view.id.raw(), 7);
        assert_eq!(view.speed_mph, 62.1);
        assert_eq!(view.heading_direction, Compass::E);
        assert!(view.is_moving);
    }

    #[test]
    fn speed_in_mph() {
        assert_eq!(PositionReport::new(raw(100.0), 5.0).speed_mph(), 62.1);
    }
}
