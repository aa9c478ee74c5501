use chrono::{DateTime, Utc};
use model::{
    position::{PositionReport, PositionSource, RawPositionReport},
    WithDistance, WithId,
};
use sqlx::prelude::FromRow;
use utility::id::{Id, IdWrapper};

use super::DatabaseRow;

/// Table: `position_reports`
#[derive(Debug, Clone, FromRow)]
pub struct PositionRow {
    pub id: i64,
    pub vehicle_id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub speed: f64,
    pub heading: f64,
    pub accuracy: f64,
    pub altitude: Option<f64>,
    pub captured_at: DateTime<Utc>,
    pub source: String,
    pub route_id: Option<String>,
    pub is_moving: bool,
}

impl PositionRow {
    pub fn from_model(report: &PositionReport) -> Self {
        Self {
            id: 0,
            vehicle_id: report.vehicle_id.raw(),
            latitude: report.latitude,
            longitude: report.longitude,
            speed: report.speed,
            heading: report.heading,
            accuracy: report.accuracy,
            altitude: report.altitude,
            captured_at: report.timestamp,
            source: report.source.as_str().to_owned(),
            route_id: report.route_id.as_ref().raw(),
            is_moving: report.is_moving(),
        }
    }
}

impl DatabaseRow for PositionRow {
    type Model = PositionReport;

    fn to_model(self) -> WithId<PositionReport> {
        let source = PositionSource::parse(&self.source).unwrap_or_else(|| {
            log::warn!("report {} has unknown source '{}'", self.id, self.source);
            PositionSource::default()
        });
        let report = PositionReport::restore(
            RawPositionReport {
                vehicle_id: Id::new(self.vehicle_id),
                latitude: self.latitude,
                longitude: self.longitude,
                speed: self.speed,
                heading: self.heading,
                accuracy: self.accuracy,
                altitude: self.altitude,
                timestamp: self.captured_at,
                source,
                route_id: self.route_id.map(Id::new),
            },
            self.is_moving,
        );
        WithId::new(Id::new(self.id), report)
    }
}

/// A report row with its distance to a query point.
#[derive(Debug, Clone, FromRow)]
pub struct NearbyRow {
    #[sqlx(flatten)]
    pub position: PositionRow,
    pub distance_km: f64,
}

impl NearbyRow {
    pub fn to_model(self) -> WithDistance<WithId<PositionReport>> {
        WithDistance::new(self.distance_km, self.position.to_model())
    }
}
