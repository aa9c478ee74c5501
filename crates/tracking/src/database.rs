use std::{error, fmt, result};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use model::{
    position::{Coordinates, PositionReport, ReportLimits, StoredReport},
    vehicle::Vehicle,
    DateTimeRange, ValidationError, WithDistance,
};
use utility::id::Id;

#[derive(Debug)]
pub enum DatabaseError {
    NotFound,
    Validation(ValidationError),
    Other(Box<dyn error::Error + Send + Sync>),
}

impl fmt::Display for DatabaseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "not found"),
            Self::Validation(why) => write!(f, "{why}"),
            Self::Other(why) => write!(f, "{why}"),
        }
    }
}

impl error::Error for DatabaseError {}

impl From<ValidationError> for DatabaseError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

pub type Result<T> = result::Result<T, DatabaseError>;

/// Parameters of a proximity lookup at the store level.
#[derive(Debug, Clone, Copy)]
pub struct ProximitySearch {
    pub center: Coordinates,
    pub radius_km: f64,
    /// Reports captured before this instant are ignored.
    pub since: DateTime<Utc>,
    pub limit: Option<usize>,
}

/// Storage of position reports.
///
/// Every read returns owned snapshots. "Latest" always means the greatest
/// capture timestamp, ties broken by the larger generated id.
#[async_trait]
pub trait PositionRepo {
    /// Validates and persists a report.
    async fn insert(&mut self, report: PositionReport) -> Result<StoredReport>;

    async fn latest_for_vehicle(&mut self, vehicle: &Id<Vehicle>) -> Result<StoredReport>;

    /// Reports of one vehicle within the inclusive range, oldest first.
    async fn range_for_vehicle(
        &mut self,
        vehicle: &Id<Vehicle>,
        range: DateTimeRange,
        limit: usize,
    ) -> Result<Vec<StoredReport>>;

    /// At most one report per vehicle: its most recent report within the
    /// radius, ordered by ascending distance.
    async fn nearby(
        &mut self,
        search: ProximitySearch,
    ) -> Result<Vec<WithDistance<StoredReport>>>;

    /// The latest report of every vehicle that reported since the given time.
    async fn latest_for_all_vehicles(
        &mut self,
        since: DateTime<Utc>,
    ) -> Result<Vec<StoredReport>>;

    /// Deletes every report captured before `cutoff` and returns the count.
    async fn evict_older_than(&mut self, cutoff: DateTime<Utc>) -> Result<u64>;

    async fn delete_vehicle(&mut self, vehicle: &Id<Vehicle>) -> Result<u64>;
}

pub trait DatabaseAutocommit: PositionRepo + Send {}

pub trait Database: Clone + Send + Sync + Sized + 'static {
    type Autocommit: DatabaseAutocommit + Send;

    fn auto(&self) -> Self::Autocommit;
}

/// The bound check every store applies on insert, judged against the
/// store's own clock.
pub fn check_report(report: &PositionReport, limits: &ReportLimits) -> Result<()> {
    report.validate(limits, Utc::now())?;
    Ok(())
}
