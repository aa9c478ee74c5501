use std::error::Error;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use model::{
    position::{PositionReport, ReportLimits, StoredReport},
    vehicle::Vehicle,
    DateTimeRange, WithDistance,
};
use tracking::{
    database::{Database, DatabaseAutocommit, PositionRepo, ProximitySearch, Result},
    memory::{MemoryAutocommit, MemoryDatabase},
};
use utility::id::Id;

use crate::{DatabaseConnectionInfo, PgDatabase, PgDatabaseAutocommit};

/// The store selected at startup.
#[derive(Clone)]
pub enum AnyDatabase {
    Memory(MemoryDatabase),
    Postgres(PgDatabase),
}

impl AnyDatabase {
    /// PostgreSQL when connection info is present in the environment, the
    /// in-memory store otherwise.
    pub async fn from_env(
        limits: ReportLimits,
    ) -> std::result::Result<Self, Box<dyn Error>> {
        match DatabaseConnectionInfo::from_env() {
            Some(info) => {
                log::info!("using postgres at {}:{}", info.hostname, info.port);
                Ok(Self::Postgres(PgDatabase::connect(info, limits).await?))
            }
            None => {
                log::info!("no database configured, keeping positions in memory");
                Ok(Self::Memory(MemoryDatabase::new(limits)))
            }
        }
    }
}

pub enum AnyAutocommit {
    Memory(MemoryAutocommit),
    Postgres(PgDatabaseAutocommit),
}

impl DatabaseAutocommit for AnyAutocommit {}

impl Database for AnyDatabase {
    type Autocommit = AnyAutocommit;

    fn auto(&self) -> Self::Autocommit {
        match self {
            Self::Memory(database) => AnyAutocommit::Memory(database.auto()),
            Self::Postgres(database) => AnyAutocommit::Postgres(database.auto()),
        }
    }
}

#[async_trait]
impl PositionRepo for AnyAutocommit {
    async fn insert(&mut self, report: PositionReport) -> Result<StoredReport> {
        match self {
            Self::Memory(repo) => repo.insert(report).await,
            Self::Postgres(repo) => repo.insert(report).await,
        }
    }

    async fn latest_for_vehicle(&mut self, vehicle: &Id<Vehicle>) -> Result<StoredReport> {
        match self {
            Self::Memory(repo) => repo.latest_for_vehicle(vehicle).await,
            Self::Postgres(repo) => repo.latest_for_vehicle(vehicle).await,
        }
    }

    async fn range_for_vehicle(
        &mut self,
        vehicle: &Id<Vehicle>,
        range: DateTimeRange,
        limit: usize,
    ) -> Result<Vec<StoredReport>> {
        match self {
            Self::Memory(repo) => repo.range_for_vehicle(vehicle, range, limit).await,
            Self::Postgres(repo) => repo.range_for_vehicle(vehicle, range, limit).await,
        }
    }

    async fn nearby(
        &mut self,
        search: ProximitySearch,
    ) -> Result<Vec<WithDistance<StoredReport>>> {
        match self {
            Self::Memory(repo) => repo.nearby(search).await,
            Self::Postgres(repo) => repo.nearby(search).await,
        }
    }

    async fn latest_for_all_vehicles(
        &mut self,
        since: DateTime<Utc>,
    ) -> Result<Vec<StoredReport>> {
        match self {
            Self::Memory(repo) => repo.latest_for_all_vehicles(since).await,
            Self::Postgres(repo) => repo.latest_for_all_vehicles(since).await,
        }
    }

    async fn evict_older_than(&mut self, cutoff: DateTime<Utc>) -> Result<u64> {
        match self {
            Self::Memory(repo) => repo.evict_older_than(cutoff).await,
            Self::Postgres(repo) => repo.evict_older_than(cutoff).await,
        }
    }

    async fn delete_vehicle(&mut self, vehicle: &Id<Vehicle>) -> Result<u64> {
        match self {
            Self::Memory(repo) => repo.delete_vehicle(vehicle).await,
            Self::Postgres(repo) => repo.delete_vehicle(vehicle).await,
        }
    }
}
