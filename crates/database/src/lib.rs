use std::{env, error::Error};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use model::{
    position::{PositionReport, ReportLimits, StoredReport},
    vehicle::Vehicle,
    DateTimeRange, WithDistance,
};
use tracking::database::{
    check_report, Database, DatabaseAutocommit, PositionRepo, ProximitySearch, Result,
};
use utility::id::Id;

pub mod any;
pub mod data_model;
pub mod queries;

pub use any::AnyDatabase;

pub struct DatabaseConnectionInfo {
    pub username: String,
    pub password: String,
    pub hostname: String,
    pub port: u16,
    pub database: String,
}

impl DatabaseConnectionInfo {
    pub fn from_env() -> Option<Self> {
        let username = env::var("DATABASE_USER").ok()?;
        let password = env::var("DATABASE_PASSWORD").ok()?;
        let hostname = env::var("DATABASE_HOST").ok()?;
        let port: u16 = env::var("DATABASE_PORT").ok()?.parse().ok()?;
        let database = env::var("DATABASE_NAME").ok()?;
        Some(Self {
            username,
            password,
            hostname,
            port,
            database,
        })
    }

    pub(self) fn postgres_url(self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.username, self.password, self.hostname, self.port, self.database
        )
    }
}

#[derive(Clone)]
pub struct PgDatabase {
    connection: sqlx::PgPool,
    limits: ReportLimits,
}

pub struct PgDatabaseAutocommit {
    pool: sqlx::PgPool,
    limits: ReportLimits,
}

impl DatabaseAutocommit for PgDatabaseAutocommit {}

impl PgDatabase {
    pub async fn connect(
        database_connection_info: DatabaseConnectionInfo,
        limits: ReportLimits,
    ) -> std::result::Result<Self, Box<dyn Error>> {
        let url = database_connection_info.postgres_url();
        let pool = sqlx::postgres::PgPool::connect(&url).await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self {
            connection: pool,
            limits,
        })
    }
}

impl Database for PgDatabase {
    type Autocommit = PgDatabaseAutocommit;

    fn auto(&self) -> Self::Autocommit {
        PgDatabaseAutocommit {
            pool: self.connection.clone(),
            limits: self.limits,
        }
    }
}

#[async_trait]
impl PositionRepo for PgDatabaseAutocommit {
    async fn insert(&mut self, report: PositionReport) -> Result<StoredReport> {
        check_report(&report, &self.limits)?;
        queries::position::insert(&self.pool, report).await
    }

    async fn latest_for_vehicle(&mut self, vehicle: &Id<Vehicle>) -> Result<StoredReport> {
        queries::position::latest_for_vehicle(&self.pool, vehicle).await
    }

    async fn range_for_vehicle(
        &mut self,
        vehicle: &Id<Vehicle>,
        range: DateTimeRange,
        limit: usize,
    ) -> Result<Vec<StoredReport>> {
        if range.first > range.last {
            return Ok(Vec::new());
        }
        queries::position::range_for_vehicle(&self.pool, vehicle, range, limit).await
    }

    async fn nearby(
        &mut self,
        search: ProximitySearch,
    ) -> Result<Vec<WithDistance<StoredReport>>> {
        queries::position::nearby(&self.pool, search).await
    }

    async fn latest_for_all_vehicles(
        &mut self,
        since: DateTime<Utc>,
    ) -> Result<Vec<StoredReport>> {
        queries::position::latest_for_all_vehicles(&self.pool, since).await
    }

    async fn evict_older_than(&mut self, cutoff: DateTime<Utc>) -> Result<u64> {
        queries::position::evict_older_than(&self.pool, cutoff).await
    }

    async fn delete_vehicle(&mut self, vehicle: &Id<Vehicle>) -> Result<u64> {
        queries::position::delete_vehicle(&self.pool, vehicle).await
    }
}
