use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::{
    catalog::{RouteCatalog, VehicleCatalog},
    client::Client,
    config::TrackingConfig,
    database::Database,
    events::{self, CatalogEvents},
    retention::RetentionTask,
};

pub struct Server<D>
where
    D: Database,
{
    database: D,
    vehicles: Arc<dyn VehicleCatalog>,
    routes: Arc<dyn RouteCatalog>,
    config: Arc<TrackingConfig>,
}

/// Handles of the background tasks started by `Server::start`.
pub struct Background {
    pub events: CatalogEvents,
    pub cascade: JoinHandle<()>,
    pub retention: JoinHandle<()>,
}

impl<D> Server<D>
where
    D: Database,
{
    pub fn new(
        database: D,
        vehicles: Arc<dyn VehicleCatalog>,
        routes: Arc<dyn RouteCatalog>,
        config: TrackingConfig,
    ) -> Self {
        Self {
            database,
            vehicles,
            routes,
            config: Arc::new(config),
        }
    }

    pub fn client(&self) -> Client<D> {
        Client::new(
            self.database.clone(),
            self.vehicles.clone(),
            self.routes.clone(),
            self.config.clone(),
        )
    }

    /// Starts retention eviction and the catalog event consumer.
    pub fn start(&self) -> Background {
        let retention =
            RetentionTask::new(self.client(), self.config.eviction_interval).spawn();
        let (events, cascade) = events::spawn(self.client());
        log::info!(
            "tracking started: retention {} h, eviction every {} s",
            self.config.retention.num_hours(),
            self.config.eviction_interval.as_secs()
        );
        Background {
            events,
            cascade,
            retention,
        }
    }
}
