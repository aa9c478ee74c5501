use std::{collections::HashMap, error::Error, fmt, fs, path::Path};

use async_trait::async_trait;
use model::{route::Route, vehicle::Vehicle};
use serde::Deserialize;
use tokio::sync::RwLock;
use utility::id::Id;

#[derive(Debug)]
pub enum CatalogError {
    NotFound,
    Other(Box<dyn Error + Send + Sync>),
}

impl CatalogError {
    pub fn other<T: Error + Send + Sync + 'static>(why: T) -> Self {
        Self::Other(Box::new(why))
    }
}

impl fmt::Display for CatalogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "not found in catalog"),
            Self::Other(why) => write!(f, "catalog unavailable: {why}"),
        }
    }
}

impl Error for CatalogError {}

pub type CatalogResult<O> = Result<O, CatalogError>;

pub fn not_found_to_none<O>(result: CatalogResult<O>) -> CatalogResult<Option<O>> {
    if let Err(CatalogError::NotFound) = result {
        Ok(None)
    } else {
        result.map(Some)
    }
}

#[async_trait]
pub trait VehicleCatalog: Send + Sync {
    async fn get_vehicle(&self, id: &Id<Vehicle>) -> CatalogResult<Vehicle>;
}

#[async_trait]
pub trait RouteCatalog: Send + Sync {
    async fn get_route(&self, id: &Id<Route>) -> CatalogResult<Route>;
}

/// Catalog contents keyed by id, as found in a seed file.
#[derive(Debug, Default, Deserialize)]
pub struct CatalogSeed {
    #[serde(default)]
    pub vehicles: HashMap<String, Vehicle>,
    #[serde(default)]
    pub routes: HashMap<String, Route>,
}

/// A catalog held in memory. Serves as the default catalog when no catalog
/// service is configured, and as the catalog in tests.
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    vehicles: RwLock<HashMap<Id<Vehicle>, Vehicle>>,
    routes: RwLock<HashMap<Id<Route>, Route>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_seed(seed: CatalogSeed) -> Self {
        Self {
            vehicles: RwLock::new(
                seed.vehicles
                    .into_iter()
                    .map(|(id, vehicle)| (Id::new(id), vehicle))
                    .collect(),
            ),
            routes: RwLock::new(
                seed.routes
                    .into_iter()
                    .map(|(id, route)| (Id::new(id), route))
                    .collect(),
            ),
        }
    }

    pub fn load<P: AsRef<Path>>(path: P) -> CatalogResult<Self> {
        let content = fs::read_to_string(path).map_err(CatalogError::other)?;
        let seed: CatalogSeed =
            serde_json::from_str(&content).map_err(CatalogError::other)?;
        Ok(Self::from_seed(seed))
    }

    pub async fn put_vehicle(&self, id: Id<Vehicle>, vehicle: Vehicle) {
        self.vehicles.write().await.insert(id, vehicle);
    }

    pub async fn remove_vehicle(&self, id: &Id<Vehicle>) -> Option<Vehicle> {
        self.vehicles.write().await.remove(id)
    }

    pub async fn put_route(&self, id: Id<Route>, route: Route) {
        self.routes.write().await.insert(id, route);
    }
}

#[async_trait]
impl VehicleCatalog for InMemoryCatalog {
    async fn get_vehicle(&self, id: &Id<Vehicle>) -> CatalogResult<Vehicle> {
        self.vehicles
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or(CatalogError::NotFound)
    }
}

#[async_trait]
impl RouteCatalog for InMemoryCatalog {
    async fn get_route(&self, id: &Id<Route>) -> CatalogResult<Route> {
        self.routes
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or(CatalogError::NotFound)
    }
}
