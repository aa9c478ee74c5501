use std::{env, error, fmt, sync::Arc};

use tracking::catalog::{CatalogError, InMemoryCatalog, RouteCatalog, VehicleCatalog};

pub mod client;
pub mod http;

#[derive(Debug, Clone)]
pub enum ApiError {
    RequestError(Arc<reqwest::Error>),
    InvalidResponse {
        status_code: reqwest::StatusCode,
        url: String,
        response: Option<String>,
    },
}

impl error::Error for ApiError {}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ApiError::RequestError(e) => write!(f, "HTTP request error: {}", e),
            ApiError::InvalidResponse {
                status_code,
                url,
                response,
            } => match response {
                Some(text) => {
                    write!(f, "Invalid Response ({}) {}: {}", status_code, text, url)
                }
                None => write!(f, "Invalid Response({}) {}", status_code, url),
            },
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        ApiError::RequestError(Arc::new(e))
    }
}

impl From<ApiError> for CatalogError {
    fn from(value: ApiError) -> Self {
        CatalogError::other(value)
    }
}

pub struct Catalogs {
    pub vehicles: Arc<dyn VehicleCatalog>,
    pub routes: Arc<dyn RouteCatalog>,
}

impl Catalogs {
    /// Selects the catalogs from the environment. `VEHICLE_CATALOG_URL` and
    /// `ROUTE_CATALOG_URL` point to catalog services. Whatever is not served
    /// remotely comes from the JSON file named by `CATALOG_SEED_FILE`, or
    /// from an empty in-memory catalog.
    pub fn from_env() -> Result<Self, CatalogError> {
        let local = Arc::new(match env::var("CATALOG_SEED_FILE") {
            Ok(path) => {
                log::info!("seeding catalog from {path}");
                InMemoryCatalog::load(path)?
            }
            Err(_) => InMemoryCatalog::new(),
        });

        let vehicles: Arc<dyn VehicleCatalog> = match env::var("VEHICLE_CATALOG_URL") {
            Ok(url) => Arc::new(http::HttpVehicleCatalog::new(
                client::CatalogClient::new(url),
            )),
            Err(_) => local.clone(),
        };
        let routes: Arc<dyn RouteCatalog> = match env::var("ROUTE_CATALOG_URL") {
            Ok(url) => Arc::new(http::HttpRouteCatalog::new(
                client::CatalogClient::new(url),
            )),
            Err(_) => local,
        };
        Ok(Self { vehicles, routes })
    }
}
