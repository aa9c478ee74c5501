use std::sync::Arc;

use chrono::{Duration, Utc};
use model::{
    position::{PositionSource, RawPositionReport},
    route::Route,
    vehicle::{Vehicle, VehicleStatus},
    ExampleData,
};
use utility::{geo::EARTH_RADIUS_KM, id::Id};

use crate::{
    catalog::InMemoryCatalog, config::TrackingConfig, memory::MemoryDatabase,
    server::Server,
};

pub const COLOMBO: (f64, f64) = (6.9271, 79.8612);

pub fn vehicle(status: VehicleStatus) -> Vehicle {
    Vehicle {
        status,
        ..Vehicle::example_data()
    }
}

/// bus-1 and bus-2 are active, bus-3 is in maintenance, route 138 exists.
pub async fn catalog() -> Arc<InMemoryCatalog> {
    let catalog = InMemoryCatalog::new();
    catalog
        .put_vehicle(Id::from("bus-1"), vehicle(VehicleStatus::Active))
        .await;
    catalog
        .put_vehicle(Id::from("bus-2"), vehicle(VehicleStatus::Active))
        .await;
    catalog
        .put_vehicle(Id::from("bus-3"), vehicle(VehicleStatus::Maintenance))
        .await;
    catalog.put_route(Id::from("138"), Route::example_data()).await;
    Arc::new(catalog)
}

pub fn server(catalog: Arc<InMemoryCatalog>) -> Server<MemoryDatabase> {
    let config = TrackingConfig::default();
    Server::new(
        MemoryDatabase::new(config.limits),
        catalog.clone(),
        catalog,
        config,
    )
}

/// A point `km` north of Colombo.
pub fn north_of_colombo(km: f64) -> (f64, f64) {
    (COLOMBO.0 + (km / EARTH_RADIUS_KM).to_degrees(), COLOMBO.1)
}

pub fn raw(
    vehicle: &str,
    (latitude, longitude): (f64, f64),
    speed: f64,
    minutes_ago: i64,
) -> RawPositionReport {
    RawPositionReport {
        vehicle_id: Id::from(vehicle),
        latitude,
        longitude,
        speed,
        heading: 90.0,
        accuracy: 10.0,
        altitude: None,
        timestamp: Utc::now() - Duration::minutes(minutes_ago),
        source: PositionSource::DeviceReported,
        route_id: None,
    }
}
