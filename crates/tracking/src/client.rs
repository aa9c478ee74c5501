use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use model::{
    eta::{ArrivalEstimate, EstimateOutcome, EtaResult},
    live::{LatestPosition, LiveLocation, NearbyVehicle},
    position::{Coordinates, LocationView, PositionReport, RawPositionReport, StoredReport},
    route::Route,
    trail::{Trail, TrailStats},
    vehicle::Vehicle,
    DateTimeRange, ValidationError, WithDistance, WithId,
};
use utility::{geo::round_to, id::Id};

use crate::{
    catalog::{not_found_to_none, CatalogError, RouteCatalog, VehicleCatalog},
    config::TrackingConfig,
    database::{Database, DatabaseError, PositionRepo, ProximitySearch},
    deadline::Deadline,
    eta, history,
    liveness::{human_age_at, is_stale_at},
    nearby::NearbyQuery,
    TrackingError, TrackingResult,
};

/// Entry point to every tracking operation. Cheap to clone.
#[derive(Clone)]
pub struct Client<D>
where
    D: Database,
{
    pub database: D,
    vehicles: Arc<dyn VehicleCatalog>,
    routes: Arc<dyn RouteCatalog>,
    config: Arc<TrackingConfig>,
    deadline: Deadline,
}

impl<D> Client<D>
where
    D: Database,
{
    pub(crate) fn new(
        database: D,
        vehicles: Arc<dyn VehicleCatalog>,
        routes: Arc<dyn RouteCatalog>,
        config: Arc<TrackingConfig>,
    ) -> Self {
        let deadline = Deadline::Within(config.deadline);
        Self {
            database,
            vehicles,
            routes,
            config,
            deadline,
        }
    }

    pub fn config(&self) -> &TrackingConfig {
        &self.config
    }

    /// A client whose operations run against the given deadline instead of
    /// the configured one.
    pub fn with_deadline(&self, deadline: Deadline) -> Self {
        Self {
            deadline,
            ..self.clone()
        }
    }

    // ingest

    /// Validates a raw report, checks the vehicle and the operating region
    /// and stores it. Submitting the same report twice stores it twice.
    pub async fn submit_position(
        &self,
        raw: RawPositionReport,
    ) -> TrackingResult<StoredReport> {
        let report = PositionReport::new(raw, self.config.moving_threshold_kmh);
        report.validate(&self.config.limits, Utc::now())?;

        self.deadline
            .run(async {
                self.vehicle(&report.vehicle_id).await?;
                let region = &self.config.operating_region;
                if !region.contains(report.latitude, report.longitude) {
                    return Err(TrackingError::OutOfRegion {
                        latitude: report.latitude,
                        longitude: report.longitude,
                    });
                }
                let stored = self.database.auto().insert(report).await?;
                log::debug!(
                    "accepted report {} of vehicle {} at ({}, {})",
                    stored.id,
                    stored.content.vehicle_id,
                    stored.content.latitude,
                    stored.content.longitude
                );
                Ok(stored)
            })
            .await
    }

    // queries

    pub async fn latest_position(
        &self,
        vehicle_id: &Id<Vehicle>,
    ) -> TrackingResult<LatestPosition> {
        let stored = self.deadline.run(self.latest_report(vehicle_id)).await?;
        let now = Utc::now();
        let timestamp = stored.content.timestamp;
        Ok(LatestPosition {
            location: LocationView::new(&stored),
            is_stale: is_stale_at(&timestamp, self.config.latest_stale_after, now),
            last_updated: human_age_at(&timestamp, now),
        })
    }

    /// Closest vehicles around a point, one entry per vehicle, each showing
    /// its most recent report inside the radius.
    pub async fn find_nearby(
        &self,
        query: NearbyQuery,
    ) -> TrackingResult<Vec<NearbyVehicle>> {
        query.validate()?;

        self.deadline
            .run(async {
                let now = Utc::now();
                let window = query.window.unwrap_or(self.config.nearby_window);
                let candidates = self
                    .database
                    .auto()
                    .nearby(ProximitySearch {
                        center: query.center,
                        radius_km: query.radius_km,
                        since: now - window,
                        limit: None,
                    })
                    .await?;

                let joined = join_all(
                    candidates
                        .into_iter()
                        .map(|candidate| self.join_nearby(candidate, &query, now)),
                )
                .await;

                let mut results = Vec::new();
                for result in joined {
                    if let Some(vehicle) = result? {
                        results.push(vehicle);
                    }
                }
                results.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));
                results.truncate(query.limit.unwrap_or(self.config.nearby_limit));
                Ok(results)
            })
            .await
    }

    /// Latest position of every active vehicle that reported within the live
    /// window.
    pub async fn live_locations(&self) -> TrackingResult<Vec<LiveLocation>> {
        self.deadline
            .run(async {
                let now = Utc::now();
                let latest = self
                    .database
                    .auto()
                    .latest_for_all_vehicles(now - self.config.live_window)
                    .await?;

                let joined =
                    join_all(latest.into_iter().map(|stored| self.join_live(stored, now)))
                        .await;

                let mut results = Vec::new();
                for result in joined {
                    if let Some(location) = result? {
                        results.push(location);
                    }
                }
                Ok(results)
            })
            .await
    }

    pub async fn estimate_arrival(
        &self,
        vehicle_id: &Id<Vehicle>,
        destination: Coordinates,
    ) -> TrackingResult<EtaResult> {
        destination.validate()?;
        let stored = self.deadline.run(self.latest_report(vehicle_id)).await?;
        Ok(eta::estimate_at(&stored.content, &destination, Utc::now()))
    }

    /// Estimates for several vehicles at once. Estimates are computed
    /// concurrently and returned in request order; a failing vehicle yields
    /// an error entry instead of failing the batch.
    pub async fn estimate_arrival_many(
        &self,
        vehicle_ids: Vec<Id<Vehicle>>,
        destination: Coordinates,
    ) -> TrackingResult<Vec<ArrivalEstimate>> {
        destination.validate()?;
        let estimates = vehicle_ids.into_iter().map(|vehicle_id| async move {
            let outcome = match self.estimate_arrival(&vehicle_id, destination).await {
                Ok(result) => EstimateOutcome::Estimate(result),
                Err(why) => EstimateOutcome::Failed {
                    error: why.to_string(),
                },
            };
            ArrivalEstimate {
                vehicle_id,
                outcome,
            }
        });
        Ok(join_all(estimates).await)
    }

    /// Reports of a vehicle within a time window, oldest first, with their
    /// statistics. Without bounds the window is the configured trail window
    /// ending now.
    pub async fn trail(
        &self,
        vehicle_id: &Id<Vehicle>,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        limit: Option<usize>,
    ) -> TrackingResult<Trail> {
        let end = end.unwrap_or_else(Utc::now);
        let start = start.unwrap_or(end - self.config.trail_window);
        let range = time_range(start, end)?;
        let limit = limit.unwrap_or(self.config.trail_limit);

        let reports = self
            .deadline
            .run(async {
                Ok(self
                    .database
                    .auto()
                    .range_for_vehicle(vehicle_id, range, limit)
                    .await?)
            })
            .await?;

        Ok(Trail {
            vehicle_id: vehicle_id.clone(),
            start,
            end,
            stats: history::trail_stats(reports.iter().map(|stored| &stored.content)),
            locations: reports.iter().map(LocationView::new).collect(),
        })
    }

    pub async fn trail_stats(
        &self,
        vehicle_id: &Id<Vehicle>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> TrackingResult<TrailStats> {
        Ok(self.trail(vehicle_id, Some(start), Some(end), None).await?.stats)
    }

    // maintenance

    /// Deletes every report of a vehicle that left the catalog.
    pub async fn vehicle_removed(&self, vehicle_id: &Id<Vehicle>) -> TrackingResult<u64> {
        let count = self
            .deadline
            .run(async { Ok(self.database.auto().delete_vehicle(vehicle_id).await?) })
            .await?;
        log::info!("removed {count} reports of deleted vehicle {vehicle_id}");
        Ok(count)
    }

    /// Deletes every report older than the retention window.
    pub async fn evict_expired(&self) -> TrackingResult<u64> {
        let cutoff = Utc::now() - self.config.retention;
        self.deadline
            .run(async { Ok(self.database.auto().evict_older_than(cutoff).await?) })
            .await
    }

    // helpers

    async fn latest_report(&self, vehicle_id: &Id<Vehicle>) -> TrackingResult<StoredReport> {
        self.database
            .auto()
            .latest_for_vehicle(vehicle_id)
            .await
            .map_err(|why| match why {
                DatabaseError::NotFound => TrackingError::no_position(vehicle_id),
                why => why.into(),
            })
    }

    async fn vehicle(&self, vehicle_id: &Id<Vehicle>) -> TrackingResult<Vehicle> {
        self.vehicles
            .get_vehicle(vehicle_id)
            .await
            .map_err(|why| match why {
                CatalogError::NotFound => TrackingError::vehicle_not_found(vehicle_id),
                why => why.into(),
            })
    }

    async fn route(
        &self,
        route_id: Option<&Id<Route>>,
    ) -> TrackingResult<Option<WithId<Route>>> {
        let Some(route_id) = route_id else {
            return Ok(None);
        };
        Ok(not_found_to_none(self.routes.get_route(route_id).await)?
            .map(|route| WithId::new(route_id.clone(), route)))
    }

    /// Attaches catalog data to a proximity candidate. Candidates of vehicles
    /// no longer in the catalog, or not matching the filters, are dropped.
    async fn join_nearby(
        &self,
        candidate: WithDistance<StoredReport>,
        query: &NearbyQuery,
        now: DateTime<Utc>,
    ) -> TrackingResult<Option<NearbyVehicle>> {
        let report = &candidate.content.content;
        let Some(vehicle) =
            not_found_to_none(self.vehicles.get_vehicle(&report.vehicle_id).await)?
        else {
            return Ok(None);
        };
        if !query.matches(&vehicle, report) {
            return Ok(None);
        }
        let route = self.route(report.route_id.as_ref()).await?;
        Ok(Some(NearbyVehicle {
            vehicle: WithId::new(report.vehicle_id.clone(), vehicle),
            route,
            location: LocationView::new(&candidate.content),
            distance_km: reported_distance(candidate.distance_km, query.radius_km),
            last_updated: human_age_at(&report.timestamp, now),
        }))
    }

    async fn join_live(
        &self,
        stored: StoredReport,
        now: DateTime<Utc>,
    ) -> TrackingResult<Option<LiveLocation>> {
        let report = &stored.content;
        let vehicle = not_found_to_none(self.vehicles.get_vehicle(&report.vehicle_id).await)?;
        let Some(vehicle) = vehicle.filter(Vehicle::is_active) else {
            return Ok(None);
        };
        let route = self.route(report.route_id.as_ref()).await?;
        Ok(Some(LiveLocation {
            vehicle: WithId::new(report.vehicle_id.clone(), vehicle),
            route,
            location: LocationView::new(&stored),
            is_stale: is_stale_at(&report.timestamp, self.config.live_stale_after, now),
            last_updated: human_age_at(&report.timestamp, now),
        }))
    }
}

/// Distance rounded to metres, never above the search radius.
fn reported_distance(distance_km: f64, radius_km: f64) -> f64 {
    round_to(distance_km, 3).min(radius_km)
}

fn time_range(start: DateTime<Utc>, end: DateTime<Utc>) -> TrackingResult<DateTimeRange> {
    if start > end {
        return Err(ValidationError::new("start", "must not be after end").into());
    }
    Ok(DateTimeRange::new(start, end))
}
