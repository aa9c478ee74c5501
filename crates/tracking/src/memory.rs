//! Position store held in process memory.
//!
//! Reports live in one map keyed by their generated id. Three indexes point
//! into it: an R-tree over `[longitude, latitude, unix millis]`, a timestamp
//! ordered set per vehicle and a global timestamp ordered set used for
//! eviction. Every insert and removal updates all of them under the same
//! write lock.
//!
//! The time axis of the R-tree lets proximity searches cut both space and
//! the recency window in one envelope query, so retained history outside
//! the window is never visited.

use std::{
    collections::{BTreeMap, BTreeSet, HashMap},
    mem,
    sync::Arc,
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use model::{
    position::{PositionReport, ReportLimits, StoredReport},
    vehicle::Vehicle,
    DateTimeRange, WithDistance, WithId,
};
use rstar::{RTree, RTreeObject, AABB};
use tokio::sync::RwLock;
use utility::{geo::BoundingBox, id::Id};

use crate::database::{
    check_report, Database, DatabaseAutocommit, DatabaseError, PositionRepo,
    ProximitySearch, Result,
};

type RecencyKey = (DateTime<Utc>, i64);

#[derive(Debug, Clone, PartialEq)]
struct ReportNode {
    id: i64,
    point: [f64; 3],
}

fn time_axis(timestamp: DateTime<Utc>) -> f64 {
    timestamp.timestamp_millis() as f64
}

impl ReportNode {
    fn new(id: i64, report: &PositionReport) -> Self {
        Self {
            id,
            point: [report.longitude, report.latitude, time_axis(report.timestamp)],
        }
    }
}

impl RTreeObject for ReportNode {
    type Envelope = AABB<[f64; 3]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.point)
    }
}

#[derive(Default)]
struct Store {
    last_id: i64,
    reports: HashMap<i64, PositionReport>,
    by_vehicle: BTreeMap<Id<Vehicle>, BTreeSet<RecencyKey>>,
    by_time: BTreeSet<RecencyKey>,
    spatial: RTree<ReportNode>,
}

impl Store {
    fn insert(&mut self, report: PositionReport) -> StoredReport {
        self.last_id += 1;
        let id = self.last_id;
        let key = (report.timestamp, id);
        self.by_vehicle
            .entry(report.vehicle_id.clone())
            .or_default()
            .insert(key);
        self.by_time.insert(key);
        self.spatial.insert(ReportNode::new(id, &report));
        self.reports.insert(id, report.clone());
        WithId::new(Id::new(id), report)
    }

    fn remove(&mut self, id: i64) -> bool {
        let Some(report) = self.reports.remove(&id) else {
            return false;
        };
        let key = (report.timestamp, id);
        self.by_time.remove(&key);
        if let Some(keys) = self.by_vehicle.get_mut(&report.vehicle_id) {
            keys.remove(&key);
            if keys.is_empty() {
                self.by_vehicle.remove(&report.vehicle_id);
            }
        }
        self.spatial.remove(&ReportNode::new(id, &report));
        true
    }

    fn stored(&self, key: &RecencyKey) -> Option<StoredReport> {
        self.reports
            .get(&key.1)
            .map(|report| WithId::new(Id::new(key.1), report.clone()))
    }
}

/// In-memory position store. Clones share the same data.
#[derive(Clone, Default)]
pub struct MemoryDatabase {
    store: Arc<RwLock<Store>>,
    limits: ReportLimits,
}

impl MemoryDatabase {
    pub fn new(limits: ReportLimits) -> Self {
        Self {
            store: Arc::default(),
            limits,
        }
    }
}

pub struct MemoryAutocommit {
    store: Arc<RwLock<Store>>,
    limits: ReportLimits,
}

impl DatabaseAutocommit for MemoryAutocommit {}

impl Database for MemoryDatabase {
    type Autocommit = MemoryAutocommit;

    fn auto(&self) -> Self::Autocommit {
        MemoryAutocommit {
            store: self.store.clone(),
            limits: self.limits,
        }
    }
}

#[async_trait]
impl PositionRepo for MemoryAutocommit {
    async fn insert(&mut self, report: PositionReport) -> Result<StoredReport> {
        check_report(&report, &self.limits)?;
        Ok(self.store.write().await.insert(report))
    }

    async fn latest_for_vehicle(&mut self, vehicle: &Id<Vehicle>) -> Result<StoredReport> {
        let store = self.store.read().await;
        store
            .by_vehicle
            .get(vehicle)
            .and_then(|keys| keys.last())
            .and_then(|key| store.stored(key))
            .ok_or(DatabaseError::NotFound)
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
        let store = self.store.read().await;
        let Some(keys) = store.by_vehicle.get(vehicle) else {
            return Ok(Vec::new());
        };
        Ok(keys
            .range((range.first, i64::MIN)..=(range.last, i64::MAX))
            .take(limit)
            .filter_map(|key| store.stored(key))
            .collect())
    }

    async fn nearby(
        &mut self,
        search: ProximitySearch,
    ) -> Result<Vec<WithDistance<StoredReport>>> {
        let center = search.center;
        let bounds =
            BoundingBox::around(center.latitude, center.longitude, search.radius_km);
        let envelope = AABB::from_corners(
            [bounds.min_longitude, bounds.min_latitude, time_axis(search.since)],
            [bounds.max_longitude, bounds.max_latitude, f64::MAX],
        );

        let store = self.store.read().await;

        // most recent in-radius candidate per vehicle
        let mut candidates: IndexMap<&Id<Vehicle>, (RecencyKey, f64)> = IndexMap::new();
        for node in store.spatial.locate_in_envelope(&envelope) {
            let Some(report) = store.reports.get(&node.id) else {
                continue;
            };
            if report.timestamp < search.since {
                continue;
            }
            let distance_km = report.distance_km_to(&center);
            if distance_km > search.radius_km {
                continue;
            }
            let key = (report.timestamp, node.id);
            match candidates.get_mut(&report.vehicle_id) {
                Some(best) if best.0 >= key => {}
                Some(best) => *best = (key, distance_km),
                None => {
                    candidates.insert(&report.vehicle_id, (key, distance_km));
                }
            }
        }

        let mut results = candidates
            .into_values()
            .filter_map(|(key, distance_km)| {
                store
                    .stored(&key)
                    .map(|stored| WithDistance::new(distance_km, stored))
            })
            .collect::<Vec<_>>();
        results.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));
        if let Some(limit) = search.limit {
            results.truncate(limit);
        }
        Ok(results)
    }

    async fn latest_for_all_vehicles(
        &mut self,
        since: DateTime<Utc>,
    ) -> Result<Vec<StoredReport>> {
        let store = self.store.read().await;
        Ok(store
            .by_vehicle
            .values()
            .filter_map(|keys| keys.last())
            .filter(|key| key.0 >= since)
            .filter_map(|key| store.stored(key))
            .collect())
    }

    async fn evict_older_than(&mut self, cutoff: DateTime<Utc>) -> Result<u64> {
        let mut store = self.store.write().await;
        let kept = store.by_time.split_off(&(cutoff, i64::MIN));
        let expired = mem::replace(&mut store.by_time, kept);
        let mut count = 0;
        for (_, id) in expired {
            if store.remove(id) {
                count += 1;
            }
        }
        Ok(count)
    }

    async fn delete_vehicle(&mut self, vehicle: &Id<Vehicle>) -> Result<u64> {
        let mut store = self.store.write().await;
        let Some(keys) = store.by_vehicle.get(vehicle).cloned() else {
            return Ok(0);
        };
        let mut count = 0;
        for (_, id) in keys {
            if store.remove(id) {
                count += 1;
            }
        }
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use model::position::{Coordinates, PositionSource, RawPositionReport};
    use utility::geo::EARTH_RADIUS_KM;

    use super::*;

    const CENTER: (f64, f64) = (6.9271, 79.8612);

    fn report(
        vehicle: &str,
        latitude: f64,
        longitude: f64,
        timestamp: DateTime<Utc>,
    ) -> PositionReport {
        PositionReport::new(
            RawPositionReport {
                vehicle_id: Id::from(vehicle),
                latitude,
                longitude,
                speed: 30.0,
                heading: 0.0,
                accuracy: 10.0,
                altitude: None,
                timestamp,
                source: PositionSource::DeviceReported,
                route_id: None,
            },
            5.0,
        )
    }

    /// A point `km` north of the center.
    fn north_of_center(km: f64) -> (f64, f64) {
        (CENTER.0 + (km / EARTH_RADIUS_KM).to_degrees(), CENTER.1)
    }

    fn search(radius_km: f64, since: DateTime<Utc>) -> ProximitySearch {
        ProximitySearch {
            center: Coordinates::new(CENTER.0, CENTER.1),
            radius_km,
            since,
            limit: None,
        }
    }

    #[tokio::test]
    async fn rejects_invalid_reports() {
        let mut db = MemoryDatabase::default().auto();
        let now = Utc::now();
        let result = db.insert(report("bus-1", 91.0, 0.0, now)).await;
        assert!(matches!(result, Err(DatabaseError::Validation(_))));
        let result = db
            .insert(report("bus-1", 6.9, 79.8, now + Duration::minutes(6)))
            .await;
        assert!(matches!(result, Err(DatabaseError::Validation(_))));
    }

    #[tokio::test]
    async fn latest_is_resolved_by_timestamp() {
        let mut db = MemoryDatabase::default().auto();
        let now = Utc::now();
        let newer = db
            .insert(report("bus-1", 6.91, 79.86, now - Duration::minutes(1)))
            .await
            .unwrap();
        db.insert(report("bus-1", 6.90, 79.86, now - Duration::minutes(5)))
            .await
            .unwrap();

        let latest = db.latest_for_vehicle(&Id::from("bus-1")).await.unwrap();
        assert_eq!(latest.id, newer.id);
        assert!(matches!(
            db.latest_for_vehicle(&Id::from("bus-2")).await,
            Err(DatabaseError::NotFound)
        ));
    }

    #[tokio::test]
    async fn equal_timestamps_prefer_the_later_id() {
        let mut db = MemoryDatabase::default().auto();
        let now = Utc::now();
        db.insert(report("bus-1", 6.90, 79.86, now)).await.unwrap();
        let second = db.insert(report("bus-1", 6.91, 79.86, now)).await.unwrap();
        let latest = db.latest_for_vehicle(&Id::from("bus-1")).await.unwrap();
        assert_eq!(latest.id, second.id);
    }

    #[tokio::test]
    async fn range_is_inclusive_ordered_and_limited() {
        let mut db = MemoryDatabase::default().auto();
        let start = Utc::now() - Duration::hours(1);
        for minutes in [30, 0, 20, 10, 40] {
            db.insert(report("bus-1", 6.9, 79.86, start + Duration::minutes(minutes)))
                .await
                .unwrap();
        }
        db.insert(report("bus-2", 6.9, 79.86, start)).await.unwrap();

        let range = DateTimeRange::new(start, start + Duration::minutes(30));
        let trail = db
            .range_for_vehicle(&Id::from("bus-1"), range, 100)
            .await
            .unwrap();
        let offsets = trail
            .iter()
            .map(|stored| (stored.content.timestamp - start).num_minutes())
            .collect::<Vec<_>>();
        assert_eq!(offsets, vec![0, 10, 20, 30]);

        let limited = db
            .range_for_vehicle(&Id::from("bus-1"), range, 2)
            .await
            .unwrap();
        assert_eq!(limited.len(), 2);

        let reversed = DateTimeRange::new(range.last, range.first);
        assert!(db
            .range_for_vehicle(&Id::from("bus-1"), reversed, 100)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn nearby_returns_one_result_per_vehicle_within_radius() {
        let mut db = MemoryDatabase::default().auto();
        let now = Utc::now();
        let (lat_1, lon_1) = north_of_center(1.0);
        let (lat_2, lon_2) = north_of_center(2.0);
        let (lat_3, lon_3) = north_of_center(3.0);
        let (far_lat, far_lon) = north_of_center(8.0);

        db.insert(report("bus-a", lat_3, lon_3, now - Duration::minutes(2)))
            .await
            .unwrap();
        let latest_a = db
            .insert(report("bus-a", lat_2, lon_2, now - Duration::minutes(1)))
            .await
            .unwrap();
        let b = db
            .insert(report("bus-b", lat_1, lon_1, now - Duration::minutes(3)))
            .await
            .unwrap();
        db.insert(report("bus-c", far_lat, far_lon, now)).await.unwrap();

        let results = db
            .nearby(search(5.0, now - Duration::minutes(10)))
            .await
            .unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].content.id, b.id);
        assert_eq!(results[1].content.id, latest_a.id);
        assert!(results.iter().all(|result| result.distance_km <= 5.0));
        assert!((results[1].distance_km - 2.0).abs() < 0.01);
    }

    #[tokio::test]
    async fn nearby_ignores_reports_before_the_window() {
        let mut db = MemoryDatabase::default().auto();
        let now = Utc::now();
        let (lat, lon) = north_of_center(1.0);
        db.insert(report("bus-a", lat, lon, now - Duration::minutes(20)))
            .await
            .unwrap();
        assert!(db
            .nearby(search(5.0, now - Duration::minutes(10)))
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn nearby_falls_back_to_an_older_report_inside_the_radius() {
        let mut db = MemoryDatabase::default().auto();
        let now = Utc::now();
        let (inside_lat, inside_lon) = north_of_center(1.0);
        let (outside_lat, outside_lon) = north_of_center(9.0);
        let inside = db
            .insert(report("bus-a", inside_lat, inside_lon, now - Duration::minutes(4)))
            .await
            .unwrap();
        db.insert(report("bus-a", outside_lat, outside_lon, now - Duration::minutes(1)))
            .await
            .unwrap();

        let results = db
            .nearby(search(5.0, now - Duration::minutes(10)))
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].content.id, inside.id);
        assert!((results[0].distance_km - 1.0).abs() < 0.01);
    }

    #[tokio::test]
    async fn nearby_prefers_the_latest_report_when_it_is_inside_the_radius() {
        let mut db = MemoryDatabase::default().auto();
        let now = Utc::now();
        let (inside_lat, inside_lon) = north_of_center(2.0);
        let (outside_lat, outside_lon) = north_of_center(9.0);
        db.insert(report("bus-a", outside_lat, outside_lon, now - Duration::minutes(4)))
            .await
            .unwrap();
        let latest = db
            .insert(report("bus-a", inside_lat, inside_lon, now - Duration::minutes(1)))
            .await
            .unwrap();

        let results = db
            .nearby(search(5.0, now - Duration::minutes(10)))
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].content.id, latest.id);
    }

    #[tokio::test]
    async fn nearby_envelope_excludes_history_before_the_window() {
        let mut db = MemoryDatabase::default().auto();
        let now = Utc::now();
        let (lat, lon) = north_of_center(1.0);
        for hours in 1..=20 {
            db.insert(report("bus-a", lat, lon, now - Duration::hours(hours)))
                .await
                .unwrap();
        }
        let recent = db
            .insert(report("bus-a", lat, lon, now - Duration::minutes(2)))
            .await
            .unwrap();

        let since = now - Duration::minutes(10);
        let store = db.store.read().await;
        let bounds = BoundingBox::around(CENTER.0, CENTER.1, 5.0);
        let envelope = AABB::from_corners(
            [bounds.min_longitude, bounds.min_latitude, time_axis(since)],
            [bounds.max_longitude, bounds.max_latitude, f64::MAX],
        );
        let visited = store
            .spatial
            .locate_in_envelope(&envelope)
            .map(|node| node.id)
            .collect::<Vec<_>>();
        assert_eq!(visited, vec![recent.id.raw()]);
        drop(store);

        let results = db.nearby(search(5.0, since)).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].content.id, recent.id);
    }

    #[tokio::test]
    async fn nearby_applies_limit_after_sorting() {
        let mut db = MemoryDatabase::default().auto();
        let now = Utc::now();
        for (index, km) in [4.0, 1.0, 3.0, 2.0].into_iter().enumerate() {
            let (lat, lon) = north_of_center(km);
            db.insert(report(&format!("bus-{index}"), lat, lon, now))
                .await
                .unwrap();
        }
        let mut query = search(5.0, now - Duration::minutes(10));
        query.limit = Some(2);
        let results = db.nearby(query).await.unwrap();
        let vehicles = results
            .iter()
            .map(|result| result.content.content.vehicle_id.raw())
            .collect::<Vec<_>>();
        assert_eq!(vehicles, vec!["bus-1", "bus-3"]);
    }

    #[tokio::test]
    async fn latest_for_all_vehicles_respects_since() {
        let mut db = MemoryDatabase::default().auto();
        let now = Utc::now();
        db.insert(report("bus-a", 6.9, 79.86, now - Duration::minutes(40)))
            .await
            .unwrap();
        db.insert(report("bus-a", 6.9, 79.87, now - Duration::minutes(5)))
            .await
            .unwrap();
        db.insert(report("bus-b", 6.9, 79.86, now - Duration::minutes(45)))
            .await
            .unwrap();

        let live = db
            .latest_for_all_vehicles(now - Duration::minutes(30))
            .await
            .unwrap();
        assert_eq!(live.len(), 1);
        assert_eq!(live[0].content.longitude, 79.87);
    }

    #[tokio::test]
    async fn eviction_removes_old_reports_from_every_index() {
        let mut db = MemoryDatabase::default().auto();
        let now = Utc::now();
        let (lat, lon) = north_of_center(1.0);
        db.insert(report("bus-a", lat, lon, now - Duration::hours(30)))
            .await
            .unwrap();
        db.insert(report("bus-b", lat, lon, now - Duration::hours(25)))
            .await
            .unwrap();
        let kept = db
            .insert(report("bus-a", lat, lon, now - Duration::hours(1)))
            .await
            .unwrap();

        let cutoff = now - Duration::hours(24);
        assert_eq!(db.evict_older_than(cutoff).await.unwrap(), 2);
        assert_eq!(db.evict_older_than(cutoff).await.unwrap(), 0);

        let latest = db.latest_for_vehicle(&Id::from("bus-a")).await.unwrap();
        assert_eq!(latest.id, kept.id);
        assert!(matches!(
            db.latest_for_vehicle(&Id::from("bus-b")).await,
            Err(DatabaseError::NotFound)
        ));
        let nearby = db.nearby(search(5.0, now - Duration::days(3))).await.unwrap();
        assert_eq!(nearby.len(), 1);
    }

    #[tokio::test]
    async fn deleting_a_vehicle_removes_all_its_reports() {
        let mut db = MemoryDatabase::default().auto();
        let now = Utc::now();
        for minutes in 0..3 {
            db.insert(report("bus-a", 6.93, 79.86, now - Duration::minutes(minutes)))
                .await
                .unwrap();
        }
        db.insert(report("bus-b", 6.93, 79.86, now)).await.unwrap();

        assert_eq!(db.delete_vehicle(&Id::from("bus-a")).await.unwrap(), 3);
        assert_eq!(db.delete_vehicle(&Id::from("bus-a")).await.unwrap(), 0);
        let nearby = db
            .nearby(search(5.0, now - Duration::minutes(10)))
            .await
            .unwrap();
        assert_eq!(nearby.len(), 1);
        assert_eq!(nearby[0].content.content.vehicle_id.raw(), "bus-b");
    }
}
