use chrono::{DateTime, Utc};
use model::{
    position::{PositionReport, StoredReport},
    vehicle::Vehicle,
    DateTimeRange, WithDistance,
};
use sqlx::{Executor, Postgres};
use tracking::database::{ProximitySearch, Result};
use utility::{
    geo::{BoundingBox, EARTH_RADIUS_KM},
    id::Id,
    let_also::LetAlso,
};

use crate::data_model::{
    position::{NearbyRow, PositionRow},
    with_ids, DatabaseRow,
};

use super::convert_error;

pub async fn insert<'c, E>(executor: E, report: PositionReport) -> Result<StoredReport>
where
    E: Executor<'c, Database = Postgres>,
{
    let row = PositionRow::from_model(&report);
    sqlx::query_as::<_, PositionRow>(
        "
        INSERT INTO position_reports(
            vehicle_id,
            latitude,
            longitude,
            speed,
            heading,
            accuracy,
            altitude,
            captured_at,
            source,
            route_id,
            is_moving
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        RETURNING
            id, vehicle_id, latitude, longitude, speed, heading, accuracy,
            altitude, captured_at, source, route_id, is_moving;
        ",
    )
    .bind(&row.vehicle_id)
    .bind(row.latitude)
    .bind(row.longitude)
    .bind(row.speed)
    .bind(row.heading)
    .bind(row.accuracy)
    .bind(row.altitude)
    .bind(row.captured_at)
    .bind(&row.source)
    .bind(&row.route_id)
    .bind(row.is_moving)
    .fetch_one(executor)
    .await
    .map_err(convert_error)?
    .let_owned(|row| Ok(row.to_model()))
}

pub async fn latest_for_vehicle<'c, E>(
    executor: E,
    vehicle: &Id<Vehicle>,
) -> Result<StoredReport>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as::<_, PositionRow>(
        "
        SELECT
            id, vehicle_id, latitude, longitude, speed, heading, accuracy,
            altitude, captured_at, source, route_id, is_moving
        FROM
            position_reports
        WHERE
            vehicle_id = $1
        ORDER BY
            captured_at DESC, id DESC
        LIMIT 1;
        ",
    )
    .bind(vehicle.raw())
    .fetch_one(executor)
    .await
    .map_err(convert_error)?
    .let_owned(|row| Ok(row.to_model()))
}

pub async fn range_for_vehicle<'c, E>(
    executor: E,
    vehicle: &Id<Vehicle>,
    range: DateTimeRange,
    limit: usize,
) -> Result<Vec<StoredReport>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        SELECT
            id, vehicle_id, latitude, longitude, speed, heading, accuracy,
            altitude, captured_at, source, route_id, is_moving
        FROM
            position_reports
        WHERE
            vehicle_id = $1
            AND captured_at BETWEEN $2 AND $3
        ORDER BY
            captured_at ASC, id ASC
        LIMIT $4;
        ",
    )
    .bind(vehicle.raw())
    .bind(range.first)
    .bind(range.last)
    .bind(i64::try_from(limit).unwrap_or(i64::MAX))
    .fetch_all(executor)
    .await
    .map_err(convert_error)?
    .let_owned(|rows: Vec<PositionRow>| Ok(with_ids(rows)))
}

/// Bounding box prefilter, then haversine distance, then the most recent
/// candidate per vehicle.
pub async fn nearby<'c, E>(
    executor: E,
    search: ProximitySearch,
) -> Result<Vec<WithDistance<StoredReport>>>
where
    E: Executor<'c, Database = Postgres>,
{
    let center = search.center;
    let bounds =
        BoundingBox::around(center.latitude, center.longitude, search.radius_km);

    sqlx::query_as(
        "
        WITH distance_calc AS (
            SELECT
                id, vehicle_id, latitude, longitude, speed, heading, accuracy,
                altitude, captured_at, source, route_id, is_moving,
                (2 * $1 * ASIN(LEAST(1.0, SQRT(
                    POWER(SIN(RADIANS(latitude - $2) / 2), 2) +
                    COS(RADIANS($2)) * COS(RADIANS(latitude)) *
                    POWER(SIN(RADIANS(longitude - $3) / 2), 2)
                )))) AS distance_km
            FROM
                position_reports
            WHERE
                latitude BETWEEN $4 AND $5
                AND longitude BETWEEN $6 AND $7
                AND captured_at >= $8
        ),
        latest AS (
            SELECT DISTINCT ON (vehicle_id)
                *
            FROM
                distance_calc
            WHERE
                distance_km <= $9
            ORDER BY
                vehicle_id, captured_at DESC, id DESC
        )
        SELECT
            *
        FROM
            latest
        ORDER BY
            distance_km ASC
        LIMIT $10;
        ",
    )
    .bind(EARTH_RADIUS_KM)
    .bind(center.latitude)
    .bind(center.longitude)
    .bind(bounds.min_latitude)
    .bind(bounds.max_latitude)
    .bind(bounds.min_longitude)
    .bind(bounds.max_longitude)
    .bind(search.since)
    .bind(search.radius_km)
    .bind(search.limit.map(|limit| i64::try_from(limit).unwrap_or(i64::MAX)))
    .fetch_all(executor)
    .await
    .map_err(convert_error)?
    .let_owned(|rows: Vec<NearbyRow>| {
        Ok(rows.into_iter().map(NearbyRow::to_model).collect())
    })
}

pub async fn latest_for_all_vehicles<'c, E>(
    executor: E,
    since: DateTime<Utc>,
) -> Result<Vec<StoredReport>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        SELECT DISTINCT ON (vehicle_id)
            id, vehicle_id, latitude, longitude, speed, heading, accuracy,
            altitude, captured_at, source, route_id, is_moving
        FROM
            position_reports
        WHERE
            captured_at >= $1
        ORDER BY
            vehicle_id, captured_at DESC, id DESC;
        ",
    )
    .bind(since)
    .fetch_all(executor)
    .await
    .map_err(convert_error)?
    .let_owned(|rows: Vec<PositionRow>| Ok(with_ids(rows)))
}

pub async fn evict_older_than<'c, E>(executor: E, cutoff: DateTime<Utc>) -> Result<u64>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query("DELETE FROM position_reports WHERE captured_at < $1;")
        .bind(cutoff)
        .execute(executor)
        .await
        .map_err(convert_error)?
        .let_owned(|result| Ok(result.rows_affected()))
}

pub async fn delete_vehicle<'c, E>(executor: E, vehicle: &Id<Vehicle>) -> Result<u64>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query("DELETE FROM position_reports WHERE vehicle_id = $1;")
        .bind(vehicle.raw())
        .execute(executor)
        .await
        .map_err(convert_error)?
        .let_owned(|result| Ok(result.rows_affected()))
}
