use itertools::Itertools;
use model::{position::PositionReport, trail::TrailStats};
use utility::geo::round_to;

/// Aggregates an ordered run of reports of one vehicle.
///
/// Distance sums the great-circle legs between consecutive reports. Speeds
/// are taken from the arrival end of each leg, so the first report only
/// marks the starting point. The average considers reports flagged as
/// moving, the maximum considers all of them.
pub fn trail_stats<'a, I>(reports: I) -> TrailStats
where
    I: IntoIterator<Item = &'a PositionReport>,
{
    let reports = reports.into_iter().collect::<Vec<_>>();
    let (Some(first), Some(last)) = (reports.first(), reports.last()) else {
        return TrailStats::default();
    };
    if reports.len() < 2 {
        return TrailStats::default();
    }

    let total_distance_km: f64 = reports
        .iter()
        .tuple_windows()
        .map(|(from, to)| from.distance_km_to(&to.coordinates()))
        .sum();

    let moving_speeds = reports
        .iter()
        .skip(1)
        .filter(|report| report.is_moving())
        .map(|report| report.speed)
        .collect::<Vec<_>>();
    let average_speed_kmh = if moving_speeds.is_empty() {
        0.0
    } else {
        moving_speeds.iter().sum::<f64>() / moving_speeds.len() as f64
    };
    let max_speed_kmh = reports
        .iter()
        .skip(1)
        .map(|report| report.speed)
        .fold(0.0, f64::max);

    let duration_ms = last
        .timestamp
        .signed_duration_since(first.timestamp)
        .num_milliseconds();

    TrailStats {
        total_points: reports.len(),
        total_distance_km: round_to(total_distance_km, 2),
        average_speed_kmh: round_to(average_speed_kmh, 1),
        max_speed_kmh: round_to(max_speed_kmh, 1),
        duration_minutes: (duration_ms as f64 / 60_000.0).round() as i64,
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use model::position::{PositionSource, RawPositionReport};
    use utility::{geo::EARTH_RADIUS_KM, id::Id};

    use super::*;

    fn report(latitude: f64, speed: f64, timestamp: DateTime<Utc>) -> PositionReport {
        PositionReport::new(
            RawPositionReport {
                vehicle_id: Id::from("bus-1"),
                latitude,
                longitude: 79.8612,
                speed,
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

    #[test]
    fn too_few_points_give_zero_stats() {
        let start = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();
        assert_eq!(trail_stats(&Vec::new()), TrailStats::default());
        assert_eq!(
            trail_stats(&[report(6.9, 40.0, start)]),
            TrailStats::default()
        );
    }

    #[test]
    fn three_points_ten_km_apart() {
        let start = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();
        let step = (10.0 / EARTH_RADIUS_KM).to_degrees();
        let reports = [
            report(6.9, 20.0, start),
            report(6.9 + step, 20.0, start + Duration::minutes(15)),
            report(6.9 + 2.0 * step, 20.0, start + Duration::minutes(30)),
        ];
        let stats = trail_stats(&reports);
        assert_eq!(stats.total_points, 3);
        assert_relative_eq!(stats.total_distance_km, 20.0, epsilon = 0.01);
        assert_eq!(stats.average_speed_kmh, 20.0);
        assert_eq!(stats.max_speed_kmh, 20.0);
        assert_eq!(stats.duration_minutes, 30);
    }

    #[test]
    fn average_ignores_stationary_points() {
        let start = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();
        let reports = [
            report(6.9, 0.0, start),
            report(6.91, 30.0, start + Duration::minutes(1)),
            report(6.92, 45.0, start + Duration::minutes(2)),
            report(6.92, 2.0, start + Duration::seconds(150)),
        ];
        let stats = trail_stats(&reports);
        assert_eq!(stats.average_speed_kmh, 37.5);
        assert_eq!(stats.max_speed_kmh, 45.0);
        assert_eq!(stats.duration_minutes, 3);
    }

    #[test]
    fn first_report_only_marks_the_start() {
        let start = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();
        let reports = [
            report(6.9, 60.0, start),
            report(6.91, 20.0, start + Duration::minutes(1)),
            report(6.92, 20.0, start + Duration::minutes(2)),
        ];
        let stats = trail_stats(&reports);
        assert_eq!(stats.average_speed_kmh, 20.0);
        assert_eq!(stats.max_speed_kmh, 20.0);
        assert_eq!(stats.duration_minutes, 2);
    }
}
