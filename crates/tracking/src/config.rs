use std::{env, str::FromStr};

use chrono::Duration;
use model::position::{ReportLimits, DEFAULT_MOVING_THRESHOLD_KMH};
use utility::geo::BoundingBox;

/// Tunables of the tracking engine.
#[derive(Debug, Clone)]
pub struct TrackingConfig {
    pub moving_threshold_kmh: f64,
    pub limits: ReportLimits,
    /// Reports outside this box are rejected at ingest.
    pub operating_region: BoundingBox,
    pub retention: Duration,
    pub eviction_interval: std::time::Duration,
    /// Upper bound for a single engine operation.
    pub deadline: std::time::Duration,
    pub nearby_window: Duration,
    pub nearby_limit: usize,
    pub live_window: Duration,
    pub live_stale_after: Duration,
    pub latest_stale_after: Duration,
    pub trail_window: Duration,
    pub trail_limit: usize,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            moving_threshold_kmh: DEFAULT_MOVING_THRESHOLD_KMH,
            limits: ReportLimits::default(),
            // Sri Lanka
            operating_region: BoundingBox::new(5.9, 79.5, 9.9, 82.0),
            retention: Duration::hours(24),
            eviction_interval: std::time::Duration::from_secs(5 * 60),
            deadline: std::time::Duration::from_secs(10),
            nearby_window: Duration::minutes(10),
            nearby_limit: 50,
            live_window: Duration::minutes(30),
            live_stale_after: Duration::minutes(10),
            latest_stale_after: Duration::minutes(30),
            trail_window: Duration::hours(24),
            trail_limit: 1000,
        }
    }
}

fn var<T: FromStr>(name: &str) -> Option<T> {
    let value = env::var(name).ok()?;
    match value.parse() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            log::warn!("ignoring {name}: cannot parse '{value}'");
            None
        }
    }
}

fn minutes(name: &str) -> Option<Duration> {
    var(name).and_then(|minutes| duration(name, Duration::try_minutes(minutes)))
}

/// Durations have to be representable and must not be negative.
fn duration(name: &str, value: Option<Duration>) -> Option<Duration> {
    match value {
        Some(value) if value >= Duration::zero() => Some(value),
        _ => {
            log::warn!("ignoring {name}: duration out of range");
            None
        }
    }
}

/// Timer periods must be greater than zero.
fn positive(name: &str, value: std::time::Duration) -> Option<std::time::Duration> {
    if value.is_zero() {
        log::warn!("ignoring {name}: must be greater than zero");
        None
    } else {
        Some(value)
    }
}

impl TrackingConfig {
    /// Reads overrides from `TRACKING_*` environment variables. Unset or
    /// unparsable variables keep their default.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(threshold) = var("TRACKING_MOVING_THRESHOLD_KMH") {
            config.moving_threshold_kmh = threshold;
        }
        if let Some(max_speed) = var("TRACKING_MAX_SPEED_KMH") {
            config.limits.max_speed_kmh = max_speed;
        }
        if let Some(region) =
            var::<String>("TRACKING_REGION").and_then(|region| parse_region(&region))
        {
            config.operating_region = region;
        }
        if let Some(retention) = var("TRACKING_RETENTION_HOURS")
            .and_then(|hours| duration("TRACKING_RETENTION_HOURS", Duration::try_hours(hours)))
        {
            config.retention = retention;
        }
        if let Some(interval) = var("TRACKING_EVICTION_INTERVAL_SECONDS").and_then(|seconds| {
            positive("TRACKING_EVICTION_INTERVAL_SECONDS", std::time::Duration::from_secs(seconds))
        }) {
            config.eviction_interval = interval;
        }
        if let Some(deadline) = var("TRACKING_DEADLINE_MS").and_then(|millis| {
            positive("TRACKING_DEADLINE_MS", std::time::Duration::from_millis(millis))
        }) {
            config.deadline = deadline;
        }
        if let Some(window) = minutes("TRACKING_NEARBY_WINDOW_MINUTES") {
            config.nearby_window = window;
        }
        if let Some(limit) = var("TRACKING_NEARBY_LIMIT") {
            config.nearby_limit = limit;
        }
        if let Some(window) = minutes("TRACKING_LIVE_WINDOW_MINUTES") {
            config.live_window = window;
        }
        if let Some(threshold) = minutes("TRACKING_LIVE_STALE_MINUTES") {
            config.live_stale_after = threshold;
        }
        if let Some(threshold) = minutes("TRACKING_LATEST_STALE_MINUTES") {
            config.latest_stale_after = threshold;
        }
        if let Some(limit) = var("TRACKING_TRAIL_LIMIT") {
            config.trail_limit = limit;
        }
        config
    }
}

/// Parses `min_lat,min_lon,max_lat,max_lon`.
fn parse_region(value: &str) -> Option<BoundingBox> {
    let bounds = value
        .split(',')
        .map(|part| part.trim().parse::<f64>().ok())
        .collect::<Option<Vec<_>>>()?;
    match bounds[..] {
        [min_lat, min_lon, max_lat, max_lon]
            if min_lat <= max_lat && min_lon <= max_lon =>
        {
            Some(BoundingBox::new(min_lat, min_lon, max_lat, max_lon))
        }
        _ => {
            log::warn!(
                "ignoring TRACKING_REGION: expected min_lat,min_lon,max_lat,max_lon"
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_region_covers_colombo() {
        let config = TrackingConfig::default();
        assert!(config.operating_region.contains(6.9271, 79.8612));
        assert!(!config.operating_region.contains(51.5, -0.12));
    }

    #[test]
    fn parses_regions() {
        assert_eq!(
            parse_region("1, 2, 3, 4"),
            Some(BoundingBox::new(1.0, 2.0, 3.0, 4.0))
        );
        assert_eq!(parse_region("3,2,1,4"), None);
        assert_eq!(parse_region("1,2,3"), None);
        assert_eq!(parse_region("a,b,c,d"), None);
    }

    #[test]
    fn rejects_zero_periods_and_unrepresentable_durations() {
        let name = "TRACKING_EVICTION_INTERVAL_SECONDS";
        assert_eq!(positive(name, std::time::Duration::ZERO), None);
        assert_eq!(
            positive(name, std::time::Duration::from_secs(30)),
            Some(std::time::Duration::from_secs(30))
        );

        let name = "TRACKING_RETENTION_HOURS";
        assert_eq!(duration(name, Duration::try_hours(i64::MAX)), None);
        assert_eq!(duration(name, Duration::try_hours(-1)), None);
        assert_eq!(
            duration(name, Duration::try_hours(48)),
            Some(Duration::hours(48))
        );
    }
}
