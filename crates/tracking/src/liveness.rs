//! Classification of reports by age and heading. Nothing here fails or
//! performs I/O.

use chrono::{DateTime, Duration, Utc};
use model::position::Compass;

/// Whether a report captured at `timestamp` is older than `max_age` at `now`.
pub fn is_stale_at(
    timestamp: &DateTime<Utc>,
    max_age: Duration,
    now: DateTime<Utc>,
) -> bool {
    now.signed_duration_since(*timestamp) > max_age
}

pub fn is_stale(timestamp: &DateTime<Utc>, max_age: Duration) -> bool {
    is_stale_at(timestamp, max_age, Utc::now())
}

/// Age of a timestamp in words, e.g. "42 seconds ago". Each unit is used
/// until the next one is reached and counts are rounded down. Timestamps in
/// the future read as "0 seconds ago".
pub fn human_age_at(timestamp: &DateTime<Utc>, now: DateTime<Utc>) -> String {
    let seconds = now.signed_duration_since(*timestamp).num_seconds().max(0);
    if seconds < 60 {
        format!("{seconds} seconds ago")
    } else if seconds < 60 * 60 {
        format!("{} minutes ago", seconds / 60)
    } else if seconds < 24 * 60 * 60 {
        format!("{} hours ago", seconds / (60 * 60))
    } else {
        format!("{} days ago", seconds / (24 * 60 * 60))
    }
}

pub fn human_age(timestamp: &DateTime<Utc>) -> String {
    human_age_at(timestamp, Utc::now())
}

pub fn heading_to_compass(heading: f64) -> Compass {
    Compass::from_heading(heading)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn staleness_is_monotonic_in_age() {
        let max_age = Duration::minutes(10);
        let mut was_stale = false;
        for age in 0..=30 {
            let timestamp = now() - Duration::minutes(age);
            let stale = is_stale_at(&timestamp, max_age, now());
            assert!(stale || !was_stale, "turned fresh again at {age} minutes");
            was_stale = stale;
        }
        assert!(was_stale);
    }

    #[test]
    fn staleness_boundary_is_exclusive() {
        let max_age = Duration::minutes(10);
        assert!(!is_stale_at(&(now() - max_age), max_age, now()));
        assert!(is_stale_at(
            &(now() - max_age - Duration::seconds(1)),
            max_age,
            now()
        ));
    }

    #[test]
    fn ages_in_words() {
        let ago = |duration: Duration| human_age_at(&(now() - duration), now());
        assert_eq!(ago(Duration::seconds(42)), "42 seconds ago");
        assert_eq!(ago(Duration::seconds(119)), "1 minutes ago");
        assert_eq!(ago(Duration::minutes(59)), "59 minutes ago");
        assert_eq!(ago(Duration::minutes(150)), "2 hours ago");
        assert_eq!(ago(Duration::hours(49)), "2 days ago");
        assert_eq!(ago(Duration::seconds(-30)), "0 seconds ago");
    }

    #[test]
    fn compass_points() {
        assert_eq!(heading_to_compass(0.0), Compass::N);
        assert_eq!(heading_to_compass(22.4), Compass::N);
        assert_eq!(heading_to_compass(22.5), Compass::NE);
        assert_eq!(heading_to_compass(90.0), Compass::E);
        assert_eq!(heading_to_compass(200.0), Compass::S);
        assert_eq!(heading_to_compass(337.5), Compass::N);
        assert_eq!(heading_to_compass(359.9), Compass::N);
        assert_eq!(heading_to_compass(-90.0), Compass::W);
        assert_eq!(heading_to_compass(f64::NAN), Compass::N);
    }
}
