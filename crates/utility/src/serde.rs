pub mod date_time {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{de::Error, Deserialize as _, Deserializer};

    /// Parses either an RFC 3339 timestamp or a naive `%Y-%m-%dT%H:%M:%S`
    /// timestamp, which is taken to be UTC.
    pub fn parse_utc(s: &str) -> Option<DateTime<Utc>> {
        if let Ok(date_time) = DateTime::parse_from_rfc3339(s) {
            return Some(date_time.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
            .ok()
            .map(|naive| naive.and_utc())
    }

    pub fn deserialize_utc_option<'de, D>(
        deserializer: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = Option::<String>::deserialize(deserializer)?;
        match s {
            Some(s) => parse_utc(&s)
                .map(Some)
                .ok_or_else(|| Error::custom(format!("invalid timestamp '{s}'"))),
            None => Ok(None),
        }
    }
}

/// Durations given as a whole number of minutes, e.g. a recency window in a
/// query string.
pub mod minutes {
    use chrono::Duration;
    use serde::{de::Error, Deserialize as _, Deserializer};

    pub fn deserialize_option<'de, D>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<i64>::deserialize(deserializer)? {
            Some(minutes) if minutes < 0 => Err(Error::custom(
                "a duration in minutes must not be negative",
            )),
            Some(minutes) => Ok(Some(Duration::minutes(minutes))),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::date_time::parse_utc;

    #[test]
    fn parses_rfc3339_and_naive_timestamps() {
        let expected = Utc.with_ymd_and_hms(2024, 5, 1, 8, 30, 0).unwrap();
        assert_eq!(parse_utc("2024-05-01T08:30:00Z"), Some(expected));
        assert_eq!(parse_utc("2024-05-01T14:00:00+05:30"), Some(expected));
        assert_eq!(parse_utc("2024-05-01T08:30:00"), Some(expected));
        assert_eq!(parse_utc("yesterday"), None);
    }
}
