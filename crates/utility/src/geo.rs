use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub const EARTH_RADIUS_KM: f64 = 6371.0;

pub const MIN_LATITUDE: f64 = -90.0;
pub const MAX_LATITUDE: f64 = 90.0;
pub const MIN_LONGITUDE: f64 = -180.0;
pub const MAX_LONGITUDE: f64 = 180.0;

fn to_radians(degrees: f64) -> f64 {
    degrees * std::f64::consts::PI / 180.0
}

fn to_degrees(radians: f64) -> f64 {
    radians * 180.0 / std::f64::consts::PI
}

pub fn is_valid_latitude(latitude: f64) -> bool {
    (MIN_LATITUDE..=MAX_LATITUDE).contains(&latitude)
}

pub fn is_valid_longitude(longitude: f64) -> bool {
    (MIN_LONGITUDE..=MAX_LONGITUDE).contains(&longitude)
}

/// Rounds half away from zero to the given number of decimal places.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// An axis aligned latitude/longitude rectangle. Bounds are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BoundingBox {
    pub min_latitude: f64,
    pub min_longitude: f64,
    pub max_latitude: f64,
    pub max_longitude: f64,
}

impl BoundingBox {
    pub fn new(
        min_latitude: f64,
        min_longitude: f64,
        max_latitude: f64,
        max_longitude: f64,
    ) -> Self {
        Self {
            min_latitude,
            min_longitude,
            max_latitude,
            max_longitude,
        }
    }

    /// The smallest box containing every point within `radius_km` of the center.
    ///
    /// Boxes reaching a pole or crossing the antimeridian span all longitudes,
    /// so callers may see more candidates than needed but never miss one.
    pub fn around(latitude: f64, longitude: f64, radius_km: f64) -> Self {
        let angular_radius = radius_km / EARTH_RADIUS_KM;
        let lat_rad = to_radians(latitude);

        let min_lat = to_degrees(lat_rad - angular_radius);
        let max_lat = to_degrees(lat_rad + angular_radius);

        if min_lat <= MIN_LATITUDE || max_lat >= MAX_LATITUDE {
            return Self::new(
                min_lat.max(MIN_LATITUDE),
                MIN_LONGITUDE,
                max_lat.min(MAX_LATITUDE),
                MAX_LONGITUDE,
            );
        }

        // widest longitude extent of a circle on the sphere
        let sin_ratio = angular_radius.sin() / lat_rad.cos();
        if sin_ratio >= 1.0 {
            return Self::new(min_lat, MIN_LONGITUDE, max_lat, MAX_LONGITUDE);
        }
        let lon_delta = to_degrees(sin_ratio.asin());
        let min_lon = longitude - lon_delta;
        let max_lon = longitude + lon_delta;

        if min_lon < MIN_LONGITUDE || max_lon > MAX_LONGITUDE {
            Self::new(min_lat, MIN_LONGITUDE, max_lat, MAX_LONGITUDE)
        } else {
            Self::new(min_lat, min_lon, max_lat, max_lon)
        }
    }

    pub fn contains(&self, latitude: f64, longitude: f64) -> bool {
        latitude >= self.min_latitude
            && latitude <= self.max_latitude
            && longitude >= self.min_longitude
            && longitude <= self.max_longitude
    }
}

pub fn haversine_distance(
    latitude_1: f64,
    longitude_1: f64,
    latitude_2: f64,
    longitude_2: f64,
) -> f64 {
    let lat1_rad = to_radians(latitude_1);
    let lat2_rad = to_radians(latitude_2);

    let dlat = to_radians(latitude_2 - latitude_1);
    let dlon = to_radians(longitude_2 - longitude_1);

    let a = (dlat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}
