use crate::types::GeoPoint;

pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance in kilometres (haversine).
#[must_use]
pub fn distance_km(a: GeoPoint, b: GeoPoint) -> f64 {
    let delta_lat = (b.lat - a.lat).to_radians();
    let delta_lon = (b.lon - a.lon).to_radians();
    let h = (delta_lat / 2.0).sin().powi(2)
        + a.lat.to_radians().cos() * b.lat.to_radians().cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).max(0.0).sqrt());
    EARTH_RADIUS_KM * c
}

/// Initial bearing from `a` to `b`, in `[0, 360)`.
///
/// Identical points give 0.
#[must_use]
pub fn bearing_deg(a: GeoPoint, b: GeoPoint) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let delta_lon = (b.lon - a.lon).to_radians();

    let y = delta_lon.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * delta_lon.cos();
    normalize_degrees(y.atan2(x).to_degrees())
}

/// Local east/north offset of `point` from `origin` in kilometres.
///
/// Equirectangular approximation around the mean latitude, good enough for
/// the few hundred kilometres the scope covers.
#[must_use]
pub fn planar_offset_km(origin: GeoPoint, point: GeoPoint) -> (f64, f64) {
    let mean_lat = ((origin.lat + point.lat) / 2.0).to_radians();
    let east = EARTH_RADIUS_KM * (point.lon - origin.lon).to_radians() * mean_lat.cos();
    let north = EARTH_RADIUS_KM * (point.lat - origin.lat).to_radians();
    (east, north)
}

/// Wraps any finite angle into `[0, 360)`.
#[must_use]
pub fn normalize_degrees(angle: f64) -> f64 {
    let wrapped = angle.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative inputs
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

/// Clockwise angular distance travelled going from `from` to `to`, in `[0, 360)`.
#[must_use]
pub fn forward_angle_delta(from: f64, to: f64) -> f64 {
    normalize_degrees(to - from)
}

/// Smallest absolute difference between two bearings, in `[0, 180]`.
#[must_use]
pub fn angular_difference(a: f64, b: f64) -> f64 {
    let diff = forward_angle_delta(a, b);
    if diff > 180.0 {
        360.0 - diff
    } else {
        diff
    }
}

/// Compass direction of an east/north vector, in `[0, 360)`.
#[must_use]
pub fn vector_bearing_deg(east: f64, north: f64) -> f64 {
    normalize_degrees(east.atan2(north).to_degrees())
}
