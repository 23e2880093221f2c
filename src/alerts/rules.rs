use super::{AlertCandidate, AlertConfig, AlertKind};
use crate::geodesy::{angular_difference, planar_offset_km, vector_bearing_deg};
use crate::types::{GeoPoint, Track};

const KNOTS_TO_KMH: f64 = 1.852;

/// Where a track's current heading line passes relative to the reference point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ApproachGeometry {
    pub distance_km: f64,
    /// Distance still to fly along the heading line to the closest point; negative when moving away.
    pub along_track_km: f64,
    /// Distance from the reference point at the closest point of the heading line.
    pub closest_approach_km: f64,
    /// Angle between the heading and the direct course to the reference point.
    pub heading_error_deg: f64,
}

#[must_use]
pub fn approach_geometry(track: &Track, reference: GeoPoint) -> ApproachGeometry {
    let (east, north) = planar_offset_km(reference, track.position);
    let distance_km = east.hypot(north);
    let heading = track.heading_deg.to_radians();
    let (dir_east, dir_north) = (heading.sin(), heading.cos());

    let along_track_km = -(east * dir_east + north * dir_north);
    let closest_approach_km = if along_track_km > 0.0 {
        (east + along_track_km * dir_east).hypot(north + along_track_km * dir_north)
    } else {
        distance_km
    };
    let heading_error_deg = if distance_km > 0.0 {
        angular_difference(track.heading_deg, vector_bearing_deg(-east, -north))
    } else {
        0.0
    };

    ApproachGeometry {
        distance_km,
        along_track_km,
        closest_approach_km,
        heading_error_deg,
    }
}

pub fn emergency_squawk(track: &Track, config: &AlertConfig) -> Option<AlertCandidate> {
    let condition = config.emergency_squawks.get(&track.squawk)?;
    let kind = AlertKind::EmergencySquawk;
    Some(AlertCandidate {
        key: kind.key_for(&track.key),
        kind,
        message: format!(
            "Squawk {} ({condition}): {}",
            track.squawk,
            track.display_name()
        ),
        track_keys: vec![track.key.clone()],
        eta_minutes: None,
    })
}

/// Needs both a steep reported rate and an actual altitude drop between samples;
/// the rate field alone is too noisy.
pub fn rapid_descent(track: &Track, config: &AlertConfig) -> Option<AlertCandidate> {
    if track.on_ground || !track.altitude_descent_confirmed {
        return None;
    }
    let rate = track
        .vertical_rate_fpm
        .filter(|rate| *rate < config.rapid_descent_rate_fpm)?;
    let kind = AlertKind::RapidDescent;
    Some(AlertCandidate {
        key: kind.key_for(&track.key),
        kind,
        message: format!(
            "Rapid descent: {} {rate:.0} fpm through {} ft",
            track.display_name(),
            track.altitude_ft
        ),
        track_keys: vec![track.key.clone()],
        eta_minutes: None,
    })
}

#[allow(clippy::cast_possible_truncation)]
pub fn base_approach(
    track: &Track,
    reference: GeoPoint,
    alert_radius_km: f64,
    config: &AlertConfig,
) -> Option<AlertCandidate> {
    if track.on_ground
        || !track.has_ground_speed()
        || track.ground_speed_kt < config.base_approach_min_speed_kt
    {
        return None;
    }
    let geometry = approach_geometry(track, reference);
    if !geometry.distance_km.is_finite()
        || geometry.heading_error_deg > config.base_approach_heading_tolerance_deg
    {
        return None;
    }
    if geometry.distance_km > alert_radius_km && geometry.closest_approach_km > alert_radius_km {
        return None;
    }

    let eta_minutes = (track.ground_speed_kt > 0.0 && geometry.along_track_km > 0.0).then(|| {
        (geometry.along_track_km / (track.ground_speed_kt * KNOTS_TO_KMH) * 60.0).round() as i64
    });
    let kind = AlertKind::BaseApproach;
    let message = match eta_minutes {
        Some(minutes) => format!(
            "Inbound: {} {:.1} km, closest {:.1} km in {minutes}m",
            track.display_name(),
            geometry.distance_km,
            geometry.closest_approach_km
        ),
        None => format!(
            "Inbound: {} {:.1} km, closest {:.1} km",
            track.display_name(),
            geometry.distance_km,
            geometry.closest_approach_km
        ),
    };
    Some(AlertCandidate {
        key: kind.key_for(&track.key),
        kind,
        message,
        track_keys: vec![track.key.clone()],
        eta_minutes,
    })
}

#[cfg(test)]
mod tests {
    use super::{approach_geometry, base_approach, emergency_squawk, rapid_descent};
    use crate::alerts::AlertConfig;
    use crate::geodesy;
    use crate::types::{GeoPoint, Track};

    const REFERENCE: GeoPoint = GeoPoint::new(54.0, -1.0);

    fn track_at(lat: f64, lon: f64, heading_deg: f64) -> Track {
        let position = GeoPoint::new(lat, lon);
        Track {
            key: String::from("ABC123"),
            hex: String::from("ABC123"),
            flight: String::new(),
            position,
            distance_km: geodesy::distance_km(REFERENCE, position),
            bearing_deg: geodesy::bearing_deg(REFERENCE, position),
            heading_deg,
            altitude_ft: 5000,
            ground_speed_kt: 120.0,
            vertical_rate_fpm: None,
            squawk: String::new(),
            on_ground: false,
            last_message_age_sec: Some(1.0),
            signal_rssi: None,
            category: None,
            altitude_descent_confirmed: false,
        }
    }

    #[test]
    fn when_squawk_is_not_an_emergency_code_then_no_alert() {
        let mut track = track_at(54.1, -1.0, 180.0);
        track.squawk = String::from("1200");
        assert!(emergency_squawk(&track, &AlertConfig::default()).is_none());
        track.squawk = String::from("7500");
        let candidate = emergency_squawk(&track, &AlertConfig::default()).expect("emergency");
        assert_eq!(candidate.key, "squawk-ABC123");
        assert!(candidate.message.contains("unlawful interference"));
    }

    #[test]
    fn when_descent_rate_steep_but_uncorroborated_then_no_alert() {
        let mut track = track_at(54.1, -1.0, 180.0);
        track.vertical_rate_fpm = Some(-3000.0);
        assert!(rapid_descent(&track, &AlertConfig::default()).is_none());
        track.altitude_descent_confirmed = true;
        assert!(rapid_descent(&track, &AlertConfig::default()).is_some());
    }

    #[test]
    fn when_descent_rate_shallow_or_on_ground_then_no_alert() {
        let mut track = track_at(54.1, -1.0, 180.0);
        track.altitude_descent_confirmed = true;
        track.vertical_rate_fpm = Some(-1500.0);
        assert!(rapid_descent(&track, &AlertConfig::default()).is_none());
        track.vertical_rate_fpm = Some(-3000.0);
        track.on_ground = true;
        assert!(rapid_descent(&track, &AlertConfig::default()).is_none());
    }

    #[test]
    fn when_heading_straight_at_reference_then_closest_approach_is_zero() {
        let geometry = approach_geometry(&track_at(54.1, -1.0, 180.0), REFERENCE);
        assert!(geometry.closest_approach_km < 1e-9);
        assert!((geometry.along_track_km - geometry.distance_km).abs() < 1e-9);
        assert!(geometry.heading_error_deg < 1e-9);
    }

    #[test]
    fn when_outside_radius_but_passing_close_then_base_approach_alerts() {
        // 11 km north, tracking 190: passes roughly 1.9 km west of the reference
        let track = track_at(54.1, -1.0, 190.0);
        let candidate = base_approach(&track, REFERENCE, 5.0, &AlertConfig::default())
            .expect("closest approach inside radius");
        assert_eq!(candidate.key, "base-approach-ABC123");
        assert_eq!(candidate.eta_minutes, Some(3));
    }

    #[test]
    fn when_heading_away_or_too_slow_then_no_base_approach() {
        let away = track_at(54.02, -1.0, 0.0);
        assert!(base_approach(&away, REFERENCE, 5.0, &AlertConfig::default()).is_none());

        let mut slow = track_at(54.02, -1.0, 180.0);
        slow.ground_speed_kt = 20.0;
        assert!(base_approach(&slow, REFERENCE, 5.0, &AlertConfig::default()).is_none());
    }

    #[test]
    fn when_heading_misaligned_beyond_tolerance_then_no_base_approach() {
        // inside the radius but crossing at 50 degrees off the direct course
        let track = track_at(54.02, -1.0, 230.0);
        assert!(base_approach(&track, REFERENCE, 5.0, &AlertConfig::default()).is_none());
    }
}
