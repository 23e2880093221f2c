use super::{AlertCandidate, AlertConfig, AlertKind};
use crate::geodesy::{angular_difference, normalize_degrees, planar_offset_km, vector_bearing_deg};
use crate::types::Track;

/// Below this separation the bearing between two aircraft is meaningless.
const MIN_RESOLVABLE_SEPARATION_KM: f64 = 0.01;

fn is_eligible(track: &Track, config: &AlertConfig) -> bool {
    !track.on_ground
        && track.has_altitude()
        && track.has_ground_speed()
        && track.ground_speed_kt >= config.collision_min_speed_kt
        && track
            .last_message_age_sec
            .map_or(true, |age| age <= config.collision_max_message_age_sec)
}

/// Scans every unordered pair of eligible tracks for close, mutually closing geometry.
#[must_use]
pub fn collision_courses(tracks: &[Track], config: &AlertConfig) -> Vec<AlertCandidate> {
    let eligible: Vec<&Track> = tracks
        .iter()
        .filter(|track| is_eligible(track, config))
        .collect();

    let mut candidates = Vec::new();
    for (index, first) in eligible.iter().enumerate() {
        for second in &eligible[index + 1..] {
            if let Some(candidate) = converging_pair(first, second, config) {
                candidates.push(candidate);
            }
        }
    }
    candidates
}

fn converging_pair(a: &Track, b: &Track, config: &AlertConfig) -> Option<AlertCandidate> {
    if a.key == b.key {
        return None;
    }
    let (east, north) = planar_offset_km(a.position, b.position);
    let separation_km = east.hypot(north);
    if !separation_km.is_finite()
        || separation_km < MIN_RESOLVABLE_SEPARATION_KM
        || separation_km > config.collision_distance_km
    {
        return None;
    }
    let altitude_delta_ft = (a.altitude_ft - b.altitude_ft).abs();
    if altitude_delta_ft > config.collision_altitude_ft {
        return None;
    }

    let bearing_a_to_b = vector_bearing_deg(east, north);
    let bearing_b_to_a = normalize_degrees(bearing_a_to_b + 180.0);
    let tolerance = config.collision_heading_tolerance_deg;
    if angular_difference(a.heading_deg, bearing_a_to_b) > tolerance
        || angular_difference(b.heading_deg, bearing_b_to_a) > tolerance
    {
        return None;
    }

    let kind = AlertKind::CollisionCourse;
    let (first, second) = if a.key <= b.key { (a, b) } else { (b, a) };
    Some(AlertCandidate {
        key: kind.pair_key(&a.key, &b.key),
        kind,
        message: format!(
            "Collision course: {} and {} {separation_km:.1} km, {altitude_delta_ft} ft apart",
            first.display_name(),
            second.display_name()
        ),
        track_keys: vec![first.key.clone(), second.key.clone()],
        eta_minutes: None,
    })
}
