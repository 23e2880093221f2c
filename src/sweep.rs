use crate::geodesy::{forward_angle_delta, normalize_degrees};
use crate::types::Track;

const MIN_TOLERANCE_DEG: f64 = 0.75;
const MAX_TOLERANCE_DEG: f64 = 2.5;
const TOLERANCE_FACTOR: f64 = 0.6;
/// A single frame never advances the beam a whole revolution.
const MAX_ADVANCE_DEG: f64 = 359.0;
pub const DEFAULT_SPEED_DEG_PER_SEC: f64 = 90.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SweepDirection {
    #[default]
    Clockwise,
    CounterClockwise,
}

impl SweepDirection {
    /// Maps a compass bearing into sweep space and back (the mapping is its own inverse).
    #[must_use]
    pub fn to_sweep_space(self, bearing_deg: f64) -> f64 {
        match self {
            SweepDirection::Clockwise => normalize_degrees(bearing_deg),
            SweepDirection::CounterClockwise => normalize_degrees(360.0 - bearing_deg),
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SweepDirection::Clockwise => "clockwise",
            SweepDirection::CounterClockwise => "counter_clockwise",
        }
    }
}

impl std::str::FromStr for SweepDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "clockwise" | "cw" => Ok(SweepDirection::Clockwise),
            "counter_clockwise" | "ccw" => Ok(SweepDirection::CounterClockwise),
            other => Err(format!("Unknown sweep direction: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepPhase {
    Advancing,
    /// The last advance carried the beam past north and started a new sweep id.
    Wrapped,
}

/// Outcome of one call to [`SweepState::advance`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SweepStep {
    pub previous_angle: f64,
    pub angle: f64,
    pub swept_delta: f64,
    pub tolerance: f64,
    pub phase: SweepPhase,
    pub sweep_id: u64,
}

impl SweepStep {
    /// Sweep id the beam had when this step started.
    #[must_use]
    pub fn starting_sweep_id(&self) -> u64 {
        match self.phase {
            SweepPhase::Advancing => self.sweep_id,
            SweepPhase::Wrapped => self.sweep_id.wrapping_sub(1),
        }
    }

    /// Sweep id of the revolution in which the beam reaches `target` (sweep space),
    /// or `None` when the beam has not reached it during this step.
    #[must_use]
    pub fn crossing_sweep_id(&self, target: f64) -> Option<u64> {
        let distance = forward_angle_delta(self.previous_angle, target);
        if distance > self.swept_delta + self.tolerance {
            return None;
        }
        if self.previous_angle + distance >= 360.0 {
            Some(self.starting_sweep_id().wrapping_add(1))
        } else {
            Some(self.starting_sweep_id())
        }
    }
}

/// Pixel geometry of the round scope on the drawing surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScopeGeometry {
    pub center_x: f64,
    pub center_y: f64,
    pub radius: f64,
    pub range_km: f64,
    pub width: f64,
    pub height: f64,
}

impl ScopeGeometry {
    /// Largest scope that fits the surface with a margin for the compass labels.
    #[must_use]
    pub fn fit(width: f64, height: f64, range_km: f64) -> Self {
        let square = width.min(height);
        let label_padding = square * 0.05;
        ScopeGeometry {
            center_x: width / 2.0,
            center_y: height / 2.0,
            radius: (square / 2.0 - label_padding).max(10.0),
            range_km,
            width,
            height,
        }
    }

    /// Screen position of something at `bearing_deg`/`distance_km` from the scope centre.
    /// Distances beyond the range are pinned to the rim.
    #[must_use]
    pub fn project(&self, bearing_deg: f64, distance_km: f64) -> (f64, f64) {
        let fraction = if self.range_km > 0.0 {
            (distance_km / self.range_km).clamp(0.0, 1.0)
        } else {
            0.0
        };
        let screen_radius = fraction * self.radius;
        let angle = bearing_deg.to_radians();
        (
            self.center_x + angle.sin() * screen_radius,
            self.center_y - angle.cos() * screen_radius,
        )
    }

    #[must_use]
    pub fn km_to_pixels(&self, km: f64) -> f64 {
        if self.range_km > 0.0 {
            km / self.range_km * self.radius
        } else {
            0.0
        }
    }
}

/// Extra state the engine attaches to a blip when it is spawned.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BlipAnnotation {
    pub alerting: bool,
    pub minutes_to_base: Option<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Blip {
    pub key: String,
    pub x: f64,
    pub y: f64,
    pub heading_deg: f64,
    pub spawned_at: chrono::DateTime<chrono::Utc>,
    pub altitude_ft: i32,
    pub distance_km: f64,
    pub flight: String,
    pub annotation: BlipAnnotation,
}

/// A track the beam has just crossed.
#[derive(Debug, Clone, PartialEq)]
pub struct PaintEvent {
    pub key: String,
    pub altitude_ft: i32,
    pub sweep_id: u64,
}

#[derive(Debug)]
pub struct SweepState {
    angle_deg: f64,
    sweep_id: u64,
    speed_deg_per_sec: f64,
    rotation_period_sec: f64,
    direction: SweepDirection,
    phase: SweepPhase,
    painted_rotation: std::collections::HashMap<String, u64>,
    blips: Vec<Blip>,
}

impl SweepState {
    /// Starts at north. An unusable speed leaves the beam at
    /// [`DEFAULT_SPEED_DEG_PER_SEC`].
    #[must_use]
    pub fn new(speed_deg_per_sec: f64, direction: SweepDirection) -> Self {
        let mut state = SweepState {
            angle_deg: 0.0,
            sweep_id: 0,
            speed_deg_per_sec: DEFAULT_SPEED_DEG_PER_SEC,
            rotation_period_sec: 360.0 / DEFAULT_SPEED_DEG_PER_SEC,
            direction,
            phase: SweepPhase::Advancing,
            painted_rotation: std::collections::HashMap::new(),
            blips: Vec::new(),
        };
        state.set_speed(speed_deg_per_sec);
        state
    }

    /// Changes the beam speed and recomputes the rotation period.
    /// Non-positive or non-finite speeds are ignored.
    pub fn set_speed(&mut self, speed_deg_per_sec: f64) {
        if speed_deg_per_sec.is_finite() && speed_deg_per_sec > 0.0 {
            self.speed_deg_per_sec = speed_deg_per_sec;
            self.rotation_period_sec = 360.0 / speed_deg_per_sec;
        }
    }

    pub fn set_direction(&mut self, direction: SweepDirection) {
        if self.direction != direction {
            self.direction = direction;
            self.reset();
        }
    }

    /// The single transition function of the sweep: moves the beam by
    /// `speed × dt` and bumps the sweep id when it passes north.
    pub fn advance(&mut self, dt_sec: f64) -> SweepStep {
        let dt_sec = if dt_sec.is_finite() { dt_sec.max(0.0) } else { 0.0 };
        let advance = (self.speed_deg_per_sec * dt_sec).min(MAX_ADVANCE_DEG);
        let previous_angle = self.angle_deg;
        let unwrapped = previous_angle + advance;

        if unwrapped >= 360.0 {
            self.phase = SweepPhase::Wrapped;
            if self.sweep_id == u64::MAX {
                self.sweep_id = 0;
                self.painted_rotation.clear();
            } else {
                self.sweep_id += 1;
            }
        } else {
            self.phase = SweepPhase::Advancing;
        }
        self.angle_deg = normalize_degrees(unwrapped);

        SweepStep {
            previous_angle,
            angle: self.angle_deg,
            swept_delta: forward_angle_delta(previous_angle, self.angle_deg),
            tolerance: (advance * TOLERANCE_FACTOR).clamp(MIN_TOLERANCE_DEG, MAX_TOLERANCE_DEG),
            phase: self.phase,
            sweep_id: self.sweep_id,
        }
    }

    /// Spawns a blip for every track the beam crossed during `step` that has not
    /// been painted in that revolution yet.
    pub fn paint<'a, I, F>(
        &mut self,
        step: &SweepStep,
        tracks: I,
        geometry: &ScopeGeometry,
        now: chrono::DateTime<chrono::Utc>,
        annotate: F,
    ) -> Vec<PaintEvent>
    where
        I: IntoIterator<Item = &'a Track>,
        F: Fn(&Track) -> BlipAnnotation,
    {
        let mut events = Vec::new();
        for track in tracks {
            let target = self.direction.to_sweep_space(track.bearing_deg);
            let Some(crossing_id) = step.crossing_sweep_id(target) else {
                continue;
            };
            if self.painted_rotation.get(&track.key) == Some(&crossing_id) {
                continue;
            }

            let (x, y) = geometry.project(track.bearing_deg, track.distance_km);
            self.blips.push(Blip {
                key: track.key.clone(),
                x,
                y,
                heading_deg: track.heading_deg,
                spawned_at: now,
                altitude_ft: track.altitude_ft,
                distance_km: track.distance_km,
                flight: track.display_name().to_string(),
                annotation: annotate(track),
            });
            self.painted_rotation.insert(track.key.clone(), crossing_id);
            log::debug!("Painted {} in sweep {crossing_id}", track.key);
            events.push(PaintEvent {
                key: track.key.clone(),
                altitude_ft: track.altitude_ft,
                sweep_id: crossing_id,
            });
        }
        events
    }

    /// Removes blips that have fully faded.
    pub fn prune_blips(&mut self, now: chrono::DateTime<chrono::Utc>) {
        let period = self.rotation_period_sec;
        self.blips
            .retain(|blip| seconds_between(blip.spawned_at, now) < period);
    }

    /// Fade factor in `[0, 1]`: 1 at spawn, 0 one rotation later.
    #[must_use]
    pub fn blip_alpha(&self, blip: &Blip, now: chrono::DateTime<chrono::Utc>) -> f64 {
        let age = seconds_between(blip.spawned_at, now) / self.rotation_period_sec;
        (1.0 - age).clamp(0.0, 1.0)
    }

    /// Forgets paint records of tracks no longer present.
    pub fn retain_tracks(&mut self, active: &std::collections::HashSet<&str>) {
        self.painted_rotation
            .retain(|key, _| active.contains(key.as_str()));
    }

    /// Scope reset: clears every paint record and blip.
    pub fn reset(&mut self) {
        self.painted_rotation.clear();
        self.blips.clear();
    }

    #[must_use]
    pub fn angle_deg(&self) -> f64 {
        self.angle_deg
    }

    /// Compass bearing the beam currently points at.
    #[must_use]
    pub fn beam_bearing_deg(&self) -> f64 {
        self.direction.to_sweep_space(self.angle_deg)
    }

    #[must_use]
    pub fn sweep_id(&self) -> u64 {
        self.sweep_id
    }

    #[must_use]
    pub fn phase(&self) -> SweepPhase {
        self.phase
    }

    #[must_use]
    pub fn direction(&self) -> SweepDirection {
        self.direction
    }

    #[must_use]
    pub fn speed_deg_per_sec(&self) -> f64 {
        self.speed_deg_per_sec
    }

    #[must_use]
    pub fn rotation_period_sec(&self) -> f64 {
        self.rotation_period_sec
    }

    #[must_use]
    pub fn blips(&self) -> &[Blip] {
        &self.blips
    }

    #[must_use]
    pub fn painted_sweep(&self, key: &str) -> Option<u64> {
        self.painted_rotation.get(key).copied()
    }
}

#[allow(clippy::cast_precision_loss)]
pub(crate) fn seconds_between(
    earlier: chrono::DateTime<chrono::Utc>,
    later: chrono::DateTime<chrono::Utc>,
) -> f64 {
    (later - earlier).num_microseconds().map_or(f64::MAX, |us| us as f64 / 1e6)
}

#[cfg(test)]
mod tests {
    use super::{ScopeGeometry, SweepDirection, SweepPhase, SweepState};
    use crate::types::{GeoPoint, Track};

    fn track(key: &str, bearing_deg: f64, distance_km: f64) -> Track {
        Track {
            key: key.to_string(),
            hex: key.to_string(),
            flight: String::new(),
            position: GeoPoint::new(54.0, -1.0),
            distance_km,
            bearing_deg,
            heading_deg: bearing_deg,
            altitude_ft: 12000,
            ground_speed_kt: 250.0,
            vertical_rate_fpm: None,
            squawk: String::new(),
            on_ground: false,
            last_message_age_sec: Some(0.5),
            signal_rssi: None,
            category: None,
            altitude_descent_confirmed: false,
        }
    }

    fn start() -> chrono::DateTime<chrono::Utc> {
        chrono::DateTime::from_timestamp(1_700_000_000, 0).expect("valid timestamp")
    }

    fn geometry() -> ScopeGeometry {
        ScopeGeometry::fit(800.0, 800.0, 50.0)
    }

    #[test]
    fn when_speed_not_positive_then_beam_still_turns_at_default_speed() {
        for speed in [-90.0, 0.0, f64::NAN] {
            let mut sweep = SweepState::new(speed, SweepDirection::Clockwise);
            assert!((sweep.speed_deg_per_sec() - super::DEFAULT_SPEED_DEG_PER_SEC).abs() < 1e-9);
            assert!((sweep.rotation_period_sec() - 4.0).abs() < 1e-9);
            sweep.advance(0.5);
            assert!((sweep.angle_deg() - 45.0).abs() < 1e-9);
        }
    }

    #[test]
    fn when_advancing_past_north_then_sweep_id_increments_and_delta_wraps() {
        let mut sweep = SweepState::new(90.0, SweepDirection::Clockwise);
        let step = sweep.advance(3.0 + 8.0 / 9.0); // 350 degrees
        assert_eq!(step.phase, SweepPhase::Advancing);
        assert!((sweep.angle_deg() - 350.0).abs() < 1e-9);

        let step = sweep.advance(20.0 / 90.0);
        assert_eq!(step.phase, SweepPhase::Wrapped);
        assert_eq!(step.sweep_id, 1);
        assert!((step.angle - 10.0).abs() < 1e-9);
        assert!((step.swept_delta - 20.0).abs() < 1e-9);
    }

    #[test]
    fn when_frames_are_tiny_then_tolerance_clamped_to_minimum() {
        let mut sweep = SweepState::new(90.0, SweepDirection::Clockwise);
        assert_eq!(sweep.advance(0.001).tolerance, 0.75);
        assert_eq!(sweep.advance(1.0).tolerance, 2.5);
    }

    #[test]
    fn when_sweeping_two_revolutions_then_track_painted_once_per_revolution() {
        let mut sweep = SweepState::new(90.0, SweepDirection::Clockwise);
        let tracks = vec![track("ABC123", 45.0, 20.0)];
        let mut now = start();
        let mut paints = Vec::new();

        // 8 seconds at 60 fps = two full revolutions
        for _ in 0..480 {
            now += chrono::TimeDelta::microseconds(16_667);
            let step = sweep.advance(1.0 / 60.0);
            let events = sweep.paint(&step, &tracks, &geometry(), now, |_| Default::default());
            paints.extend(events);
        }

        assert_eq!(paints.len(), 2);
        assert_eq!(paints[0].sweep_id, 0);
        assert_eq!(paints[1].sweep_id, 1);
        assert_eq!(sweep.painted_sweep("ABC123"), Some(1));
    }

    #[test]
    fn when_track_sits_at_north_then_never_painted_twice_in_one_sweep_id() {
        let mut sweep = SweepState::new(90.0, SweepDirection::Clockwise);
        let tracks = vec![track("N1", 0.2, 10.0), track("N2", 359.8, 10.0)];
        let mut now = start();
        let mut seen: std::collections::HashSet<(String, u64)> = std::collections::HashSet::new();
        let mut total = 0;
        for _ in 0..600 {
            now += chrono::TimeDelta::microseconds(16_667);
            let step = sweep.advance(1.0 / 60.0);
            for event in sweep.paint(&step, &tracks, &geometry(), now, |_| Default::default()) {
                assert!(seen.insert((event.key.clone(), event.sweep_id)), "{event:?}");
                total += 1;
            }
        }
        // 10 seconds is two and a half revolutions
        assert!((4..=6).contains(&total), "{total}");
    }

    #[test]
    fn when_painting_then_blip_placed_at_projected_position() {
        let mut sweep = SweepState::new(90.0, SweepDirection::Clockwise);
        let tracks = vec![track("EAST", 90.0, 25.0)];
        let step = sweep.advance(1.0); // 0 -> 90
        let events = sweep.paint(&step, &tracks, &geometry(), start(), |_| Default::default());
        assert_eq!(events.len(), 1);
        let blip = &sweep.blips()[0];
        let geometry = geometry();
        assert!((blip.x - (geometry.center_x + geometry.radius / 2.0)).abs() < 1e-6);
        assert!((blip.y - geometry.center_y).abs() < 1e-6);
    }

    #[test]
    fn when_blip_ages_one_rotation_then_pruned() {
        let mut sweep = SweepState::new(90.0, SweepDirection::Clockwise);
        let tracks = vec![track("ABC123", 10.0, 5.0)];
        let step = sweep.advance(0.2);
        sweep.paint(&step, &tracks, &geometry(), start(), |_| Default::default());
        let blip = sweep.blips()[0].clone();

        let half = start() + chrono::TimeDelta::seconds(2);
        assert!((sweep.blip_alpha(&blip, half) - 0.5).abs() < 1e-9);
        sweep.prune_blips(half);
        assert_eq!(sweep.blips().len(), 1);

        sweep.prune_blips(start() + chrono::TimeDelta::seconds(4));
        assert!(sweep.blips().is_empty());
    }

    #[test]
    fn when_speed_changes_then_rotation_period_recomputed() {
        let mut sweep = SweepState::new(90.0, SweepDirection::Clockwise);
        assert_eq!(sweep.rotation_period_sec(), 4.0);
        sweep.set_speed(45.0);
        assert_eq!(sweep.rotation_period_sec(), 8.0);
        sweep.set_speed(0.0);
        assert_eq!(sweep.rotation_period_sec(), 8.0);
    }

    #[test]
    fn when_reset_then_track_repainted_in_same_sweep_id() {
        let mut sweep = SweepState::new(90.0, SweepDirection::Clockwise);
        let tracks = vec![track("ABC123", 10.0, 5.0)];
        let step = sweep.advance(0.2);
        assert_eq!(sweep.paint(&step, &tracks, &geometry(), start(), |_| Default::default()).len(), 1);
        assert_eq!(sweep.paint(&step, &tracks, &geometry(), start(), |_| Default::default()).len(), 0);

        sweep.reset();
        assert!(sweep.blips().is_empty());
        assert_eq!(sweep.paint(&step, &tracks, &geometry(), start(), |_| Default::default()).len(), 1);
    }

    #[test]
    fn when_counter_clockwise_then_beam_reaches_west_first() {
        let mut sweep = SweepState::new(90.0, SweepDirection::CounterClockwise);
        let tracks = vec![track("WEST", 270.0, 5.0), track("EAST", 90.0, 5.0)];
        let step = sweep.advance(1.0);
        let events = sweep.paint(&step, &tracks, &geometry(), start(), |_| Default::default());
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].key, "WEST");
        assert!((sweep.beam_bearing_deg() - 270.0).abs() < 1e-9);
    }

    #[test]
    fn when_frame_delta_is_garbage_then_beam_holds_still() {
        let mut sweep = SweepState::new(90.0, SweepDirection::Clockwise);
        let step = sweep.advance(f64::NAN);
        assert_eq!(step.swept_delta, 0.0);
        let step = sweep.advance(-3.0);
        assert_eq!(step.angle, 0.0);
    }
}
