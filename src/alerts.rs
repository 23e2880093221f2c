pub mod collision;
pub mod history;
pub mod rules;

use crate::types::{GeoPoint, Track};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AlertKind {
    EmergencySquawk,
    RapidDescent,
    BaseApproach,
    CollisionCourse,
}

impl AlertKind {
    #[must_use]
    pub fn key_prefix(self) -> &'static str {
        match self {
            AlertKind::EmergencySquawk => "squawk",
            AlertKind::RapidDescent => "rapid-descent",
            AlertKind::BaseApproach => "base-approach",
            AlertKind::CollisionCourse => "collision",
        }
    }

    /// Repeating alerts stay in the live rotation for as long as they hold.
    #[must_use]
    pub fn repeats_while_active(self) -> bool {
        matches!(self, AlertKind::EmergencySquawk | AlertKind::CollisionCourse)
    }

    #[must_use]
    pub fn key_for(self, track_key: &str) -> String {
        format!("{}-{track_key}", self.key_prefix())
    }

    /// Canonical key for a pair: the two track keys in lexicographic order.
    #[must_use]
    pub fn pair_key(self, a: &str, b: &str) -> String {
        let (first, second) = if a <= b { (a, b) } else { (b, a) };
        format!("{}-{first}-{second}", self.key_prefix())
    }
}

/// A condition that holds during the current evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertCandidate {
    pub key: String,
    pub kind: AlertKind,
    pub message: String,
    pub track_keys: Vec<String>,
    pub eta_minutes: Option<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AlertEvent {
    pub key: String,
    pub kind: AlertKind,
    pub message: String,
    pub track_keys: Vec<String>,
    pub first_triggered_at: chrono::DateTime<chrono::Utc>,
    pub last_triggered_at: chrono::DateTime<chrono::Utc>,
    pub eta_minutes: Option<i64>,
}

impl AlertEvent {
    #[must_use]
    pub fn involves(&self, track_key: &str) -> bool {
        self.track_keys.iter().any(|key| key == track_key)
    }
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    /// Squawk code to the condition it signals.
    pub emergency_squawks: std::collections::BTreeMap<String, String>,
    pub squawk_cooldown_secs: i64,

    pub rapid_descent_rate_fpm: f64,
    pub rapid_descent_min_drop_ft: i32,
    /// Maximum spacing of the two corroborating altitude samples, in refresh cycles.
    pub corroboration_cycles: u32,
    pub rapid_descent_cooldown_secs: i64,

    pub base_approach_radius_km: f64,
    pub base_approach_min_speed_kt: f64,
    pub base_approach_heading_tolerance_deg: f64,
    pub base_approach_cooldown_secs: i64,

    pub collision_distance_km: f64,
    pub collision_altitude_ft: i32,
    pub collision_heading_tolerance_deg: f64,
    pub collision_min_speed_kt: f64,
    pub collision_max_message_age_sec: f64,
    pub collision_cooldown_secs: i64,

    pub live_grace_secs: i64,
    pub history_max_age_secs: i64,
}

impl Default for AlertConfig {
    fn default() -> Self {
        AlertConfig {
            emergency_squawks: [
                ("7500", "unlawful interference"),
                ("7600", "radio failure"),
                ("7700", "general emergency"),
            ]
            .into_iter()
            .map(|(code, label)| (code.to_string(), label.to_string()))
            .collect(),
            squawk_cooldown_secs: 300,
            rapid_descent_rate_fpm: -2500.0,
            rapid_descent_min_drop_ft: 100,
            corroboration_cycles: 3,
            rapid_descent_cooldown_secs: 180,
            base_approach_radius_km: 5.0,
            base_approach_min_speed_kt: 40.0,
            base_approach_heading_tolerance_deg: 35.0,
            base_approach_cooldown_secs: 120,
            collision_distance_km: 3.5,
            collision_altitude_ft: 1000,
            collision_heading_tolerance_deg: 25.0,
            collision_min_speed_kt: 50.0,
            collision_max_message_age_sec: 15.0,
            collision_cooldown_secs: 120,
            live_grace_secs: 15,
            history_max_age_secs: 600,
        }
    }
}

impl AlertConfig {
    #[must_use]
    pub fn cooldown_for(&self, kind: AlertKind) -> chrono::TimeDelta {
        chrono::TimeDelta::seconds(match kind {
            AlertKind::EmergencySquawk => self.squawk_cooldown_secs,
            AlertKind::RapidDescent => self.rapid_descent_cooldown_secs,
            AlertKind::BaseApproach => self.base_approach_cooldown_secs,
            AlertKind::CollisionCourse => self.collision_cooldown_secs,
        })
    }
}

/// What changed in one evaluation pass.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct AlertOutcome {
    pub announced: Vec<AlertEvent>,
    pub resolved: Vec<AlertEvent>,
}

#[derive(Debug)]
pub struct AlertEvaluator {
    config: AlertConfig,
    history: history::AlertHistory,
}

impl AlertEvaluator {
    #[must_use]
    pub fn new(config: AlertConfig) -> Self {
        let history = history::AlertHistory::new(
            chrono::TimeDelta::seconds(config.live_grace_secs),
            chrono::TimeDelta::seconds(config.history_max_age_secs),
        );
        AlertEvaluator { config, history }
    }

    /// Runs every rule against the new track set.
    pub fn evaluate(
        &mut self,
        tracks: &[Track],
        reference: GeoPoint,
        alert_radius_km: f64,
        now: chrono::DateTime<chrono::Utc>,
    ) -> AlertOutcome {
        let mut outcome = AlertOutcome::default();

        let present: std::collections::HashSet<&str> =
            tracks.iter().map(|track| track.key.as_str()).collect();
        let departed: std::collections::BTreeSet<String> = self
            .history
            .active()
            .values()
            .flat_map(|event| event.track_keys.iter())
            .filter(|key| !present.contains(key.as_str()))
            .cloned()
            .collect();
        for key in departed {
            outcome.resolved.extend(self.history.drop_track(&key));
        }

        let mut candidates = Vec::new();
        for track in tracks {
            candidates.extend(rules::emergency_squawk(track, &self.config));
            candidates.extend(rules::rapid_descent(track, &self.config));
            candidates.extend(rules::base_approach(
                track,
                reference,
                alert_radius_km,
                &self.config,
            ));
        }
        candidates.extend(collision::collision_courses(tracks, &self.config));

        let triggered: std::collections::HashSet<String> =
            candidates.iter().map(|candidate| candidate.key.clone()).collect();
        for candidate in candidates {
            let cooldown = self.config.cooldown_for(candidate.kind);
            if let Some(event) = self.history.activate(candidate, cooldown, now) {
                outcome.announced.push(event);
            }
        }

        let mut lapsed: Vec<String> = self
            .history
            .active()
            .keys()
            .filter(|key| !triggered.contains(*key))
            .cloned()
            .collect();
        lapsed.sort();
        for key in lapsed {
            outcome.resolved.extend(self.history.resolve(&key, now));
        }

        self.history.prune(now);
        outcome.announced.sort_by(|a, b| a.key.cmp(&b.key));
        outcome
    }

    /// Used when the feed is lost: every alert is cleared, cooldowns are kept.
    pub fn clear(&mut self, now: chrono::DateTime<chrono::Utc>) -> Vec<AlertEvent> {
        self.history.prune(now);
        self.history.clear_active()
    }

    #[must_use]
    pub fn active_for_track(&self, track_key: &str) -> Vec<&AlertEvent> {
        let mut events: Vec<&AlertEvent> = self
            .history
            .active()
            .values()
            .filter(|event| event.involves(track_key))
            .collect();
        events.sort_by(|a, b| a.key.cmp(&b.key));
        events
    }

    #[must_use]
    pub fn is_active(&self, key: &str) -> bool {
        self.history.is_active(key)
    }

    #[must_use]
    pub fn event(&self, key: &str) -> Option<&AlertEvent> {
        self.history.active().get(key)
    }

    /// Repeating alerts currently in live rotation, ordered by key.
    #[must_use]
    pub fn live_alerts(&self) -> Vec<(String, String)> {
        self.history
            .live()
            .iter()
            .map(|(key, live)| (key.clone(), live.message.clone()))
            .collect()
    }

    #[must_use]
    pub fn config(&self) -> &AlertConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::{AlertConfig, AlertEvaluator, AlertKind};
    use crate::types::{GeoPoint, Track};

    const REFERENCE: GeoPoint = GeoPoint::new(54.0, -1.0);

    fn at_seconds(seconds: i64) -> chrono::DateTime<chrono::Utc> {
        chrono::DateTime::from_timestamp(1_700_000_000 + seconds, 0).expect("valid timestamp")
    }

    fn squawking(key: &str, squawk: &str) -> Track {
        Track {
            key: key.to_string(),
            hex: key.to_string(),
            flight: String::new(),
            position: GeoPoint::new(54.3, -1.0),
            distance_km: 33.4,
            bearing_deg: 0.0,
            heading_deg: 0.0,
            altitude_ft: 9000,
            ground_speed_kt: 200.0,
            vertical_rate_fpm: None,
            squawk: squawk.to_string(),
            on_ground: false,
            last_message_age_sec: Some(1.0),
            signal_rssi: None,
            category: None,
            altitude_descent_confirmed: false,
        }
    }

    #[test]
    fn when_pair_key_built_then_order_is_canonical() {
        assert_eq!(
            AlertKind::CollisionCourse.pair_key("ZZZ999", "AAA111"),
            "collision-AAA111-ZZZ999"
        );
        assert_eq!(
            AlertKind::CollisionCourse.pair_key("AAA111", "ZZZ999"),
            "collision-AAA111-ZZZ999"
        );
    }

    #[test]
    fn when_squawk_persists_then_announced_once_and_kept_live() {
        let mut evaluator = AlertEvaluator::new(AlertConfig::default());
        let tracks = vec![squawking("ABC123", "7700")];
        let first = evaluator.evaluate(&tracks, REFERENCE, 5.0, at_seconds(0));
        assert_eq!(first.announced.len(), 1);
        assert_eq!(first.announced[0].key, "squawk-ABC123");

        let second = evaluator.evaluate(&tracks, REFERENCE, 5.0, at_seconds(5));
        assert!(second.announced.is_empty());
        assert_eq!(evaluator.live_alerts().len(), 1);
    }

    #[test]
    fn when_squawk_changes_then_resolved_after_grace() {
        let mut evaluator = AlertEvaluator::new(AlertConfig::default());
        evaluator.evaluate(&[squawking("ABC123", "7700")], REFERENCE, 5.0, at_seconds(0));

        let quiet = vec![squawking("ABC123", "1200")];
        let within_grace = evaluator.evaluate(&quiet, REFERENCE, 5.0, at_seconds(5));
        assert!(within_grace.resolved.is_empty());
        assert!(evaluator.is_active("squawk-ABC123"));

        let after_grace = evaluator.evaluate(&quiet, REFERENCE, 5.0, at_seconds(25));
        assert_eq!(after_grace.resolved.len(), 1);
        assert!(evaluator.live_alerts().is_empty());
    }

    #[test]
    fn when_track_disappears_then_alert_resolved_immediately() {
        let mut evaluator = AlertEvaluator::new(AlertConfig::default());
        evaluator.evaluate(&[squawking("ABC123", "7600")], REFERENCE, 5.0, at_seconds(0));
        let outcome = evaluator.evaluate(&[], REFERENCE, 5.0, at_seconds(5));
        assert_eq!(outcome.resolved.len(), 1);
        assert!(!evaluator.is_active("squawk-ABC123"));
    }

    #[test]
    fn when_feed_lost_then_alerts_cleared_but_cooldown_kept() {
        let mut evaluator = AlertEvaluator::new(AlertConfig::default());
        let tracks = vec![squawking("ABC123", "7700")];
        evaluator.evaluate(&tracks, REFERENCE, 5.0, at_seconds(0));
        assert_eq!(evaluator.clear(at_seconds(5)).len(), 1);

        let again = evaluator.evaluate(&tracks, REFERENCE, 5.0, at_seconds(10));
        assert!(again.announced.is_empty());
        assert!(evaluator.is_active("squawk-ABC123"));
    }
}
