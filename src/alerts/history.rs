use super::{AlertCandidate, AlertEvent};

#[derive(Debug, Clone, PartialEq)]
pub struct LiveAlert {
    pub message: String,
    pub last_seen_at: chrono::DateTime<chrono::Utc>,
}

/// Bookkeeping shared by every alert rule: which keys are active, when each key
/// was last announced, and which repeating alerts are still in live rotation.
#[derive(Debug)]
pub struct AlertHistory {
    active: std::collections::HashMap<String, AlertEvent>,
    cooldowns: std::collections::HashMap<String, chrono::DateTime<chrono::Utc>>,
    live: std::collections::BTreeMap<String, LiveAlert>,
    live_grace: chrono::TimeDelta,
    max_age: chrono::TimeDelta,
}

impl AlertHistory {
    #[must_use]
    pub fn new(live_grace: chrono::TimeDelta, max_age: chrono::TimeDelta) -> Self {
        AlertHistory {
            active: std::collections::HashMap::new(),
            cooldowns: std::collections::HashMap::new(),
            live: std::collections::BTreeMap::new(),
            live_grace,
            max_age,
        }
    }

    /// Records that a condition holds right now.
    ///
    /// Returns the event when it should be announced: always subject to the
    /// cooldown, and for repeating alerts only on their first activation (the
    /// live rotation restates them afterwards).
    pub fn activate(
        &mut self,
        candidate: AlertCandidate,
        cooldown: chrono::TimeDelta,
        now: chrono::DateTime<chrono::Utc>,
    ) -> Option<AlertEvent> {
        let repeat_while_active = candidate.kind.repeats_while_active();
        let is_new = !self.active.contains_key(&candidate.key);

        let event = self
            .active
            .entry(candidate.key.clone())
            .and_modify(|event| {
                event.message.clone_from(&candidate.message);
                event.last_triggered_at = now;
                event.eta_minutes = candidate.eta_minutes;
            })
            .or_insert_with(|| AlertEvent {
                key: candidate.key.clone(),
                kind: candidate.kind,
                message: candidate.message.clone(),
                track_keys: candidate.track_keys.clone(),
                first_triggered_at: now,
                last_triggered_at: now,
                eta_minutes: candidate.eta_minutes,
            })
            .clone();

        if repeat_while_active {
            self.live.insert(
                candidate.key.clone(),
                LiveAlert {
                    message: candidate.message,
                    last_seen_at: now,
                },
            );
            if !is_new {
                return None;
            }
        }

        let cooling_down = self
            .cooldowns
            .get(&candidate.key)
            .is_some_and(|shown_at| now - *shown_at < cooldown);
        if cooling_down {
            return None;
        }
        self.cooldowns.insert(candidate.key, now);
        if is_new {
            log::info!("Alert raised: {}", event.message);
        }
        Some(event)
    }

    /// Records that a condition no longer holds. One-shot alerts clear at once;
    /// repeating alerts clear only after being absent for the grace period.
    pub fn resolve(
        &mut self,
        key: &str,
        now: chrono::DateTime<chrono::Utc>,
    ) -> Option<AlertEvent> {
        if let Some(live) = self.live.get(key) {
            if now - live.last_seen_at <= self.live_grace {
                return None;
            }
            self.live.remove(key);
        }
        let event = self.active.remove(key)?;
        log::info!("Alert resolved: {}", event.message);
        Some(event)
    }

    /// Clears every alert that involves `track_key`, regardless of grace periods.
    pub fn drop_track(&mut self, track_key: &str) -> Vec<AlertEvent> {
        let keys: Vec<String> = self
            .active
            .values()
            .filter(|event| event.track_keys.iter().any(|key| key == track_key))
            .map(|event| event.key.clone())
            .collect();
        keys.into_iter()
            .filter_map(|key| {
                self.live.remove(&key);
                self.active.remove(&key)
            })
            .collect()
    }

    /// Expires cooldown records older than the max age and live alerts past their grace.
    pub fn prune(&mut self, now: chrono::DateTime<chrono::Utc>) {
        let max_age = self.max_age;
        self.cooldowns.retain(|_, shown_at| now - *shown_at <= max_age);

        let grace = self.live_grace;
        let expired: Vec<String> = self
            .live
            .iter()
            .filter(|(_, live)| now - live.last_seen_at > grace)
            .map(|(key, _)| key.clone())
            .collect();
        for key in expired {
            self.live.remove(&key);
            self.active.remove(&key);
        }
    }

    /// Forgets everything except cooldowns, so a reconnect does not re-announce
    /// conditions that were just shown.
    pub fn clear_active(&mut self) -> Vec<AlertEvent> {
        self.live.clear();
        self.active.drain().map(|(_, event)| event).collect()
    }

    #[must_use]
    pub fn active(&self) -> &std::collections::HashMap<String, AlertEvent> {
        &self.active
    }

    #[must_use]
    pub fn live(&self) -> &std::collections::BTreeMap<String, LiveAlert> {
        &self.live
    }

    #[must_use]
    pub fn is_active(&self, key: &str) -> bool {
        self.active.contains_key(key)
    }

    #[must_use]
    pub fn last_shown(&self, key: &str) -> Option<chrono::DateTime<chrono::Utc>> {
        self.cooldowns.get(key).copied()
    }
}
