#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    pub min_duration_ms: i64,
    pub max_duration_ms: i64,
    pub per_char_ms: i64,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        NotificationConfig {
            min_duration_ms: 1500,
            max_duration_ms: 6000,
            per_char_ms: 60,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    /// Alert key for alert messages, `None` for plain status notices.
    pub key: Option<String>,
    pub text: String,
    pub alert: bool,
    pub duration: chrono::TimeDelta,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DisplayedNotification {
    pub notification: Notification,
    pub until: chrono::DateTime<chrono::Utc>,
    pub from_rotation: bool,
}

#[derive(Debug, Clone, PartialEq)]
struct RotationEntry {
    message: String,
    resolved: bool,
}

/// Messages waiting for the single display slot.
///
/// Explicit notices are shown first, in order. When none are waiting the slot
/// cycles round-robin through the live repeating alerts so each ongoing
/// condition keeps getting airtime.
#[derive(Debug)]
pub struct NotificationQueue {
    config: NotificationConfig,
    pending: std::collections::VecDeque<Notification>,
    current: Option<DisplayedNotification>,
    rotation: std::collections::BTreeMap<String, RotationEntry>,
    rotation_cursor: Option<String>,
}

impl NotificationQueue {
    #[must_use]
    pub fn new(mut config: NotificationConfig) -> Self {
        if config.min_duration_ms > config.max_duration_ms {
            log::warn!(
                "Notification min duration {} ms exceeds max {} ms, using {} ms for both",
                config.min_duration_ms,
                config.max_duration_ms,
                config.min_duration_ms
            );
            config.max_duration_ms = config.min_duration_ms;
        }
        NotificationQueue {
            config,
            pending: std::collections::VecDeque::new(),
            current: None,
            rotation: std::collections::BTreeMap::new(),
            rotation_cursor: None,
        }
    }

    /// Display time grows with text length, clamped to the configured bounds.
    #[must_use]
    pub fn duration_for(&self, text: &str) -> chrono::TimeDelta {
        let chars = i64::try_from(text.chars().count()).unwrap_or(i64::MAX);
        let weighted = self.config.per_char_ms.saturating_mul(chars);
        chrono::TimeDelta::milliseconds(
            weighted.clamp(self.config.min_duration_ms, self.config.max_duration_ms),
        )
    }

    /// Queues a message. A waiting message with the same key (or, for keyless
    /// notices, the same text) is replaced in place instead of queued twice.
    pub fn enqueue(
        &mut self,
        text: impl Into<String>,
        key: Option<String>,
        alert: bool,
        duration_override: Option<chrono::TimeDelta>,
    ) {
        let text = text.into();
        let duration = duration_override.unwrap_or_else(|| self.duration_for(&text));
        let notification = Notification {
            key,
            text,
            alert,
            duration,
        };

        let duplicate = self.pending.iter_mut().find(|waiting| match &notification.key {
            Some(key) => waiting.key.as_ref() == Some(key),
            None => waiting.key.is_none() && waiting.text == notification.text,
        });
        match duplicate {
            Some(waiting) => *waiting = notification,
            None => self.pending.push_back(notification),
        }
    }

    /// Replaces the live rotation with the alerts that are live right now.
    ///
    /// An entry that dropped out while on display stays until its slot drains.
    pub fn sync_live(&mut self, live: &[(String, String)]) {
        let displayed_key = self
            .current
            .as_ref()
            .and_then(|displayed| displayed.notification.key.clone());

        self.rotation.retain(|key, entry| {
            if live.iter().any(|(live_key, _)| live_key == key) {
                true
            } else if displayed_key.as_deref() == Some(key.as_str()) {
                entry.resolved = true;
                true
            } else {
                false
            }
        });
        for (key, message) in live {
            self.rotation.insert(
                key.clone(),
                RotationEntry {
                    message: message.clone(),
                    resolved: false,
                },
            );
        }
    }

    /// Advances the display slot to `now` and returns what should be shown.
    pub fn tick(&mut self, now: chrono::DateTime<chrono::Utc>) -> Option<&DisplayedNotification> {
        if self.current.as_ref().is_some_and(|displayed| now >= displayed.until) {
            if let Some(finished) = self.current.take() {
                self.drain(&finished);
            }
        }

        if self.current.is_none() {
            if let Some(notification) = self.pending.pop_front() {
                self.show(notification, now, false);
            } else if let Some(notification) = self.next_from_rotation() {
                self.show(notification, now, true);
            }
        }
        self.current.as_ref()
    }

    #[must_use]
    pub fn current(&self) -> Option<&DisplayedNotification> {
        self.current.as_ref()
    }

    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    #[must_use]
    pub fn rotation_keys(&self) -> Vec<&str> {
        self.rotation.keys().map(String::as_str).collect()
    }

    fn show(&mut self, notification: Notification, now: chrono::DateTime<chrono::Utc>, from_rotation: bool) {
        log::debug!("Showing notification: {}", notification.text);
        self.current = Some(DisplayedNotification {
            until: now + notification.duration,
            notification,
            from_rotation,
        });
    }

    fn drain(&mut self, finished: &DisplayedNotification) {
        let Some(key) = &finished.notification.key else {
            return;
        };
        if self.rotation.get(key).is_some_and(|entry| entry.resolved) {
            self.rotation.remove(key);
        }
    }

    fn next_from_rotation(&mut self) -> Option<Notification> {
        let after_cursor = self
            .rotation
            .iter()
            .filter(|(_, entry)| !entry.resolved)
            .find(|(key, _)| {
                self.rotation_cursor
                    .as_ref()
                    .map_or(true, |cursor| key.as_str() > cursor.as_str())
            });
        let (key, entry) = after_cursor.or_else(|| {
            self.rotation
                .iter()
                .find(|(_, entry)| !entry.resolved)
        })?;

        let notification = Notification {
            key: Some(key.clone()),
            text: entry.message.clone(),
            alert: true,
            duration: self.duration_for(&entry.message),
        };
        self.rotation_cursor = Some(key.clone());
        Some(notification)
    }
}

#[cfg(test)]
mod tests {
    use super::{NotificationConfig, NotificationQueue};

    fn at_millis(millis: i64) -> chrono::DateTime<chrono::Utc> {
        chrono::DateTime::from_timestamp_millis(1_700_000_000_000 + millis).expect("valid timestamp")
    }

    fn queue() -> NotificationQueue {
        NotificationQueue::new(NotificationConfig::default())
    }

    #[test]
    fn when_text_is_short_or_long_then_duration_clamped() {
        let queue = queue();
        assert_eq!(queue.duration_for("Hi"), chrono::TimeDelta::milliseconds(1500));
        assert_eq!(queue.duration_for(&"x".repeat(50)), chrono::TimeDelta::milliseconds(3000));
        assert_eq!(queue.duration_for(&"x".repeat(500)), chrono::TimeDelta::milliseconds(6000));
    }

    #[test]
    fn when_duration_bounds_inverted_then_min_duration_used() {
        let queue = NotificationQueue::new(NotificationConfig {
            min_duration_ms: 8000,
            max_duration_ms: 2000,
            per_char_ms: 60,
        });
        assert_eq!(queue.duration_for("ok"), chrono::TimeDelta::milliseconds(8000));
        assert_eq!(
            queue.duration_for(&"x".repeat(500)),
            chrono::TimeDelta::milliseconds(8000)
        );
    }

    #[test]
    fn when_messages_queued_then_shown_in_order_for_their_duration() {
        let mut queue = queue();
        queue.enqueue("first", None, false, Some(chrono::TimeDelta::seconds(2)));
        queue.enqueue("second", None, false, None);

        assert_eq!(queue.tick(at_millis(0)).map(|d| d.notification.text.as_str()), Some("first"));
        assert_eq!(queue.tick(at_millis(1999)).map(|d| d.notification.text.as_str()), Some("first"));
        assert_eq!(queue.tick(at_millis(2000)).map(|d| d.notification.text.as_str()), Some("second"));
        assert!(queue.tick(at_millis(10_000)).is_none());
    }

    #[test]
    fn when_same_key_enqueued_twice_then_only_latest_waits() {
        let mut queue = queue();
        queue.enqueue("Range: 25 km", None, false, None);
        queue.enqueue("squawk old", Some(String::from("squawk-A")), true, None);
        queue.enqueue("squawk new", Some(String::from("squawk-A")), true, None);
        queue.enqueue("Range: 25 km", None, false, None);
        assert_eq!(queue.pending_len(), 2);
        queue.tick(at_millis(0));
        assert_eq!(
            queue.tick(at_millis(5000)).map(|d| d.notification.text.as_str()),
            Some("squawk new")
        );
    }

    #[test]
    fn when_queue_empty_then_live_alerts_rotate_round_robin() {
        let mut queue = queue();
        queue.sync_live(&[
            (String::from("collision-A-B"), String::from("A and B converging")),
            (String::from("squawk-C"), String::from("C squawking 7700")),
        ]);

        let mut shown = Vec::new();
        let mut now = 0;
        for _ in 0..4 {
            let displayed = queue.tick(at_millis(now)).expect("rotation never starves").clone();
            assert!(displayed.from_rotation);
            shown.push(displayed.notification.key.expect("rotation entries are keyed"));
            now += displayed.notification.duration.num_milliseconds();
        }
        assert_eq!(shown, ["collision-A-B", "squawk-C", "collision-A-B", "squawk-C"]);
    }

    #[test]
    fn when_displayed_live_alert_resolves_then_removed_after_it_drains() {
        let mut queue = queue();
        queue.sync_live(&[(String::from("squawk-C"), String::from("C squawking 7700"))]);
        let until = queue.tick(at_millis(0)).expect("shown").until;

        queue.sync_live(&[]);
        assert_eq!(queue.rotation_keys(), ["squawk-C"]);
        assert!(queue.tick(until).is_none());
        assert!(queue.rotation_keys().is_empty());
    }

    #[test]
    fn when_explicit_message_waiting_then_it_preempts_rotation() {
        let mut queue = queue();
        queue.sync_live(&[(String::from("squawk-C"), String::from("C squawking 7700"))]);
        let until = queue.tick(at_millis(0)).expect("shown").until;
        queue.enqueue("Range: 10 km", None, false, None);
        let displayed = queue.tick(until).expect("shown");
        assert_eq!(displayed.notification.text, "Range: 10 km");
        assert!(!displayed.from_rotation);
    }
}
