pub const RANGE_INDEX: &str = "range_index";
pub const ALERT_RADIUS_KM: &str = "alert_radius_km";
pub const SWEEP_DIRECTION: &str = "sweep_direction";
pub const VOLUME: &str = "volume";

/// Durable key/value settings. Persistence is up to the implementor.
pub trait PreferenceStore: Send {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: String);
}

#[derive(Debug, Default, Clone)]
pub struct MemoryPreferences {
    values: std::collections::HashMap<String, String>,
}

impl MemoryPreferences {
    #[must_use]
    pub fn new() -> Self {
        MemoryPreferences::default()
    }
}

impl PreferenceStore for MemoryPreferences {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) {
        self.values.insert(key.to_string(), value);
    }
}

/// Reads and parses a value, ignoring anything that does not parse.
pub fn read_parsed<T: std::str::FromStr>(store: &dyn PreferenceStore, key: &str) -> Option<T> {
    store.get(key).and_then(|raw| raw.trim().parse().ok())
}
