pub const AIRCRAFT: &str = "aircraft";
pub const HEX: &str = "hex";
pub const FLIGHT: &str = "flight";
pub const LATITUDE: &str = "lat";
pub const LONGITUDE: &str = "lon";
pub const BARO_ALTITUDE: &str = "alt_baro";
pub const GEOMETRIC_ALTITUDE: &str = "alt_geom";
pub const GROUND_SPEED: &str = "gs";
pub const COURSE_FIELDS: [&str; 3] = ["track", "true_heading", "mag_heading"];
pub const VERTICAL_RATE_FIELDS: [&str; 2] = ["baro_rate", "geom_rate"];
pub const SQUAWK: &str = "squawk";
pub const SEEN: &str = "seen";
pub const RSSI: &str = "rssi";
pub const CATEGORY: &str = "category";

/// `alt_baro` carries this string instead of a number for aircraft on the ground.
pub const ON_GROUND_ALTITUDE: &str = "ground";

pub static SQUAWK_REGEX: once_cell::sync::Lazy<regex::Regex> = once_cell::sync::Lazy::new(|| {
    regex::Regex::new(r"^[0-7]{4}$").unwrap()
});
pub static CATEGORY_REGEX: once_cell::sync::Lazy<regex::Regex> =
    once_cell::sync::Lazy::new(|| regex::Regex::new(r"^[A-D][0-7]$").unwrap());
