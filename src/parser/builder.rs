use super::constants::{
    BARO_ALTITUDE, CATEGORY, CATEGORY_REGEX, COURSE_FIELDS, FLIGHT, GEOMETRIC_ALTITUDE,
    GROUND_SPEED, HEX, LATITUDE, LONGITUDE, ON_GROUND_ALTITUDE, RSSI, SEEN, SQUAWK, SQUAWK_REGEX,
    VERTICAL_RATE_FIELDS,
};
use crate::types::{AircraftReport, IcaoAddress};

#[derive(Debug, PartialEq)]
pub enum AircraftBuildError {
    NotAnObject,
    MissingLatitude,
    MissingLongitude,
    InvalidField(String),
}

impl std::fmt::Display for AircraftBuildError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AircraftBuildError::NotAnObject => write!(f, "Aircraft entry is not an object"),
            AircraftBuildError::MissingLatitude => write!(f, "Aircraft entry has no numeric lat"),
            AircraftBuildError::MissingLongitude => write!(f, "Aircraft entry has no numeric lon"),
            AircraftBuildError::InvalidField(name) => write!(f, "Invalid value for field {name}"),
        }
    }
}

impl std::error::Error for AircraftBuildError {}

/// Builds a report from one element of the `aircraft` array.
///
/// Only a missing or non-numeric position is an error. Every other field is
/// optional and silently dropped when it has the wrong shape.
pub fn build_report_from_value(
    value: &serde_json::Value,
) -> Result<AircraftReport, AircraftBuildError> {
    let entry = value.as_object().ok_or(AircraftBuildError::NotAnObject)?;

    let latitude = finite_number(entry, LATITUDE).ok_or(AircraftBuildError::MissingLatitude)?;
    let longitude = finite_number(entry, LONGITUDE).ok_or(AircraftBuildError::MissingLongitude)?;
    if !(-90.0..=90.0).contains(&latitude) {
        return Err(AircraftBuildError::InvalidField(LATITUDE.to_string()));
    }

    let (altitude_ft, on_ground) = parse_altitude(entry);

    Ok(AircraftReport {
        hex: normalize_hex(entry.get(HEX).and_then(serde_json::Value::as_str).unwrap_or("")),
        flight: trimmed_string(entry, FLIGHT),
        latitude,
        longitude,
        altitude_ft,
        on_ground,
        ground_speed_kt: finite_number(entry, GROUND_SPEED).filter(|gs| *gs >= 0.0),
        course_deg: COURSE_FIELDS
            .iter()
            .find_map(|field| finite_number(entry, field)),
        vertical_rate_fpm: VERTICAL_RATE_FIELDS
            .iter()
            .find_map(|field| finite_number(entry, field)),
        squawk: Some(trimmed_string(entry, SQUAWK))
            .filter(|squawk| SQUAWK_REGEX.is_match(squawk))
            .unwrap_or_default(),
        seconds_since_last_message: finite_number(entry, SEEN).filter(|seen| *seen >= 0.0),
        signal_rssi: finite_number(entry, RSSI),
        category: Some(trimmed_string(entry, CATEGORY))
            .filter(|category| CATEGORY_REGEX.is_match(category)),
    })
}

fn finite_number(entry: &serde_json::Map<String, serde_json::Value>, field: &str) -> Option<f64> {
    entry
        .get(field)
        .and_then(serde_json::Value::as_f64)
        .filter(|value| value.is_finite())
}

fn trimmed_string(entry: &serde_json::Map<String, serde_json::Value>, field: &str) -> String {
    entry
        .get(field)
        .and_then(serde_json::Value::as_str)
        .map(|s| s.trim().to_string())
        .unwrap_or_default()
}

#[allow(clippy::cast_possible_truncation)]
fn parse_altitude(entry: &serde_json::Map<String, serde_json::Value>) -> (Option<i32>, bool) {
    match entry.get(BARO_ALTITUDE) {
        Some(serde_json::Value::String(s)) if s == ON_GROUND_ALTITUDE => (None, true),
        Some(value) => match value.as_f64().filter(|alt| alt.is_finite()) {
            Some(altitude) => (Some(altitude.round() as i32), false),
            None => (geometric_altitude(entry), false),
        },
        None => (geometric_altitude(entry), false),
    }
}

#[allow(clippy::cast_possible_truncation)]
fn geometric_altitude(entry: &serde_json::Map<String, serde_json::Value>) -> Option<i32> {
    finite_number(entry, GEOMETRIC_ALTITUDE).map(|alt| alt.round() as i32)
}

fn normalize_hex(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    match trimmed.parse::<IcaoAddress>() {
        Ok(address) if trimmed.starts_with('~') => format!("~{address}"),
        Ok(address) => address.to_string(),
        Err(err) => {
            log::debug!("Keeping unparseable hex id as-is: {err}");
            trimmed.to_uppercase()
        }
    }
}

#[cfg(test)]
mod test {
    use super::{build_report_from_value, AircraftBuildError};

    #[test]
    fn when_building_full_entry_then_all_fields_are_extracted() {
        let value = serde_json::json!({
            "hex": " abc123 ",
            "flight": "BAW12   ",
            "lat": 54.1,
            "lon": -1.2,
            "alt_baro": 5000,
            "gs": 120.5,
            "track": 181.2,
            "baro_rate": -640,
            "squawk": "7700",
            "seen": 0.4,
            "rssi": -21.5,
            "category": "A3"
        });
        let report = build_report_from_value(&value).expect("entry is valid");
        assert_eq!(report.hex, "ABC123");
        assert_eq!(report.flight, "BAW12");
        assert_eq!(report.latitude, 54.1);
        assert_eq!(report.longitude, -1.2);
        assert_eq!(report.altitude_ft, Some(5000));
        assert!(!report.on_ground);
        assert_eq!(report.ground_speed_kt, Some(120.5));
        assert_eq!(report.course_deg, Some(181.2));
        assert_eq!(report.vertical_rate_fpm, Some(-640.0));
        assert_eq!(report.squawk, "7700");
        assert_eq!(report.seconds_since_last_message, Some(0.4));
        assert_eq!(report.signal_rssi, Some(-21.5));
        assert_eq!(report.category.as_deref(), Some("A3"));
    }

    #[test]
    fn when_altitude_is_ground_then_on_ground_and_altitude_unknown() {
        let value = serde_json::json!({"hex": "4ca2d1", "lat": 54.0, "lon": -1.0, "alt_baro": "ground"});
        let report = build_report_from_value(&value).expect("entry is valid");
        assert!(report.on_ground);
        assert_eq!(report.altitude_ft, None);
    }

    #[test]
    fn when_course_missing_then_true_heading_then_geom_rate_used() {
        let value = serde_json::json!({
            "lat": 54.0, "lon": -1.0, "true_heading": 90.0, "geom_rate": 1200, "alt_geom": 3275.4
        });
        let report = build_report_from_value(&value).expect("entry is valid");
        assert_eq!(report.course_deg, Some(90.0));
        assert_eq!(report.vertical_rate_fpm, Some(1200.0));
        assert_eq!(report.altitude_ft, Some(3275));
    }

    #[test]
    fn when_position_is_missing_or_not_numeric_then_error() {
        let missing_lat = serde_json::json!({"hex": "abc123", "lon": -1.0});
        assert_eq!(
            build_report_from_value(&missing_lat),
            Err(AircraftBuildError::MissingLatitude)
        );
        let string_lon = serde_json::json!({"hex": "abc123", "lat": 54.0, "lon": "-1.0"});
        assert_eq!(
            build_report_from_value(&string_lon),
            Err(AircraftBuildError::MissingLongitude)
        );
        assert_eq!(
            build_report_from_value(&serde_json::json!([1, 2])),
            Err(AircraftBuildError::NotAnObject)
        );
    }

    #[test]
    fn when_squawk_is_not_octal_then_dropped() {
        let value = serde_json::json!({"lat": 54.0, "lon": -1.0, "squawk": "7890"});
        let report = build_report_from_value(&value).expect("entry is valid");
        assert!(report.squawk.is_empty());
    }

    #[test]
    fn when_hex_is_non_icao_then_tilde_prefix_kept() {
        let value = serde_json::json!({"hex": "~2a0b1c", "lat": 54.0, "lon": -1.0});
        let report = build_report_from_value(&value).expect("entry is valid");
        assert_eq!(report.hex, "~2A0B1C");
    }
}
