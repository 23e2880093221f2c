#[derive(Debug, PartialEq, Clone, Copy, serde::Deserialize, serde::Serialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    #[must_use]
    pub const fn new(lat: f64, lon: f64) -> Self {
        GeoPoint { lat, lon }
    }

    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.lat.is_finite() && self.lon.is_finite()
    }
}

/// One aircraft record as delivered by the feed, before any geometry is applied.
#[derive(Debug, PartialEq, Clone, Default)]
pub struct AircraftReport {
    pub hex: String,
    pub flight: String,
    pub latitude: f64,
    pub longitude: f64,
    pub altitude_ft: Option<i32>,
    pub on_ground: bool,
    pub ground_speed_kt: Option<f64>,
    pub course_deg: Option<f64>,
    pub vertical_rate_fpm: Option<f64>,
    pub squawk: String,
    pub seconds_since_last_message: Option<f64>,
    pub signal_rssi: Option<f64>,
    pub category: Option<String>,
}

impl AircraftReport {
    #[must_use]
    pub fn position(&self) -> GeoPoint {
        GeoPoint::new(self.latitude, self.longitude)
    }

    /// Stable identifier: hex id, else callsign, else the position rounded to 3 decimals.
    #[must_use]
    pub fn key(&self) -> String {
        if !self.hex.is_empty() {
            return self.hex.clone();
        }
        if !self.flight.is_empty() {
            return self.flight.clone();
        }
        let lat = if self.latitude.is_finite() {
            format!("{:.3}", self.latitude)
        } else {
            String::from("na")
        };
        let lon = if self.longitude.is_finite() {
            format!("{:.3}", self.longitude)
        } else {
            String::from("na")
        };
        format!("{lat},{lon}")
    }
}

/// One aircraft as seen from the reference point during the current feed cycle.
#[derive(Debug, PartialEq, Clone)]
pub struct Track {
    pub key: String,
    pub hex: String,
    pub flight: String,
    pub position: GeoPoint,
    pub distance_km: f64,
    pub bearing_deg: f64,
    pub heading_deg: f64,
    /// -1 when unknown.
    pub altitude_ft: i32,
    /// -1 when unknown.
    pub ground_speed_kt: f64,
    pub vertical_rate_fpm: Option<f64>,
    pub squawk: String,
    pub on_ground: bool,
    pub last_message_age_sec: Option<f64>,
    pub signal_rssi: Option<f64>,
    pub category: Option<String>,
    pub altitude_descent_confirmed: bool,
}

impl Track {
    /// Callsign if known, else hex, else the key.
    #[must_use]
    pub fn display_name(&self) -> &str {
        if !self.flight.is_empty() {
            &self.flight
        } else if !self.hex.is_empty() {
            &self.hex
        } else {
            &self.key
        }
    }

    #[must_use]
    pub fn has_altitude(&self) -> bool {
        self.altitude_ft >= 0
    }

    #[must_use]
    pub fn has_ground_speed(&self) -> bool {
        self.ground_speed_kt >= 0.0
    }
}

#[derive(Debug, PartialEq, Clone, Copy, Eq, Hash)]
pub struct IcaoAddress(u32);

impl IcaoAddress {
    pub const MAX_VALUE: u32 = 0x00FF_FFFF;

    pub fn new(value: u32) -> Result<Self, IcaoAddressError> {
        if value <= Self::MAX_VALUE {
            Ok(IcaoAddress(value))
        } else {
            Err(IcaoAddressError::InvalidAddress(value))
        }
    }

    #[must_use]
    pub fn value(&self) -> u32 {
        self.0
    }
}

impl std::str::FromStr for IcaoAddress {
    type Err = IcaoAddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = u32::from_str_radix(s.trim_start_matches('~'), 16)
            .map_err(|_| IcaoAddressError::InvalidHexFormat(s.to_string()))?;
        IcaoAddress::new(value)
    }
}

impl std::fmt::Display for IcaoAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:06X}", self.0)
    }
}

#[derive(Debug, PartialEq)]
pub enum IcaoAddressError {
    InvalidHexFormat(String),
    InvalidAddress(u32),
}

impl std::fmt::Display for IcaoAddressError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IcaoAddressError::InvalidHexFormat(s) => write!(f, "Invalid hexadecimal format: {s}"),
            IcaoAddressError::InvalidAddress(val) => {
                write!(
                    f,
                    "Value 0x{:X} ({}) exceeds 24-bit ICAO address limit (0x{:X})",
                    val,
                    val,
                    IcaoAddress::MAX_VALUE
                )
            }
        }
    }
}

impl std::error::Error for IcaoAddressError {}
