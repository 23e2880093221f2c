use crate::alerts::AlertConfig;
use crate::ingestor::FeedConfig;
use crate::notifications::NotificationConfig;
use crate::sweep::SweepDirection;
use crate::types::GeoPoint;

#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
#[serde(default)]
pub struct ApplicationConfig {
    pub feed: FeedConfig,
    pub receiver: ReceiverConfig,
    pub radar: RadarConfig,
    pub alerts: AlertConfig,
    pub notifications: NotificationConfig,
    pub airspaces: Vec<AirspaceAnnotation>,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        ApplicationConfig {
            feed: FeedConfig::default(),
            receiver: ReceiverConfig::default(),
            radar: RadarConfig::default(),
            alerts: AlertConfig::default(),
            notifications: NotificationConfig::default(),
            airspaces: default_airspaces(),
        }
    }
}

impl ApplicationConfig {
    pub fn construct_from_path(
        path: &std::path::PathBuf,
    ) -> Result<ApplicationConfig, errors::ApplicationConfigError> {
        let string =
            std::fs::read_to_string(path).map_err(|error| errors::ApplicationConfigError::Io {
                source: error,
                path: path.clone(),
            })?;

        toml::from_str(&string).map_err(|error| errors::ApplicationConfigError::Parse {
            source: error,
            path: path.clone(),
        })
    }

    /// Loads `path` when given, otherwise falls back to the built-in defaults.
    pub fn load(
        path: Option<&std::path::PathBuf>,
    ) -> Result<ApplicationConfig, errors::ApplicationConfigError> {
        match path {
            Some(path) => ApplicationConfig::construct_from_path(path),
            None => Ok(ApplicationConfig::default()),
        }
    }
}

/// Static fallback location of the ground station.
#[derive(Debug, Clone, Copy, PartialEq, serde::Deserialize)]
#[serde(default)]
pub struct ReceiverConfig {
    pub lat: f64,
    pub lon: f64,
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        ReceiverConfig {
            lat: 54.0,
            lon: -1.0,
        }
    }
}

impl ReceiverConfig {
    #[must_use]
    pub fn position(&self) -> GeoPoint {
        GeoPoint::new(self.lat, self.lon)
    }
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
#[serde(default)]
pub struct RadarConfig {
    pub range_steps_km: Vec<f64>,
    pub default_range_index: usize,
    pub sweep_speed_deg_per_sec: f64,
    pub sweep_direction: SweepDirection,
    pub frame_interval_ms: u64,
    /// Marker size as a fraction of the scope radius.
    pub blip_marker_fraction: f64,
}

impl Default for RadarConfig {
    fn default() -> Self {
        RadarConfig {
            range_steps_km: vec![5.0, 10.0, 25.0, 50.0, 100.0, 150.0, 200.0, 300.0],
            default_range_index: 3,
            sweep_speed_deg_per_sec: crate::sweep::DEFAULT_SPEED_DEG_PER_SEC,
            sweep_direction: SweepDirection::Clockwise,
            frame_interval_ms: 16,
            blip_marker_fraction: 0.14,
        }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
pub struct AirspaceAnnotation {
    pub icao: String,
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    pub radius_km: f64,
}

impl AirspaceAnnotation {
    #[must_use]
    pub fn position(&self) -> GeoPoint {
        GeoPoint::new(self.lat, self.lon)
    }
}

fn default_airspaces() -> Vec<AirspaceAnnotation> {
    [
        ("EGNV", "Teesside", 54.5092, -1.4294, 18.0),
        ("EGNT", "Newcastle", 55.0375, -1.6917, 22.0),
        ("EGNM", "Leeds Bradford", 53.8659, -1.6606, 20.0),
        ("EGCN", "Doncaster Sheffield", 53.4806, -1.0107, 18.0),
        ("EGNJ", "Humberside", 53.5744, -0.3508, 17.0),
    ]
    .into_iter()
    .map(|(icao, name, lat, lon, radius_km)| AirspaceAnnotation {
        icao: icao.to_string(),
        name: name.to_string(),
        lat,
        lon,
        radius_km,
    })
    .collect()
}

pub mod errors {

    #[derive(Debug)]
    pub enum ApplicationConfigError {
        Parse {
            source: toml::de::Error,
            path: std::path::PathBuf,
        },
        Io {
            source: std::io::Error,
            path: std::path::PathBuf,
        },
    }
    impl std::fmt::Display for ApplicationConfigError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                ApplicationConfigError::Io {
                    source: error,
                    path,
                } => {
                    write!(
                        f,
                        "Failed to read config file '{}': {}",
                        path.display(),
                        error
                    )
                }
                ApplicationConfigError::Parse {
                    source: error,
                    path,
                } => {
                    write!(
                        f,
                        "Failed to parse config file '{}': {}",
                        path.display(),
                        error
                    )
                }
            }
        }
    }
    impl std::error::Error for ApplicationConfigError {
        fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
            match self {
                ApplicationConfigError::Io { source: error, .. } => Some(error),
                ApplicationConfigError::Parse { source: error, .. } => Some(error),
            }
        }
    }
}
