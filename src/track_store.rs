use crate::geodesy;
use crate::types::{AircraftReport, GeoPoint, Track};

/// Thresholds used to corroborate a reported descent against actual altitude samples.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DescentCorroboration {
    pub window: chrono::TimeDelta,
    pub min_drop_ft: i32,
}

impl Default for DescentCorroboration {
    fn default() -> Self {
        DescentCorroboration {
            window: chrono::TimeDelta::seconds(15),
            min_drop_ft: 100,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct AltitudeSample {
    altitude_ft: i32,
    sampled_at: chrono::DateTime<chrono::Utc>,
}

/// Current set of tracks plus the short-lived history needed to derive them.
///
/// The track list is replaced wholesale by every feed update and handed out as
/// an `Arc`, so a reader holding the previous snapshot never sees a partial set.
#[derive(Debug)]
pub struct TrackStore {
    tracks: std::sync::Arc<Vec<Track>>,
    previous_positions: std::collections::HashMap<String, GeoPoint>,
    altitude_samples: std::collections::HashMap<String, AltitudeSample>,
    corroboration: DescentCorroboration,
}

impl TrackStore {
    #[must_use]
    pub fn new(corroboration: DescentCorroboration) -> Self {
        TrackStore {
            tracks: std::sync::Arc::new(Vec::new()),
            previous_positions: std::collections::HashMap::new(),
            altitude_samples: std::collections::HashMap::new(),
            corroboration,
        }
    }

    /// Builds the new track set from a feed batch and swaps it in.
    ///
    /// Reports beyond `range_km` are dropped. History for aircraft that did not
    /// appear in this batch is discarded.
    pub fn update(
        &mut self,
        reports: &[AircraftReport],
        reference: GeoPoint,
        range_km: f64,
        now: chrono::DateTime<chrono::Utc>,
    ) -> std::sync::Arc<Vec<Track>> {
        let mut next_positions = std::collections::HashMap::with_capacity(reports.len());
        let mut next_samples = std::collections::HashMap::with_capacity(reports.len());
        let mut tracks = Vec::with_capacity(reports.len());

        for report in reports {
            let position = report.position();
            if !position.is_finite() || !reference.is_finite() {
                continue;
            }
            let distance_km = geodesy::distance_km(reference, position);
            if !distance_km.is_finite() || distance_km > range_km {
                continue;
            }
            let bearing_deg = geodesy::bearing_deg(reference, position);
            let key = report.key();

            let heading_deg = derive_heading(
                report.course_deg,
                self.previous_positions.get(&key).copied(),
                position,
                bearing_deg,
            );

            let altitude_descent_confirmed = match report.altitude_ft {
                Some(altitude_ft) => {
                    let confirmed = self.altitude_samples.get(&key).is_some_and(|previous| {
                        now - previous.sampled_at <= self.corroboration.window
                            && previous.altitude_ft - altitude_ft >= self.corroboration.min_drop_ft
                    });
                    next_samples.insert(
                        key.clone(),
                        AltitudeSample {
                            altitude_ft,
                            sampled_at: now,
                        },
                    );
                    confirmed
                }
                None => false,
            };

            next_positions.insert(key.clone(), position);
            tracks.push(Track {
                key,
                hex: report.hex.clone(),
                flight: report.flight.clone(),
                position,
                distance_km,
                bearing_deg,
                heading_deg,
                altitude_ft: report.altitude_ft.unwrap_or(-1),
                ground_speed_kt: report.ground_speed_kt.unwrap_or(-1.0),
                vertical_rate_fpm: report.vertical_rate_fpm,
                squawk: report.squawk.clone(),
                on_ground: report.on_ground,
                last_message_age_sec: report.seconds_since_last_message,
                signal_rssi: report.signal_rssi,
                category: report.category.clone(),
                altitude_descent_confirmed,
            });
        }

        self.previous_positions = next_positions;
        self.altitude_samples = next_samples;
        self.tracks = std::sync::Arc::new(tracks);
        self.snapshot()
    }

    /// Drops every track and all history.
    pub fn clear(&mut self) {
        self.tracks = std::sync::Arc::new(Vec::new());
        self.previous_positions.clear();
        self.altitude_samples.clear();
    }

    /// Drops tracks beyond a newly reduced range without waiting for the next batch.
    pub fn restrict_range(&mut self, range_km: f64) {
        if self.tracks.iter().all(|track| track.distance_km <= range_km) {
            return;
        }
        let kept: Vec<Track> = self
            .tracks
            .iter()
            .filter(|track| track.distance_km <= range_km)
            .cloned()
            .collect();
        self.tracks = std::sync::Arc::new(kept);
    }

    #[must_use]
    pub fn snapshot(&self) -> std::sync::Arc<Vec<Track>> {
        std::sync::Arc::clone(&self.tracks)
    }

    #[must_use]
    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Track> {
        self.tracks.iter().find(|track| track.key == key)
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }
}

/// Direction of travel: feed course, else displacement since the last update, else bearing.
fn derive_heading(
    course_deg: Option<f64>,
    previous: Option<GeoPoint>,
    current: GeoPoint,
    bearing_deg: f64,
) -> f64 {
    if let Some(course) = course_deg.filter(|course| course.is_finite()) {
        return geodesy::normalize_degrees(course);
    }
    let Some(previous) = previous else {
        return bearing_deg;
    };
    if previous == current {
        return bearing_deg;
    }
    let displacement = geodesy::bearing_deg(previous, current);
    if displacement.is_finite() {
        displacement
    } else {
        bearing_deg
    }
}
