use crate::alerts::{AlertEvaluator, AlertEvent, AlertKind};
use crate::audio::{self, ToneSink};
use crate::config::{AirspaceAnnotation, ApplicationConfig};
use crate::geodesy;
use crate::ingestor::FeedUpdate;
use crate::labels::{marker_footprint, CalloutRequest, CalloutStore, PlacedCallout, Rect, TextMeasure};
use crate::notifications::{DisplayedNotification, NotificationQueue};
use crate::preferences::{self, read_parsed, PreferenceStore};
use crate::sweep::{Blip, BlipAnnotation, PaintEvent, ScopeGeometry, SweepDirection, SweepState};
use crate::track_store::{DescentCorroboration, TrackStore};
use crate::types::{AircraftReport, GeoPoint, Track};

pub const MIN_ALERT_RADIUS_KM: f64 = 1.0;
pub const MAX_ALERT_RADIUS_KM: f64 = 20.0;

pub const FEED_FAILURE_NOTICE: &str = "Failed to fetch aircraft data. Check receiver connection.";

const RECENT_ALERT_CAPACITY: usize = 20;
/// Clearance between a marker's footprint and its callout.
const CALLOUT_GAP_PX: f64 = 4.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    WaitingForData,
    Connected,
    Lost,
}

impl ConnectionState {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            ConnectionState::Connected => "Connected",
            ConnectionState::WaitingForData | ConnectionState::Lost => "Waiting for data",
        }
    }
}

/// Where the current reference point came from, highest precedence first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceSource {
    Override,
    Receiver,
    Default,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AlertLogEntry {
    pub at: chrono::DateTime<chrono::Utc>,
    pub key: String,
    pub message: String,
    pub resolved: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BlipView {
    pub blip: Blip,
    pub alpha: f64,
    /// Rotated marker bounds in surface pixels.
    pub marker: Rect,
    pub marker_size: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AirspaceView {
    pub icao: String,
    pub name: String,
    pub center: (f64, f64),
    pub radius_px: f64,
    pub label_rect: Rect,
}

/// Everything needed to draw one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameOutput {
    pub geometry: ScopeGeometry,
    pub beam_bearing_deg: f64,
    pub sweep_id: u64,
    pub blips: Vec<BlipView>,
    pub callouts: Vec<PlacedCallout>,
    pub airspaces: Vec<AirspaceView>,
    pub painted: Vec<PaintEvent>,
    pub notification: Option<DisplayedNotification>,
}

pub struct RadarEngine {
    default_reference: GeoPoint,
    receiver_reference: Option<GeoPoint>,
    override_reference: Option<GeoPoint>,

    range_steps_km: Vec<f64>,
    range_index: usize,
    alert_radius_km: f64,
    volume: u8,
    blip_marker_fraction: f64,

    track_store: TrackStore,
    sweep: SweepState,
    alerts: AlertEvaluator,
    notifications: NotificationQueue,
    callouts: CalloutStore,
    airspaces: Vec<AirspaceAnnotation>,

    selected: Option<String>,
    display_only_selected: bool,
    last_painted: Option<String>,
    connection: ConnectionState,
    recent_alerts: std::collections::VecDeque<AlertLogEntry>,
    failure_notice_duration: chrono::TimeDelta,

    preferences: Box<dyn PreferenceStore>,
    tone_sink: Box<dyn ToneSink>,
}

impl RadarEngine {
    /// Builds an engine from the configuration, letting stored preferences
    /// override the configured range, alert radius, sweep direction and volume.
    #[must_use]
    pub fn new(
        config: &ApplicationConfig,
        preferences: Box<dyn PreferenceStore>,
        tone_sink: Box<dyn ToneSink>,
    ) -> Self {
        let mut range_steps_km: Vec<f64> = config
            .radar
            .range_steps_km
            .iter()
            .copied()
            .filter(|step| step.is_finite() && *step > 0.0)
            .collect();
        if range_steps_km.is_empty() {
            log::warn!("No usable range steps configured, falling back to the defaults");
            range_steps_km = crate::config::RadarConfig::default().range_steps_km;
        }
        let last_index = range_steps_km.len() - 1;

        let mut sweep_speed = config.radar.sweep_speed_deg_per_sec;
        if !(sweep_speed.is_finite() && sweep_speed > 0.0) {
            log::warn!("Unusable sweep speed {sweep_speed} deg/s, falling back to the default");
            sweep_speed = crate::config::RadarConfig::default().sweep_speed_deg_per_sec;
        }

        let range_index = read_parsed::<usize>(preferences.as_ref(), preferences::RANGE_INDEX)
            .unwrap_or(config.radar.default_range_index)
            .min(last_index);
        let alert_radius_km = read_parsed::<f64>(preferences.as_ref(), preferences::ALERT_RADIUS_KM)
            .filter(|radius| radius.is_finite())
            .unwrap_or(config.alerts.base_approach_radius_km)
            .clamp(MIN_ALERT_RADIUS_KM, MAX_ALERT_RADIUS_KM);
        let volume = read_parsed::<u8>(preferences.as_ref(), preferences::VOLUME)
            .unwrap_or(audio::DEFAULT_VOLUME)
            .min(audio::MAX_VOLUME);
        let direction = read_parsed::<SweepDirection>(preferences.as_ref(), preferences::SWEEP_DIRECTION)
            .unwrap_or(config.radar.sweep_direction);

        let corroboration = DescentCorroboration {
            window: chrono::TimeDelta::milliseconds(
                i64::try_from(config.feed.refresh_interval_ms)
                    .unwrap_or(i64::MAX / 4)
                    .saturating_mul(i64::from(config.alerts.corroboration_cycles)),
            ),
            min_drop_ft: config.alerts.rapid_descent_min_drop_ft,
        };

        RadarEngine {
            default_reference: config.receiver.position(),
            receiver_reference: None,
            override_reference: None,
            range_steps_km,
            range_index,
            alert_radius_km,
            volume,
            blip_marker_fraction: config.radar.blip_marker_fraction,
            track_store: TrackStore::new(corroboration),
            sweep: SweepState::new(sweep_speed, direction),
            alerts: AlertEvaluator::new(config.alerts.clone()),
            notifications: NotificationQueue::new(config.notifications.clone()),
            callouts: CalloutStore::new(),
            airspaces: config.airspaces.clone(),
            selected: None,
            display_only_selected: false,
            last_painted: None,
            connection: ConnectionState::WaitingForData,
            recent_alerts: std::collections::VecDeque::with_capacity(RECENT_ALERT_CAPACITY),
            failure_notice_duration: chrono::TimeDelta::milliseconds(
                config.notifications.min_duration_ms.saturating_mul(2),
            ),
            preferences,
            tone_sink,
        }
    }

    pub fn handle_feed_update(&mut self, update: FeedUpdate) {
        match update {
            FeedUpdate::Batch {
                reports,
                receiver,
                received_at,
            } => {
                if let Some(receiver) = receiver {
                    self.set_receiver_reference(receiver);
                }
                self.on_feed_update(&reports, received_at);
            }
            FeedUpdate::Failed { reason, at } => {
                log::debug!("Feed failure: {reason}");
                self.on_feed_failure(at);
            }
        }
    }

    /// Replaces the track set with a new batch and re-evaluates every alert.
    pub fn on_feed_update(&mut self, reports: &[AircraftReport], now: chrono::DateTime<chrono::Utc>) {
        if self.connection != ConnectionState::Connected {
            log::info!("Feed connected");
        }
        self.connection = ConnectionState::Connected;

        let reference = self.reference_point();
        let tracks = self
            .track_store
            .update(reports, reference, self.range_km(), now);

        let outcome = self
            .alerts
            .evaluate(&tracks, reference, self.alert_radius_km, now);
        for event in &outcome.announced {
            self.log_alert(event, now, false);
            if self.alert_surfaces(event) {
                self.notifications
                    .enqueue(event.message.clone(), Some(event.key.clone()), true, None);
            }
        }
        for event in &outcome.resolved {
            self.log_alert(event, now, true);
        }
        self.sync_live_alerts();

        let present: std::collections::HashSet<&str> =
            tracks.iter().map(|track| track.key.as_str()).collect();
        self.sweep.retain_tracks(&present);
        self.callouts.retain(&present);
        if self
            .last_painted
            .as_deref()
            .is_some_and(|key| !present.contains(key))
        {
            self.last_painted = None;
        }
    }

    /// Feed lost: clear everything derived from it and tell the user once.
    pub fn on_feed_failure(&mut self, now: chrono::DateTime<chrono::Utc>) {
        self.track_store.clear();
        self.sweep.reset();
        self.callouts.clear();
        self.last_painted = None;
        for event in self.alerts.clear(now) {
            self.log_alert(&event, now, true);
        }
        self.notifications.sync_live(&[]);

        if self.connection != ConnectionState::Lost {
            log::warn!("Feed lost, clearing the scope");
            self.notifications.enqueue(
                FEED_FAILURE_NOTICE,
                None,
                true,
                Some(self.failure_notice_duration),
            );
        }
        self.connection = ConnectionState::Lost;
    }

    /// Advances the beam by `dt_sec`, paints what it crossed and lays out the frame.
    pub fn on_frame(
        &mut self,
        now: chrono::DateTime<chrono::Utc>,
        dt_sec: f64,
        width: f64,
        height: f64,
        measure: &dyn TextMeasure,
    ) -> FrameOutput {
        let geometry = ScopeGeometry::fit(width, height, self.range_km());
        let step = self.sweep.advance(dt_sec);

        let tracks = self.track_store.snapshot();
        let only_selected = self.display_only_selected;
        let selected = self.selected.as_deref();
        let visible = tracks
            .iter()
            .filter(|track| is_displayed(only_selected, selected, &track.key));
        let alerts = &self.alerts;
        let painted = self.sweep.paint(&step, visible, &geometry, now, |track| {
            annotate(alerts, track)
        });
        self.sweep.prune_blips(now);

        for event in &painted {
            self.last_painted = Some(event.key.clone());
            let focused = self.selected.as_deref().map_or(true, |key| key == event.key);
            if focused {
                if let Some(tone) = audio::paint_cue(event.altitude_ft, self.volume) {
                    self.tone_sink.play_tone(tone);
                }
            }
        }

        let airspaces = self.airspace_views(&geometry, measure);
        let reserved: Vec<Rect> = airspaces.iter().map(|airspace| airspace.label_rect).collect();
        let blips = self.blip_views(&geometry, now);
        let (requests, base_radius) = callout_requests(&blips, measure);
        let surface = Rect::new(0.0, 0.0, geometry.width, geometry.height);
        let callouts = self.callouts.layout(&requests, &reserved, surface, base_radius);

        let notification = self.notifications.tick(now).cloned();

        FrameOutput {
            geometry,
            beam_bearing_deg: self.sweep.beam_bearing_deg(),
            sweep_id: self.sweep.sweep_id(),
            blips,
            callouts,
            airspaces,
            painted,
            notification,
        }
    }

    /// Moves `delta` steps through the range table. Returns whether the range changed.
    pub fn adjust_range(&mut self, delta: i32) -> bool {
        let last_index = self.range_steps_km.len() - 1;
        let target = i64::try_from(self.range_index)
            .unwrap_or(0)
            .saturating_add(i64::from(delta))
            .clamp(0, i64::try_from(last_index).unwrap_or(0));
        let next_index = usize::try_from(target).unwrap_or(0);
        if next_index == self.range_index {
            return false;
        }

        self.range_index = next_index;
        let range_km = self.range_km();
        self.reset_scope();
        self.track_store.restrict_range(range_km);
        self.status_notice(format!("Range: {range_km} km"));
        self.preferences
            .set(preferences::RANGE_INDEX, self.range_index.to_string());
        true
    }

    pub fn adjust_alert_radius(&mut self, delta_km: f64) -> bool {
        let next = (self.alert_radius_km + delta_km).clamp(MIN_ALERT_RADIUS_KM, MAX_ALERT_RADIUS_KM);
        if !next.is_finite() || (next - self.alert_radius_km).abs() < f64::EPSILON {
            return false;
        }
        self.alert_radius_km = next;
        self.status_notice(format!("Alert radius: {next:.1} km"));
        self.preferences
            .set(preferences::ALERT_RADIUS_KM, next.to_string());
        true
    }

    pub fn adjust_volume(&mut self, delta: i32) -> bool {
        let next = (i32::from(self.volume) + delta).clamp(0, i32::from(audio::MAX_VOLUME));
        let next = u8::try_from(next).unwrap_or(audio::MAX_VOLUME);
        if next == self.volume {
            return false;
        }
        self.volume = next;
        self.status_notice(format!("Volume: {next}"));
        self.preferences.set(preferences::VOLUME, next.to_string());
        true
    }

    pub fn set_sweep_direction(&mut self, direction: SweepDirection) {
        if direction == self.sweep.direction() {
            return;
        }
        self.sweep.set_direction(direction);
        self.callouts.clear();
        self.status_notice(format!("Sweep: {}", direction.as_str().replace('_', " ")));
        self.preferences
            .set(preferences::SWEEP_DIRECTION, direction.as_str().to_string());
    }

    /// User override of the reference point; `None` returns to the receiver or default location.
    pub fn set_reference_point(&mut self, point: Option<GeoPoint>) {
        let point = point.filter(GeoPoint::is_finite);
        let before = self.reference_point();
        self.override_reference = point;
        self.on_reference_changed(before);
    }

    pub fn set_receiver_reference(&mut self, point: GeoPoint) {
        if !point.is_finite() || self.receiver_reference == Some(point) {
            return;
        }
        let before = self.reference_point();
        self.receiver_reference = Some(point);
        self.on_reference_changed(before);
    }

    /// Focuses one track (or none). The focused track drives the info panel and audio cue.
    pub fn select_track(&mut self, key: Option<&str>) {
        self.selected = key.map(str::to_string);
        if self.display_only_selected {
            self.sweep.reset();
            self.callouts.clear();
            self.sync_live_alerts();
        }
    }

    pub fn set_display_only_selected(&mut self, enabled: bool) {
        if self.display_only_selected == enabled {
            return;
        }
        self.display_only_selected = enabled;
        self.sweep.reset();
        self.callouts.clear();
        self.sync_live_alerts();
    }

    #[must_use]
    pub fn reference_point(&self) -> GeoPoint {
        self.override_reference
            .or(self.receiver_reference)
            .unwrap_or(self.default_reference)
    }

    #[must_use]
    pub fn reference_source(&self) -> ReferenceSource {
        if self.override_reference.is_some() {
            ReferenceSource::Override
        } else if self.receiver_reference.is_some() {
            ReferenceSource::Receiver
        } else {
            ReferenceSource::Default
        }
    }

    #[must_use]
    pub fn range_km(&self) -> f64 {
        self.range_steps_km[self.range_index]
    }

    #[must_use]
    pub fn alert_radius_km(&self) -> f64 {
        self.alert_radius_km
    }

    #[must_use]
    pub fn volume(&self) -> u8 {
        self.volume
    }

    #[must_use]
    pub fn tracks(&self) -> std::sync::Arc<Vec<Track>> {
        self.track_store.snapshot()
    }

    #[must_use]
    pub fn connection(&self) -> ConnectionState {
        self.connection
    }

    #[must_use]
    pub fn sweep(&self) -> &SweepState {
        &self.sweep
    }

    #[must_use]
    pub fn alerts(&self) -> &AlertEvaluator {
        &self.alerts
    }

    #[must_use]
    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    #[must_use]
    pub fn display_only_selected(&self) -> bool {
        self.display_only_selected
    }

    #[must_use]
    pub fn last_painted(&self) -> Option<&Track> {
        self.last_painted
            .as_deref()
            .and_then(|key| self.track_store.get(key))
    }

    /// The selected track if it is present, else the most recently painted one.
    #[must_use]
    pub fn focus_track(&self) -> Option<&Track> {
        self.selected
            .as_deref()
            .and_then(|key| self.track_store.get(key))
            .or_else(|| self.last_painted())
    }

    /// Newest first.
    #[must_use]
    pub fn recent_alerts(&self) -> impl Iterator<Item = &AlertLogEntry> {
        self.recent_alerts.iter().rev()
    }

    #[must_use]
    pub fn info_lines(&self) -> Vec<(&'static str, String)> {
        let Some(track) = self.focus_track() else {
            return Vec::new();
        };
        vec![
            ("Flight", non_empty_or(&track.flight, "-----")),
            ("Hex", non_empty_or(&track.hex, "-----")),
            ("Distance", format!("{:.1} km", track.distance_km)),
            (
                "Altitude",
                if track.altitude_ft > 0 {
                    format!("{} ft", track.altitude_ft)
                } else {
                    String::from("-----")
                },
            ),
            (
                "Speed",
                if track.ground_speed_kt > 0.0 {
                    format!("{:.0} kt", track.ground_speed_kt)
                } else {
                    String::from("---")
                },
            ),
        ]
    }

    #[must_use]
    pub fn range_lines(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Range", format!("{} km", self.range_km())),
            ("Alert", format!("{:.1} km", self.alert_radius_km)),
            ("Volume", self.volume.to_string()),
            ("Sweep", format!("{}°/s", self.sweep.speed_deg_per_sec())),
        ]
    }

    fn alert_surfaces(&self, event: &AlertEvent) -> bool {
        match (&self.selected, self.display_only_selected) {
            (Some(selected), true) => event.involves(selected),
            _ => true,
        }
    }

    fn sync_live_alerts(&mut self) {
        let live: Vec<(String, String)> = self
            .alerts
            .live_alerts()
            .into_iter()
            .filter(|(key, _)| {
                self.alerts
                    .event(key)
                    .map_or(true, |event| self.alert_surfaces(event))
            })
            .collect();
        self.notifications.sync_live(&live);
    }

    fn log_alert(&mut self, event: &AlertEvent, at: chrono::DateTime<chrono::Utc>, resolved: bool) {
        if self.recent_alerts.len() == RECENT_ALERT_CAPACITY {
            self.recent_alerts.pop_front();
        }
        self.recent_alerts.push_back(AlertLogEntry {
            at,
            key: event.key.clone(),
            message: event.message.clone(),
            resolved,
        });
    }

    fn status_notice(&mut self, text: String) {
        log::info!("{text}");
        self.notifications.enqueue(text, None, false, None);
    }

    /// Paint records and callouts refer to the old scope layout.
    fn reset_scope(&mut self) {
        self.sweep.reset();
        self.callouts.clear();
    }

    fn on_reference_changed(&mut self, before: GeoPoint) {
        let after = self.reference_point();
        if after == before {
            return;
        }
        log::info!(
            "Reference point moved to {}, {} ({:?})",
            after.lat,
            after.lon,
            self.reference_source()
        );
        self.reset_scope();
        self.track_store.clear();
        self.last_painted = None;
    }

    fn airspace_views(&self, geometry: &ScopeGeometry, measure: &dyn TextMeasure) -> Vec<AirspaceView> {
        let reference = self.reference_point();
        self.airspaces
            .iter()
            .filter_map(|airspace| {
                let distance_km = geodesy::distance_km(reference, airspace.position());
                if !distance_km.is_finite() || distance_km > geometry.range_km {
                    return None;
                }
                let bearing_deg = geodesy::bearing_deg(reference, airspace.position());
                let center = geometry.project(bearing_deg, distance_km);
                let (width, height) = measure.measure(&airspace.icao);
                Some(AirspaceView {
                    icao: airspace.icao.clone(),
                    name: airspace.name.clone(),
                    center,
                    radius_px: geometry.km_to_pixels(airspace.radius_km),
                    label_rect: Rect::from_center(center, width, height),
                })
            })
            .collect()
    }

    fn blip_views(&self, geometry: &ScopeGeometry, now: chrono::DateTime<chrono::Utc>) -> Vec<BlipView> {
        let marker_size = geometry.radius * self.blip_marker_fraction;
        self.sweep
            .blips()
            .iter()
            .map(|blip| BlipView {
                blip: blip.clone(),
                alpha: self.sweep.blip_alpha(blip, now),
                marker: marker_footprint((blip.x, blip.y), marker_size, marker_size, blip.heading_deg),
                marker_size,
            })
            .collect()
    }
}

fn is_displayed(only_selected: bool, selected: Option<&str>, track_key: &str) -> bool {
    !only_selected || selected == Some(track_key)
}

fn annotate(alerts: &AlertEvaluator, track: &Track) -> BlipAnnotation {
    let events = alerts.active_for_track(&track.key);
    BlipAnnotation {
        alerting: !events.is_empty(),
        minutes_to_base: events
            .iter()
            .find(|event| event.kind == AlertKind::BaseApproach)
            .and_then(|event| event.eta_minutes),
    }
}

fn non_empty_or(value: &str, placeholder: &str) -> String {
    if value.is_empty() {
        placeholder.to_string()
    } else {
        value.to_string()
    }
}

#[must_use]
pub fn callout_text(blip: &Blip) -> String {
    let mut text = blip.flight.clone();
    if blip.altitude_ft >= 0 {
        text.push_str(&format!(" {}ft", blip.altitude_ft));
    }
    if let Some(minutes) = blip.annotation.minutes_to_base {
        text.push_str(&format!(" {minutes}m"));
    }
    text
}

/// One request per track, taken from its newest blip, in key order.
fn callout_requests(blips: &[BlipView], measure: &dyn TextMeasure) -> (Vec<CalloutRequest>, f64) {
    let mut newest: std::collections::BTreeMap<&str, &BlipView> = std::collections::BTreeMap::new();
    for view in blips {
        newest
            .entry(view.blip.key.as_str())
            .and_modify(|current| {
                if view.blip.spawned_at >= current.blip.spawned_at {
                    *current = view;
                }
            })
            .or_insert(view);
    }

    let base_radius = blips
        .first()
        .map_or(CALLOUT_GAP_PX, |view| view.marker_size / 2.0 + CALLOUT_GAP_PX);
    let requests = newest
        .into_values()
        .map(|view| {
            let text = callout_text(&view.blip);
            CalloutRequest {
                key: view.blip.key.clone(),
                anchor: (view.blip.x, view.blip.y),
                marker: view.marker,
                size: measure.measure(&text),
                text,
            }
        })
        .collect();
    (requests, base_radius)
}
