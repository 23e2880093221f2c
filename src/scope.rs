use crate::engine::{AlertLogEntry, ConnectionState, FrameOutput, RadarEngine};
use crate::ingestor::FeedUpdate;
use crate::labels::{MonospaceMeasure, TextMeasure};
use crate::task_manager::SteppableTask;
use crate::types::Track;

/// Surface size used when no window is attached.
pub const HEADLESS_SURFACE: (f64, f64) = (800.0, 800.0);

/// Feeds queued updates into the engine and runs frames against the wall clock.
pub struct ScopeDriver {
    engine: RadarEngine,
    feed_receiver: crossbeam_channel::Receiver<FeedUpdate>,
    last_frame: Option<std::time::Instant>,
}

impl ScopeDriver {
    #[must_use]
    pub fn new(engine: RadarEngine, feed_receiver: crossbeam_channel::Receiver<FeedUpdate>) -> Self {
        ScopeDriver {
            engine,
            feed_receiver,
            last_frame: None,
        }
    }

    /// Applies every update waiting on the channel. Returns how many were applied.
    pub fn pump_feed(&mut self) -> usize {
        let updates: Vec<FeedUpdate> = self.feed_receiver.try_iter().collect();
        let count = updates.len();
        for update in updates {
            self.engine.handle_feed_update(update);
        }
        count
    }

    pub fn frame(&mut self, width: f64, height: f64, measure: &dyn TextMeasure) -> FrameOutput {
        let instant = std::time::Instant::now();
        let dt_sec = self
            .last_frame
            .map_or(0.0, |last| instant.duration_since(last).as_secs_f64());
        self.last_frame = Some(instant);
        self.engine
            .on_frame(chrono::Utc::now(), dt_sec, width, height, measure)
    }

    #[must_use]
    pub fn engine(&self) -> &RadarEngine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut RadarEngine {
        &mut self.engine
    }
}

/// What readers on other threads get to see after each frame.
#[derive(Debug, Clone)]
pub struct ScopeSnapshot {
    pub frame: Option<FrameOutput>,
    pub tracks: std::sync::Arc<Vec<Track>>,
    pub connection: ConnectionState,
    pub info_lines: Vec<(&'static str, String)>,
    pub range_lines: Vec<(&'static str, String)>,
    pub recent_alerts: Vec<AlertLogEntry>,
    pub frame_count: u64,
}

impl Default for ScopeSnapshot {
    fn default() -> Self {
        ScopeSnapshot {
            frame: None,
            tracks: std::sync::Arc::new(Vec::new()),
            connection: ConnectionState::WaitingForData,
            info_lines: Vec::new(),
            range_lines: Vec::new(),
            recent_alerts: Vec::new(),
            frame_count: 0,
        }
    }
}

/// Headless scope thread: one frame per step, published for the viewers.
pub struct ScopeTask {
    driver: ScopeDriver,
    measure: MonospaceMeasure,
    inner: std::sync::Arc<std::sync::RwLock<ScopeSnapshot>>,
}

impl ScopeTask {
    #[must_use]
    pub fn new(driver: ScopeDriver) -> Self {
        ScopeTask {
            driver,
            measure: MonospaceMeasure::default(),
            inner: std::sync::Arc::new(std::sync::RwLock::new(ScopeSnapshot::default())),
        }
    }

    #[must_use]
    pub fn get_scope_viewer(&self) -> ScopeViewer {
        ScopeViewer {
            inner: self.inner.clone(),
        }
    }
}

impl SteppableTask for ScopeTask {
    fn step(&mut self) -> bool {
        let applied = self.driver.pump_feed();
        if applied > 0 {
            log::debug!("Scope applied {applied} feed updates");
        }
        let (width, height) = HEADLESS_SURFACE;
        let frame = self.driver.frame(width, height, &self.measure);
        let engine = self.driver.engine();

        if let Ok(mut snapshot) = self.inner.write() {
            snapshot.frame = Some(frame);
            snapshot.tracks = engine.tracks();
            snapshot.connection = engine.connection();
            snapshot.info_lines = engine.info_lines();
            snapshot.range_lines = engine.range_lines();
            snapshot.recent_alerts = engine.recent_alerts().cloned().collect();
            snapshot.frame_count += 1;
            return true;
        }
        false
    }
}

#[derive(Clone)]
pub struct ScopeViewer {
    inner: std::sync::Arc<std::sync::RwLock<ScopeSnapshot>>,
}

impl ScopeViewer {
    #[allow(clippy::missing_panics_doc)]
    pub fn read(&self) -> std::sync::RwLockReadGuard<ScopeSnapshot> {
        self.inner.read().expect("Read lock poisoned")
    }
}

#[cfg(test)]
mod tests {
    use super::{ScopeDriver, ScopeTask};
    use crate::audio::RecordingToneSink;
    use crate::config::ApplicationConfig;
    use crate::engine::{ConnectionState, RadarEngine};
    use crate::ingestor::FeedUpdate;
    use crate::preferences::MemoryPreferences;
    use crate::task_manager::SteppableTask;
    use crate::types::AircraftReport;

    fn driver() -> (ScopeDriver, crossbeam_channel::Sender<FeedUpdate>) {
        let engine = RadarEngine::new(
            &ApplicationConfig::default(),
            Box::new(MemoryPreferences::new()),
            Box::new(RecordingToneSink::default()),
        );
        let (sender, receiver) = crossbeam_channel::unbounded();
        (ScopeDriver::new(engine, receiver), sender)
    }

    fn batch() -> FeedUpdate {
        FeedUpdate::Batch {
            reports: vec![AircraftReport {
                hex: String::from("ABC123"),
                latitude: 54.1,
                longitude: -1.0,
                ..AircraftReport::default()
            }],
            receiver: None,
            received_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn when_updates_queued_then_pump_applies_them_in_order() {
        let (mut driver, sender) = driver();
        sender.send(batch()).unwrap();
        sender
            .send(FeedUpdate::Failed {
                reason: String::from("timeout"),
                at: chrono::Utc::now(),
            })
            .unwrap();

        assert_eq!(driver.pump_feed(), 2);
        assert!(driver.engine().tracks().is_empty());
        assert_eq!(driver.engine().connection(), ConnectionState::Lost);
        assert_eq!(driver.pump_feed(), 0);
    }

    #[test]
    fn when_scope_task_steps_then_viewer_sees_published_snapshot() {
        let (driver, sender) = driver();
        let mut task = ScopeTask::new(driver);
        let viewer = task.get_scope_viewer();
        assert!(viewer.read().frame.is_none());

        sender.send(batch()).unwrap();
        assert!(task.step());

        let snapshot = viewer.read();
        assert_eq!(snapshot.frame_count, 1);
        assert_eq!(snapshot.tracks.len(), 1);
        assert_eq!(snapshot.connection, ConnectionState::Connected);
        assert_eq!(snapshot.range_lines[0], ("Range", String::from("50 km")));
        assert!(snapshot.frame.is_some());
    }
}
