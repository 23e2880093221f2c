use crate::parser::{parse_feed_document, parse_receiver_document, FeedDocumentError};
use crate::task_manager::SteppableTask;
use crate::types::{AircraftReport, GeoPoint};
use std::io::{BufRead, Write};

const AIRCRAFT_DOCUMENT: &str = "aircraft.json";
const RECEIVER_DOCUMENT: &str = "receiver.json";

#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// Base URL of the dump1090 data directory.
    pub url: String,
    pub refresh_interval_ms: u64,
    pub timeout_ms: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        FeedConfig {
            url: String::from("http://192.168.50.100:8080/dump1090-fa/data"),
            refresh_interval_ms: 5000,
            timeout_ms: 4000,
        }
    }
}

impl FeedConfig {
    #[must_use]
    pub fn refresh_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.refresh_interval_ms)
    }

    #[must_use]
    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug)]
pub enum FeedError {
    Http(reqwest::Error),
    Status(u16),
    Io {
        source: std::io::Error,
        path: std::path::PathBuf,
    },
    Document(FeedDocumentError),
    /// A replayed stream has no documents left.
    Exhausted,
}

impl std::fmt::Display for FeedError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FeedError::Http(error) => write!(f, "Feed request failed: {error}"),
            FeedError::Status(status) => write!(f, "Feed answered with HTTP status {status}"),
            FeedError::Io {
                source: error,
                path,
            } => write!(f, "Feed file '{}' failed: {}", path.display(), error),
            FeedError::Document(error) => write!(f, "{error}"),
            FeedError::Exhausted => write!(f, "Feed stream exhausted"),
        }
    }
}

impl std::error::Error for FeedError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FeedError::Http(error) => Some(error),
            FeedError::Io { source: error, .. } => Some(error),
            FeedError::Document(error) => Some(error),
            FeedError::Status(_) | FeedError::Exhausted => None,
        }
    }
}

/// What the poller hands to the scope after each refresh.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedUpdate {
    Batch {
        reports: Vec<AircraftReport>,
        receiver: Option<GeoPoint>,
        received_at: chrono::DateTime<chrono::Utc>,
    },
    Failed {
        reason: String,
        at: chrono::DateTime<chrono::Utc>,
    },
}

/// Somewhere raw feed documents come from.
pub trait FeedSource: Send + 'static {
    fn fetch_aircraft(&mut self) -> Result<String, FeedError>;

    /// The receiver's own `receiver.json`, when the source has one.
    fn fetch_receiver(&mut self) -> Result<Option<String>, FeedError> {
        Ok(None)
    }
}

pub struct HttpFeed {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl HttpFeed {
    pub fn new(config: &FeedConfig) -> Result<Self, FeedError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(FeedError::Http)?;
        log::info!("Polling feed at {}", config.url);
        Ok(HttpFeed {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
        })
    }

    fn fetch_document(&self, name: &str) -> Result<String, FeedError> {
        let url = format!("{}/{name}", self.base_url);
        let response = self.client.get(&url).send().map_err(FeedError::Http)?;
        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::Status(status.as_u16()));
        }
        response.text().map_err(FeedError::Http)
    }
}

impl FeedSource for HttpFeed {
    fn fetch_aircraft(&mut self) -> Result<String, FeedError> {
        self.fetch_document(AIRCRAFT_DOCUMENT)
    }

    fn fetch_receiver(&mut self) -> Result<Option<String>, FeedError> {
        self.fetch_document(RECEIVER_DOCUMENT).map(Some)
    }
}

/// Replays a recorded stream: one `aircraft.json` document per line.
pub struct ReplayFeed<R> {
    reader: R,
    path: std::path::PathBuf,
}

impl ReplayFeed<std::io::BufReader<std::fs::File>> {
    pub fn open(path: &std::path::Path) -> Result<Self, FeedError> {
        let file = std::fs::File::open(path).map_err(|error| FeedError::Io {
            source: error,
            path: path.to_path_buf(),
        })?;
        log::info!("Replaying feed from {}", path.display());
        Ok(ReplayFeed::new(std::io::BufReader::new(file), path))
    }
}

impl<R: BufRead> ReplayFeed<R> {
    pub fn new(reader: R, path: &std::path::Path) -> Self {
        ReplayFeed {
            reader,
            path: path.to_path_buf(),
        }
    }
}

impl<R: BufRead + Send + 'static> FeedSource for ReplayFeed<R> {
    fn fetch_aircraft(&mut self) -> Result<String, FeedError> {
        let mut line_buffer = String::new();
        loop {
            line_buffer.clear();
            let bytes_read =
                self.reader
                    .read_line(&mut line_buffer)
                    .map_err(|error| FeedError::Io {
                        source: error,
                        path: self.path.clone(),
                    })?;
            if bytes_read == 0 {
                return Err(FeedError::Exhausted);
            }
            if !line_buffer.trim().is_empty() {
                return Ok(line_buffer.trim().to_string());
            }
        }
    }
}

/// Appends every fetched document as one line, in the format [`ReplayFeed`] reads.
pub struct RawFeedLog {
    writer: std::io::BufWriter<std::fs::File>,
    path: std::path::PathBuf,
}

impl RawFeedLog {
    pub fn create(path: &std::path::Path) -> Result<Self, FeedError> {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|error| FeedError::Io {
                source: error,
                path: path.to_path_buf(),
            })?;
        Ok(RawFeedLog {
            writer: std::io::BufWriter::new(file),
            path: path.to_path_buf(),
        })
    }

    pub fn record(&mut self, document: &str) -> Result<(), FeedError> {
        let single_line = document.replace(['\r', '\n'], " ");
        writeln!(self.writer, "{}", single_line.trim())
            .and_then(|()| self.writer.flush())
            .map_err(|error| FeedError::Io {
                source: error,
                path: self.path.clone(),
            })
    }
}

/// Fetches one document per step and forwards the decoded batch.
pub struct FeedPoller<S: FeedSource> {
    source: S,
    sender: crossbeam_channel::Sender<FeedUpdate>,
    raw_log: Option<RawFeedLog>,
    receiver_location: Option<GeoPoint>,
}

impl<S: FeedSource> FeedPoller<S> {
    #[must_use]
    pub fn new(
        source: S,
        sender: crossbeam_channel::Sender<FeedUpdate>,
        raw_log: Option<RawFeedLog>,
    ) -> Self {
        FeedPoller {
            source,
            sender,
            raw_log,
            receiver_location: None,
        }
    }

    fn refresh_receiver_location(&mut self) {
        if self.receiver_location.is_some() {
            return;
        }
        match self.source.fetch_receiver() {
            Ok(Some(document)) => {
                self.receiver_location = parse_receiver_document(&document);
                if let Some(location) = self.receiver_location {
                    log::info!("Receiver reports its location as {}, {}", location.lat, location.lon);
                }
            }
            Ok(None) => {}
            Err(err) => log::warn!("Failed to fetch receiver location: {err}"),
        }
    }

    fn poll(&mut self) -> Result<FeedUpdate, FeedError> {
        let document = self.source.fetch_aircraft()?;
        if let Some(raw_log) = &mut self.raw_log {
            if let Err(err) = raw_log.record(&document) {
                log::error!("{err}");
            }
        }
        let reports = match parse_feed_document(&document) {
            Ok(reports) => reports,
            Err(err) => {
                log::warn!("{}", FeedError::Document(err));
                Vec::new()
            }
        };
        Ok(FeedUpdate::Batch {
            reports,
            receiver: self.receiver_location,
            received_at: chrono::Utc::now(),
        })
    }
}

impl<S: FeedSource> SteppableTask for FeedPoller<S> {
    fn step(&mut self) -> bool {
        self.refresh_receiver_location();

        let update = match self.poll() {
            Ok(update) => update,
            Err(FeedError::Exhausted) => {
                log::info!("Feed stream exhausted, poller stopping");
                return false;
            }
            Err(err) => {
                log::warn!("{err}");
                FeedUpdate::Failed {
                    reason: err.to_string(),
                    at: chrono::Utc::now(),
                }
            }
        };

        if let Err(err) = self.sender.send(update) {
            log::error!("FeedPoller: Failed to send to channel: {err}");
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::{FeedError, FeedPoller, FeedSource, FeedUpdate, RawFeedLog, ReplayFeed};
    use crate::task_manager::SteppableTask;
    use crate::types::GeoPoint;

    fn replay(contents: &str) -> ReplayFeed<std::io::Cursor<Vec<u8>>> {
        ReplayFeed::new(
            std::io::Cursor::new(contents.as_bytes().to_vec()),
            std::path::Path::new("memory"),
        )
    }

    struct BrokenFeed;

    impl FeedSource for BrokenFeed {
        fn fetch_aircraft(&mut self) -> Result<String, FeedError> {
            Err(FeedError::Status(503))
        }

        fn fetch_receiver(&mut self) -> Result<Option<String>, FeedError> {
            Ok(Some(String::from(r#"{"lat": 54.5, "lon": -1.2, "version": "9.0"}"#)))
        }
    }

    #[test]
    fn when_replaying_then_blank_lines_skipped_and_end_reported() {
        let mut feed = replay("{\"aircraft\": []}\n\n   \n{\"aircraft\": [{\"hex\": \"abc123\"}]}\n");
        assert_eq!(feed.fetch_aircraft().expect("first"), "{\"aircraft\": []}");
        assert!(feed.fetch_aircraft().expect("second").contains("abc123"));
        assert!(matches!(feed.fetch_aircraft(), Err(FeedError::Exhausted)));
    }

    #[test]
    fn when_poller_steps_then_batches_forwarded_until_stream_ends() {
        let (sender, receiver) = crossbeam_channel::unbounded();
        let mut poller = FeedPoller::new(
            replay("{\"aircraft\": [{\"hex\": \"abc123\", \"lat\": 54.1, \"lon\": -1.0}]}\n[1, 2]\n"),
            sender,
            None,
        );

        assert!(poller.step());
        assert!(poller.step());
        assert!(!poller.step());

        let updates: Vec<FeedUpdate> = receiver.try_iter().collect();
        assert_eq!(updates.len(), 2);
        match &updates[0] {
            FeedUpdate::Batch { reports, receiver, .. } => {
                assert_eq!(reports.len(), 1);
                assert_eq!(reports[0].hex, "ABC123");
                assert!(receiver.is_none());
            }
            FeedUpdate::Failed { .. } => panic!("expected a batch"),
        }
        // an unexpected document shape degrades to an empty batch
        assert!(matches!(&updates[1], FeedUpdate::Batch { reports, .. } if reports.is_empty()));
    }

    #[test]
    fn when_source_fails_then_failure_forwarded_and_poller_keeps_running() {
        let (sender, receiver) = crossbeam_channel::unbounded();
        let mut poller = FeedPoller::new(BrokenFeed, sender, None);
        assert!(poller.step());
        assert_eq!(poller.receiver_location, Some(GeoPoint::new(54.5, -1.2)));
        match receiver.try_recv().expect("one update") {
            FeedUpdate::Failed { reason, .. } => assert!(reason.contains("503")),
            FeedUpdate::Batch { .. } => panic!("expected a failure"),
        }
    }

    #[test]
    fn when_channel_closed_then_poller_stops() {
        let (sender, receiver) = crossbeam_channel::unbounded();
        drop(receiver);
        let mut poller = FeedPoller::new(replay("{\"aircraft\": []}\n"), sender, None);
        assert!(!poller.step());
    }

    #[test]
    fn when_raw_documents_logged_then_they_replay_line_by_line() {
        let path = std::env::temp_dir().join(format!("radarscope-raw-{}.jsonl", std::process::id()));
        let _ = std::fs::remove_file(&path);
        {
            let mut log = RawFeedLog::create(&path).expect("temp file");
            log.record("{\"aircraft\":\n []}").expect("write");
            log.record("{\"aircraft\": [{\"hex\": \"abc123\"}]}").expect("write");
        }
        let mut feed = ReplayFeed::open(&path).expect("written file");
        assert_eq!(feed.fetch_aircraft().expect("first"), "{\"aircraft\":  []}");
        assert!(feed.fetch_aircraft().expect("second").contains("abc123"));
        assert!(matches!(feed.fetch_aircraft(), Err(FeedError::Exhausted)));
        let _ = std::fs::remove_file(&path);
    }
}
