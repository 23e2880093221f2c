use crate::engine::ConnectionState;
use crate::scope::{ScopeSnapshot, ScopeViewer};
use crate::task_manager::SteppableTask;
use crate::types::Track;

/// Most contacts listed per log line.
const MAX_LISTED_CONTACTS: usize = 8;

/// Headless stand-in for the scope window: logs the ticker and contact list
/// whenever they change.
pub struct TerminalRenderer {
    pub viewer: ScopeViewer,
    last_ticker: Option<String>,
    last_connection: Option<ConnectionState>,
    last_contacts: Vec<String>,
}

impl TerminalRenderer {
    #[must_use]
    pub fn new(viewer: ScopeViewer) -> Self {
        Self {
            viewer,
            last_ticker: None,
            last_connection: None,
            last_contacts: Vec::new(),
        }
    }

    /// Lines worth printing for this snapshot; empty when nothing changed.
    fn observe(&mut self, snapshot: &ScopeSnapshot) -> Vec<String> {
        let mut lines = Vec::new();

        if self.last_connection != Some(snapshot.connection) {
            self.last_connection = Some(snapshot.connection);
            lines.push(format!("Status: {}", snapshot.connection.label()));
        }

        let ticker = snapshot
            .frame
            .as_ref()
            .and_then(|frame| frame.notification.as_ref())
            .map(|shown| {
                if shown.notification.alert {
                    format!("ALERT {}", shown.notification.text)
                } else {
                    shown.notification.text.clone()
                }
            });
        if ticker.is_some() && ticker != self.last_ticker {
            lines.push(format!("Ticker: {}", ticker.as_deref().unwrap_or_default()));
        }
        self.last_ticker = ticker;

        let mut contacts: Vec<&Track> = snapshot.tracks.iter().collect();
        contacts.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));
        let contact_keys: Vec<String> = contacts.iter().map(|track| track.key.clone()).collect();
        if contact_keys != self.last_contacts {
            self.last_contacts = contact_keys;
            let listed: Vec<String> = contacts
                .iter()
                .take(MAX_LISTED_CONTACTS)
                .map(|track| contact_line(track))
                .collect();
            lines.push(format!("Contacts ({}): {}", contacts.len(), listed.join(" | ")));
        }

        lines
    }
}

fn contact_line(track: &Track) -> String {
    let altitude = if track.has_altitude() {
        format!("{}ft", track.altitude_ft)
    } else {
        String::from("---")
    };
    format!(
        "{} {:.1}km {:03.0}° {}",
        track.display_name(),
        track.distance_km,
        track.bearing_deg,
        altitude
    )
}

impl SteppableTask for TerminalRenderer {
    fn step(&mut self) -> bool {
        let snapshot = self.viewer.read().clone();
        for line in self.observe(&snapshot) {
            log::info!("{line}");
        }
        true
    }
}
