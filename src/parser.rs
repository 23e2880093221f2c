pub mod builder;
mod constants;

use crate::parser::builder::build_report_from_value;
use crate::types::{AircraftReport, GeoPoint};

#[derive(Debug)]
pub enum FeedDocumentError {
    Json(serde_json::Error),
    MissingAircraftArray,
}

impl std::fmt::Display for FeedDocumentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FeedDocumentError::Json(err) => write!(f, "Feed document is not valid JSON: {err}"),
            FeedDocumentError::MissingAircraftArray => {
                write!(f, "Feed document has no aircraft array")
            }
        }
    }
}

impl std::error::Error for FeedDocumentError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FeedDocumentError::Json(err) => Some(err),
            FeedDocumentError::MissingAircraftArray => None,
        }
    }
}

/// Decodes an `aircraft.json` document.
///
/// Malformed entries are skipped one by one; only a document that is not JSON
/// or carries no `aircraft` array is an error.
pub fn parse_feed_document(document: &str) -> Result<Vec<AircraftReport>, FeedDocumentError> {
    let value: serde_json::Value =
        serde_json::from_str(document).map_err(FeedDocumentError::Json)?;
    let entries = value
        .get(constants::AIRCRAFT)
        .and_then(serde_json::Value::as_array)
        .ok_or(FeedDocumentError::MissingAircraftArray)?;

    let mut reports = Vec::with_capacity(entries.len());
    for entry in entries {
        match build_report_from_value(entry) {
            Ok(report) => reports.push(report),
            Err(err) => log::debug!("Skipping aircraft entry: {err}"),
        }
    }
    Ok(reports)
}

/// Decodes a `receiver.json` document into the receiver's own location, if it reports one.
#[must_use]
pub fn parse_receiver_document(document: &str) -> Option<GeoPoint> {
    let value: serde_json::Value = serde_json::from_str(document).ok()?;
    let lat = value.get(constants::LATITUDE)?.as_f64()?;
    let lon = value.get(constants::LONGITUDE)?.as_f64()?;
    Some(GeoPoint::new(lat, lon)).filter(GeoPoint::is_finite)
}
