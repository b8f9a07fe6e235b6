/// Canonical detection records and position fixes.
///
/// A scored candidate leaves its adapter, crosses the dispatch channel,
/// and is enriched into an immutable [`DetectionRecord`] with a timestamp
/// and a by-value copy of the latest position fix. Records serialize to
/// JSON for the live-status surface.
use chrono::{DateTime, Local, NaiveTime};
use serde::Serialize;

/// Radio source a detection came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Protocol {
    #[serde(rename = "BLE")]
    Ble,
    #[serde(rename = "WiFi")]
    Wifi,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Ble => "BLE",
            Protocol::Wifi => "WiFi",
        }
    }
}

/// Adapter-specific event classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EventKind {
    Advertisement,
    Beacon,
    ProbeRequest,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Advertisement => "Advertisement",
            EventKind::Beacon => "Beacon",
            EventKind::ProbeRequest => "ProbeRequest",
        }
    }
}

/// A satellite position fix.
///
/// Created only from sentences reporting a valid solution; replaced as a
/// whole, never field-by-field. Altitude and satellite count default to
/// zero for sentence types that do not carry them.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionFix {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f64,
    /// Fix quality indicator (GGA field 6; 1 for a valid RMC solution).
    pub quality: u8,
    pub satellites: u8,
    /// UTC time carried by the sentence, when parseable.
    pub time: Option<NaiveTime>,
}

/// A scored detection before enrichment. Identifier is already normalized
/// (uppercase, separators stripped).
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionCandidate {
    pub protocol: Protocol,
    pub kind: EventKind,
    pub mac: String,
    pub name: String,
    pub rssi: i32,
    pub threat_score: u8,
    pub description: String,
}

/// The canonical detection record delivered to sinks.
///
/// Position fields are omitted entirely when no fix was available at
/// enrichment time, so consumers can distinguish "no fix" from a fix at
/// 0,0.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectionRecord {
    pub timestamp: String,
    pub protocol: Protocol,
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub mac: String,
    pub name: String,
    pub rssi: i32,
    pub threat_score: u8,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub altitude: Option<f64>,
}

/// Attach a timestamp and the current position fix to a scored candidate.
///
/// The fix is copied by value: later fix updates never alter a record that
/// has already been dispatched.
pub fn enrich(
    candidate: DetectionCandidate,
    at: DateTime<Local>,
    fix: Option<&PositionFix>,
) -> DetectionRecord {
    DetectionRecord {
        timestamp: at.to_rfc3339(),
        protocol: candidate.protocol,
        kind: candidate.kind,
        mac: candidate.mac,
        name: candidate.name,
        rssi: candidate.rssi,
        threat_score: candidate.threat_score,
        description: candidate.description,
        latitude: fix.map(|f| f.latitude),
        longitude: fix.map(|f| f.longitude),
        altitude: fix.map(|f| f.altitude),
    }
}
