//! Live-status sinks.
//!
//! `NdjsonStatus` streams detection and GPS events as newline-delimited
//! JSON on stdout, for a dashboard or companion process to consume.
//! `ConsoleStatus` keeps a running detection count and logs a status line
//! on each heartbeat.

use std::io::{self, Write};

use roadhound::record::DetectionRecord;
use roadhound::sink::{PositionStatus, StatusSink};
use serde::Serialize;

#[derive(Serialize)]
#[serde(tag = "event")]
enum StatusLine<'a> {
    #[serde(rename = "detection")]
    Detection {
        #[serde(flatten)]
        record: &'a DetectionRecord,
    },
    #[serde(rename = "gps")]
    Gps {
        status: &'static str,
        #[serde(skip_serializing_if = "Option::is_none")]
        lat: Option<f64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        lon: Option<f64>,
    },
}

/// NDJSON event stream on stdout.
pub struct NdjsonStatus {
    out: io::Stdout,
}

impl NdjsonStatus {
    pub fn stdout() -> Self {
        Self { out: io::stdout() }
    }

    fn emit(&mut self, line: &StatusLine) {
        match serde_json::to_string(line) {
            Ok(json) => {
                let _ = writeln!(self.out.lock(), "{json}");
            }
            Err(e) => log::warn!("status line serialization failed: {e}"),
        }
    }
}

impl StatusSink for NdjsonStatus {
    fn on_detection(&mut self, record: &DetectionRecord) {
        self.emit(&StatusLine::Detection { record });
    }

    fn on_position_status(
        &mut self,
        status: PositionStatus,
        latitude: Option<f64>,
        longitude: Option<f64>,
    ) {
        self.emit(&StatusLine::Gps {
            status: status.as_str(),
            lat: latitude,
            lon: longitude,
        });
    }
}

/// Heartbeat-driven status line in the log.
pub struct ConsoleStatus {
    detections: u64,
}

impl ConsoleStatus {
    pub fn new() -> Self {
        Self { detections: 0 }
    }
}

impl StatusSink for ConsoleStatus {
    fn on_detection(&mut self, _record: &DetectionRecord) {
        self.detections += 1;
    }

    fn on_position_status(
        &mut self,
        status: PositionStatus,
        _latitude: Option<f64>,
        _longitude: Option<f64>,
    ) {
        log::info!(
            "status: running | detections: {} | gps: {}",
            self.detections,
            status.as_str()
        );
    }
}
