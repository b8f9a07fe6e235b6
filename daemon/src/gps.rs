//! Serial GPS source — port discovery and connection.
//!
//! USB GPS dongles show up as /dev/ttyUSB* or /dev/ttyACM* on Linux; when
//! no port is configured the first match wins. The tracker owns reconnect
//! behavior; this module only supplies fresh connections.

use std::io::{self, BufRead, BufReader};
use std::time::Duration;

use roadhound::tracker::PositionTracker;

pub const BAUD_RATE: u32 = 9600;

/// Serial read timeout — keeps the tracker's stop flag responsive.
const READ_TIMEOUT: Duration = Duration::from_secs(1);

/// Well-known device name prefixes for USB GPS receivers, in preference
/// order.
const PORT_PREFIXES: &[&str] = &["ttyUSB", "ttyACM"];

/// Start the position tracker against a configured or auto-detected port.
/// With no port available the tracker runs disabled and the pipeline
/// continues without enrichment.
pub fn start_tracker(configured: Option<String>) -> PositionTracker {
    let port = configured.or_else(find_port);
    let Some(port) = port else {
        log::warn!("no GPS port found; GPS disabled");
        return PositionTracker::disabled();
    };

    log::info!("using GPS port {port} at {BAUD_RATE} baud");
    PositionTracker::spawn(move || open_port(&port))
}

/// Scan /dev for the first name matching a known GPS dongle pattern.
fn find_port() -> Option<String> {
    let entries = std::fs::read_dir("/dev").ok()?;
    let mut names: Vec<String> = entries
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| entry.file_name().into_string().ok())
        .collect();
    names.sort();

    for prefix in PORT_PREFIXES {
        if let Some(name) = names.iter().find(|name| name.starts_with(prefix)) {
            log::info!("found potential GPS port: /dev/{name}");
            return Some(format!("/dev/{name}"));
        }
    }
    None
}

fn open_port(path: &str) -> io::Result<Box<dyn BufRead + Send>> {
    let port = serialport::new(path, BAUD_RATE)
        .timeout(READ_TIMEOUT)
        .open()
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
    Ok(Box::new(BufReader::new(port)))
}
