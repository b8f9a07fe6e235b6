//! Roadhound — Linux surveillance-device detection daemon.
//!
//! Wires the portable detection engine to real radios: a monitor-mode
//! 802.11 capture thread, a BLE advertisement scan thread, a serial GPS
//! tracker, and a dispatcher thread fanning detections out to the session
//! log, alert feedback, and the live-status surface. No subsystem failure
//! is fatal — whatever cannot start is disabled and the rest keeps
//! hunting. Only ctrl-c ends the process.

mod alert;
mod ble;
mod csvlog;
mod gps;
mod status;
mod wifi;

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::SyncSender;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Result;
use clap::Parser;

use roadhound::dispatch::{self, Dispatcher, PipelineEvent};
use roadhound::signatures::SignatureSet;

/// Interval between heartbeat ticks.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(10);

#[derive(Parser)]
#[command(name = "roadhound", version)]
#[command(about = "Passive surveillance device scanner (WiFi + BLE + GPS)")]
struct Cli {
    /// Serial port for the GPS receiver (auto-detect if omitted).
    #[arg(long)]
    gps_port: Option<String>,

    /// WiFi interface in monitor mode. WiFi scanning is disabled if omitted.
    #[arg(long)]
    wifi_interface: Option<String>,

    /// Disable BLE scanning.
    #[arg(long)]
    no_ble: bool,

    /// Disable WiFi scanning.
    #[arg(long)]
    no_wifi: bool,

    /// Directory for session logs (CSV + KML).
    #[arg(long, default_value = "logs")]
    log_dir: PathBuf,

    /// Minimum RSSI threshold in dBm; weaker signals are ignored.
    #[arg(long, default_value_t = -90)]
    min_rssi: i32,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .init();

    let cli = Cli::parse();
    let min_rssi = cli.min_rssi;

    log::info!("roadhound v{} starting", env!("CARGO_PKG_VERSION"));

    let catalog = Arc::new(SignatureSet::builtin());
    log::info!(
        "signature catalog: {} MAC prefixes, {} name patterns, {} SSID patterns, {} service UUIDs",
        catalog.mac_prefix_count(),
        catalog.name_pattern_count(),
        catalog.ssid_pattern_count(),
        catalog.service_count(),
    );

    // ── Shutdown flag ────────────────────────────────────────────────

    let stop = Arc::new(AtomicBool::new(false));
    {
        let stop = Arc::clone(&stop);
        ctrlc::set_handler(move || {
            log::info!("interrupt received; shutting down");
            stop.store(true, Ordering::Relaxed);
        })?;
    }

    // ── Position tracker ─────────────────────────────────────────────

    let mut tracker = gps::start_tracker(cli.gps_port.clone());

    // ── Dispatcher ───────────────────────────────────────────────────

    let (events_tx, events_rx) = dispatch::channel();

    let mut dispatcher = Dispatcher::new(tracker.fix());
    match csvlog::SessionLog::create(&cli.log_dir) {
        Ok(sink) => dispatcher.add_detection_sink(Box::new(sink)),
        Err(e) => log::warn!("session log disabled: {e}"),
    }
    dispatcher.add_alert_sink(Box::new(alert::ConsoleAlert));
    dispatcher.add_status_sink(Box::new(status::NdjsonStatus::stdout()));
    dispatcher.add_status_sink(Box::new(status::ConsoleStatus::new()));
    dispatcher.boot();

    let dispatcher_handle = thread::Builder::new()
        .name("dispatch".into())
        .spawn(move || dispatcher.run(events_rx))?;

    // ── Adapters ─────────────────────────────────────────────────────

    let mut workers = Vec::new();

    if cli.no_wifi {
        log::info!("wifi scanning disabled by flag");
    } else if let Some(interface) = cli.wifi_interface.clone() {
        let catalog = Arc::clone(&catalog);
        let events = events_tx.clone();
        let stop = Arc::clone(&stop);
        workers.push(
            thread::Builder::new()
                .name("wifi".into())
                .spawn(move || wifi::capture_loop(interface, catalog, min_rssi, events, stop))?,
        );
    } else {
        log::info!("no wifi interface specified; wifi scanning disabled");
    }

    if cli.no_ble {
        log::info!("ble scanning disabled by flag");
    } else {
        let catalog = Arc::clone(&catalog);
        let events = events_tx.clone();
        let stop = Arc::clone(&stop);
        workers.push(
            thread::Builder::new()
                .name("ble".into())
                .spawn(move || ble::scan_loop(catalog, min_rssi, events, stop))?,
        );
    }

    // ── Heartbeat ────────────────────────────────────────────────────

    {
        let events = events_tx.clone();
        let stop = Arc::clone(&stop);
        workers.push(
            thread::Builder::new()
                .name("heartbeat".into())
                .spawn(move || heartbeat_loop(events, stop))?,
        );
    }

    // The dispatcher exits once every producer has dropped its sender.
    drop(events_tx);

    log::info!("system active; hunting for signals (ctrl-c to stop)");

    for worker in workers {
        let _ = worker.join();
    }
    let _ = dispatcher_handle.join();
    tracker.stop();

    log::info!("goodbye");
    Ok(())
}

fn heartbeat_loop(events: SyncSender<PipelineEvent>, stop: Arc<AtomicBool>) {
    loop {
        let deadline = Instant::now() + HEARTBEAT_INTERVAL;
        while Instant::now() < deadline {
            if stop.load(Ordering::Relaxed) {
                return;
            }
            thread::sleep(Duration::from_millis(100));
        }
        if events.send(PipelineEvent::Heartbeat).is_err() {
            return;
        }
    }
}
