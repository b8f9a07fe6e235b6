//! Monitor-mode 802.11 capture adapter.
//!
//! A dedicated thread performs blocking pcap reads; the packet handler
//! runs matching and dispatch synchronously on that same thread. The stop
//! flag is polled once per packet, so capture may lag one packet behind a
//! stop request. Open and read failures (permissions, driver resets) back
//! off and retry forever — the adapter is never fatal to the process.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::SyncSender;
use std::sync::Arc;
use std::time::{Duration, Instant};

use pcap::{Active, Capture, Linktype};
use radiotap::Radiotap;

use roadhound::detect;
use roadhound::dispatch::PipelineEvent;
use roadhound::frame;
use roadhound::signatures::SignatureSet;

/// Backoff between capture attempts after an open or read failure.
const RETRY_DELAY: Duration = Duration::from_secs(5);

/// pcap read timeout, bounding how long a stop request can go unnoticed
/// on a quiet channel.
const READ_TIMEOUT_MS: i32 = 500;

const LINKTYPE_IEEE802_11: Linktype = Linktype(105);
const LINKTYPE_RADIOTAP: Linktype = Linktype(127);

pub fn capture_loop(
    interface: String,
    catalog: Arc<SignatureSet>,
    min_rssi: i32,
    events: SyncSender<PipelineEvent>,
    stop: Arc<AtomicBool>,
) {
    while !stop.load(Ordering::Relaxed) {
        match open_capture(&interface) {
            Ok(capture) => run_capture(capture, &interface, &catalog, min_rssi, &events, &stop),
            Err(e) => log::warn!(
                "wifi capture open failed on {interface}: {e} \
                 (monitor mode and root privileges required)"
            ),
        }

        if stop.load(Ordering::Relaxed) {
            break;
        }
        sleep_unless_stopped(RETRY_DELAY, &stop);
    }
    log::info!("wifi capture stopped");
}

fn open_capture(interface: &str) -> Result<Capture<Active>, pcap::Error> {
    Capture::from_device(interface)?
        .promisc(true)
        .immediate_mode(true)
        .timeout(READ_TIMEOUT_MS)
        .open()
}

fn run_capture(
    mut capture: Capture<Active>,
    interface: &str,
    catalog: &SignatureSet,
    min_rssi: i32,
    events: &SyncSender<PipelineEvent>,
    stop: &AtomicBool,
) {
    let datalink = capture.get_datalink();
    if datalink != LINKTYPE_RADIOTAP && datalink != LINKTYPE_IEEE802_11 {
        log::warn!(
            "{interface} is not delivering 802.11 frames (datalink {}); \
             is the interface in monitor mode?",
            datalink.0
        );
        return;
    }

    log::info!("wifi capture started on {interface}");
    loop {
        if stop.load(Ordering::Relaxed) {
            return;
        }
        match capture.next_packet() {
            Ok(packet) => handle_packet(packet.data, datalink, catalog, min_rssi, events),
            Err(pcap::Error::TimeoutExpired) => continue,
            Err(e) => {
                log::warn!("wifi capture read error: {e}");
                return;
            }
        }
    }
}

fn handle_packet(
    data: &[u8],
    datalink: Linktype,
    catalog: &SignatureSet,
    min_rssi: i32,
    events: &SyncSender<PipelineEvent>,
) {
    let (body, rssi) = strip_radiotap(data, datalink);

    let Some(event) = frame::parse_frame(body, rssi) else {
        return;
    };
    // rssi == 0 means the capture exposed no power indicator; don't let
    // the threshold discard those.
    if rssi != 0 && rssi < min_rssi {
        return;
    }

    if let Some(candidate) = detect::evaluate_wifi(&event, catalog) {
        // Blocking send keeps capture-order delivery for this adapter; the
        // error case only fires during shutdown when the dispatcher is gone.
        let _ = events.send(PipelineEvent::Detection(candidate));
    }
}

/// Slice off the radiotap header and pull the antenna-signal field out of
/// it, best-effort. Malformed headers fall back to the raw length field at
/// bytes 2..4; missing power indicators yield rssi 0.
fn strip_radiotap(data: &[u8], datalink: Linktype) -> (&[u8], i32) {
    if datalink != LINKTYPE_RADIOTAP {
        return (data, 0);
    }

    match Radiotap::from_bytes(data) {
        Ok(parsed) => {
            let rssi = parsed
                .antenna_signal
                .map(|signal| i32::from(signal.value))
                .unwrap_or(0);
            (data.get(parsed.header.length..).unwrap_or(&[]), rssi)
        }
        Err(_) => {
            if data.len() >= 4 {
                let length = u16::from_le_bytes([data[2], data[3]]) as usize;
                if let Some(body) = data.get(length..) {
                    return (body, 0);
                }
            }
            (&[], 0)
        }
    }
}

fn sleep_unless_stopped(total: Duration, stop: &AtomicBool) {
    let deadline = Instant::now() + total;
    while Instant::now() < deadline {
        if stop.load(Ordering::Relaxed) {
            return;
        }
        std::thread::sleep(Duration::from_millis(50));
    }
}
