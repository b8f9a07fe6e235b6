//! BLE advertisement scan adapter.
//!
//! The btleplug stack is async, so a dedicated thread drives a small
//! current-thread runtime and blocks on the scan loop — the host-side
//! equivalent of running a radio scan callback on its own thread. The
//! advertisement handler runs matching and dispatch synchronously per
//! event and never blocks: candidates enter the pipeline via `try_send`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{SyncSender, TrySendError};
use std::sync::Arc;
use std::time::Duration;

use btleplug::api::{Central, CentralEvent, Manager as _, Peripheral as _, ScanFilter};
use btleplug::platform::{Adapter, Manager, PeripheralId};
use futures::StreamExt;

use roadhound::detect::{self, BleAdvertisement};
use roadhound::dispatch::PipelineEvent;
use roadhound::signatures::SignatureSet;

/// Backoff between scan attempts after a stack failure.
const RETRY_DELAY: Duration = Duration::from_secs(5);

/// How often the event wait wakes up to poll the stop flag.
const STOP_POLL: Duration = Duration::from_secs(1);

pub fn scan_loop(
    catalog: Arc<SignatureSet>,
    min_rssi: i32,
    events: SyncSender<PipelineEvent>,
    stop: Arc<AtomicBool>,
) {
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            log::error!("ble runtime init failed: {e}; BLE scanning disabled");
            return;
        }
    };

    runtime.block_on(async {
        let manager = match Manager::new().await {
            Ok(manager) => manager,
            Err(e) => {
                log::warn!("ble stack unavailable: {e}; BLE scanning disabled");
                return;
            }
        };

        while !stop.load(Ordering::Relaxed) {
            let adapter = match manager.adapters().await {
                Ok(adapters) => adapters.into_iter().next(),
                Err(e) => {
                    log::warn!("ble adapter enumeration failed: {e}");
                    tokio::time::sleep(RETRY_DELAY).await;
                    continue;
                }
            };
            let Some(adapter) = adapter else {
                log::warn!("no BLE adapter found; BLE scanning disabled");
                return;
            };

            if let Err(e) = scan_session(&adapter, &catalog, min_rssi, &events, &stop).await {
                log::warn!(
                    "ble scan error: {e}; retrying in {}s",
                    RETRY_DELAY.as_secs()
                );
                tokio::time::sleep(RETRY_DELAY).await;
            }
        }
    });
    log::info!("ble scanner stopped");
}

async fn scan_session(
    adapter: &Adapter,
    catalog: &SignatureSet,
    min_rssi: i32,
    events: &SyncSender<PipelineEvent>,
    stop: &AtomicBool,
) -> Result<(), btleplug::Error> {
    let mut stream = adapter.events().await?;
    adapter.start_scan(ScanFilter::default()).await?;
    log::info!("ble scanner started");

    loop {
        if stop.load(Ordering::Relaxed) {
            break;
        }
        match tokio::time::timeout(STOP_POLL, stream.next()).await {
            Err(_) => continue, // timeout tick: poll the stop flag
            Ok(None) => break,  // stream ended, restart the session
            Ok(Some(event)) => {
                if let CentralEvent::DeviceDiscovered(id) | CentralEvent::DeviceUpdated(id) = event
                {
                    handle_advertisement(adapter, &id, catalog, min_rssi, events).await;
                }
            }
        }
    }

    let _ = adapter.stop_scan().await;
    Ok(())
}

async fn handle_advertisement(
    adapter: &Adapter,
    id: &PeripheralId,
    catalog: &SignatureSet,
    min_rssi: i32,
    events: &SyncSender<PipelineEvent>,
) {
    let Ok(peripheral) = adapter.peripheral(id).await else {
        return;
    };
    // Missing properties just mean the advertisement carried nothing
    // usable yet; skip it.
    let Ok(Some(properties)) = peripheral.properties().await else {
        return;
    };

    let advertisement = BleAdvertisement {
        mac: properties.address.to_string(),
        name: properties.local_name.unwrap_or_default(),
        rssi: properties.rssi.map(i32::from).unwrap_or(0),
        services: properties.services,
    };

    if advertisement.rssi != 0 && advertisement.rssi < min_rssi {
        return;
    }

    if !catalog.matched_services(&advertisement.services).is_empty() {
        log::debug!(
            "raven service set advertised by {}; firmware estimate: {}",
            advertisement.mac,
            catalog.firmware_generation(&advertisement.services)
        );
    }

    let Some(candidate) = detect::evaluate_ble(&advertisement, catalog) else {
        return;
    };

    // This handler sits on the scan delivery path — never block on a full
    // channel, drop instead.
    if let Err(TrySendError::Full(_)) = events.try_send(PipelineEvent::Detection(candidate)) {
        log::warn!("dispatch channel full; dropping BLE detection");
    }
}
