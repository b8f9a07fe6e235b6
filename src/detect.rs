/// Normalization, signature matching, and threat scoring.
///
/// Each adapter computes its match signals and converts them to a score
/// through a fixed precedence table, evaluated top to bottom, first match
/// wins. The two tables deliberately disagree on the identifier-prefix-only
/// score (85 for BLE, 70 for WiFi) — both values are kept as observed in
/// the field data rather than unified.
///
/// Events matching nothing produce no candidate at all: downstream
/// counters and history assume only qualifying events arrive.
use uuid::Uuid;

use crate::frame::{self, WifiFrameEvent};
use crate::record::{DetectionCandidate, EventKind, Protocol};
use crate::signatures::SignatureSet;

/// A raw short-range advertisement, as delivered by the BLE scan layer.
#[derive(Debug, Clone)]
pub struct BleAdvertisement {
    /// Advertiser address in whatever separator convention the scan layer
    /// uses; normalized before any comparison.
    pub mac: String,
    pub name: String,
    pub rssi: i32,
    pub services: Vec<Uuid>,
}

/// Evaluate a BLE advertisement against the catalog.
///
/// Precedence: vendor service match (100) over MAC+name (100) over MAC
/// only (85) over name only (70). `None` when nothing matches.
pub fn evaluate_ble(adv: &BleAdvertisement, catalog: &SignatureSet) -> Option<DetectionCandidate> {
    let mac_match = catalog.matches_mac_prefix(&adv.mac);
    let name_match = !adv.name.is_empty() && catalog.matches_name(&adv.name);
    let services = catalog.matched_services(&adv.services);

    let (threat_score, description) = if !services.is_empty() {
        let mut reasons = vec!["Raven Gunshot Detector".to_string()];
        reasons.extend(services.iter().map(|s| s.description.to_string()));
        (100, reasons.join("; "))
    } else if mac_match && name_match {
        (100, "Flock Safety (MAC+Name Match)".to_string())
    } else if mac_match {
        (85, "Flock Safety (MAC Match)".to_string())
    } else if name_match {
        (70, "Flock Safety (Name Match)".to_string())
    } else {
        return None;
    };

    Some(DetectionCandidate {
        protocol: Protocol::Ble,
        kind: EventKind::Advertisement,
        mac: crate::signatures::normalize_mac(&adv.mac),
        name: adv.name.clone(),
        rssi: adv.rssi,
        threat_score,
        description,
    })
}

/// Evaluate a parsed management frame against the catalog.
///
/// Precedence: SSID+MAC (100) over SSID only (85) over MAC only (70).
/// `None` when nothing matches.
pub fn evaluate_wifi(event: &WifiFrameEvent, catalog: &SignatureSet) -> Option<DetectionCandidate> {
    let mac = frame::mac_string(&event.mac);
    let ssid_match = !event.ssid.is_empty() && catalog.matches_ssid(&event.ssid);
    let mac_match = catalog.matches_mac_prefix(&mac);

    let (threat_score, description) = if ssid_match && mac_match {
        (100, "Flock Safety (SSID+MAC)".to_string())
    } else if ssid_match {
        (85, "Flock Safety (SSID Match)".to_string())
    } else if mac_match {
        (70, "Flock Safety (MAC Match)".to_string())
    } else {
        return None;
    };

    Some(DetectionCandidate {
        protocol: Protocol::Wifi,
        kind: event.subtype,
        mac,
        name: event.ssid.clone(),
        rssi: event.rssi,
        threat_score,
        description,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::uuid;

    fn catalog() -> SignatureSet {
        SignatureSet::builtin()
    }

    fn adv(mac: &str, name: &str, services: Vec<Uuid>) -> BleAdvertisement {
        BleAdvertisement {
            mac: mac.into(),
            name: name.into(),
            rssi: -60,
            services,
        }
    }

    fn wifi_event(mac: [u8; 6], ssid: &str, subtype: EventKind) -> WifiFrameEvent {
        WifiFrameEvent {
            mac,
            ssid: ssid.into(),
            rssi: -70,
            subtype,
        }
    }

    const RAVEN_GPS: Uuid = uuid!("00003100-0000-1000-8000-00805f9b34fb");

    // ── BLE precedence table ────────────────────────────────────────

    #[test]
    fn ble_service_match_scores_100() {
        let a = adv("00:11:22:33:44:55", "", vec![RAVEN_GPS]);
        let c = evaluate_ble(&a, &catalog()).expect("service match");
        assert_eq!(c.threat_score, 100);
        assert!(c.description.starts_with("Raven Gunshot Detector"));
        assert!(c.description.contains("GPS Location Service (Lat/Lon/Alt)"));
    }

    #[test]
    fn ble_service_match_wins_over_mac_and_name() {
        let a = adv("58:8E:81:AA:BB:CC", "FS Ext Battery", vec![RAVEN_GPS]);
        let c = evaluate_ble(&a, &catalog()).unwrap();
        assert_eq!(c.threat_score, 100);
        assert!(c.description.starts_with("Raven Gunshot Detector"));
    }

    #[test]
    fn ble_mac_and_name_scores_100() {
        let a = adv("58:8E:81:AA:BB:CC", "FS Ext Battery", vec![]);
        let c = evaluate_ble(&a, &catalog()).unwrap();
        assert_eq!(c.threat_score, 100);
        assert_eq!(c.description, "Flock Safety (MAC+Name Match)");
    }

    #[test]
    fn ble_mac_only_scores_85() {
        let a = adv("58:8E:81:11:22:33", "", vec![]);
        let c = evaluate_ble(&a, &catalog()).unwrap();
        assert_eq!(c.threat_score, 85);
        assert!(c.description.contains("MAC Match"));
        assert_eq!(c.mac, "588E81112233");
        assert_eq!(c.protocol, Protocol::Ble);
        assert_eq!(c.kind, EventKind::Advertisement);
    }

    #[test]
    fn ble_name_only_scores_70() {
        let a = adv("00:11:22:33:44:55", "Penguin-0042", vec![]);
        let c = evaluate_ble(&a, &catalog()).unwrap();
        assert_eq!(c.threat_score, 70);
        assert_eq!(c.description, "Flock Safety (Name Match)");
    }

    #[test]
    fn ble_no_match_yields_nothing() {
        let a = adv("00:11:22:33:44:55", "Fitness Tracker", vec![]);
        assert!(evaluate_ble(&a, &catalog()).is_none());
    }

    // ── WiFi precedence table ───────────────────────────────────────

    #[test]
    fn wifi_ssid_and_mac_scores_100() {
        let e = wifi_event(
            [0x58, 0x8E, 0x81, 0x11, 0x22, 0x33],
            "Flock-A1B2C3",
            EventKind::Beacon,
        );
        let c = evaluate_wifi(&e, &catalog()).unwrap();
        assert_eq!(c.threat_score, 100);
        assert_eq!(c.description, "Flock Safety (SSID+MAC)");
    }

    #[test]
    fn wifi_ssid_only_scores_85() {
        let e = wifi_event(
            [0x00, 0x11, 0x22, 0x33, 0x44, 0x55],
            "Flock-Camera-3",
            EventKind::Beacon,
        );
        let c = evaluate_wifi(&e, &catalog()).unwrap();
        assert_eq!(c.threat_score, 85);
        assert_eq!(c.kind, EventKind::Beacon);
        assert_eq!(c.description, "Flock Safety (SSID Match)");
    }

    #[test]
    fn wifi_mac_only_scores_70() {
        // Identifier-prefix-only is 70 here, unlike the BLE table's 85.
        let e = wifi_event(
            [0x58, 0x8E, 0x81, 0x11, 0x22, 0x33],
            "CoffeeShopGuest",
            EventKind::ProbeRequest,
        );
        let c = evaluate_wifi(&e, &catalog()).unwrap();
        assert_eq!(c.threat_score, 70);
        assert_eq!(c.description, "Flock Safety (MAC Match)");
        assert_eq!(c.kind, EventKind::ProbeRequest);
    }

    #[test]
    fn wifi_no_match_yields_nothing() {
        let e = wifi_event(
            [0x00, 0x11, 0x22, 0x33, 0x44, 0x55],
            "HomeNetwork",
            EventKind::Beacon,
        );
        assert!(evaluate_wifi(&e, &catalog()).is_none());
    }

    #[test]
    fn wifi_empty_ssid_does_not_count_as_ssid_match() {
        let e = wifi_event(
            [0x58, 0x8E, 0x81, 0x11, 0x22, 0x33],
            "",
            EventKind::ProbeRequest,
        );
        let c = evaluate_wifi(&e, &catalog()).unwrap();
        assert_eq!(c.threat_score, 70);
    }

    #[test]
    fn prefix_only_scores_differ_between_adapters() {
        let mac = [0x58, 0x8E, 0x81, 0x11, 0x22, 0x33];
        let ble = evaluate_ble(&adv("58:8E:81:11:22:33", "", vec![]), &catalog()).unwrap();
        let wifi =
            evaluate_wifi(&wifi_event(mac, "", EventKind::Beacon), &catalog()).unwrap();
        assert_eq!(ble.threat_score, 85);
        assert_eq!(wifi.threat_score, 70);
    }
}
