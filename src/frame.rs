/// 802.11 management-frame parsing, using the ieee80211 crate for
/// zero-copy frame dissection.
///
/// Only beacons and probe requests cross the adapter boundary; every other
/// frame class is dropped here, before matching is attempted.
use ieee80211::match_frames;
use ieee80211::mgmt_frame::{BeaconFrame, ProbeRequestFrame};

use crate::record::EventKind;

/// A parsed management frame event.
#[derive(Debug, Clone)]
pub struct WifiFrameEvent {
    pub mac: [u8; 6],
    pub ssid: String,
    pub rssi: i32,
    /// `Beacon` or `ProbeRequest` — no other subtype is produced.
    pub subtype: EventKind,
}

/// Parse a raw 802.11 frame into a [`WifiFrameEvent`].
///
/// Returns `None` for anything that is not a beacon or probe request, and
/// for frames too malformed to dissect. `rssi` is supplied by the capture
/// layer (zero when the link layer exposes no power indicator).
pub fn parse_frame(frame: &[u8], rssi: i32) -> Option<WifiFrameEvent> {
    let result = match_frames! {
        frame,
        beacon = BeaconFrame<'_> => {
            WifiFrameEvent {
                mac: beacon.header.transmitter_address.0,
                ssid: beacon.body.ssid().unwrap_or("").to_string(),
                rssi,
                subtype: EventKind::Beacon,
            }
        }
        probe_req = ProbeRequestFrame<'_> => {
            WifiFrameEvent {
                mac: probe_req.header.transmitter_address.0,
                ssid: probe_req.body.ssid().unwrap_or("").to_string(),
                rssi,
                subtype: EventKind::ProbeRequest,
            }
        }
    };

    result.ok()
}

/// Format a 6-byte MAC in normalized form (uppercase hex, no separators).
pub fn mac_string(mac: &[u8; 6]) -> String {
    format!(
        "{:02X}{:02X}{:02X}{:02X}{:02X}{:02X}",
        mac[0], mac[1], mac[2], mac[3], mac[4], mac[5]
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build a minimal beacon frame: management header, fixed fields,
    /// then an SSID element.
    fn beacon_frame(ta: [u8; 6], ssid: &str) -> Vec<u8> {
        let mut frame = vec![
            0x80, 0x00, // frame control: management / beacon
            0x00, 0x00, // duration
            0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, // addr1: broadcast
        ];
        frame.extend_from_slice(&ta); // addr2: transmitter
        frame.extend_from_slice(&ta); // addr3: BSSID
        frame.extend_from_slice(&[0x00, 0x00]); // sequence control
        frame.extend_from_slice(&[0x00; 8]); // timestamp
        frame.extend_from_slice(&[0x64, 0x00]); // beacon interval
        frame.extend_from_slice(&[0x11, 0x04]); // capabilities
        frame.push(0x00); // element id: SSID
        frame.push(ssid.len() as u8);
        frame.extend_from_slice(ssid.as_bytes());
        frame.extend_from_slice(&[0x01, 0x01, 0x82]); // supported rates
        frame
    }

    fn probe_request_frame(ta: [u8; 6], ssid: &str) -> Vec<u8> {
        let mut frame = vec![
            0x40, 0x00, // frame control: management / probe request
            0x00, 0x00, // duration
            0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, // addr1: broadcast
        ];
        frame.extend_from_slice(&ta);
        frame.extend_from_slice(&[0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF]); // addr3
        frame.extend_from_slice(&[0x00, 0x00]); // sequence control
        frame.push(0x00); // element id: SSID
        frame.push(ssid.len() as u8);
        frame.extend_from_slice(ssid.as_bytes());
        frame.extend_from_slice(&[0x01, 0x01, 0x82]); // supported rates
        frame
    }

    const TA: [u8; 6] = [0x58, 0x8E, 0x81, 0x11, 0x22, 0x33];

    #[test]
    fn parses_beacon_with_ssid() {
        let frame = beacon_frame(TA, "Flock-Camera-3");
        let event = parse_frame(&frame, -52).expect("beacon should parse");
        assert_eq!(event.mac, TA);
        assert_eq!(event.ssid, "Flock-Camera-3");
        assert_eq!(event.rssi, -52);
        assert_eq!(event.subtype, EventKind::Beacon);
    }

    #[test]
    fn parses_probe_request() {
        let frame = probe_request_frame(TA, "Flock-A1B2C3");
        let event = parse_frame(&frame, 0).expect("probe request should parse");
        assert_eq!(event.subtype, EventKind::ProbeRequest);
        assert_eq!(event.ssid, "Flock-A1B2C3");
        assert_eq!(event.rssi, 0);
    }

    #[test]
    fn beacon_with_empty_ssid_yields_empty_name() {
        let frame = beacon_frame(TA, "");
        let event = parse_frame(&frame, -80).expect("beacon should parse");
        assert_eq!(event.ssid, "");
    }

    #[test]
    fn non_management_frames_are_dropped() {
        // Data frame: type bits = 10.
        let mut frame = vec![0x08, 0x00, 0x00, 0x00];
        frame.extend_from_slice(&[0xAA; 6]);
        frame.extend_from_slice(&TA);
        frame.extend_from_slice(&[0xBB; 6]);
        frame.extend_from_slice(&[0x00, 0x00]);
        assert!(parse_frame(&frame, -40).is_none());
    }

    #[test]
    fn truncated_frames_are_dropped() {
        assert!(parse_frame(&[0x80, 0x00, 0x00], 0).is_none());
        assert!(parse_frame(&[], 0).is_none());
    }

    #[test]
    fn mac_string_is_normalized() {
        assert_eq!(mac_string(&TA), "588E81112233");
    }
}
