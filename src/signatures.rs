/// Signature catalog for surveillance device detection.
///
/// Identifier prefixes, device/network name patterns, and vendor BLE
/// service UUIDs for Flock Safety cameras, FS Ext Battery units, Penguin
/// and Pigvision devices, and Raven gunshot detectors.
///
/// The catalog is built once at startup and passed by reference to the
/// adapters — there is no module-level global, so tests can run against
/// alternate catalogs.
use std::fmt;

use uuid::{uuid, Uuid};

/// Known MAC address prefixes (colon form, normalized at construction).
static MAC_PREFIXES: &[&str] = &[
    // FS Ext Battery devices
    "58:8e:81",
    "cc:cc:cc",
    "ec:1b:bd",
    "90:35:ea",
    "04:0d:84",
    "f0:82:c0",
    "1c:34:f1",
    "38:5b:44",
    "94:34:69",
    "b4:e3:f9",
    // Flock WiFi devices
    "70:c9:4e",
    "3c:91:80",
    "d8:f3:bc",
    "80:30:49",
    "14:5a:fc",
    "74:4c:a1",
    "08:3a:88",
    "9c:2f:9d",
    "94:08:53",
    "e4:aa:ea",
];

/// Device name patterns for BLE advertisements (case-insensitive substring).
static NAME_PATTERNS: &[&str] = &["FS Ext Battery", "Penguin", "Flock", "Pigvision"];

/// Network name patterns for WiFi SSIDs (case-insensitive substring).
static SSID_PATTERNS: &[&str] = &["Flock", "FS Ext Battery", "Penguin", "Pigvision"];

/// Which firmware generation a Raven service UUID is associated with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceGeneration {
    /// Advertised across all known firmware versions.
    AllFirmware,
    /// Introduced with firmware 1.2.0.
    V12Plus,
    /// Only advertised by legacy 1.1.x firmware.
    Legacy,
}

/// A vendor BLE service signature: UUID, human-readable description, and
/// the firmware generation it is associated with.
#[derive(Debug, Clone)]
pub struct ServiceSignature {
    pub uuid: Uuid,
    pub description: &'static str,
    pub generation: ServiceGeneration,
}

/// Raven Device Information Service (used across all firmware versions).
const RAVEN_DEVICE_INFO: Uuid = uuid!("0000180a-0000-1000-8000-00805f9b34fb");
/// Raven GPS Location Service (firmware 1.2.0+).
const RAVEN_GPS: Uuid = uuid!("00003100-0000-1000-8000-00805f9b34fb");
/// Raven Power/Battery Service (firmware 1.2.0+).
const RAVEN_POWER: Uuid = uuid!("00003200-0000-1000-8000-00805f9b34fb");
/// Raven Network Status Service (firmware 1.2.0+).
const RAVEN_NETWORK: Uuid = uuid!("00003300-0000-1000-8000-00805f9b34fb");
/// Raven Upload Statistics Service (firmware 1.2.0+).
const RAVEN_UPLOAD: Uuid = uuid!("00003400-0000-1000-8000-00805f9b34fb");
/// Raven Error/Failure Service (firmware 1.2.0+).
const RAVEN_ERROR: Uuid = uuid!("00003500-0000-1000-8000-00805f9b34fb");
/// Health Thermometer Service (firmware 1.1.7).
const RAVEN_OLD_HEALTH: Uuid = uuid!("00001809-0000-1000-8000-00805f9b34fb");
/// Location and Navigation Service (firmware 1.1.7).
const RAVEN_OLD_LOCATION: Uuid = uuid!("00001819-0000-1000-8000-00805f9b34fb");

/// Estimated Raven firmware generation, inferred from the advertised
/// service set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FirmwareGeneration {
    Legacy11,
    V12,
    V13,
    Unknown,
}

impl fmt::Display for FirmwareGeneration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FirmwareGeneration::Legacy11 => "1.1.x (Legacy)",
            FirmwareGeneration::V12 => "1.2.x",
            FirmwareGeneration::V13 => "1.3.x (Latest)",
            FirmwareGeneration::Unknown => "Unknown Version",
        };
        f.write_str(s)
    }
}

/// Normalize a raw identifier to uppercase hex with separators stripped.
///
/// `"58:8E:81:aa-bb-cc"` and `"588e81aabbcc"` both normalize to
/// `"588E81AABBCC"`. All prefix comparisons and all stored identifiers use
/// this form.
pub fn normalize_mac(raw: &str) -> String {
    raw.chars()
        .filter(|c| *c != ':' && *c != '-')
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

/// Immutable signature catalog with case- and separator-insensitive lookup.
#[derive(Debug, Clone)]
pub struct SignatureSet {
    mac_prefixes: Vec<String>,
    name_patterns: Vec<String>,
    ssid_patterns: Vec<String>,
    services: Vec<ServiceSignature>,
}

impl SignatureSet {
    /// Build a catalog from raw parts. Prefixes are normalized, name and
    /// SSID patterns are lowercased.
    pub fn new(
        mac_prefixes: &[&str],
        name_patterns: &[&str],
        ssid_patterns: &[&str],
        services: Vec<ServiceSignature>,
    ) -> Self {
        Self {
            mac_prefixes: mac_prefixes.iter().map(|p| normalize_mac(p)).collect(),
            name_patterns: name_patterns.iter().map(|p| p.to_lowercase()).collect(),
            ssid_patterns: ssid_patterns.iter().map(|p| p.to_lowercase()).collect(),
            services,
        }
    }

    /// The compiled-in catalog.
    pub fn builtin() -> Self {
        Self::new(MAC_PREFIXES, NAME_PATTERNS, SSID_PATTERNS, builtin_services())
    }

    /// Check an identifier (any separator convention) against the known
    /// prefixes.
    pub fn matches_mac_prefix(&self, mac: &str) -> bool {
        let id = normalize_mac(mac);
        self.mac_prefixes.iter().any(|p| id.starts_with(p.as_str()))
    }

    /// Check a device name against the name patterns (case-insensitive
    /// substring).
    pub fn matches_name(&self, name: &str) -> bool {
        let lower = name.to_lowercase();
        self.name_patterns.iter().any(|p| lower.contains(p.as_str()))
    }

    /// Check a network name against the SSID patterns (case-insensitive
    /// substring).
    pub fn matches_ssid(&self, ssid: &str) -> bool {
        let lower = ssid.to_lowercase();
        self.ssid_patterns.iter().any(|p| lower.contains(p.as_str()))
    }

    /// Return the known vendor service signatures present in an advertised
    /// service list. Empty when none match.
    pub fn matched_services(&self, advertised: &[Uuid]) -> Vec<&ServiceSignature> {
        self.services
            .iter()
            .filter(|s| advertised.contains(&s.uuid))
            .collect()
    }

    /// Infer the Raven firmware generation from an advertised service set.
    ///
    /// Legacy location service without the new GPS service marks 1.1.x;
    /// the GPS service without the power service marks 1.2.x; GPS plus
    /// power marks 1.3.x.
    pub fn firmware_generation(&self, advertised: &[Uuid]) -> FirmwareGeneration {
        if advertised.is_empty() {
            return FirmwareGeneration::Unknown;
        }

        let has_gps = advertised.contains(&RAVEN_GPS);
        let has_old_location = advertised.contains(&RAVEN_OLD_LOCATION);
        let has_power = advertised.contains(&RAVEN_POWER);

        if has_old_location && !has_gps {
            FirmwareGeneration::Legacy11
        } else if has_gps && !has_power {
            FirmwareGeneration::V12
        } else if has_gps && has_power {
            FirmwareGeneration::V13
        } else {
            FirmwareGeneration::Unknown
        }
    }

    pub fn mac_prefix_count(&self) -> usize {
        self.mac_prefixes.len()
    }

    pub fn name_pattern_count(&self) -> usize {
        self.name_patterns.len()
    }

    pub fn ssid_pattern_count(&self) -> usize {
        self.ssid_patterns.len()
    }

    pub fn service_count(&self) -> usize {
        self.services.len()
    }
}

fn builtin_services() -> Vec<ServiceSignature> {
    vec![
        ServiceSignature {
            uuid: RAVEN_DEVICE_INFO,
            description: "Device Information (Serial, Model, Firmware)",
            generation: ServiceGeneration::AllFirmware,
        },
        ServiceSignature {
            uuid: RAVEN_GPS,
            description: "GPS Location Service (Lat/Lon/Alt)",
            generation: ServiceGeneration::V12Plus,
        },
        ServiceSignature {
            uuid: RAVEN_POWER,
            description: "Power Management (Battery/Solar)",
            generation: ServiceGeneration::V12Plus,
        },
        ServiceSignature {
            uuid: RAVEN_NETWORK,
            description: "Network Status (LTE/WiFi)",
            generation: ServiceGeneration::V12Plus,
        },
        ServiceSignature {
            uuid: RAVEN_UPLOAD,
            description: "Upload Statistics Service",
            generation: ServiceGeneration::V12Plus,
        },
        ServiceSignature {
            uuid: RAVEN_ERROR,
            description: "Error/Failure Tracking Service",
            generation: ServiceGeneration::V12Plus,
        },
        ServiceSignature {
            uuid: RAVEN_OLD_HEALTH,
            description: "Health/Temperature Service (Legacy)",
            generation: ServiceGeneration::Legacy,
        },
        ServiceSignature {
            uuid: RAVEN_OLD_LOCATION,
            description: "Location Service (Legacy)",
            generation: ServiceGeneration::Legacy,
        },
    ]
}
