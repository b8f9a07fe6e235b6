//! Roadhound library — portable surveillance detection engine.
//!
//! This crate contains the full detection pipeline with no radio, capture,
//! or serial platform dependencies, testable on any host with `cargo test`:
//! the signature catalog, event normalization and threat scoring, 802.11
//! management-frame parsing, NMEA position parsing, the position tracker,
//! and the dispatch fan-out that feeds detection sinks.
//!
//! The Linux daemon (`daemon/`) is a thin consumer that provides radio
//! access (monitor-mode capture, BLE scanning), a serial GPS source, and
//! concrete output sinks.

pub mod detect;
pub mod dispatch;
pub mod frame;
pub mod nmea;
pub mod record;
pub mod signatures;
pub mod sink;
pub mod tracker;
