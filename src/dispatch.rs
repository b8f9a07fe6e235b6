/// Pipeline dispatch — one consumer thread fanning finished detections
/// out to independently-owned sinks.
///
/// Both adapters push scored candidates into a single bounded channel, so
/// per-adapter capture order is preserved without forcing either adapter
/// onto the other's execution model. Enrichment happens here, reading the
/// most recent fix at the moment a candidate is drained; later fix updates
/// never touch an already-dispatched record.
use std::sync::mpsc::{self, Receiver, SyncSender};

use chrono::Local;

use crate::record::{enrich, DetectionCandidate};
use crate::sink::{AlertSink, DetectionSink, PositionStatus, StatusSink};
use crate::tracker::FixCell;

/// Events drained by the dispatcher thread.
#[derive(Debug)]
pub enum PipelineEvent {
    Detection(DetectionCandidate),
    /// Periodic tick from the heartbeat timer; drives alert heartbeats and
    /// position-status updates.
    Heartbeat,
}

/// Channel depth. Adapters produce at radio-event rates; the dispatcher
/// only formats and forwards, so a small bound is plenty.
pub const CHANNEL_DEPTH: usize = 64;

/// Create the bounded pipeline channel.
pub fn channel() -> (SyncSender<PipelineEvent>, Receiver<PipelineEvent>) {
    mpsc::sync_channel(CHANNEL_DEPTH)
}

/// Fan-out dispatcher. Holds the sinks and the fix handle; performs no
/// transformation beyond enrichment and keeps no other state.
pub struct Dispatcher {
    detection_sinks: Vec<Box<dyn DetectionSink>>,
    alert_sinks: Vec<Box<dyn AlertSink>>,
    status_sinks: Vec<Box<dyn StatusSink>>,
    fix: FixCell,
}

impl Dispatcher {
    pub fn new(fix: FixCell) -> Self {
        Self {
            detection_sinks: Vec::new(),
            alert_sinks: Vec::new(),
            status_sinks: Vec::new(),
            fix,
        }
    }

    pub fn add_detection_sink(&mut self, sink: Box<dyn DetectionSink>) {
        self.detection_sinks.push(sink);
    }

    pub fn add_alert_sink(&mut self, sink: Box<dyn AlertSink>) {
        self.alert_sinks.push(sink);
    }

    pub fn add_status_sink(&mut self, sink: Box<dyn StatusSink>) {
        self.status_sinks.push(sink);
    }

    /// Fire boot feedback on all alert sinks.
    pub fn boot(&mut self) {
        for sink in &mut self.alert_sinks {
            sink.on_boot();
        }
    }

    /// Drain the channel until every sender is gone, then finalize the
    /// persistence sinks. Runs on its own thread for the process lifetime.
    pub fn run(mut self, events: Receiver<PipelineEvent>) {
        while let Ok(event) = events.recv() {
            match event {
                PipelineEvent::Detection(candidate) => self.handle_detection(candidate),
                PipelineEvent::Heartbeat => self.handle_heartbeat(),
            }
        }
        self.finalize();
    }

    fn handle_detection(&mut self, candidate: DetectionCandidate) {
        let fix = self.fix.current_fix();
        let record = enrich(candidate, Local::now(), fix.as_ref());

        log::info!(
            "DETECTED {} [{} {} rssi {} score {}]",
            record.description,
            record.protocol.as_str(),
            record.mac,
            record.rssi,
            record.threat_score,
        );

        for sink in &mut self.detection_sinks {
            if let Err(e) = sink.record_detection(&record) {
                log::warn!("detection sink failed: {e}");
            }
        }
        for sink in &mut self.alert_sinks {
            sink.on_detection(record.threat_score);
        }
        for sink in &mut self.status_sinks {
            sink.on_detection(&record);
        }
    }

    fn handle_heartbeat(&mut self) {
        let fix = self.fix.current_fix();
        let status = if fix.is_some() {
            PositionStatus::Fix
        } else {
            PositionStatus::Searching
        };

        for sink in &mut self.alert_sinks {
            sink.on_heartbeat();
        }
        for sink in &mut self.status_sinks {
            sink.on_position_status(
                status,
                fix.as_ref().map(|f| f.latitude),
                fix.as_ref().map(|f| f.longitude),
            );
        }
    }

    fn finalize(&mut self) {
        for sink in &mut self.detection_sinks {
            if let Err(e) = sink.finalize() {
                log::warn!("detection sink finalize failed: {e}");
            }
        }
    }
}
