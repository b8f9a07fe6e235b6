/// Output sink contracts consumed by the dispatcher.
///
/// Sinks are independent collaborators — persistence, alert feedback, and
/// the live-status surface. The pipeline core never depends on their
/// internals, and a failure in one sink never reaches another.
use crate::record::DetectionRecord;

#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("i/o: {0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Other(String),
}

/// Append-only detection persistence. `record_detection` must return
/// within a short bound; `finalize` is called exactly once at shutdown.
pub trait DetectionSink: Send {
    fn record_detection(&mut self, record: &DetectionRecord) -> Result<(), SinkError>;

    fn finalize(&mut self) -> Result<(), SinkError> {
        Ok(())
    }
}

/// Fire-and-forget operator feedback (audio, buzzer, console bell).
pub trait AlertSink: Send {
    fn on_boot(&mut self) {}

    fn on_detection(&mut self, threat_score: u8);

    fn on_heartbeat(&mut self) {}
}

/// Whether the position tracker currently holds a fix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionStatus {
    Searching,
    Fix,
}

impl PositionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PositionStatus::Searching => "SEARCHING",
            PositionStatus::Fix => "FIX",
        }
    }
}

/// Live-status surface: full records plus periodic position status.
pub trait StatusSink: Send {
    fn on_detection(&mut self, record: &DetectionRecord);

    fn on_position_status(
        &mut self,
        status: PositionStatus,
        latitude: Option<f64>,
        longitude: Option<f64>,
    );
}
