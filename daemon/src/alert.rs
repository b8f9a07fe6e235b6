//! Console alert feedback.
//!
//! The terminal-bell fallback of a buzzer: more bells for higher threat
//! scores. GPIO/audio hardware feedback would slot in here as another
//! `AlertSink`.

use std::io::{self, Write};

use roadhound::sink::AlertSink;

pub struct ConsoleAlert;

impl ConsoleAlert {
    fn bell(count: usize) {
        let mut out = io::stderr();
        for _ in 0..count {
            let _ = out.write_all(b"\x07");
        }
        let _ = out.flush();
    }
}

impl AlertSink for ConsoleAlert {
    fn on_boot(&mut self) {
        Self::bell(2);
        log::info!("alert feedback ready");
    }

    fn on_detection(&mut self, threat_score: u8) {
        // Same tiers as the buzzer patterns: critical, high, medium.
        let count = if threat_score >= 90 {
            4
        } else if threat_score >= 70 {
            3
        } else {
            2
        };
        Self::bell(count);
    }
}
