/// Position tracker — owns the current best-known fix.
///
/// A background thread runs a connect/read/reconnect loop against an
/// injected sentence source (the daemon supplies a serial port; tests
/// supply in-memory readers). Any I/O failure drops back to reconnect
/// after a fixed backoff, forever. Parse failures are expected on noisy
/// links and are skipped without comment; only valid-solution sentences
/// replace the shared fix, which persists stale across disconnects.
use std::io::{self, BufRead};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use crate::nmea;
use crate::record::PositionFix;

/// Backoff between connection attempts.
pub const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Bounded wait for the reader thread during shutdown.
const STOP_JOIN_WAIT: Duration = Duration::from_secs(2);

/// Shared handle to the current fix. Cloneable; reads copy the fix out
/// under the guard, so a snapshot is never half-written.
#[derive(Debug, Clone, Default)]
pub struct FixCell {
    inner: Arc<Mutex<Option<PositionFix>>>,
}

impl FixCell {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the latest fix, or `None` if no valid sentence has been
    /// seen yet. Safe to call from any thread.
    pub fn current_fix(&self) -> Option<PositionFix> {
        self.inner.lock().ok().and_then(|guard| guard.clone())
    }

    pub(crate) fn replace(&self, fix: PositionFix) {
        if let Ok(mut guard) = self.inner.lock() {
            *guard = Some(fix);
        }
    }
}

/// A factory producing a fresh sentence stream per connection attempt.
pub type SourceFactory = dyn FnMut() -> io::Result<Box<dyn BufRead + Send>> + Send;

/// Background position tracker.
pub struct PositionTracker {
    fix: FixCell,
    stop: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl PositionTracker {
    /// A tracker with no source: `current_fix()` is permanently absent.
    /// Used when no position source could be found, so the rest of the
    /// pipeline keeps running without enrichment.
    pub fn disabled() -> Self {
        Self {
            fix: FixCell::new(),
            stop: Arc::new(AtomicBool::new(false)),
            handle: None,
        }
    }

    /// Spawn the reader thread against a source factory. The factory is
    /// invoked once per connection attempt.
    pub fn spawn<F>(connect: F) -> Self
    where
        F: FnMut() -> io::Result<Box<dyn BufRead + Send>> + Send + 'static,
    {
        let fix = FixCell::new();
        let stop = Arc::new(AtomicBool::new(false));

        let thread_fix = fix.clone();
        let thread_stop = Arc::clone(&stop);
        let handle = thread::Builder::new()
            .name("gps".into())
            .spawn(move || read_loop(connect, thread_fix, thread_stop))
            .ok();
        if handle.is_none() {
            log::warn!("position tracker thread failed to start; GPS disabled");
        }

        Self {
            fix,
            stop,
            handle,
        }
    }

    /// Cheap cloneable reader for the current fix.
    pub fn fix(&self) -> FixCell {
        self.fix.clone()
    }

    /// Snapshot of the latest fix.
    pub fn current_fix(&self) -> Option<PositionFix> {
        self.fix.current_fix()
    }

    /// Request shutdown and wait a bounded couple of seconds for the
    /// reader thread. A thread stuck in a blocking read is abandoned; the
    /// process may exit regardless.
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let deadline = Instant::now() + STOP_JOIN_WAIT;
            while !handle.is_finished() && Instant::now() < deadline {
                thread::sleep(Duration::from_millis(25));
            }
            if handle.is_finished() {
                let _ = handle.join();
            }
        }
    }
}

fn read_loop<F>(mut connect: F, fix: FixCell, stop: Arc<AtomicBool>)
where
    F: FnMut() -> io::Result<Box<dyn BufRead + Send>>,
{
    while !stop.load(Ordering::Relaxed) {
        let mut reader = match connect() {
            Ok(reader) => {
                log::info!("position source connected");
                reader
            }
            Err(e) => {
                log::warn!(
                    "position source connect failed: {e}; retrying in {}s",
                    RECONNECT_DELAY.as_secs()
                );
                sleep_unless_stopped(RECONNECT_DELAY, &stop);
                continue;
            }
        };

        let mut line = String::new();
        loop {
            if stop.load(Ordering::Relaxed) {
                return;
            }
            line.clear();
            match reader.read_line(&mut line) {
                Ok(0) => break, // EOF: source went away, reconnect
                Ok(_) => {
                    if let Some(new_fix) = nmea::parse_sentence(&line) {
                        fix.replace(new_fix);
                    }
                }
                // Serial read timeouts just give us a chance to poll the
                // stop flag; binary noise that isn't UTF-8 is a bad line,
                // not a dead link.
                Err(e)
                    if e.kind() == io::ErrorKind::TimedOut
                        || e.kind() == io::ErrorKind::WouldBlock
                        || e.kind() == io::ErrorKind::InvalidData =>
                {
                    continue
                }
                Err(e) => {
                    log::warn!("position source read error: {e}");
                    break;
                }
            }
        }

        sleep_unless_stopped(RECONNECT_DELAY, &stop);
    }
}

fn sleep_unless_stopped(total: Duration, stop: &AtomicBool) {
    let deadline = Instant::now() + total;
    while Instant::now() < deadline {
        if stop.load(Ordering::Relaxed) {
            return;
        }
        thread::sleep(Duration::from_millis(50));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const GGA_VALID: &str =
        "$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*47\n";

    fn cursor_source(data: String) -> Box<dyn BufRead + Send> {
        Box::new(Cursor::new(data.into_bytes()))
    }

    fn wait_for_fix(tracker: &PositionTracker) -> Option<PositionFix> {
        let deadline = Instant::now() + Duration::from_secs(2);
        while Instant::now() < deadline {
            if let Some(fix) = tracker.current_fix() {
                return Some(fix);
            }
            thread::sleep(Duration::from_millis(10));
        }
        None
    }

    #[test]
    fn fix_absent_before_any_valid_sentence() {
        let tracker = PositionTracker::disabled();
        assert!(tracker.current_fix().is_none());
    }

    #[test]
    fn valid_sentence_updates_fix() {
        let mut served = false;
        let mut tracker = PositionTracker::spawn(move || {
            if served {
                return Err(io::Error::new(io::ErrorKind::NotFound, "gone"));
            }
            served = true;
            Ok(cursor_source(GGA_VALID.to_string()))
        });

        let fix = wait_for_fix(&tracker).expect("fix should arrive");
        assert!((fix.latitude - 48.1173).abs() < 1e-4);
        tracker.stop();
    }

    #[test]
    fn invalid_sentences_never_produce_a_fix() {
        let mut served = false;
        let mut tracker = PositionTracker::spawn(move || {
            if served {
                return Err(io::Error::new(io::ErrorKind::NotFound, "gone"));
            }
            served = true;
            Ok(cursor_source(
                "$GPGGA,123519,4807.038,N,01131.000,E,0,00,,,M,,M,,\n\
                 garbage line\n\
                 $GPRMC,123519,V,4807.038,N,01131.000,E,022.4,084.4,230394,003.1,W\n"
                    .to_string(),
            ))
        });

        thread::sleep(Duration::from_millis(200));
        assert!(tracker.current_fix().is_none());
        tracker.stop();
    }

    #[test]
    fn fix_persists_across_disconnect() {
        // First connection serves one valid sentence then hits EOF; every
        // later attempt fails. The fix must survive the disconnect.
        let mut attempts = 0u32;
        let mut tracker = PositionTracker::spawn(move || {
            attempts += 1;
            if attempts == 1 {
                Ok(cursor_source(GGA_VALID.to_string()))
            } else {
                Err(io::Error::new(io::ErrorKind::NotFound, "unplugged"))
            }
        });

        let fix = wait_for_fix(&tracker).expect("fix should arrive");
        // Give the loop time to hit EOF and enter reconnect.
        thread::sleep(Duration::from_millis(100));
        let after = tracker.current_fix().expect("fix should persist");
        assert_eq!(after, fix);
        tracker.stop();
    }

    #[test]
    fn invalid_fix_does_not_clear_previous_fix() {
        let mut served = false;
        let mut tracker = PositionTracker::spawn(move || {
            if served {
                return Err(io::Error::new(io::ErrorKind::NotFound, "gone"));
            }
            served = true;
            Ok(cursor_source(format!(
                "{GGA_VALID}$GPGGA,123520,4807.038,N,01131.000,E,0,00,,,M,,M,,\n"
            )))
        });

        let fix = wait_for_fix(&tracker).expect("fix should arrive");
        thread::sleep(Duration::from_millis(100));
        assert_eq!(tracker.current_fix(), Some(fix));
        tracker.stop();
    }

    #[test]
    fn concurrent_reads_see_only_complete_fixes() {
        // Stream many sentences where the satellite count always equals
        // the altitude; a torn snapshot would break that pairing.
        let mut sentences = String::new();
        for i in 1..=60u32 {
            let sats = (i % 12) + 1;
            sentences.push_str(&format!(
                "$GPGGA,123519,4807.038,N,01131.000,E,1,{sats:02},0.9,{sats}.0,M,46.9,M,,\n"
            ));
        }
        let mut served = false;
        let mut tracker = PositionTracker::spawn(move || {
            if served {
                return Err(io::Error::new(io::ErrorKind::NotFound, "gone"));
            }
            served = true;
            Ok(cursor_source(sentences.clone()))
        });

        let cell = tracker.fix();
        let readers: Vec<_> = (0..4)
            .map(|_| {
                let cell = cell.clone();
                thread::spawn(move || {
                    let deadline = Instant::now() + Duration::from_millis(300);
                    while Instant::now() < deadline {
                        if let Some(fix) = cell.current_fix() {
                            assert_eq!(
                                fix.altitude, fix.satellites as f64,
                                "torn snapshot observed"
                            );
                        }
                    }
                })
            })
            .collect();

        for reader in readers {
            reader.join().expect("reader thread panicked");
        }
        tracker.stop();
    }

    #[test]
    fn stop_returns_promptly_while_connecting() {
        let mut tracker = PositionTracker::spawn(|| {
            Err(io::Error::new(io::ErrorKind::NotFound, "no port"))
        });
        thread::sleep(Duration::from_millis(50));
        let started = Instant::now();
        tracker.stop();
        assert!(started.elapsed() < STOP_JOIN_WAIT);
    }
}
