use crate::event::EventKind;
use crate::frame::FrameNumber;
use std::fmt;
use std::time::{Duration, Instant};
use lazy_static::lazy_static;



lazy_static! {
    // Every journal stamps against the same epoch so entries from separate
    // sessions in one process can still be compared.
    static ref EPOCH: Instant = Instant::now();
}

pub(crate) fn now() -> Duration {
    EPOCH.elapsed()
}



#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LogEntry {
    pub kind: EventKind,
    pub frame: FrameNumber,
    pub timestamp: Duration
}

impl LogEntry {
    pub fn new(kind: EventKind, frame: FrameNumber) -> Self {
        Self { kind, frame, timestamp: now() }
    }
}



/// Append-only record of everything the monitor saw, kept in memory so that
/// printing doesn't disturb the timing of the callbacks.
#[derive(Clone, Debug, Default)]
pub struct EventJournal {
    entries: Vec<LogEntry>
}

impl EventJournal {
    pub fn with_capacity(capacity: usize) -> Self {
        Self { entries: Vec::with_capacity(capacity) }
    }

    pub fn push(&mut self, kind: EventKind, frame: FrameNumber) {
        self.entries.push(LogEntry::new(kind, frame));
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn count(&self, kind: EventKind) -> usize {
        self.entries.iter().filter(|e| e.kind == kind).count()
    }
}

impl From<Vec<LogEntry>> for EventJournal {
    fn from(entries: Vec<LogEntry>) -> Self {
        Self { entries }
    }
}

impl fmt::Display for EventJournal {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(fmt, "Time [ms]    Event                 FrameNumber")?;
        writeln!(fmt, "------------ --------------------- -----------")?;

        let mut prev: Option<Duration> = None;

        for entry in &self.entries {
            // Elapsed time since the previous entry, not since the epoch
            let delta_ms = match prev {
                Some(p) => entry.timestamp.saturating_sub(p).as_secs_f64() * 1000.0,
                None => 0.0
            };

            writeln!(fmt, "{:12.4} {} {}", delta_ms, entry.kind.label(), entry.frame)?;
            prev = Some(entry.timestamp);
        }

        Ok(())
    }
}
