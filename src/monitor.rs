use crate::config::MonitorConfig;
use crate::error::{Error, Warning};
use crate::event::{EventKind, EventMask, Notification};
use crate::frame::{FrameCounter, FrameNumber};
use crate::journal::{EventJournal, LogEntry};
use crate::Result;
use std::sync::{Mutex, MutexGuard, PoisonError};
use log::{debug, error, info, warn};



/// Called with the frame number once it is safe to move the imaged item or
/// the sensor head. Runs with the monitor locked, so it must not call back
/// into the monitor.
pub trait MoveAction: Send + FnMut(FrameNumber) {}

impl<T> MoveAction for T where T: Send + FnMut(FrameNumber) {}



#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct FrameSequenceState {
    pub next_expected_image: FrameCounter,
    pub next_expected_exposure_end: FrameCounter,
    pub next_frame_for_move: FrameCounter
}

impl FrameSequenceState {
    pub fn new(start: FrameNumber) -> Self {
        Self {
            next_expected_image: FrameCounter::new(start),
            next_expected_exposure_end: FrameCounter::new(start),
            next_frame_for_move: FrameCounter::new(start)
        }
    }
}



struct Inner {
    state: FrameSequenceState,
    journal: EventJournal,
    warnings: Vec<Warning>,
    moves: usize,
    action: Box<dyn MoveAction>
}

impl Inner {
    // Both callers have already checked frame == next_frame_for_move, and this
    // is the only place that counter moves, so a frame can't be moved twice.
    fn invoke_move(&mut self) {
        let frame = self.state.next_frame_for_move.get();

        self.journal.push(EventKind::Move, frame);
        info!("moving item or sensor head after frame {frame}");
        (self.action)(frame);

        self.state.next_frame_for_move.advance();
        self.moves += 1;
    }
}



/// Correlates exposure end and image received notifications by frame number.
///
/// The two `on_*` entry points can be called from different threads in any
/// order. Each call holds one lock for its whole body.
pub struct SequenceMonitor {
    inner: Mutex<Inner>,
    events: EventMask,
    strict_image_sequence: bool
}

impl SequenceMonitor {
    pub fn new<F>(action: F) -> Self
    where F: MoveAction + 'static {
        Self::with_config(&MonitorConfig::default(), action)
    }

    pub fn with_config<F>(config: &MonitorConfig, action: F) -> Self
    where F: MoveAction + 'static {
        let inner = Inner {
            state: FrameSequenceState::new(config.initial_frame),
            journal: EventJournal::with_capacity(config.log_capacity),
            warnings: vec![],
            moves: 0,
            action: Box::new(action)
        };

        Self {
            inner: Mutex::new(inner),
            events: config.events,
            strict_image_sequence: config.strict_image_sequence
        }
    }

    // Nothing under the lock is ever left half-updated, so a panic in a move
    // action on another thread doesn't make the counters untrustworthy.
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn on_exposure_end(&self, frame: FrameNumber) -> Result<()> {
        let mut inner = self.lock();

        inner.journal.push(EventKind::ExposureEnd, frame);
        debug!("exposure end for frame {frame}");

        // Event packets can arrive twice. A repeat of the frame we just
        // accepted is dropped without touching anything.
        if inner.state.next_expected_exposure_end.follows(frame) {
            debug!("duplicate exposure end for frame {frame}");
            return Ok(());
        }

        if inner.state.next_frame_for_move.is(frame) {
            inner.invoke_move();
        }

        let expected = inner.state.next_expected_exposure_end.get();

        if frame != expected {
            error!("exposure end lost: expected frame {expected}, got {frame}");
            return Err(Error::SequenceGap { expected, observed: frame });
        }

        inner.state.next_expected_exposure_end.advance();

        Ok(())
    }

    /// Only fails in strict mode; otherwise a mismatch is recorded as a warning.
    pub fn on_image_received(&self, frame: FrameNumber) -> Result<()> {
        let mut inner = self.lock();

        inner.journal.push(EventKind::ImageReceived, frame);
        debug!("image received for frame {frame}");

        // Covers a lost exposure end, or one that turns up after the image
        if inner.state.next_frame_for_move.is(frame) {
            inner.invoke_move();
        }

        let expected = inner.state.next_expected_image.get();
        let mismatch = if frame != expected {
            let w = Warning::SequenceMismatch { expected, observed: frame };
            warn!("{w}");
            inner.warnings.push(w);
            Some(w)
        }
        else { None };

        inner.state.next_expected_image.advance();

        match mismatch {
            Some(w) if self.strict_image_sequence => Err(w.into_error()),
            _ => Ok(())
        }
    }

    pub fn on_frame_start_overtrigger(&self) {
        let mut inner = self.lock();

        inner.journal.push(EventKind::FrameStartOvertrigger, 0);
        warn!("camera has been overtriggered");
    }

    pub fn handle(&self, notification: Notification) -> Result<()> {
        if !self.events.enables(notification.kind()) {
            debug!("ignoring {notification:?}, event not enabled");
            return Ok(());
        }

        match notification {
            Notification::ExposureEnd(frame) => self.on_exposure_end(frame),
            Notification::ImageReceived(frame) => self.on_image_received(frame),
            Notification::FrameStartOvertrigger => {
                self.on_frame_start_overtrigger();
                Ok(())
            }
        }
    }

    /// Dispatch a camera event by the id it was registered under.
    pub fn handle_camera_event(&self, user_id: i64, frame: FrameNumber) -> Result<()> {
        match EventKind::from_user_id(user_id)? {
            EventKind::ExposureEnd => self.handle(Notification::ExposureEnd(frame)),
            EventKind::FrameStartOvertrigger => self.handle(Notification::FrameStartOvertrigger),
            // Images come in through on_image_received, nothing to do here
            EventKind::ImageReceived => Ok(()),
            EventKind::Move | EventKind::None => Err(Error::UnknownEvent(user_id))
        }
    }

    /// Copy of the log so far, in arrival order. The log itself is kept.
    pub fn drain_log(&self) -> Vec<LogEntry> {
        self.lock().journal.entries().to_vec()
    }

    pub fn journal(&self) -> EventJournal {
        self.lock().journal.clone()
    }

    pub fn state(&self) -> FrameSequenceState {
        self.lock().state
    }

    pub fn warnings(&self) -> Vec<Warning> {
        self.lock().warnings.clone()
    }

    pub fn moves(&self) -> usize {
        self.lock().moves
    }
}



#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, mpsc};
    use std::thread;

    fn monitor_from(start: FrameNumber) -> (SequenceMonitor, mpsc::Receiver<FrameNumber>) {
        let (tx, rx) = mpsc::channel();
        let config = MonitorConfig { initial_frame: start, ..MonitorConfig::default() };
        let monitor = SequenceMonitor::with_config(&config, move |f: FrameNumber| {
            tx.send(f).unwrap();
        });

        (monitor, rx)
    }

    fn kinds(log: &[LogEntry]) -> Vec<(EventKind, FrameNumber)> {
        log.iter().map(|e| (e.kind, e.frame)).collect()
    }

    #[test]
    fn ordered_exposure_ends_advance_counter() {
        let (m, _rx) = monitor_from(0);

        for f in 0..100 {
            m.on_exposure_end(f).unwrap();
        }

        assert_eq!(m.state().next_expected_exposure_end.get(), 100);
        assert_eq!(m.moves(), 100);
    }

    #[test]
    fn ordered_exposure_ends_wrap_around() {
        let (m, _rx) = monitor_from(65530);

        for f in (65530..=65535).chain(0..4) {
            m.on_exposure_end(f).unwrap();
        }

        assert_eq!(m.state().next_expected_exposure_end.get(), 4);
        assert_eq!(m.state().next_frame_for_move.get(), 4);
    }

    #[test]
    fn duplicate_exposure_end_is_ignored() {
        let (m, rx) = monitor_from(0);

        m.on_exposure_end(0).unwrap();
        m.on_exposure_end(0).unwrap();
        m.on_exposure_end(1).unwrap();
        m.on_exposure_end(1).unwrap();

        let moved: Vec<_> = rx.try_iter().collect();

        assert_eq!(moved, vec![0, 1]);
        assert_eq!(m.state().next_expected_exposure_end.get(), 2);
        assert_eq!(m.drain_log().len(), 6);
    }

    #[test]
    fn move_fires_once_exposure_first() {
        let (m, rx) = monitor_from(5);

        m.on_exposure_end(5).unwrap();
        m.on_image_received(5).unwrap();

        assert_eq!(rx.try_iter().collect::<Vec<_>>(), vec![5]);
        assert_eq!(kinds(&m.drain_log()), vec![
            (EventKind::ExposureEnd, 5),
            (EventKind::Move, 5),
            (EventKind::ImageReceived, 5)
        ]);
    }

    #[test]
    fn move_fires_once_image_first() {
        let (m, rx) = monitor_from(5);

        m.on_image_received(5).unwrap();
        m.on_exposure_end(5).unwrap();

        assert_eq!(rx.try_iter().collect::<Vec<_>>(), vec![5]);
        assert_eq!(kinds(&m.drain_log()), vec![
            (EventKind::ImageReceived, 5),
            (EventKind::Move, 5),
            (EventKind::ExposureEnd, 5)
        ]);
        assert_eq!(m.state().next_expected_exposure_end.get(), 6);
    }

    #[test]
    fn lost_exposure_end_is_a_gap() {
        let (m, rx) = monitor_from(0);

        m.on_exposure_end(0).unwrap();
        assert_eq!(m.state().next_expected_exposure_end.get(), 1);

        m.on_image_received(0).unwrap();
        assert_eq!(m.state().next_expected_image.get(), 1);
        assert_eq!(m.moves(), 1);

        let err = m.on_exposure_end(2).unwrap_err();

        assert_eq!(err, Error::SequenceGap { expected: 1, observed: 2 });
        assert_eq!(m.state().next_expected_exposure_end.get(), 1);
        assert_eq!(rx.try_iter().collect::<Vec<_>>(), vec![0]);
    }

    #[test]
    fn move_still_fires_before_gap_is_reported() {
        let (m, rx) = monitor_from(0);

        // The image for frame 0 moved already, so frame 1 is next for moving
        m.on_image_received(0).unwrap();

        let err = m.on_exposure_end(1).unwrap_err();

        assert_eq!(err, Error::SequenceGap { expected: 0, observed: 1 });
        assert_eq!(rx.try_iter().collect::<Vec<_>>(), vec![0, 1]);
    }

    #[test]
    fn lost_image_is_tolerated() {
        let (m, _rx) = monitor_from(0);

        m.on_image_received(0).unwrap();
        m.on_image_received(2).unwrap();

        assert_eq!(m.warnings(), vec![Warning::SequenceMismatch { expected: 1, observed: 2 }]);
        assert_eq!(m.state().next_expected_image.get(), 2);
    }

    #[test]
    fn strict_mode_turns_lost_image_into_error() {
        let config = MonitorConfig { strict_image_sequence: true, ..MonitorConfig::default() };
        let m = SequenceMonitor::with_config(&config, |_: FrameNumber| {});

        m.on_image_received(0).unwrap();

        assert_eq!(m.on_image_received(2), Err(Error::SequenceMismatch { expected: 1, observed: 2 }));
        assert_eq!(m.state().next_expected_image.get(), 2);
    }

    #[test]
    fn log_keeps_call_order_including_rejects() {
        let (m, _rx) = monitor_from(0);

        m.on_image_received(1).unwrap();
        m.on_exposure_end(0).unwrap();
        m.on_exposure_end(0).unwrap();
        m.on_frame_start_overtrigger();
        let _ = m.on_exposure_end(3);

        assert_eq!(kinds(&m.drain_log()), vec![
            (EventKind::ImageReceived, 1),
            (EventKind::ExposureEnd, 0),
            (EventKind::Move, 0),
            (EventKind::ExposureEnd, 0),
            (EventKind::FrameStartOvertrigger, 0),
            (EventKind::ExposureEnd, 3)
        ]);

        // Draining doesn't consume anything
        assert_eq!(m.drain_log().len(), 6);
    }

    #[test]
    fn camera_events_dispatch_by_user_id() {
        let (m, _rx) = monitor_from(0);

        m.handle_camera_event(EventKind::ExposureEnd.user_id(), 0).unwrap();
        m.handle_camera_event(EventKind::FrameStartOvertrigger.user_id(), 0).unwrap();
        m.handle_camera_event(EventKind::ImageReceived.user_id(), 0).unwrap();

        assert_eq!(m.handle_camera_event(200, 0), Err(Error::UnknownEvent(200)));
        assert_eq!(m.handle_camera_event(EventKind::Move.user_id(), 0), Err(Error::UnknownEvent(3)));
        assert_eq!(kinds(&m.drain_log()), vec![
            (EventKind::ExposureEnd, 0),
            (EventKind::Move, 0),
            (EventKind::FrameStartOvertrigger, 0)
        ]);
    }

    #[test]
    fn disabled_events_are_not_recorded() {
        let config = MonitorConfig { events: EventMask::IMAGE_RECEIVED, ..MonitorConfig::default() };
        let m = SequenceMonitor::with_config(&config, |_: FrameNumber| {});

        m.handle(Notification::ExposureEnd(0)).unwrap();
        m.handle(Notification::FrameStartOvertrigger).unwrap();
        m.handle(Notification::ImageReceived(0)).unwrap();

        assert_eq!(kinds(&m.drain_log()), vec![
            (EventKind::ImageReceived, 0),
            (EventKind::Move, 0)
        ]);
    }

    #[test]
    fn concurrent_paths_move_each_frame_once() {
        const FRAMES: u16 = 2000;

        let (m, rx) = monitor_from(0);
        let m = Arc::new(m);

        let exposures = {
            let m = m.clone();
            thread::spawn(move || {
                for f in 0..FRAMES { m.on_exposure_end(f).unwrap(); }
            })
        };
        let images = {
            let m = m.clone();
            thread::spawn(move || {
                for f in 0..FRAMES { m.on_image_received(f).unwrap(); }
            })
        };

        exposures.join().unwrap();
        images.join().unwrap();

        let moved: Vec<FrameNumber> = rx.try_iter().collect();

        assert_eq!(moved, (0..FRAMES).collect::<Vec<_>>());
        assert_eq!(m.state(), FrameSequenceState::new(FRAMES));
        assert!(m.warnings().is_empty());
    }
}
