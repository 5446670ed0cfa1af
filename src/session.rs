use crate::config::MonitorConfig;
use crate::error::{Error, Warning};
use crate::event::Notification;
use crate::journal::EventJournal;
use crate::monitor::{FrameSequenceState, MoveAction, SequenceMonitor};
use crate::sim::Delivery;
use crate::{Flow, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::thread::{self, JoinHandle};
use log::{debug, error, info, warn};



// What actually travels down a delivery channel. Stop is queued behind any
// deliveries already sent, so those still reach the monitor.
enum Message {
    Deliver(Delivery),
    Stop
}



#[derive(Default)]
struct Shared {
    stopped: AtomicBool,
    closed: AtomicBool,
    fatal: Mutex<Option<Error>>
}

impl Shared {
    fn stop(&self, e: Error) {
        let mut fatal = self.fatal.lock().unwrap_or_else(|p| p.into_inner());

        // Only the first fatal error is reported, the rest are fallout from it
        if fatal.is_none() { *fatal = Some(e); }

        self.stopped.store(true, Ordering::SeqCst);
    }

    fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    fn accepts(&self) -> bool {
        !self.is_stopped() && !self.closed.load(Ordering::SeqCst)
    }

    fn take_fatal(&self) -> Option<Error> {
        self.fatal.lock().unwrap_or_else(|p| p.into_inner()).take()
    }
}



/// Feeds one of the session's delivery threads.
#[derive(Clone)]
pub struct NotificationSender {
    tx: mpsc::Sender<Message>,
    shared: Arc<Shared>
}

impl NotificationSender {
    pub fn send(&self, delivery: Delivery) -> Result<()> {
        if !self.shared.accepts() { return Err(Error::SessionClosed) }

        self.tx.send(Message::Deliver(delivery)).map_err(|_| Error::SessionClosed)
    }
}



#[derive(Debug, Clone)]
pub struct SessionReport {
    pub log: EventJournal,
    pub warnings: Vec<Warning>,
    pub state: FrameSequenceState,
    pub moves: usize
}



/// One camera-open/grab session: a monitor plus the two threads that deliver
/// camera events and grabbed images to it independently of each other.
pub struct CaptureSession {
    monitor: Arc<SequenceMonitor>,
    shared: Arc<Shared>,
    camera_tx: Option<mpsc::Sender<Message>>,
    image_tx: Option<mpsc::Sender<Message>>,
    threads: Vec<JoinHandle<()>>
}

impl CaptureSession {
    pub fn start<F>(config: &MonitorConfig, action: F) -> Self
    where F: MoveAction + 'static {
        let monitor = Arc::new(SequenceMonitor::with_config(config, action));
        let shared = Arc::new(Shared::default());

        let (camera_tx, camera_rx) = mpsc::channel::<Message>();
        let (image_tx, image_rx) = mpsc::channel::<Message>();

        let threads = vec![
            spawn_delivery("camera events", camera_rx, monitor.clone(), shared.clone()),
            spawn_delivery("images", image_rx, monitor.clone(), shared.clone())
        ];

        info!("capture session started at frame {}", config.initial_frame);

        Self {
            monitor,
            shared,
            camera_tx: Some(camera_tx),
            image_tx: Some(image_tx),
            threads
        }
    }

    pub fn camera_events(&self) -> Result<NotificationSender> {
        self.sender(&self.camera_tx)
    }

    pub fn image_events(&self) -> Result<NotificationSender> {
        self.sender(&self.image_tx)
    }

    fn sender(&self, tx: &Option<mpsc::Sender<Message>>) -> Result<NotificationSender> {
        match tx {
            Some(tx) => Ok(NotificationSender { tx: tx.clone(), shared: self.shared.clone() }),
            None => Err(Error::SessionClosed)
        }
    }

    /// Route a delivery to the thread that handles its kind.
    pub fn deliver(&self, delivery: Delivery) -> Result<()> {
        match delivery {
            Delivery::CameraEvent { .. } => self.camera_events()?.send(delivery),
            Delivery::Image(_) => self.image_events()?.send(delivery)
        }
    }

    pub fn monitor(&self) -> Arc<SequenceMonitor> {
        self.monitor.clone()
    }

    pub fn is_stopped(&self) -> bool {
        self.shared.is_stopped()
    }

    fn shutdown(&mut self) -> Result<()> {
        // Handed-out senders may outlive the session, so the threads can't
        // wait for their channels to close. Refuse new deliveries and tell
        // each thread to stop once it has worked through what's queued.
        self.shared.close();

        for tx in [self.camera_tx.take(), self.image_tx.take()].into_iter().flatten() {
            // Fails only if the thread already quit after a fatal error
            let _ = tx.send(Message::Stop);
        }

        let mut panicked = false;

        for t in self.threads.drain(..) {
            if t.join().is_err() { panicked = true; }
        }

        if panicked { Err(Error::ThreadPanicked) } else { Ok(()) }
    }

    /// Wait for both delivery threads and hand back what the monitor saw.
    /// A sequence gap during the session is returned as the error.
    pub fn finish(mut self) -> Result<SessionReport> {
        self.shutdown()?;

        if let Some(e) = self.shared.take_fatal() {
            return Err(e);
        }

        let report = SessionReport {
            log: self.monitor.journal(),
            warnings: self.monitor.warnings(),
            state: self.monitor.state(),
            moves: self.monitor.moves()
        };

        info!("capture session finished: {} moves, {} warnings", report.moves, report.warnings.len());

        Ok(report)
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        if !self.threads.is_empty() {
            if let Err(e) = self.shutdown() {
                error!("capture session shut down badly: {e}");
            }
        }
    }
}



fn spawn_delivery(
    name: &'static str,
    rx: mpsc::Receiver<Message>,
    monitor: Arc<SequenceMonitor>,
    shared: Arc<Shared>
) -> JoinHandle<()> {
    thread::spawn(move || {
        for msg in rx {
            let delivery = match msg {
                Message::Deliver(d) => d,
                Message::Stop => break
            };

            if shared.is_stopped() { break; }

            if deliver(&monitor, &shared, delivery) == Flow::Break {
                break;
            }
        }

        debug!("{name} delivery thread exiting");
    })
}

fn deliver(monitor: &SequenceMonitor, shared: &Shared, delivery: Delivery) -> Flow {
    let res = match delivery {
        Delivery::CameraEvent { user_id, frame } => monitor.handle_camera_event(user_id, frame),
        Delivery::Image(frame) => monitor.handle(Notification::ImageReceived(frame))
    };

    match res {
        Ok(()) => Flow::Continue,
        Err(e) if e.is_fatal() => {
            error!("stopping acquisition: {e}");
            shared.stop(e);
            Flow::Break
        },
        Err(e) => {
            warn!("{e}");
            Flow::Continue
        }
    }
}



/// Run a whole script through a fresh session.
pub fn run_script<F>(config: &MonitorConfig, script: &[Delivery], action: F) -> Result<SessionReport>
where F: MoveAction + 'static {
    let session = CaptureSession::start(config, action);

    for d in script {
        // Once stopped the remaining deliveries have nowhere to go, finish()
        // reports why.
        if session.deliver(*d).is_err() { break; }
    }

    session.finish()
}
