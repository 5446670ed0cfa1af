// Private modules
mod error;
mod frame;

// Public modules
pub mod config;
pub mod event;
pub mod journal;
pub mod monitor;
pub mod session;
pub mod sim;



pub use error::{Error, Warning};
pub use frame::{FrameCounter, FrameNumber};
pub use monitor::SequenceMonitor;

#[derive(PartialEq, Clone, Copy, Debug)]
pub enum Flow { Continue, Break }

pub type Result<T> = std::result::Result<T, Error>;



pub mod prelude {
    pub use crate::config::{LossConfig, MonitorConfig, SessionConfig};
    pub use crate::event::{EventKind, EventMask, Notification};
    pub use crate::journal::{EventJournal, LogEntry};
    pub use crate::monitor::{FrameSequenceState, MoveAction, SequenceMonitor};
    pub use crate::session::{CaptureSession, NotificationSender, SessionReport};
    pub use crate::sim::{Delivery, SyntheticCamera};
    pub use crate::{Error, Flow, FrameNumber, Warning};
}
