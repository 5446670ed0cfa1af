use crate::frame::FrameNumber;
use crate::error::Error;
use crate::Result;
use bitflags::bitflags;
use enum_as_inner::EnumAsInner;
use num_derive::FromPrimitive;
use num_traits::FromPrimitive;



// The raw values double as the user-provided ids handed out when registering
// camera event handlers, so don't renumber them.
#[repr(u32)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, FromPrimitive)]
pub enum EventKind {
    ExposureEnd = 0,
    FrameStartOvertrigger = 1,
    ImageReceived = 2,
    Move = 3,
    None = 4
}

impl EventKind {
    /// Fixed width names so the log table lines up.
    pub fn label(&self) -> &'static str {
        use EventKind::*;

        match self {
            ExposureEnd => "ExposureEndEvent     ",
            FrameStartOvertrigger => "FrameStartOvertrigger",
            ImageReceived => "ImageReceived        ",
            Move => "Move                 ",
            None => "NoEvent              "
        }
    }

    pub fn from_user_id(id: i64) -> Result<Self> {
        EventKind::from_i64(id).ok_or(Error::UnknownEvent(id))
    }

    pub fn user_id(&self) -> i64 {
        *self as u32 as i64
    }
}



bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct EventMask: u32 {
        const EXPOSURE_END = 1 << EventKind::ExposureEnd as u32;
        const FRAME_START_OVERTRIGGER = 1 << EventKind::FrameStartOvertrigger as u32;
        const IMAGE_RECEIVED = 1 << EventKind::ImageReceived as u32;
    }
}

impl Default for EventMask {
    fn default() -> Self {
        Self::all()
    }
}

impl EventMask {
    pub fn enables(&self, kind: EventKind) -> bool {
        match kind {
            EventKind::ExposureEnd => self.contains(Self::EXPOSURE_END),
            EventKind::FrameStartOvertrigger => self.contains(Self::FRAME_START_OVERTRIGGER),
            EventKind::ImageReceived => self.contains(Self::IMAGE_RECEIVED),
            EventKind::Move | EventKind::None => false
        }
    }

    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Result<Self> {
        let mut mask = Self::empty();

        for name in names {
            mask |= match name.as_ref() {
                "ExposureEnd" => Self::EXPOSURE_END,
                "FrameStartOvertrigger" => Self::FRAME_START_OVERTRIGGER,
                "ImageReceived" => Self::IMAGE_RECEIVED,
                other => return Err(Error::Config(format!("unknown event name {other:?}")))
            };
        }

        Ok(mask)
    }
}



/// A single notification as it arrives from the camera side.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, EnumAsInner)]
pub enum Notification {
    ExposureEnd(FrameNumber),
    ImageReceived(FrameNumber),
    FrameStartOvertrigger
}

impl Notification {
    pub fn kind(&self) -> EventKind {
        match self {
            Notification::ExposureEnd(_) => EventKind::ExposureEnd,
            Notification::ImageReceived(_) => EventKind::ImageReceived,
            Notification::FrameStartOvertrigger => EventKind::FrameStartOvertrigger
        }
    }

    /// Overtrigger events don't carry a frame id, so they are logged as frame 0.
    pub fn frame(&self) -> FrameNumber {
        match self {
            Notification::ExposureEnd(f) | Notification::ImageReceived(f) => *f,
            Notification::FrameStartOvertrigger => 0
        }
    }
}
