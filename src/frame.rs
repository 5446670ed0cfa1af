use std::fmt;



/// Frame numbers as the camera reports them (block id / frame id truncated to 16 bits).
pub type FrameNumber = u16;

pub fn successor(frame: FrameNumber) -> FrameNumber {
    frame.wrapping_add(1)
}



/// A wrapping 16-bit counter that can only move forward, one frame at a time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct FrameCounter(FrameNumber);

impl FrameCounter {
    pub fn new(start: FrameNumber) -> Self {
        Self(start)
    }

    pub fn get(&self) -> FrameNumber {
        self.0
    }

    pub fn advance(&mut self) {
        self.0 = successor(self.0);
    }

    pub fn is(&self, frame: FrameNumber) -> bool {
        self.0 == frame
    }

    /// True if `frame` is the one this counter has just moved past.
    pub fn follows(&self, frame: FrameNumber) -> bool {
        successor(frame) == self.0
    }
}

impl From<FrameCounter> for FrameNumber {
    fn from(c: FrameCounter) -> Self {
        c.0
    }
}

impl fmt::Display for FrameCounter {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(fmt, "{}", self.0)
    }
}
