use crate::config::LossConfig;
use crate::event::EventKind;
use crate::frame::{successor, FrameNumber};
use crate::Result;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use enum_as_inner::EnumAsInner;



/// One notification, tagged with the path the camera would deliver it on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, EnumAsInner)]
pub enum Delivery {
    /// Camera event channel, identified by its registration id.
    CameraEvent { user_id: i64, frame: FrameNumber },
    /// Block id of a grabbed image.
    Image(FrameNumber)
}

impl Delivery {
    pub fn exposure_end(frame: FrameNumber) -> Self {
        Delivery::CameraEvent { user_id: EventKind::ExposureEnd.user_id(), frame }
    }

    pub fn overtrigger() -> Self {
        Delivery::CameraEvent { user_id: EventKind::FrameStartOvertrigger.user_id(), frame: 0 }
    }
}



/// Stand-in for a triggered camera: emits the notifications a real one would,
/// with configurable packet loss, doubling and delay.
pub struct SyntheticCamera {
    frames: u32,
    start: FrameNumber,
    loss: LossConfig,
    rng: StdRng
}

impl SyntheticCamera {
    pub fn new(frames: u32, seed: u64, loss: LossConfig) -> Result<Self> {
        loss.validate()?;

        Ok(Self { frames, start: 0, loss, rng: StdRng::seed_from_u64(seed) })
    }

    pub fn starting_at(mut self, frame: FrameNumber) -> Self {
        self.start = frame;
        self
    }

    pub fn script(&mut self) -> Vec<Delivery> {
        let mut out = Vec::with_capacity(self.frames as usize * 3);
        let mut frame = self.start;

        for _ in 0..self.frames {
            self.emit_frame(frame, &mut out);
            frame = successor(frame);
        }

        out
    }

    fn emit_frame(&mut self, frame: FrameNumber, out: &mut Vec<Delivery>) {
        let loss = self.loss;

        if self.rng.gen_bool(loss.overtrigger) {
            out.push(Delivery::overtrigger());
        }

        let exposure_end = !self.rng.gen_bool(loss.exposure_end_drop);
        let doubled = exposure_end && self.rng.gen_bool(loss.duplicate);
        let late = exposure_end && self.rng.gen_bool(loss.late_exposure_end);
        let image = !self.rng.gen_bool(loss.image_drop);

        if exposure_end && !late {
            out.push(Delivery::exposure_end(frame));
            if doubled { out.push(Delivery::exposure_end(frame)); }
        }

        if image {
            out.push(Delivery::Image(frame));
        }

        if late {
            out.push(Delivery::exposure_end(frame));
            if doubled { out.push(Delivery::exposure_end(frame)); }
        }
    }
}
