use crate::error::{DecodeError, DeviceError, ReadError};
use crate::models::Frame;

use super::FrameSource;

/// A single pre-supplied frame, handed out a fixed number of times
///
/// Each `open` rearms the read budget.
#[derive(Debug, Clone)]
pub struct StillImageSource {
    frame: Frame,
    reads: u32,
    remaining: u32,
}

impl StillImageSource {
    /// One read, then [`ReadError::Exhausted`]
    pub fn new(frame: Frame) -> Self {
        Self::with_reads(frame, 1)
    }

    /// The same frame `reads` times, for retrying on one photo
    pub fn with_reads(frame: Frame, reads: u32) -> Self {
        Self {
            frame,
            reads,
            remaining: 0,
        }
    }

    /// Decode an encoded image container up front
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DecodeError> {
        Frame::from_encoded(bytes).map(Self::new)
    }

    /// The frame every read hands out
    pub fn frame(&self) -> &Frame {
        &self.frame
    }
}

impl FrameSource for StillImageSource {
    fn open(&mut self) -> Result<(), DeviceError> {
        self.remaining = self.reads;
        Ok(())
    }

    fn read_frame(&mut self) -> Result<Frame, ReadError> {
        if self.remaining == 0 {
            return Err(ReadError::Exhausted);
        }
        self.remaining -= 1;
        Ok(self.frame.clone())
    }

    fn close(&mut self) {
        self.remaining = 0;
    }
}
