//! Frame sources: where a scan session gets its pixels
//!
//! A source is opened once, polled for frames, and closed once. Sessions never
//! call [`FrameSource::close`] directly; they hold an [`OpenSource`] guard so
//! the close happens on every exit path, early returns and panics included.

mod device;
mod replay;
mod still;

pub use device::{CaptureBackend, DeviceSource};
pub use replay::ReplayBackend;
pub use still::StillImageSource;

use crate::error::{DeviceError, ReadError};
use crate::models::Frame;

/// Anything that yields frames between an open and a close
pub trait FrameSource {
    /// Acquire the underlying device
    fn open(&mut self) -> Result<(), DeviceError>;

    /// Next frame; [`ReadError::NoFrame`] means poll again
    fn read_frame(&mut self) -> Result<Frame, ReadError>;

    /// Release the underlying device
    fn close(&mut self);
}

impl<S: FrameSource + ?Sized> FrameSource for &mut S {
    fn open(&mut self) -> Result<(), DeviceError> {
        (**self).open()
    }

    fn read_frame(&mut self) -> Result<Frame, ReadError> {
        (**self).read_frame()
    }

    fn close(&mut self) {
        (**self).close()
    }
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn open(&mut self) -> Result<(), DeviceError> {
        (**self).open()
    }

    fn read_frame(&mut self) -> Result<Frame, ReadError> {
        (**self).read_frame()
    }

    fn close(&mut self) {
        (**self).close()
    }
}

/// An opened source, closed exactly once when dropped
pub struct OpenSource<'a, S: FrameSource + ?Sized> {
    source: &'a mut S,
}

impl<'a, S: FrameSource + ?Sized> OpenSource<'a, S> {
    /// Open `source`; nothing needs closing if this fails
    pub fn open(source: &'a mut S) -> Result<Self, DeviceError> {
        source.open()?;
        Ok(Self { source })
    }

    /// Next frame from the opened source
    pub fn read_frame(&mut self) -> Result<Frame, ReadError> {
        self.source.read_frame()
    }
}

impl<S: FrameSource + ?Sized> Drop for OpenSource<'_, S> {
    fn drop(&mut self) {
        self.source.close();
    }
}
