use std::collections::BTreeSet;
use std::sync::{Mutex, PoisonError};

use tracing::{debug, warn};

use crate::config::CaptureSettings;
use crate::error::{DeviceError, ReadError};
use crate::models::Frame;

use super::FrameSource;

/// Device indices currently held by an open [`DeviceSource`] in this process
static HELD_DEVICES: Mutex<BTreeSet<u32>> = Mutex::new(BTreeSet::new());

fn claim(index: u32) -> bool {
    HELD_DEVICES
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .insert(index)
}

fn release(index: u32) {
    HELD_DEVICES
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .remove(&index);
}

/// Driver-side half of a live capture device
pub trait CaptureBackend {
    /// Attach to device `index` and apply `settings`
    fn connect(&mut self, index: u32, settings: &CaptureSettings) -> Result<(), DeviceError>;

    /// Block for the next frame, up to the driver's own timeout
    fn grab(&mut self) -> Result<Frame, ReadError>;

    /// Release the device
    fn disconnect(&mut self);
}

/// A live camera addressed by index
///
/// Opening claims the index process-wide, so a second source on the same
/// index fails with [`DeviceError::Busy`] until the first one closes.
pub struct DeviceSource<B: CaptureBackend> {
    index: u32,
    settings: CaptureSettings,
    backend: B,
    open: bool,
}

impl<B: CaptureBackend> DeviceSource<B> {
    /// Device `index` with default capture settings
    pub fn new(index: u32, backend: B) -> Self {
        Self::with_settings(index, backend, CaptureSettings::default())
    }

    /// Device `index` asking the driver for `settings`
    pub fn with_settings(index: u32, backend: B, settings: CaptureSettings) -> Self {
        Self {
            index,
            settings,
            backend,
            open: false,
        }
    }

    /// Device index this source claims on open
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Whether this source currently holds its device
    pub fn is_open(&self) -> bool {
        self.open
    }

    /// The driver backend
    pub fn backend(&self) -> &B {
        &self.backend
    }
}

impl<B: CaptureBackend> FrameSource for DeviceSource<B> {
    fn open(&mut self) -> Result<(), DeviceError> {
        if self.open {
            return Ok(());
        }
        if !claim(self.index) {
            warn!(index = self.index, "capture device busy");
            return Err(DeviceError::Busy(self.index));
        }
        if let Err(err) = self.backend.connect(self.index, &self.settings) {
            release(self.index);
            warn!(index = self.index, %err, "capture device failed to open");
            return Err(err);
        }
        self.open = true;
        debug!(
            index = self.index,
            width = self.settings.width,
            height = self.settings.height,
            fps = self.settings.fps,
            autofocus = self.settings.autofocus,
            "capture device opened"
        );
        Ok(())
    }

    fn read_frame(&mut self) -> Result<Frame, ReadError> {
        if !self.open {
            return Err(ReadError::Exhausted);
        }
        self.backend.grab()
    }

    fn close(&mut self) {
        if !self.open {
            return;
        }
        self.backend.disconnect();
        release(self.index);
        self.open = false;
        debug!(index = self.index, "capture device released");
    }
}

impl<B: CaptureBackend> Drop for DeviceSource<B> {
    fn drop(&mut self) {
        self.close();
    }
}
