use std::collections::VecDeque;
use std::path::Path;
use std::time::Duration;

use tracing::{debug, warn};

use crate::config::CaptureSettings;
use crate::error::{DeviceError, ReadError};
use crate::models::Frame;

use super::CaptureBackend;

const IMAGE_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "bmp", "gif"];

/// Plays a fixed sequence of frames as if a camera produced them
///
/// Once the frames run out every grab reports [`ReadError::Exhausted`].
#[derive(Debug, Clone, Default)]
pub struct ReplayBackend {
    frames: VecDeque<Frame>,
    interval: Option<Duration>,
    settings: Option<CaptureSettings>,
}

impl ReplayBackend {
    /// Replay `frames` in order, as fast as they are grabbed
    pub fn from_frames(frames: impl IntoIterator<Item = Frame>) -> Self {
        Self {
            frames: frames.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Every decodable image in `dir`, in file-name order
    ///
    /// Files that fail to decode are skipped with a warning.
    pub fn from_dir(dir: &Path) -> Result<Self, DeviceError> {
        let entries = std::fs::read_dir(dir)
            .map_err(|e| DeviceError::Backend(format!("{}: {e}", dir.display())))?;
        let mut paths: Vec<_> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
            })
            .collect();
        paths.sort();

        let mut frames = VecDeque::with_capacity(paths.len());
        for path in paths {
            let decoded = std::fs::read(&path)
                .map_err(|e| e.to_string())
                .and_then(|bytes| Frame::from_encoded(&bytes).map_err(|e| e.to_string()));
            match decoded {
                Ok(frame) => frames.push_back(frame),
                Err(err) => warn!(path = %path.display(), %err, "skipping replay frame"),
            }
        }
        debug!(dir = %dir.display(), frames = frames.len(), "replay loaded");
        Ok(Self {
            frames,
            ..Self::default()
        })
    }

    /// Pace grabs like a camera running at this frame interval
    pub fn with_frame_interval(mut self, interval: Duration) -> Self {
        self.interval = Some(interval);
        self
    }

    /// Frames not yet grabbed
    pub fn remaining(&self) -> usize {
        self.frames.len()
    }

    /// Settings received on the last connect
    pub fn settings(&self) -> Option<&CaptureSettings> {
        self.settings.as_ref()
    }
}

impl CaptureBackend for ReplayBackend {
    fn connect(&mut self, _index: u32, settings: &CaptureSettings) -> Result<(), DeviceError> {
        self.settings = Some(*settings);
        Ok(())
    }

    fn grab(&mut self) -> Result<Frame, ReadError> {
        let frame = self.frames.pop_front().ok_or(ReadError::Exhausted)?;
        if let Some(interval) = self.interval {
            std::thread::sleep(interval);
        }
        Ok(frame)
    }

    fn disconnect(&mut self) {
        self.settings = None;
    }
}
