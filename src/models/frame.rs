use std::fmt;
use std::sync::Arc;

use image::{DynamicImage, GrayImage, Luma, RgbImage};
use serde::Deserialize;

use super::BoundingBox;
use crate::error::DecodeError;
use crate::utils::grayscale::rgb_to_grayscale_parallel;

/// Channel layout of a frame's pixel buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelLayout {
    /// One luminance byte per pixel
    Gray,
    /// Interleaved R, G, B bytes
    Rgb,
}

impl PixelLayout {
    /// Bytes per pixel
    pub fn channels(self) -> usize {
        match self {
            PixelLayout::Gray => 1,
            PixelLayout::Rgb => 3,
        }
    }
}

/// Immutable in-memory raster
///
/// The pixel buffer is shared, so cloning a frame (for the diagnostic
/// last-frame cache or for repeated still-image reads) never copies pixels.
#[derive(Debug, Clone)]
pub struct Frame {
    width: usize,
    height: usize,
    layout: PixelLayout,
    pixels: Arc<[u8]>,
}

impl Frame {
    /// Wrap a raw pixel buffer, checking its size against the dimensions
    pub fn new(
        width: usize,
        height: usize,
        layout: PixelLayout,
        pixels: Vec<u8>,
    ) -> Result<Self, DecodeError> {
        if width == 0 || height == 0 {
            return Err(DecodeError::EmptyFrame);
        }
        let expected = width * height * layout.channels();
        if pixels.len() != expected {
            return Err(DecodeError::InvalidImage(format!(
                "expected {expected} bytes for {width}x{height} {layout:?}, got {}",
                pixels.len()
            )));
        }
        Ok(Self {
            width,
            height,
            layout,
            pixels: pixels.into(),
        })
    }

    /// Wrap a single-channel luminance buffer
    pub fn from_gray(width: usize, height: usize, pixels: Vec<u8>) -> Result<Self, DecodeError> {
        Self::new(width, height, PixelLayout::Gray, pixels)
    }

    /// Wrap an interleaved RGB buffer
    pub fn from_rgb(width: usize, height: usize, pixels: Vec<u8>) -> Result<Self, DecodeError> {
        Self::new(width, height, PixelLayout::Rgb, pixels)
    }

    /// Decode an encoded container (PNG, JPEG, ...) into a frame
    ///
    /// Grayscale containers stay single-channel; everything else is
    /// flattened to RGB (alpha is dropped).
    pub fn from_encoded(bytes: &[u8]) -> Result<Self, DecodeError> {
        if bytes.is_empty() {
            return Err(DecodeError::InvalidImage("empty buffer".to_string()));
        }
        let img = image::load_from_memory(bytes)
            .map_err(|e| DecodeError::InvalidImage(e.to_string()))?;
        Self::from_dynamic(img)
    }

    /// Convert an already-decoded `image` value
    pub fn from_dynamic(img: DynamicImage) -> Result<Self, DecodeError> {
        match img {
            DynamicImage::ImageLuma8(gray) => Self::from_gray_image(gray),
            other => Self::from_rgb_image(other.to_rgb8()),
        }
    }

    /// Take ownership of an `image` luminance buffer
    pub fn from_gray_image(img: GrayImage) -> Result<Self, DecodeError> {
        let (w, h) = img.dimensions();
        Self::from_gray(w as usize, h as usize, img.into_raw())
    }

    /// Take ownership of an `image` RGB buffer
    pub fn from_rgb_image(img: RgbImage) -> Result<Self, DecodeError> {
        let (w, h) = img.dimensions();
        Self::from_rgb(w as usize, h as usize, img.into_raw())
    }

    /// Width in pixels
    pub fn width(&self) -> usize {
        self.width
    }

    /// Height in pixels
    pub fn height(&self) -> usize {
        self.height
    }

    /// Channel layout of [`Frame::pixels`]
    pub fn layout(&self) -> PixelLayout {
        self.layout
    }

    /// Raw pixel bytes in row-major order
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Luminance plane (copied for gray frames, converted for RGB)
    pub fn luma(&self) -> Vec<u8> {
        match self.layout {
            PixelLayout::Gray => self.pixels.to_vec(),
            PixelLayout::Rgb => rgb_to_grayscale_parallel(&self.pixels, self.width, self.height),
        }
    }

    /// Single-channel version of this frame; free for frames that already are
    pub fn to_gray(&self) -> Frame {
        match self.layout {
            PixelLayout::Gray => self.clone(),
            PixelLayout::Rgb => Frame::derived_gray(self.width, self.height, self.luma()),
        }
    }

    /// Gray frame produced by one of our own kernels, already sized to match
    pub(crate) fn derived_gray(width: usize, height: usize, pixels: Vec<u8>) -> Frame {
        debug_assert_eq!(pixels.len(), width * height);
        Frame {
            width,
            height,
            layout: PixelLayout::Gray,
            pixels: pixels.into(),
        }
    }

    /// Luminance plane as an `image` buffer, for the resampling helpers
    pub fn to_gray_image(&self) -> GrayImage {
        let luma = self.luma();
        let width = self.width;
        GrayImage::from_fn(self.width as u32, self.height as u32, |x, y| {
            Luma([luma[y as usize * width + x as usize]])
        })
    }

    /// Copy out a rectangle, clamped to the frame
    ///
    /// A rectangle that clamps to nothing yields the whole frame.
    pub fn crop(&self, rect: &BoundingBox) -> Frame {
        let x0 = (rect.x as usize).min(self.width);
        let y0 = (rect.y as usize).min(self.height);
        let x1 = (x0 + rect.width as usize).min(self.width);
        let y1 = (y0 + rect.height as usize).min(self.height);
        if x1 <= x0 || y1 <= y0 {
            return self.clone();
        }

        let channels = self.layout.channels();
        let stride = self.width * channels;
        let mut pixels = Vec::with_capacity((x1 - x0) * (y1 - y0) * channels);
        for y in y0..y1 {
            let row = y * stride;
            pixels.extend_from_slice(&self.pixels[row + x0 * channels..row + x1 * channels]);
        }

        Frame {
            width: x1 - x0,
            height: y1 - y0,
            layout: self.layout,
            pixels: pixels.into(),
        }
    }
}

/// Fractional crop window applied to live frames before preprocessing
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct RegionOfInterest {
    /// Left edge; all edges are fractions of the frame size, 0.0 to 1.0
    pub left: f32,
    /// Upper edge
    pub top: f32,
    /// Right edge, exclusive
    pub right: f32,
    /// Lower edge, exclusive
    pub bottom: f32,
}

impl RegionOfInterest {
    /// Central window where hand-held barcodes usually land
    pub const CENTER: RegionOfInterest = RegionOfInterest {
        left: 0.2,
        top: 0.3,
        right: 0.8,
        bottom: 0.7,
    };

    /// Resolve the fractions against concrete frame dimensions
    pub fn pixel_rect(&self, width: usize, height: usize) -> BoundingBox {
        let clamp = |v: f32| v.clamp(0.0, 1.0);
        let (left, right) = (clamp(self.left.min(self.right)), clamp(self.left.max(self.right)));
        let (top, bottom) = (clamp(self.top.min(self.bottom)), clamp(self.top.max(self.bottom)));

        let x0 = (width as f32 * left).round() as u32;
        let y0 = (height as f32 * top).round() as u32;
        let x1 = (width as f32 * right).round() as u32;
        let y1 = (height as f32 * bottom).round() as u32;
        BoundingBox::new(x0, y0, x1.saturating_sub(x0), y1.saturating_sub(y0))
    }
}

/// Preprocessing transform that produced a candidate image, in priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Stage {
    /// Frame exactly as captured
    Original,
    /// Luminance only
    Grayscale,
    /// Gaussian-weighted local threshold
    Threshold,
    /// Threshold output run through the 3x3 sharpening kernel
    Sharpened,
    /// Grayscale enlarged for low-resolution phone captures
    Upscaled,
}

impl Stage {
    /// Every stage, cheapest first
    pub const ALL: [Stage; 5] = [
        Stage::Original,
        Stage::Grayscale,
        Stage::Threshold,
        Stage::Sharpened,
        Stage::Upscaled,
    ];

    /// Lower-case name used in logs and reports
    pub fn name(self) -> &'static str {
        match self {
            Stage::Original => "original",
            Stage::Grayscale => "grayscale",
            Stage::Threshold => "threshold",
            Stage::Sharpened => "sharpened",
            Stage::Upscaled => "upscaled",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A derived frame tagged with the transform that produced it
#[derive(Debug, Clone)]
pub struct CandidateImage {
    /// Transform that produced the image
    pub stage: Stage,
    /// The derived image
    pub image: Frame,
    /// Candidate size divided by source frame size
    pub scale: f32,
}

impl CandidateImage {
    /// Candidate at the source frame's size
    pub fn new(stage: Stage, image: Frame) -> Self {
        Self {
            stage,
            image,
            scale: 1.0,
        }
    }

    /// Candidate resized by `scale` relative to the source frame
    pub fn scaled(stage: Stage, image: Frame, scale: f32) -> Self {
        Self {
            stage,
            image,
            scale,
        }
    }
}
