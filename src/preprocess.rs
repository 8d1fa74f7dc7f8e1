//! Frame to candidate-image transforms
//!
//! Candidates come out cheapest first. Intermediate planes (luminance,
//! threshold) are computed on first use and shared by the later stages, so a
//! caller that stops after the first stage never pays for the rest.

use image::imageops::{self, FilterType};

use crate::config::ScanConfig;
use crate::models::{CandidateImage, Frame, Stage};
use crate::tuning;
use crate::utils::convolve::sharpen;
use crate::utils::threshold::adaptive_threshold;

/// Largest enlargement the upscale stage accepts
pub const MAX_UPSCALE_FACTOR: f32 = 4.0;
/// Longest side, in pixels, an upscaled candidate may have
const MAX_UPSCALED_SIDE: u32 = 16_384;

/// Which transforms run, and with what parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Preprocessor {
    /// Produce the enlarged-grayscale stage for phone captures
    pub mobile_upscale: bool,
    /// Enlargement of the upscale stage; the stage is off outside `(1, MAX_UPSCALE_FACTOR]`
    pub upscale_factor: f32,
    /// Odd side of the local-threshold window
    pub threshold_block: usize,
    /// Offset subtracted from the local mean
    pub threshold_c: f32,
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self {
            mobile_upscale: true,
            upscale_factor: 1.5,
            threshold_block: tuning::threshold_block(),
            threshold_c: tuning::threshold_c(),
        }
    }
}

impl Preprocessor {
    /// Upscale settings from `config`, threshold knobs from the environment
    pub fn from_config(config: &ScanConfig) -> Self {
        Self {
            mobile_upscale: config.mobile_upscale,
            upscale_factor: config.upscale_factor,
            ..Self::default()
        }
    }

    /// Enabled stages in priority order
    pub fn stages(&self) -> impl Iterator<Item = Stage> + '_ {
        Stage::ALL.into_iter().filter(|&stage| self.enabled(stage))
    }

    /// Whether `stage` produces a candidate
    pub fn enabled(&self, stage: Stage) -> bool {
        match stage {
            Stage::Upscaled => {
                self.mobile_upscale
                    && self.upscale_factor > 1.0
                    && self.upscale_factor <= MAX_UPSCALE_FACTOR
            }
            _ => true,
        }
    }

    /// Every candidate for `frame`, eagerly
    pub fn preprocess(&self, frame: &Frame) -> Vec<CandidateImage> {
        self.candidates(frame).collect()
    }

    /// Candidates for `frame`, built one at a time as they are pulled
    pub fn candidates<'a>(&'a self, frame: &'a Frame) -> Candidates<'a> {
        Candidates {
            preprocessor: self,
            frame,
            next: 0,
            gray: None,
            threshold: None,
        }
    }
}

/// Lazily built candidates of one frame
#[derive(Debug)]
pub struct Candidates<'a> {
    preprocessor: &'a Preprocessor,
    frame: &'a Frame,
    next: usize,
    gray: Option<Frame>,
    threshold: Option<Frame>,
}

impl Candidates<'_> {
    /// Candidate for one stage; `None` if the stage is disabled
    pub fn stage(&mut self, stage: Stage) -> Option<CandidateImage> {
        if !self.preprocessor.enabled(stage) {
            return None;
        }
        let candidate = match stage {
            Stage::Original => CandidateImage::new(stage, self.frame.clone()),
            Stage::Grayscale => CandidateImage::new(stage, self.gray().clone()),
            Stage::Threshold => CandidateImage::new(stage, self.threshold().clone()),
            Stage::Sharpened => {
                let binary = self.threshold();
                let (w, h) = (binary.width(), binary.height());
                let sharp = sharpen(binary.pixels(), w, h);
                CandidateImage::new(stage, Frame::derived_gray(w, h, sharp))
            }
            Stage::Upscaled => self.upscaled()?,
        };
        Some(candidate)
    }

    fn gray(&mut self) -> &Frame {
        let frame = self.frame;
        self.gray.get_or_insert_with(|| frame.to_gray())
    }

    fn threshold(&mut self) -> &Frame {
        let Preprocessor {
            threshold_block,
            threshold_c,
            ..
        } = *self.preprocessor;
        let frame = self.frame;
        let gray = &mut self.gray;
        self.threshold.get_or_insert_with(|| {
            let gray = gray.get_or_insert_with(|| frame.to_gray());
            let (w, h) = (gray.width(), gray.height());
            let binary = adaptive_threshold(gray.pixels(), w, h, threshold_block, threshold_c);
            Frame::derived_gray(w, h, binary)
        })
    }

    fn upscaled(&mut self) -> Option<CandidateImage> {
        let factor = self.preprocessor.upscale_factor;
        let source = self.gray().to_gray_image();
        let (w, h) = source.dimensions();
        let new_w = (w as f32 * factor).round() as u32;
        let new_h = (h as f32 * factor).round() as u32;
        if new_w <= w || new_h == 0 || new_w > MAX_UPSCALED_SIDE || new_h > MAX_UPSCALED_SIDE {
            return None;
        }
        let resized = imageops::resize(&source, new_w, new_h, FilterType::Triangle);
        let frame = Frame::from_gray_image(resized).ok()?;
        Some(CandidateImage::scaled(
            Stage::Upscaled,
            frame,
            new_w as f32 / w as f32,
        ))
    }
}

impl Iterator for Candidates<'_> {
    type Item = CandidateImage;

    fn next(&mut self) -> Option<CandidateImage> {
        while let Some(&stage) = Stage::ALL.get(self.next) {
            self.next += 1;
            if let Some(candidate) = self.stage(stage) {
                return Some(candidate);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PixelLayout;

    fn gradient_frame(w: usize, h: usize) -> Frame {
        let mut rgb = Vec::with_capacity(w * h * 3);
        for y in 0..h {
            for x in 0..w {
                let v = if (x / 3) % 2 == 0 { 20 } else { 230 };
                let v = (v + y) as u8;
                rgb.extend_from_slice(&[v, v, v]);
            }
        }
        Frame::from_rgb(w, h, rgb).unwrap()
    }

    #[test]
    fn test_candidates_in_priority_order() {
        let frame = gradient_frame(40, 20);
        let stages: Vec<Stage> = Preprocessor::default()
            .preprocess(&frame)
            .iter()
            .map(|c| c.stage)
            .collect();
        assert_eq!(stages, Stage::ALL.to_vec());
    }

    #[test]
    fn test_upscale_can_be_disabled() {
        let frame = gradient_frame(40, 20);
        let preprocessor = Preprocessor {
            mobile_upscale: false,
            ..Preprocessor::default()
        };
        let candidates = preprocessor.preprocess(&frame);
        assert_eq!(candidates.len(), 4);
        assert!(candidates.iter().all(|c| c.stage != Stage::Upscaled));
    }

    #[test]
    fn test_out_of_range_upscale_is_skipped() {
        let frame = gradient_frame(40, 20);
        for factor in [f32::INFINITY, f32::NAN, 1e9, MAX_UPSCALE_FACTOR + 0.5] {
            let preprocessor = Preprocessor {
                upscale_factor: factor,
                ..Preprocessor::default()
            };
            assert!(!preprocessor.enabled(Stage::Upscaled), "factor {factor}");
            assert!(preprocessor.candidates(&frame).stage(Stage::Upscaled).is_none());
            assert_eq!(preprocessor.preprocess(&frame).len(), 4);
        }
    }

    #[test]
    fn test_upscale_respects_side_limit() {
        let width = MAX_UPSCALED_SIDE as usize / 2 + 1;
        let frame = Frame::from_gray(width, 1, vec![128; width]).unwrap();
        let preprocessor = Preprocessor {
            upscale_factor: 2.0,
            ..Preprocessor::default()
        };
        assert!(preprocessor.candidates(&frame).stage(Stage::Upscaled).is_none());
    }

    #[test]
    fn test_original_is_untouched() {
        let frame = gradient_frame(12, 4);
        let first = Preprocessor::default().candidates(&frame).next().unwrap();
        assert_eq!(first.stage, Stage::Original);
        assert_eq!(first.image.layout(), PixelLayout::Rgb);
        assert_eq!(first.image.pixels(), frame.pixels());
        assert_eq!(first.scale, 1.0);
    }

    #[test]
    fn test_threshold_and_sharpen_are_binary() {
        let frame = gradient_frame(30, 10);
        let preprocessor = Preprocessor::default();
        let mut candidates = preprocessor.candidates(&frame);
        for stage in [Stage::Threshold, Stage::Sharpened] {
            let candidate = candidates.stage(stage).unwrap();
            assert_eq!(candidate.image.layout(), PixelLayout::Gray);
            assert!(candidate.image.pixels().iter().all(|&v| v == 0 || v == 255));
        }
    }

    #[test]
    fn test_upscaled_dimensions() {
        let frame = gradient_frame(40, 20);
        let preprocessor = Preprocessor::default();
        let mut candidates = preprocessor.candidates(&frame);
        let up = candidates.stage(Stage::Upscaled).unwrap();
        assert_eq!((up.image.width(), up.image.height()), (60, 30));
        assert!((up.scale - 1.5).abs() < 1e-6);
    }

    #[test]
    fn test_preprocess_is_deterministic() {
        let frame = gradient_frame(24, 8);
        let a = Preprocessor::default().preprocess(&frame);
        let b = Preprocessor::default().preprocess(&frame);
        for (x, y) in a.iter().zip(&b) {
            assert_eq!(x.image.pixels(), y.image.pixels());
        }
    }
}
