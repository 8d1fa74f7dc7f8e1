//! Pixel kernels used by the preprocessing stages
//!
//! - Grayscale conversion (RGB to luminance)
//! - Gaussian-weighted local thresholding
//! - 3x3 convolution for edge sharpening

pub mod convolve;
pub mod grayscale;
pub mod threshold;
