//! rust_barcode - EAN-13, CODE128 and QR scanning for photos and live cameras
//!
//! Frames flow one way: a [`FrameSource`] produces them, the
//! [`Preprocessor`] derives candidate images, a [`SymbologyDecoder`] reads
//! them, the [`MultiStrategyResolver`] keeps the first hit, the validator
//! accepts or rejects it, and a [`ScanSession`] bounds the whole loop.
//!
//! ```no_run
//! use rust_barcode::{ScanConfig, scan_image_bytes};
//!
//! let bytes = std::fs::read("label.png").unwrap();
//! let report = scan_image_bytes(&bytes, &ScanConfig::still());
//! println!("{report}");
//! ```

#![warn(missing_docs)]
#![allow(clippy::missing_docs_in_private_items)]

/// Typed errors for every stage of the pipeline
pub mod error;
/// Symbol decoders (QR, EAN-13, CODE128)
pub mod decoder;
/// Core data structures (Frame, DecodeHit, Barcode, ...)
pub mod models;
/// Utility kernels (grayscale, thresholding, convolution)
pub mod utils;

/// TOML-loadable scan policy
pub mod config;
pub mod preprocess;
pub mod resolver;
pub mod session;
pub mod source;
pub mod validator;

mod tuning;

pub use config::{CaptureSettings, LoggingConfig, ScanConfig};
pub use decoder::{BuiltinDecoder, DecodeOptions, SymbologyDecoder};
pub use error::{ConfigError, DecodeError, DeviceError, ReadError, ValidationError};
pub use models::{
    Barcode, BoundingBox, CandidateImage, DecodeHit, Frame, PixelLayout, RegionOfInterest, Stage,
    Symbology, SymbologySet,
};
pub use preprocess::Preprocessor;
pub use resolver::{MultiStrategyResolver, Resolution, Strategy};
pub use session::{CancelToken, ScanReport, ScanSession, ScanState, StopReason};
pub use source::{CaptureBackend, DeviceSource, FrameSource, ReplayBackend, StillImageSource};
pub use validator::{ean13_check_digit, validate, validate_hit};

/// Scan an encoded still image (PNG, JPEG, ...)
///
/// The frame is read `config.max_attempts` times (once if unbounded), which
/// only matters for decoders with run-to-run variation. A container that does
/// not decode ends with reason `invalid-image`. The region of interest is a
/// live-camera setting and is ignored here.
pub fn scan_image_bytes(bytes: &[u8], config: &ScanConfig) -> ScanReport {
    let frame = match Frame::from_encoded(bytes) {
        Ok(frame) => frame,
        Err(err) => {
            tracing::debug!(%err, "still image rejected");
            return ScanReport::invalid_image(err.to_string());
        }
    };
    scan_frame(frame, config)
}

/// Scan an already decoded still frame
pub fn scan_frame(frame: Frame, config: &ScanConfig) -> ScanReport {
    let reads = config.max_attempts.unwrap_or(1).max(1);
    let config = ScanConfig {
        region_of_interest: None,
        ..config.clone()
    };
    let mut session = ScanSession::new(StillImageSource::with_reads(frame, reads), &config);
    session.run(&config)
}

/// Scan a live device until found, timed out, cancelled or exhausted
pub fn scan_device<B: CaptureBackend>(
    index: u32,
    backend: B,
    config: &ScanConfig,
    cancel: CancelToken,
) -> ScanReport {
    let source = DeviceSource::with_settings(index, backend, config.capture);
    let mut session = ScanSession::new(source, config).with_cancel_token(cancel);
    session.run(config)
}
