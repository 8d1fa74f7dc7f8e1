//! Symbol decoders
//!
//! A decoder turns one candidate image into zero or more raw hits. It knows
//! nothing about checksums beyond what its symbology needs to frame a symbol;
//! payload rules live in [`crate::validator`].

mod code128;
mod ean13;
mod linear;
mod qr;

use crate::models::{CandidateImage, DecodeHit, Symbology, SymbologySet};

/// Effort knobs for one decode attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DecodeOptions {
    /// Read every scanline (and inverted QR) instead of stopping early
    pub try_harder: bool,
    /// Also read columns, for barcodes rotated by 90 degrees
    pub try_rotate: bool,
}

impl DecodeOptions {
    /// Rows only, stop at the first line that reads
    pub const QUICK: DecodeOptions = DecodeOptions {
        try_harder: false,
        try_rotate: false,
    };

    /// Every row and column, inverted QR retry
    pub const THOROUGH: DecodeOptions = DecodeOptions {
        try_harder: true,
        try_rotate: true,
    };
}

/// Anything able to find symbols in a candidate image
pub trait SymbologyDecoder {
    /// Raw hits restricted to `symbologies`, in the decoder's preference order
    fn decode(
        &self,
        candidate: &CandidateImage,
        symbologies: SymbologySet,
        options: DecodeOptions,
    ) -> Vec<DecodeHit>;
}

impl<D: SymbologyDecoder + ?Sized> SymbologyDecoder for &D {
    fn decode(
        &self,
        candidate: &CandidateImage,
        symbologies: SymbologySet,
        options: DecodeOptions,
    ) -> Vec<DecodeHit> {
        (**self).decode(candidate, symbologies, options)
    }
}

/// Pure-Rust decoder for EAN-13, Code 128 and QR
///
/// QR hits come first, then linear hits in canonical symbology order.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinDecoder;

impl SymbologyDecoder for BuiltinDecoder {
    fn decode(
        &self,
        candidate: &CandidateImage,
        symbologies: SymbologySet,
        options: DecodeOptions,
    ) -> Vec<DecodeHit> {
        let frame = &candidate.image;
        let (width, height) = (frame.width(), frame.height());
        let gray = frame.luma();

        let mut hits = Vec::new();
        if symbologies.contains(Symbology::QrCode) {
            hits.extend(qr::scan(&gray, width, height, options));
        }
        if symbologies.iter().any(Symbology::is_linear) {
            let mut linear = linear::scan(&gray, width, height, symbologies, options);
            linear.sort_by_key(|h| h.symbology);
            hits.extend(linear);
        }
        hits
    }
}
