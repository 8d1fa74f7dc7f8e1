/// Symbologies, decode hits and validated barcodes
pub mod barcode;
/// Frames, regions of interest and preprocessing candidates
pub mod frame;

pub use barcode::{Barcode, BoundingBox, DecodeHit, Symbology, SymbologySet};
pub use frame::{CandidateImage, Frame, PixelLayout, RegionOfInterest, Stage};
