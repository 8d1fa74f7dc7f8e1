//! QR code reading through `rqrr`

use tracing::trace;

use crate::models::{BoundingBox, DecodeHit, Symbology};

use super::DecodeOptions;

fn detect(gray: &[u8], width: usize, height: usize, invert: bool) -> Vec<DecodeHit> {
    let mut prepared = rqrr::PreparedImage::prepare_from_greyscale(width, height, |x, y| {
        let v = gray[y * width + x];
        if invert { 255 - v } else { v }
    });

    let mut hits = Vec::new();
    for grid in prepared.detect_grids() {
        let mut payload = Vec::new();
        match grid.decode_to(&mut payload) {
            Ok(meta) => {
                trace!(version = meta.version.0, mask = meta.mask, "qr grid decoded");
                let corners = grid.bounds.iter().map(|p| (p.x as i64, p.y as i64));
                let mut hit = DecodeHit::new(Symbology::QrCode, payload);
                if let Some(bbox) = BoundingBox::enclosing(corners) {
                    hit = hit.with_bounding_box(bbox);
                }
                hits.push(hit);
            }
            Err(err) => trace!(%err, "qr grid rejected"),
        }
    }
    hits
}

/// Every QR symbol found in a luminance plane
///
/// Light-on-dark symbols are only looked for when `try_harder` is set.
pub(crate) fn scan(gray: &[u8], width: usize, height: usize, options: DecodeOptions) -> Vec<DecodeHit> {
    if width == 0 || height == 0 || gray.len() < width * height {
        return Vec::new();
    }
    let hits = detect(gray, width, height, false);
    if hits.is_empty() && options.try_harder {
        return detect(gray, width, height, true);
    }
    hits
}
