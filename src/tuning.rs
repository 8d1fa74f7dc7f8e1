//! Process-wide tuning knobs, read once from the environment

use std::sync::OnceLock;

fn parse_env_usize(name: &str, default: usize) -> usize {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(default)
}

fn parse_env_u8(name: &str, default: u8) -> u8 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<u8>().ok())
        .unwrap_or(default)
}

fn parse_env_f32(name: &str, default: f32) -> f32 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<f32>().ok())
        .filter(|v| v.is_finite())
        .unwrap_or(default)
}

static MIN_CONTRAST: OnceLock<u8> = OnceLock::new();

/// Minimum max-min luminance spread for a scanline to be worth reading
pub(crate) fn min_contrast() -> u8 {
    *MIN_CONTRAST.get_or_init(|| parse_env_u8("BARCODE_MIN_CONTRAST", 32).clamp(8, 128))
}

static MAX_LINES: OnceLock<usize> = OnceLock::new();

/// Scanlines read per direction on a quick pass
pub(crate) fn max_lines() -> usize {
    *MAX_LINES.get_or_init(|| parse_env_usize("BARCODE_MAX_LINES", 15).clamp(1, 64))
}

static MAX_VARIANCE: OnceLock<f32> = OnceLock::new();

/// Average per-element deviation, in modules, tolerated when matching a pattern
pub(crate) fn max_variance() -> f32 {
    *MAX_VARIANCE.get_or_init(|| parse_env_f32("BARCODE_MAX_VARIANCE", 0.38).clamp(0.1, 0.7))
}

static THRESHOLD_BLOCK: OnceLock<usize> = OnceLock::new();

/// Neighbourhood size of the local threshold stage
pub(crate) fn threshold_block() -> usize {
    *THRESHOLD_BLOCK.get_or_init(|| parse_env_usize("BARCODE_THRESHOLD_BLOCK", 11).clamp(3, 101))
}

static THRESHOLD_C: OnceLock<f32> = OnceLock::new();

/// Constant subtracted from the local mean by the threshold stage
pub(crate) fn threshold_c() -> f32 {
    *THRESHOLD_C.get_or_init(|| parse_env_f32("BARCODE_THRESHOLD_C", 2.0).clamp(-32.0, 32.0))
}
