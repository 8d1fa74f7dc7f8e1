//! Scanline reading for one-dimensional symbologies
//!
//! A scanline is binarized at the midpoint of its own luminance range and
//! collapsed into alternating dark/light runs. Symbology readers then match
//! run widths against their module patterns, in both reading directions.

use crate::models::{BoundingBox, DecodeHit, Symbology, SymbologySet};
use crate::tuning;

use super::{DecodeOptions, code128, ean13};

/// One uniform stretch of a scanline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Run {
    pub dark: bool,
    pub start: usize,
    pub len: usize,
}

impl Run {
    pub fn end(&self) -> usize {
        self.start + self.len
    }
}

/// A symbol read from a run sequence, with its pixel extent along the line
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LinearRead {
    pub payload: Vec<u8>,
    pub start: usize,
    pub end: usize,
}

/// Collapse samples into runs; `None` when the line is too flat to carry bars
pub(crate) fn line_runs(samples: &[u8], min_contrast: u8) -> Option<Vec<Run>> {
    let (&first, _) = samples.split_first()?;
    let (lo, hi) = samples
        .iter()
        .fold((u8::MAX, u8::MIN), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    if hi.saturating_sub(lo) < min_contrast {
        return None;
    }
    let threshold = ((lo as u16 + hi as u16 + 1) / 2) as u8;

    let mut runs = Vec::new();
    let mut start = 0;
    let mut dark = first < threshold;
    for (i, &v) in samples.iter().enumerate().skip(1) {
        let is_dark = v < threshold;
        if is_dark != dark {
            runs.push(Run {
                dark,
                start,
                len: i - start,
            });
            start = i;
            dark = is_dark;
        }
    }
    runs.push(Run {
        dark,
        start,
        len: samples.len() - start,
    });
    Some(runs)
}

/// The same runs read right to left, positions mirrored into `0..line_len`
pub(crate) fn reversed(runs: &[Run], line_len: usize) -> Vec<Run> {
    runs.iter()
        .rev()
        .map(|r| Run {
            dark: r.dark,
            start: line_len - r.end(),
            len: r.len,
        })
        .collect()
}

/// Sum of absolute differences, in modules, between `counts` and `pattern`
///
/// `counts` are first scaled so that their total equals the pattern's module
/// count, which makes the measure independent of print size.
pub(crate) fn pattern_deviation(counts: &[usize], pattern: &[u8]) -> f32 {
    let total: usize = counts.iter().sum();
    let modules: u32 = pattern.iter().map(|&p| p as u32).sum();
    if total == 0 || modules == 0 {
        return f32::INFINITY;
    }
    let unit = total as f32 / modules as f32;
    counts
        .iter()
        .zip(pattern)
        .map(|(&c, &p)| (c as f32 / unit - p as f32).abs())
        .sum()
}

/// Index of the closest pattern, if it is within `max_deviation`
pub(crate) fn best_match<const N: usize>(
    counts: &[usize],
    patterns: &[[u8; N]],
    max_deviation: f32,
) -> Option<(usize, f32)> {
    patterns
        .iter()
        .enumerate()
        .map(|(i, p)| (i, pattern_deviation(counts, p)))
        .filter(|(_, dev)| *dev <= max_deviation)
        .min_by(|a, b| a.1.total_cmp(&b.1))
}

/// Like [`best_match`], but the runner-up must trail the winner by `min_margin`
///
/// Undersampled bars can land halfway between two patterns; such a group is
/// left unread instead of guessed.
pub(crate) fn distinct_match<const N: usize>(
    counts: &[usize],
    patterns: &[[u8; N]],
    max_deviation: f32,
    min_margin: f32,
) -> Option<(usize, f32)> {
    let mut best: Option<(usize, f32)> = None;
    let mut runner_up = f32::INFINITY;
    for (i, pattern) in patterns.iter().enumerate() {
        let dev = pattern_deviation(counts, pattern);
        match best {
            Some((_, best_dev)) if dev >= best_dev => runner_up = runner_up.min(dev),
            _ => {
                runner_up = best.map_or(runner_up, |(_, best_dev)| best_dev);
                best = Some((i, dev));
            }
        }
    }
    best.filter(|&(_, dev)| dev <= max_deviation && runner_up - dev >= min_margin)
}

pub(crate) fn widths(runs: &[Run]) -> Vec<usize> {
    runs.iter().map(|r| r.len).collect()
}

/// Scanline positions from the middle outwards
pub(crate) fn line_positions(extent: usize, try_harder: bool) -> Vec<usize> {
    if extent == 0 {
        return Vec::new();
    }
    let step = if try_harder { (extent >> 8).max(1) } else { (extent >> 5).max(1) };
    let max_lines = if try_harder { extent } else { tuning::max_lines() };
    let middle = extent / 2;

    let mut positions = Vec::new();
    for i in 0..max_lines {
        let offset = (i + 1) / 2 * step;
        let position = if i % 2 == 0 {
            middle.checked_add(offset).filter(|&p| p < extent)
        } else {
            middle.checked_sub(offset)
        };
        match position {
            Some(p) => positions.push(p),
            None => break,
        }
    }
    positions
}

fn read_runs(symbology: Symbology, runs: &[Run], max_variance: f32) -> Option<LinearRead> {
    match symbology {
        Symbology::Ean13 => ean13::decode_runs(runs, max_variance),
        Symbology::Code128 => code128::decode_runs(runs, max_variance),
        Symbology::QrCode => None,
    }
}

/// Read every requested linear symbology from one line, both directions
fn read_line(samples: &[u8], symbologies: SymbologySet) -> Vec<(Symbology, LinearRead)> {
    let Some(runs) = line_runs(samples, tuning::min_contrast()) else {
        return Vec::new();
    };
    let max_variance = tuning::max_variance();
    let mut backwards: Option<Vec<Run>> = None;

    let mut reads = Vec::new();
    for symbology in symbologies.iter().filter(|s| s.is_linear()) {
        if let Some(read) = read_runs(symbology, &runs, max_variance) {
            reads.push((symbology, read));
            continue;
        }
        let mirrored = backwards.get_or_insert_with(|| reversed(&runs, samples.len()));
        if let Some(read) = read_runs(symbology, mirrored, max_variance) {
            let (start, end) = (samples.len() - read.end, samples.len() - read.start);
            reads.push((symbology, LinearRead { start, end, ..read }));
        }
    }
    reads
}

fn push_distinct(hits: &mut Vec<DecodeHit>, hit: DecodeHit) {
    let seen = hits
        .iter()
        .any(|h| h.symbology == hit.symbology && h.payload == hit.payload);
    if !seen {
        hits.push(hit);
    }
}

/// Scan rows (and columns when rotating) of a luminance plane
///
/// A quick pass stops at the first line that yields anything; a thorough
/// pass reads every line and reports each distinct payload once.
pub(crate) fn scan(
    gray: &[u8],
    width: usize,
    height: usize,
    symbologies: SymbologySet,
    options: DecodeOptions,
) -> Vec<DecodeHit> {
    let mut hits = Vec::new();
    if width == 0 || height == 0 || gray.len() < width * height {
        return hits;
    }

    for y in line_positions(height, options.try_harder) {
        let row = &gray[y * width..(y + 1) * width];
        for (symbology, read) in read_line(row, symbologies) {
            let bbox = BoundingBox::new(read.start as u32, y as u32, (read.end - read.start) as u32, 1);
            push_distinct(&mut hits, DecodeHit::new(symbology, read.payload).with_bounding_box(bbox));
        }
        if !options.try_harder && !hits.is_empty() {
            return hits;
        }
    }

    if !options.try_rotate {
        return hits;
    }

    let mut column = vec![0u8; height];
    for x in line_positions(width, options.try_harder) {
        for (y, sample) in column.iter_mut().enumerate() {
            *sample = gray[y * width + x];
        }
        for (symbology, read) in read_line(&column, symbologies) {
            let bbox = BoundingBox::new(x as u32, read.start as u32, 1, (read.end - read.start) as u32);
            push_distinct(&mut hits, DecodeHit::new(symbology, read.payload).with_bounding_box(bbox));
        }
        if !options.try_harder && !hits.is_empty() {
            break;
        }
    }

    hits
}
