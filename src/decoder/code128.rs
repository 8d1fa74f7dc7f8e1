//! Code 128 reading from bar/space runs
//!
//! Symbols are matched by their six run widths (11 modules). The modulo-103
//! check symbol is verified here since it carries no payload.

use super::linear::{LinearRead, Run, best_match, widths};

/// Bar/space widths of symbol values 0..=105, followed by the first six runs
/// of the stop pattern
pub(crate) const PATTERNS: [[u8; 6]; 107] = [
    [2, 1, 2, 2, 2, 2], [2, 2, 2, 1, 2, 2], [2, 2, 2, 2, 2, 1], [1, 2, 1, 2, 2, 3], [1, 2, 1, 3, 2, 2], [1, 3, 1, 2, 2, 2],
    [1, 2, 2, 2, 1, 3], [1, 2, 2, 3, 1, 2], [1, 3, 2, 2, 1, 2], [2, 2, 1, 2, 1, 3], [2, 2, 1, 3, 1, 2], [2, 3, 1, 2, 1, 2],
    [1, 1, 2, 2, 3, 2], [1, 2, 2, 1, 3, 2], [1, 2, 2, 2, 3, 1], [1, 1, 3, 2, 2, 2], [1, 2, 3, 1, 2, 2], [1, 2, 3, 2, 2, 1],
    [2, 2, 3, 2, 1, 1], [2, 2, 1, 1, 3, 2], [2, 2, 1, 2, 3, 1], [2, 1, 3, 2, 1, 2], [2, 2, 3, 1, 1, 2], [3, 1, 2, 1, 3, 1],
    [3, 1, 1, 2, 2, 2], [3, 2, 1, 1, 2, 2], [3, 2, 1, 2, 2, 1], [3, 1, 2, 2, 1, 2], [3, 2, 2, 1, 1, 2], [3, 2, 2, 2, 1, 1],
    [2, 1, 2, 1, 2, 3], [2, 1, 2, 3, 2, 1], [2, 3, 2, 1, 2, 1], [1, 1, 1, 3, 2, 3], [1, 3, 1, 1, 2, 3], [1, 3, 1, 3, 2, 1],
    [1, 1, 2, 3, 1, 3], [1, 3, 2, 1, 1, 3], [1, 3, 2, 3, 1, 1], [2, 1, 1, 3, 1, 3], [2, 3, 1, 1, 1, 3], [2, 3, 1, 3, 1, 1],
    [1, 1, 2, 1, 3, 3], [1, 1, 2, 3, 3, 1], [1, 3, 2, 1, 3, 1], [1, 1, 3, 1, 2, 3], [1, 1, 3, 3, 2, 1], [1, 3, 3, 1, 2, 1],
    [3, 1, 3, 1, 2, 1], [2, 1, 1, 3, 3, 1], [2, 3, 1, 1, 3, 1], [2, 1, 3, 1, 1, 3], [2, 1, 3, 3, 1, 1], [2, 1, 3, 1, 3, 1],
    [3, 1, 1, 1, 2, 3], [3, 1, 1, 3, 2, 1], [3, 3, 1, 1, 2, 1], [3, 1, 2, 1, 1, 3], [3, 1, 2, 3, 1, 1], [3, 3, 2, 1, 1, 1],
    [3, 1, 4, 1, 1, 1], [2, 2, 1, 4, 1, 1], [4, 3, 1, 1, 1, 1], [1, 1, 1, 2, 2, 4], [1, 1, 1, 4, 2, 2], [1, 2, 1, 1, 2, 4],
    [1, 2, 1, 4, 2, 1], [1, 4, 1, 1, 2, 2], [1, 4, 1, 2, 2, 1], [1, 1, 2, 2, 1, 4], [1, 1, 2, 4, 1, 2], [1, 2, 2, 1, 1, 4],
    [1, 2, 2, 4, 1, 1], [1, 4, 2, 1, 1, 2], [1, 4, 2, 2, 1, 1], [2, 4, 1, 2, 1, 1], [2, 2, 1, 1, 1, 4], [4, 1, 3, 1, 1, 1],
    [2, 4, 1, 1, 1, 2], [1, 3, 4, 1, 1, 1], [1, 1, 1, 2, 4, 2], [1, 2, 1, 1, 4, 2], [1, 2, 1, 2, 4, 1], [1, 1, 4, 2, 1, 2],
    [1, 2, 4, 1, 1, 2], [1, 2, 4, 2, 1, 1], [4, 1, 1, 2, 1, 2], [4, 2, 1, 1, 1, 2], [4, 2, 1, 2, 1, 1], [2, 1, 2, 1, 4, 1],
    [2, 1, 4, 1, 2, 1], [4, 1, 2, 1, 2, 1], [1, 1, 1, 1, 4, 3], [1, 1, 1, 3, 4, 1], [1, 3, 1, 1, 4, 1], [1, 1, 4, 1, 1, 3],
    [1, 1, 4, 3, 1, 1], [4, 1, 1, 1, 1, 3], [4, 1, 1, 3, 1, 1], [1, 1, 3, 1, 4, 1], [1, 1, 4, 1, 3, 1], [3, 1, 1, 1, 4, 1],
    [4, 1, 1, 1, 3, 1], [2, 1, 1, 4, 1, 2], [2, 1, 1, 2, 1, 4], [2, 1, 1, 2, 3, 2], [2, 3, 3, 1, 1, 1],
];

pub(crate) const START_A: usize = 103;
pub(crate) const START_B: usize = 104;
pub(crate) const START_C: usize = 105;
pub(crate) const STOP: usize = 106;
/// Width of the bar closing the stop pattern
pub(crate) const STOP_TRAILING_BAR: u8 = 2;

const SYMBOL_MODULES: f32 = 11.0;
const QUIET_ZONE_MODULES: f32 = 5.0;
const SIZE_TOLERANCE: f32 = 0.3;
/// Start + check + stop
const MIN_RUNS: usize = 6 + 6 + 7;

const GROUP_SEPARATOR: char = '\u{1d}';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CodeSet {
    A,
    B,
    C,
}

/// First Code 128 symbol found in `runs`, scanning left to right
pub(crate) fn decode_runs(runs: &[Run], max_variance: f32) -> Option<LinearRead> {
    if runs.len() < MIN_RUNS {
        return None;
    }
    (0..=runs.len() - MIN_RUNS)
        .filter(|&i| runs[i].dark)
        .find_map(|i| decode_at(runs, i, max_variance))
}

fn decode_at(runs: &[Run], at: usize, max_variance: f32) -> Option<LinearRead> {
    let symbol_limit = 6.0 * max_variance;
    let start_counts = widths(&runs[at..at + 6]);
    let (offset, _) = best_match(&start_counts, &PATTERNS[START_A..=START_C], symbol_limit)?;
    let module = start_counts.iter().sum::<usize>() as f32 / SYMBOL_MODULES;
    let quiet = QUIET_ZONE_MODULES * module;
    if at > 0 && (runs[at - 1].len as f32) < quiet {
        return None;
    }

    let mut codes = vec![START_A + offset];
    let mut pos = at + 6;
    let end = loop {
        let group = runs.get(pos..pos + 6)?;
        let counts = widths(group);
        let size = counts.iter().sum::<usize>() as f32 / module;
        if (size - SYMBOL_MODULES).abs() > SYMBOL_MODULES * SIZE_TOLERANCE {
            return None;
        }
        let (code, _) = best_match(&counts, &PATTERNS, symbol_limit)?;
        match code {
            STOP => {
                let bar = runs.get(pos + 6)?;
                let bar_modules = bar.len as f32 / module;
                if (bar_modules - STOP_TRAILING_BAR as f32).abs() > 1.0 {
                    return None;
                }
                if let Some(after) = runs.get(pos + 7) {
                    if (after.len as f32) < quiet {
                        return None;
                    }
                }
                break bar.end();
            }
            START_A..=START_C => return None,
            _ => codes.push(code),
        }
        pos += 6;
    };

    let check = codes.pop()?;
    if codes.len() < 2 || checksum(&codes) != check {
        return None;
    }
    let text = decode_text(&codes)?;
    Some(LinearRead {
        payload: text.into_bytes(),
        start: runs[at].start,
        end,
    })
}

/// Weighted modulo-103 sum of a start symbol followed by data symbols
pub(crate) fn checksum(codes: &[usize]) -> usize {
    codes
        .iter()
        .enumerate()
        .map(|(i, &c)| i.max(1) * c)
        .sum::<usize>()
        % 103
}

fn decode_text(codes: &[usize]) -> Option<String> {
    let (&start, data) = codes.split_first()?;
    let mut set = match start {
        START_A => CodeSet::A,
        START_B => CodeSet::B,
        START_C => CodeSet::C,
        _ => return None,
    };

    let mut text = String::new();
    let mut shifted = false;
    let mut extended = false;

    for (i, &code) in data.iter().enumerate() {
        let active = match (shifted, set) {
            (true, CodeSet::A) => CodeSet::B,
            (true, CodeSet::B) => CodeSet::A,
            _ => set,
        };
        shifted = false;

        if active == CodeSet::C {
            match code {
                0..=99 => {
                    text.push(char::from(b'0' + (code / 10) as u8));
                    text.push(char::from(b'0' + (code % 10) as u8));
                }
                100 => set = CodeSet::B,
                101 => set = CodeSet::A,
                102 if i > 0 => text.push(GROUP_SEPARATOR),
                102 => {}
                _ => return None,
            }
            continue;
        }

        let byte = match (active, code) {
            (_, 0..=63) => Some(code as u8 + 32),
            (CodeSet::A, 64..=95) => Some(code as u8 - 64),
            (CodeSet::B, 64..=95) => Some(code as u8 + 32),
            _ => None,
        };
        if let Some(byte) = byte {
            let byte = if extended { byte | 0x80 } else { byte };
            extended = false;
            text.push(char::from(byte));
            continue;
        }

        match (active, code) {
            // FNC3, FNC2
            (_, 96 | 97) => {}
            (_, 98) => shifted = true,
            (_, 99) => set = CodeSet::C,
            (CodeSet::A, 100) => set = CodeSet::B,
            (CodeSet::B, 101) => set = CodeSet::A,
            (CodeSet::A, 101) | (CodeSet::B, 100) => extended = true,
            (_, 102) if i > 0 => text.push(GROUP_SEPARATOR),
            (_, 102) => {}
            _ => return None,
        }
    }
    Some(text)
}
