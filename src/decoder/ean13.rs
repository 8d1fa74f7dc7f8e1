//! EAN-13 reading from bar/space runs
//!
//! The check digit is not verified here. A structurally complete read with a
//! wrong check digit is still reported, so that validation is the single
//! place where it gets rejected.

use super::linear::{LinearRead, Run, distinct_match, pattern_deviation, widths};

/// Space/bar/space/bar widths of the L-code digits; R codes share the widths
/// with colours swapped
pub(crate) const L_PATTERNS: [[u8; 4]; 10] = [
    [3, 2, 1, 1],
    [2, 2, 2, 1],
    [2, 1, 2, 2],
    [1, 4, 1, 1],
    [1, 1, 3, 2],
    [1, 2, 3, 1],
    [1, 1, 1, 4],
    [1, 3, 1, 2],
    [1, 2, 1, 3],
    [3, 1, 1, 2],
];

/// G-code digits: the L widths mirrored
pub(crate) const G_PATTERNS: [[u8; 4]; 10] = [
    [1, 1, 2, 3],
    [1, 2, 2, 2],
    [2, 2, 1, 2],
    [1, 1, 4, 1],
    [2, 3, 1, 1],
    [1, 3, 2, 1],
    [4, 1, 1, 1],
    [2, 1, 3, 1],
    [3, 1, 2, 1],
    [2, 1, 1, 3],
];

/// L codes then G codes, the candidates for a left-half digit
const LEFT_PATTERNS: [[u8; 4]; 20] = {
    let mut all = [[0u8; 4]; 20];
    let mut i = 0;
    while i < 10 {
        all[i] = L_PATTERNS[i];
        all[i + 10] = G_PATTERNS[i];
        i += 1;
    }
    all
};

/// L/G choice of the six left-half digits (1 = G, first digit in bit 5),
/// indexed by the implied leading digit
pub(crate) const FIRST_DIGIT_PARITY: [u8; 10] =
    [0x00, 0x0B, 0x0D, 0x0E, 0x13, 0x19, 0x1C, 0x15, 0x16, 0x1A];

pub(crate) const EDGE_GUARD: [u8; 3] = [1, 1, 1];
pub(crate) const MIDDLE_GUARD: [u8; 5] = [1, 1, 1, 1, 1];

/// 3 + 6*4 + 5 + 6*4 + 3
const SYMBOL_RUNS: usize = 59;
const SYMBOL_MODULES: f32 = 95.0;
const DIGIT_MODULES: f32 = 7.0;
const QUIET_ZONE_MODULES: f32 = 3.0;
/// Relative slack on the measured size of a digit or guard
const SIZE_TOLERANCE: f32 = 0.3;
/// Modules by which a digit's best pattern must beat the next best
const DIGIT_MARGIN: f32 = 0.5;

/// First EAN-13 symbol found in `runs`, scanning left to right
pub(crate) fn decode_runs(runs: &[Run], max_variance: f32) -> Option<LinearRead> {
    if runs.len() < SYMBOL_RUNS {
        return None;
    }
    (0..=runs.len() - SYMBOL_RUNS)
        .filter(|&i| runs[i].dark)
        .find_map(|i| decode_at(runs, i, max_variance))
}

fn decode_at(runs: &[Run], at: usize, max_variance: f32) -> Option<LinearRead> {
    let symbol = &runs[at..at + SYMBOL_RUNS];
    let total: usize = symbol.iter().map(|r| r.len).sum();
    let module = total as f32 / SYMBOL_MODULES;

    let quiet = QUIET_ZONE_MODULES * module;
    if at > 0 && (runs[at - 1].len as f32) < quiet {
        return None;
    }
    if let Some(after) = runs.get(at + SYMBOL_RUNS) {
        if (after.len as f32) < quiet {
            return None;
        }
    }

    guard(&symbol[0..3], &EDGE_GUARD, module, max_variance)?;
    guard(&symbol[27..32], &MIDDLE_GUARD, module, max_variance)?;
    guard(&symbol[56..59], &EDGE_GUARD, module, max_variance)?;

    let digit_limit = 4.0 * max_variance;
    let mut digits = [0u8; 13];
    let mut parity = 0u8;

    for k in 0..6 {
        let counts = widths(&symbol[3 + 4 * k..7 + 4 * k]);
        plausible_size(&counts, DIGIT_MODULES, module)?;
        let (index, _) = distinct_match(&counts, &LEFT_PATTERNS, digit_limit, DIGIT_MARGIN)?;
        digits[k + 1] = (index % 10) as u8;
        parity = (parity << 1) | u8::from(index >= 10);
    }

    for k in 0..6 {
        let counts = widths(&symbol[32 + 4 * k..36 + 4 * k]);
        plausible_size(&counts, DIGIT_MODULES, module)?;
        let (digit, _) = distinct_match(&counts, &L_PATTERNS, digit_limit, DIGIT_MARGIN)?;
        digits[k + 7] = digit as u8;
    }

    digits[0] = FIRST_DIGIT_PARITY.iter().position(|&p| p == parity)? as u8;

    Some(LinearRead {
        payload: digits.iter().map(|d| b'0' + d).collect(),
        start: symbol[0].start,
        end: symbol[SYMBOL_RUNS - 1].end(),
    })
}

fn plausible_size(counts: &[usize], modules: f32, module: f32) -> Option<()> {
    let measured = counts.iter().sum::<usize>() as f32 / module;
    ((measured - modules).abs() <= modules * SIZE_TOLERANCE).then_some(())
}

fn guard(runs: &[Run], pattern: &[u8], module: f32, max_variance: f32) -> Option<()> {
    let counts = widths(runs);
    plausible_size(&counts, pattern.len() as f32, module)?;
    (pattern_deviation(&counts, pattern) <= pattern.len() as f32 * max_variance).then_some(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::linear::{line_runs, reversed};

    fn push_widths(modules: &mut Vec<bool>, widths: &[u8], mut dark: bool) {
        for &w in widths {
            modules.extend(std::iter::repeat(dark).take(w as usize));
            dark = !dark;
        }
    }

    /// Module sequence of an EAN-13 symbol, dark = true
    fn encode(code: &str) -> Vec<bool> {
        let d: Vec<usize> = code.bytes().map(|b| (b - b'0') as usize).collect();
        let parity = FIRST_DIGIT_PARITY[d[0]];
        let mut modules = Vec::new();
        push_widths(&mut modules, &EDGE_GUARD, true);
        for k in 0..6 {
            let is_g = (parity >> (5 - k)) & 1 == 1;
            let pattern = if is_g { G_PATTERNS[d[k + 1]] } else { L_PATTERNS[d[k + 1]] };
            push_widths(&mut modules, &pattern, false);
        }
        push_widths(&mut modules, &MIDDLE_GUARD, false);
        for k in 0..6 {
            push_widths(&mut modules, &L_PATTERNS[d[k + 7]], true);
        }
        push_widths(&mut modules, &EDGE_GUARD, true);
        modules
    }

    fn render_line(code: &str, px: usize) -> Vec<u8> {
        let mut line = vec![255u8; 11 * px];
        for dark in encode(code) {
            line.extend(std::iter::repeat(if dark { 0 } else { 255 }).take(px));
        }
        line.extend(std::iter::repeat(255u8).take(11 * px));
        line
    }

    #[test]
    fn test_g_patterns_mirror_l_patterns() {
        for (l, g) in L_PATTERNS.iter().zip(G_PATTERNS.iter()) {
            let mut mirrored = *l;
            mirrored.reverse();
            assert_eq!(&mirrored, g);
        }
    }

    #[test]
    fn test_encoded_symbol_is_95_modules() {
        assert_eq!(encode("4006381333931").len(), 95);
    }

    #[test]
    fn test_decode_clean_line() {
        let line = render_line("4006381333931", 2);
        let runs = line_runs(&line, 32).unwrap();
        let read = decode_runs(&runs, 0.38).unwrap();
        assert_eq!(read.payload, b"4006381333931");
        assert_eq!(read.start, 22);
        assert_eq!(read.end, 22 + 190);
    }

    #[test]
    fn test_decode_reports_wrong_check_digit() {
        let line = render_line("4006381333939", 3);
        let runs = line_runs(&line, 32).unwrap();
        let read = decode_runs(&runs, 0.38).unwrap();
        assert_eq!(read.payload, b"4006381333939");
    }

    #[test]
    fn test_upside_down_line_reads_only_when_reversed() {
        let mut line = render_line("5901234123457", 2);
        line.reverse();
        let runs = line_runs(&line, 32).unwrap();
        assert!(decode_runs(&runs, 0.38).is_none());

        let back = reversed(&runs, line.len());
        let read = decode_runs(&back, 0.38).unwrap();
        assert_eq!(read.payload, b"5901234123457");
    }

    /// Runs of a symbol drawn at `px` pixels per module between quiet zones
    fn symbol_runs(code: &str, px: usize) -> Vec<Run> {
        let line = render_line(code, px);
        line_runs(&line, 32).unwrap()
    }

    #[test]
    fn test_left_patterns_are_l_then_g() {
        assert_eq!(LEFT_PATTERNS[3], L_PATTERNS[3]);
        assert_eq!(LEFT_PATTERNS[13], G_PATTERNS[3]);
    }

    #[test]
    fn test_ambiguous_digit_is_not_guessed() {
        let mut runs = symbol_runs("4006381333931", 2);
        assert_eq!(decode_runs(&runs, 0.38).unwrap().payload, b"4006381333931");

        // first right-half digit, a 3 (1-4-1-1), redrawn halfway between 0 (3-2-1-1) and 9 (3-1-1-2)
        let digit = 1 + 32;
        let mut start = runs[digit].start;
        for (run, len) in runs[digit..digit + 4].iter_mut().zip([6, 3, 2, 3]) {
            *run = Run { dark: run.dark, start, len };
            start += len;
        }
        assert!(decode_runs(&runs, 0.38).is_none());
    }

    #[test]
    fn test_truncated_symbol_is_rejected() {
        let line = render_line("4006381333931", 2);
        let runs = line_runs(&line[..line.len() / 2], 32).unwrap();
        assert!(decode_runs(&runs, 0.38).is_none());
    }
}
