//! Gaussian-weighted local thresholding for uneven lighting
//!
//! Each pixel is compared against the Gaussian-weighted mean of its
//! `block x block` neighbourhood minus a constant. Windows with almost no
//! contrast (the inside of a wide bar, a blank margin) carry no local
//! information, so they fall back to the global Otsu threshold instead of
//! hollowing out.

use rayon::prelude::*;

/// Local standard deviation below which a window counts as flat
const FLAT_WINDOW_STDDEV: f32 = 6.0;

fn odd_block(block: usize) -> usize {
    let block = block.max(3);
    if block % 2 == 0 { block + 1 } else { block }
}

/// Normalised 1D Gaussian kernel; sigma derived from the block size
pub fn gaussian_kernel(block: usize) -> Vec<f32> {
    let block = odd_block(block);
    let sigma = 0.3 * ((block as f32 - 1.0) * 0.5 - 1.0) + 0.8;
    let half = (block / 2) as i32;
    let mut kernel: Vec<f32> = (-half..=half)
        .map(|i| (-((i * i) as f32) / (2.0 * sigma * sigma)).exp())
        .collect();
    let sum: f32 = kernel.iter().sum();
    kernel.iter_mut().for_each(|w| *w /= sum);
    kernel
}

/// Separable blur with replicated borders, rows in parallel
fn blur(plane: &[f32], width: usize, height: usize, kernel: &[f32]) -> Vec<f32> {
    let half = kernel.len() / 2;

    let mut horizontal = vec![0f32; width * height];
    horizontal
        .par_chunks_mut(width)
        .enumerate()
        .for_each(|(y, row)| {
            let src = &plane[y * width..(y + 1) * width];
            for (x, out) in row.iter_mut().enumerate() {
                let mut acc = 0.0;
                for (k, w) in kernel.iter().enumerate() {
                    let sx = (x + k).saturating_sub(half).min(width - 1);
                    acc += w * src[sx];
                }
                *out = acc;
            }
        });

    let mut blurred = vec![0f32; width * height];
    blurred
        .par_chunks_mut(width)
        .enumerate()
        .for_each(|(y, row)| {
            for (k, w) in kernel.iter().enumerate() {
                let sy = (y + k).saturating_sub(half).min(height - 1);
                let src = &horizontal[sy * width..(sy + 1) * width];
                for (out, s) in row.iter_mut().zip(src) {
                    *out += w * s;
                }
            }
        });

    blurred
}

/// Gaussian-weighted neighbourhood mean of every pixel
pub fn gaussian_local_mean(gray: &[u8], width: usize, height: usize, block: usize) -> Vec<f32> {
    if width == 0 || height == 0 {
        return Vec::new();
    }
    let plane: Vec<f32> = gray.iter().map(|&v| v as f32).collect();
    blur(&plane, width, height, &gaussian_kernel(block))
}

/// Binarize with a Gaussian local mean: 255 where `pixel > mean - c`, else 0
pub fn adaptive_threshold(gray: &[u8], width: usize, height: usize, block: usize, c: f32) -> Vec<u8> {
    if width == 0 || height == 0 {
        return Vec::new();
    }

    let kernel = gaussian_kernel(block);
    let plane: Vec<f32> = gray.iter().map(|&v| v as f32).collect();
    let squares: Vec<f32> = plane.iter().map(|v| v * v).collect();
    let mean = blur(&plane, width, height, &kernel);
    let mean_sq = blur(&squares, width, height, &kernel);
    let global = otsu_threshold(gray) as f32;

    let mut binary = vec![0u8; width * height];
    binary.par_iter_mut().enumerate().for_each(|(i, out)| {
        let value = plane[i];
        let variance = (mean_sq[i] - mean[i] * mean[i]).max(0.0);
        let white = if variance.sqrt() < FLAT_WINDOW_STDDEV {
            value >= global
        } else {
            value > mean[i] - c
        };
        *out = if white { 255 } else { 0 };
    });

    binary
}

/// Otsu's optimal global threshold: pixels below it are dark
pub fn otsu_threshold(gray: &[u8]) -> u8 {
    let mut histogram = [0u64; 256];
    for &pixel in gray {
        histogram[pixel as usize] += 1;
    }

    let total = gray.len() as f64;
    let sum_all: f64 = histogram
        .iter()
        .enumerate()
        .map(|(i, &count)| i as f64 * count as f64)
        .sum();

    let mut weight_dark = 0.0;
    let mut sum_dark = 0.0;
    let mut max_variance = 0.0;
    let mut optimal_threshold = 128u8;

    for (intensity, &count) in histogram.iter().enumerate() {
        weight_dark += count as f64;
        if weight_dark == 0.0 {
            continue;
        }
        let weight_light = total - weight_dark;
        if weight_light == 0.0 {
            break;
        }
        sum_dark += intensity as f64 * count as f64;

        let mean_dark = sum_dark / weight_dark;
        let mean_light = (sum_all - sum_dark) / weight_light;
        let variance = weight_dark * weight_light * (mean_dark - mean_light).powi(2);
        if variance > max_variance {
            max_variance = variance;
            optimal_threshold = (intensity + 1) as u8;
        }
    }

    optimal_threshold
}
