//! 3x3 integer convolution with saturating output

use rayon::prelude::*;

/// Edge-restoring kernel: centre 9, all eight neighbours -1
pub const SHARPEN: [[i32; 3]; 3] = [[-1, -1, -1], [-1, 9, -1], [-1, -1, -1]];

/// Mirror an out-of-range index back inside `0..len` without repeating the edge
#[inline]
fn reflect_101(i: isize, len: usize) -> usize {
    if len == 1 {
        return 0;
    }
    let last = len as isize - 1;
    let mirrored = if i < 0 {
        -i
    } else if i > last {
        2 * last - i
    } else {
        i
    };
    mirrored.clamp(0, last) as usize
}

/// Convolve a grayscale plane with a 3x3 kernel, rows in parallel
pub fn convolve3x3(gray: &[u8], width: usize, height: usize, kernel: &[[i32; 3]; 3]) -> Vec<u8> {
    let mut out = vec![0u8; width * height];
    if width == 0 || height == 0 {
        return out;
    }

    out.par_chunks_mut(width).enumerate().for_each(|(y, row)| {
        for (x, px) in row.iter_mut().enumerate() {
            let mut acc = 0i32;
            for (ky, weights) in kernel.iter().enumerate() {
                let sy = reflect_101(y as isize + ky as isize - 1, height);
                let src = &gray[sy * width..(sy + 1) * width];
                for (kx, &w) in weights.iter().enumerate() {
                    let sx = reflect_101(x as isize + kx as isize - 1, width);
                    acc += w * src[sx] as i32;
                }
            }
            *px = acc.clamp(0, 255) as u8;
        }
    });

    out
}

/// Apply [`SHARPEN`]
pub fn sharpen(gray: &[u8], width: usize, height: usize) -> Vec<u8> {
    convolve3x3(gray, width, height, &SHARPEN)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reflect_101() {
        assert_eq!(reflect_101(-1, 5), 1);
        assert_eq!(reflect_101(5, 5), 3);
        assert_eq!(reflect_101(2, 5), 2);
        assert_eq!(reflect_101(-1, 1), 0);
    }

    #[test]
    fn test_sharpen_preserves_flat_regions() {
        let gray = vec![120u8; 16];
        assert_eq!(sharpen(&gray, 4, 4), gray);
    }

    #[test]
    fn test_sharpen_steepens_edges() {
        // Soft step from 100 to 150 across columns
        let row = [100u8, 100, 125, 150, 150];
        let gray: Vec<u8> = row.iter().cycle().take(15).copied().collect();
        let out = sharpen(&gray, 5, 3);

        let mid = &out[5..10];
        assert_eq!(mid[0], 100);
        assert!(mid[1] < 100, "dark side of the edge darkens: {}", mid[1]);
        assert!(mid[3] > 150, "bright side of the edge brightens: {}", mid[3]);
        assert_eq!(mid[4], 150);
    }

    #[test]
    fn test_binary_input_stays_binary() {
        let gray: Vec<u8> = (0..36).map(|i| if (i % 6) < 3 { 0 } else { 255 }).collect();
        let out = sharpen(&gray, 6, 6);
        assert!(out.iter().all(|&v| v == 0 || v == 255));
        assert_eq!(out, gray);
    }
}
