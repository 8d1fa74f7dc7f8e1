//! Fixture rendering shared by the integration tests
//!
//! Barcodes are drawn module by module as black on white, with quiet zones,
//! then PNG-encoded so tests go through the same container path as callers.

#![allow(dead_code)]

use std::io::Cursor;

use image::{DynamicImage, GrayImage, ImageOutputFormat, Luma};
use rust_barcode::Frame;

const EAN_L: [&str; 10] = [
    "3211", "2221", "2122", "1411", "1132", "1231", "1114", "1312", "1213", "3112",
];
const EAN_PARITY: [u8; 10] = [0x00, 0x0B, 0x0D, 0x0E, 0x13, 0x19, 0x1C, 0x15, 0x16, 0x1A];

const CODE128: [&str; 106] = [
    "212222", "222122", "222221", "121223", "121322", "131222", "122213", "122312",
    "132212", "221213", "221312", "231212", "112232", "122132", "122231", "113222",
    "123122", "123221", "223211", "221132", "221231", "213212", "223112", "312131",
    "311222", "321122", "321221", "312212", "322112", "322211", "212123", "212321",
    "232121", "111323", "131123", "131321", "112313", "132113", "132311", "211313",
    "231113", "231311", "112133", "112331", "132131", "113123", "113321", "133121",
    "313121", "211331", "231131", "213113", "213311", "213131", "311123", "311321",
    "331121", "312113", "312311", "332111", "314111", "221411", "431111", "111224",
    "111422", "121124", "121421", "141122", "141221", "112214", "112412", "122114",
    "122411", "142112", "142211", "241211", "221114", "413111", "241112", "134111",
    "111242", "121142", "121241", "114212", "124112", "124211", "411212", "421112",
    "421211", "212141", "214121", "412121", "111143", "111341", "131141", "114113",
    "114311", "411113", "411311", "113141", "114131", "311141", "411131", "211412",
    "211214", "211232",
];
const CODE128_STOP: &str = "2331112";
const CODE128_START_B: usize = 104;

/// Alternating run widths starting with a bar
pub type Widths = Vec<u8>;

fn digits(s: &str) -> Vec<u8> {
    s.bytes().map(|b| b - b'0').collect()
}

fn push_pattern(widths: &mut Widths, pattern: &str, reversed: bool) {
    let mut w: Vec<u8> = digits(pattern);
    if reversed {
        w.reverse();
    }
    widths.extend(w);
}

/// Bar/space widths of an EAN-13 symbol (check digit taken as given)
pub fn ean13_widths(code: &str) -> Widths {
    let d = digits(code);
    assert_eq!(d.len(), 13, "EAN-13 fixtures need 13 digits");
    let parity = EAN_PARITY[d[0] as usize];

    let mut widths = vec![1, 1, 1];
    for k in 0..6 {
        let g = (parity >> (5 - k)) & 1 == 1;
        push_pattern(&mut widths, EAN_L[d[k + 1] as usize], g);
    }
    widths.extend([1, 1, 1, 1, 1]);
    for k in 0..6 {
        push_pattern(&mut widths, EAN_L[d[k + 7] as usize], false);
    }
    widths.extend([1, 1, 1]);
    widths
}

/// Bar/space widths of a Code 128 symbol in code set B
pub fn code128_widths(text: &str) -> Widths {
    let mut values = vec![CODE128_START_B];
    values.extend(text.bytes().map(|b| {
        assert!((32..128).contains(&b), "code set B fixture");
        (b - 32) as usize
    }));
    let check = values
        .iter()
        .enumerate()
        .map(|(i, &v)| i.max(1) * v)
        .sum::<usize>()
        % 103;
    values.push(check);

    let mut widths = Vec::new();
    for v in values {
        push_pattern(&mut widths, CODE128[v], false);
    }
    push_pattern(&mut widths, CODE128_STOP, false);
    widths
}

/// Draw a linear symbol: `px` pixels per module, `quiet` modules of margin
pub fn render_linear(widths: &[u8], px: u32, bar_height: u32, quiet: u32) -> GrayImage {
    let modules: u32 = widths.iter().map(|&w| w as u32).sum();
    let width = (modules + 2 * quiet) * px;
    let height = bar_height + 2 * quiet * px;

    let mut dark_columns = vec![false; width as usize];
    let mut x = quiet * px;
    for (i, &w) in widths.iter().enumerate() {
        let span = w as u32 * px;
        if i % 2 == 0 {
            for col in x..x + span {
                dark_columns[col as usize] = true;
            }
        }
        x += span;
    }

    let top = quiet * px;
    GrayImage::from_fn(width, height, |x, y| {
        let inside = y >= top && y < top + bar_height;
        if inside && dark_columns[x as usize] {
            Luma([0])
        } else {
            Luma([255])
        }
    })
}

pub fn render_ean13(code: &str) -> GrayImage {
    render_linear(&ean13_widths(code), 2, 60, 11)
}

pub fn render_code128(text: &str) -> GrayImage {
    render_linear(&code128_widths(text), 2, 60, 11)
}

pub fn render_qr(payload: &str) -> GrayImage {
    let code = qrcode::QrCode::new(payload.as_bytes()).expect("qr fixture");
    let size = code.width() as u32;
    let colors = code.to_colors();
    let (scale, quiet) = (4u32, 4u32);
    let side = (size + 2 * quiet) * scale;
    GrayImage::from_fn(side, side, |x, y| {
        let (mx, my) = (x / scale, y / scale);
        if mx < quiet || my < quiet || mx >= size + quiet || my >= size + quiet {
            return Luma([255]);
        }
        let idx = ((my - quiet) * size + (mx - quiet)) as usize;
        if colors[idx] == qrcode::Color::Dark {
            Luma([0])
        } else {
            Luma([255])
        }
    })
}

/// Paste `img` onto a white canvas at (x, y)
pub fn place(img: &GrayImage, width: u32, height: u32, x: u32, y: u32) -> GrayImage {
    let mut canvas = GrayImage::from_pixel(width, height, Luma([255]));
    image::imageops::overlay(&mut canvas, img, x as i64, y as i64);
    canvas
}

pub fn png_bytes(img: &GrayImage) -> Vec<u8> {
    let mut bytes = Vec::new();
    DynamicImage::ImageLuma8(img.clone())
        .write_to(&mut Cursor::new(&mut bytes), ImageOutputFormat::Png)
        .expect("png encode");
    bytes
}

pub fn frame(img: &GrayImage) -> Frame {
    Frame::from_gray_image(img.clone()).expect("fixture frame")
}

pub fn blank_frame() -> Frame {
    Frame::from_gray(64, 48, vec![255; 64 * 48]).expect("blank frame")
}
