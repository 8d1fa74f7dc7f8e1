use criterion::{Criterion, black_box, criterion_group, criterion_main};
use rust_barcode::utils::convolve::sharpen;
use rust_barcode::utils::grayscale::{rgb_to_grayscale, rgb_to_grayscale_parallel};
use rust_barcode::utils::threshold::adaptive_threshold;
use rust_barcode::{Frame, Preprocessor};

/// Vertical stripes under a horizontal lighting ramp
fn striped_rgb(width: usize, height: usize) -> Vec<u8> {
    let mut rgb = Vec::with_capacity(width * height * 3);
    for _y in 0..height {
        for x in 0..width {
            let light = (x * 120 / width) as u8;
            let v = if (x / 4) % 2 == 0 { 20 + light / 4 } else { 120 + light };
            rgb.extend_from_slice(&[v, v, v]);
        }
    }
    rgb
}

fn bench_grayscale(c: &mut Criterion) {
    let rgb = striped_rgb(1280, 720);
    c.bench_function("rgb_to_grayscale_1280x720", |b| {
        b.iter(|| rgb_to_grayscale(black_box(&rgb), 1280, 720))
    });
    c.bench_function("rgb_to_grayscale_parallel_1280x720", |b| {
        b.iter(|| rgb_to_grayscale_parallel(black_box(&rgb), 1280, 720))
    });
}

fn bench_kernels(c: &mut Criterion) {
    let gray = rgb_to_grayscale(&striped_rgb(640, 480), 640, 480);
    c.bench_function("adaptive_threshold_640x480", |b| {
        b.iter(|| adaptive_threshold(black_box(&gray), 640, 480, 11, 2.0))
    });
    c.bench_function("sharpen_640x480", |b| {
        b.iter(|| sharpen(black_box(&gray), 640, 480))
    });
}

fn bench_all_stages(c: &mut Criterion) {
    let frame = Frame::from_rgb(640, 480, striped_rgb(640, 480)).unwrap();
    let preprocessor = Preprocessor::default();
    c.bench_function("preprocess_all_stages_640x480", |b| {
        b.iter(|| preprocessor.preprocess(black_box(&frame)))
    });
}

criterion_group!(benches, bench_grayscale, bench_kernels, bench_all_stages);
criterion_main!(benches);
