use criterion::{Criterion, black_box, criterion_group, criterion_main};
use rust_barcode::{Frame, MultiStrategyResolver, ScanConfig, SymbologySet};

fn qr_frame(payload: &str, scale: usize) -> Frame {
    let code = qrcode::QrCode::new(payload.as_bytes()).unwrap();
    let size = code.width();
    let colors = code.to_colors();
    let side = (size + 8) * scale;
    let mut pixels = vec![255u8; side * side];
    for y in 0..side {
        for x in 0..side {
            let (mx, my) = (x / scale, y / scale);
            if (4..size + 4).contains(&mx) && (4..size + 4).contains(&my) {
                if colors[(my - 4) * size + (mx - 4)] == qrcode::Color::Dark {
                    pixels[y * side + x] = 0;
                }
            }
        }
    }
    Frame::from_gray(side, side, pixels).unwrap()
}

fn bench_resolve(c: &mut Criterion) {
    let resolver = MultiStrategyResolver::builtin(&ScanConfig::live());

    let qr = qr_frame("https://example.com/item/42", 4);
    c.bench_function("resolve_clean_qr", |b| {
        b.iter(|| resolver.resolve(black_box(&qr), SymbologySet::ALL))
    });

    // Nothing to find: every strategy runs
    let blank = Frame::from_gray(640, 480, vec![200; 640 * 480]).unwrap();
    c.bench_function("resolve_blank_640x480", |b| {
        b.iter(|| resolver.resolve(black_box(&blank), SymbologySet::ALL))
    });
}

criterion_group!(benches, bench_resolve);
criterion_main!(benches);
