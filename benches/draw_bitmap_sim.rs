// Run with: cargo bench --features sim --bench draw_bitmap_sim

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use dsi_pipeline::bringup::{DefaultHooks, Pipeline};
use dsi_pipeline::config::PipelineConfig;
use dsi_pipeline::panel::DcsPanel;
use dsi_pipeline::sim::SimBoard;
use std::hint::black_box;

// Header with the four fields the blitter reads, rows stored bottom-up
// without padding.
fn bitmap(width: u32, height: u32, bits_per_pixel: u16) -> Vec<u8> {
    let bytes_per_pixel = usize::from(bits_per_pixel / 8);
    let mut bytes = vec![0u8; 54];
    bytes[0] = b'B';
    bytes[1] = b'M';
    bytes[10..14].copy_from_slice(&54u32.to_le_bytes());
    bytes[14..18].copy_from_slice(&40u32.to_le_bytes());
    bytes[18..22].copy_from_slice(&width.to_le_bytes());
    bytes[22..26].copy_from_slice(&height.to_le_bytes());
    bytes[28..30].copy_from_slice(&bits_per_pixel.to_le_bytes());
    let pixels = width as usize * height as usize * bytes_per_pixel;
    bytes.extend((0..pixels).map(|i| (i % 251) as u8));
    bytes
}

fn draw_bitmap_sim(c: &mut Criterion) {
    let mut group = c.benchmark_group("draw_bitmap_sim");

    let config = PipelineConfig::default();
    let board = SimBoard::new(&config);
    let mut pipeline =
        Pipeline::new(board.peripherals(), DcsPanel::default(), DefaultHooks, config);
    pipeline.bring_up().unwrap();

    let sizes = [("icon", 64, 64), ("banner", 800, 120), ("full_screen", 800, 480)];
    for (name, width, height) in sizes {
        for bits_per_pixel in [16u16, 24, 32] {
            let image = bitmap(width, height, bits_per_pixel);
            group.throughput(Throughput::Elements(u64::from(width * height)));
            group.bench_with_input(
                BenchmarkId::new(name, format!("{bits_per_pixel}bpp")),
                &image,
                |b, image| {
                    let display = pipeline.display_mut();
                    b.iter(|| {
                        black_box(&mut *display)
                            .draw_bitmap(0, 0, black_box(image))
                            .unwrap();
                    });
                },
            );
        }
    }

    group.finish();
}

criterion_group!(benches, draw_bitmap_sim);
criterion_main!(benches);
