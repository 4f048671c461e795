// Run with: cargo bench --features sim --bench fill_rect_sim

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use dsi_pipeline::bringup::{DefaultHooks, Pipeline};
use dsi_pipeline::config::PipelineConfig;
use dsi_pipeline::panel::DcsPanel;
use dsi_pipeline::sim::{SimBoard, SimPlatform};
use dsi_pipeline::PixelFormat;
use embedded_graphics::{
    pixelcolor::Rgb888,
    prelude::*,
    primitives::{PrimitiveStyle, Rectangle},
};
use std::hint::black_box;
use std::time::Duration;

type SimPipeline = Pipeline<SimPlatform, DcsPanel, DefaultHooks>;

fn configure_criterion() -> Criterion {
    Criterion::default()
        .sample_size(50)
        .measurement_time(Duration::from_secs(5))
        .warm_up_time(Duration::from_secs(2))
}

fn pipeline(format: PixelFormat) -> SimPipeline {
    let config = PipelineConfig {
        pixel_format: format,
        ..PipelineConfig::default()
    };
    let board = SimBoard::new(&config);
    let mut pipeline =
        Pipeline::new(board.peripherals(), DcsPanel::default(), DefaultHooks, config);
    pipeline.bring_up().unwrap();
    pipeline
}

fn get_test_rectangles() -> Vec<(&'static str, Rectangle)> {
    vec![
        (
            "full_screen",
            Rectangle::new(Point::zero(), Size::new(800, 480)),
        ),
        (
            "quarter_screen",
            Rectangle::new(Point::new(200, 120), Size::new(400, 240)),
        ),
        ("button", Rectangle::new(Point::new(40, 400), Size::new(120, 48))),
        ("hline", Rectangle::new(Point::new(0, 240), Size::new(800, 1))),
        ("vline", Rectangle::new(Point::new(400, 0), Size::new(1, 480))),
        // clipped at the bottom right corner
        (
            "clipped",
            Rectangle::new(Point::new(700, 400), Size::new(200, 200)),
        ),
    ]
}

fn fill_rect_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("fill_rect_sim");

    let formats = [
        ("argb8888", PixelFormat::Argb8888),
        ("rgb565", PixelFormat::Rgb565),
    ];
    for (format_name, format) in formats {
        let mut pipeline = pipeline(format);
        for (rect_name, rect) in get_test_rectangles() {
            let visible = rect.intersection(&Rectangle::new(Point::zero(), Size::new(800, 480)));
            let pixels = visible.size.width * visible.size.height;
            group.throughput(Throughput::Elements(u64::from(pixels)));
            group.bench_with_input(
                BenchmarkId::new(rect_name, format_name),
                &rect,
                |b, rect| {
                    b.iter(|| {
                        black_box(rect)
                            .into_styled(PrimitiveStyle::with_fill(Rgb888::new(0x20, 0x40, 0x80)))
                            .draw(black_box(pipeline.display_mut()))
                            .unwrap();
                    });
                },
            );
        }
    }

    group.finish();
}

criterion_group!(name = benches; config = configure_criterion(); targets = fill_rect_benchmark);
criterion_main!(benches);
