use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use sankey_barchart::config::ChartConfig;
use sankey_barchart::ir::{Funnel, Stage};
use sankey_barchart::layout::compute_layout;
use sankey_barchart::render::render_html;
use std::hint::black_box;

fn decaying_funnel(stages: usize) -> Funnel {
    let mut value = 250_000.0;
    let stages = (0..stages)
        .map(|i| {
            let stage = Stage::new(format!("Step {}", i + 1), value, format!("Lost at {}", i + 1));
            value = (value * 0.62_f64).floor();
            stage
        })
        .collect();
    Funnel::new(stages)
}

fn bench_derive(c: &mut Criterion) {
    let mut group = c.benchmark_group("derive");
    for stages in [3usize, 8, 32] {
        let funnel = decaying_funnel(stages);
        group.bench_with_input(BenchmarkId::from_parameter(stages), &funnel, |b, funnel| {
            b.iter(|| {
                let mut funnel = funnel.clone();
                funnel.derive();
                black_box(funnel.len());
            });
        });
    }
    group.finish();
}

fn bench_layout(c: &mut Criterion) {
    let mut group = c.benchmark_group("layout");
    let config = ChartConfig::default();
    for stages in [3usize, 8, 32] {
        let mut funnel = decaying_funnel(stages);
        funnel.derive();
        group.bench_with_input(BenchmarkId::from_parameter(stages), &funnel, |b, funnel| {
            b.iter(|| {
                let layout = compute_layout(black_box(funnel), &config, 1200.0).expect("layout failed");
                black_box(layout.bars.len());
            });
        });
    }
    group.finish();
}

fn bench_end_to_end(c: &mut Criterion) {
    let mut group = c.benchmark_group("end_to_end");
    let config = ChartConfig::default();
    for width in [400.0_f64, 800.0, 1920.0] {
        let funnel = decaying_funnel(6);
        group.bench_with_input(BenchmarkId::from_parameter(width), &width, |b, &width| {
            b.iter(|| {
                let mut funnel = funnel.clone();
                funnel.derive();
                let layout = compute_layout(&funnel, &config, width).expect("layout failed");
                let html = render_html(&layout, &config);
                black_box(html.len());
            });
        });
    }
    group.finish();
}

criterion_group!(
    name = benches;
    config = Criterion::default();
    targets = bench_derive, bench_layout, bench_end_to_end
);
criterion_main!(benches);
