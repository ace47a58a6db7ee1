//! Performance benchmarks for Casement
//!
//! Covers the hot paths of geometry negotiation: monitor discovery, size
//! constraint, configure planning and a full resize round trip.

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};

use casement::config::DisplayConfig;
use casement::geometry::{Rectangle, Size};
use casement::layout::{BoxLayout, DamageLog, SizeRequest, WidgetId};
use casement::platform::headless::{HeadlessPlatform, WmPolicy};
use casement::{
    CasementConfig, DisplayTopology, EventPump, GeometryHints, Gravity, WindowId, WindowKind,
    WindowRegistry,
};

fn outputs(count: i32) -> (Size, Vec<(String, Rectangle)>) {
    let monitors = (0..count)
        .map(|i| (format!("DP-{}", i + 1), Rectangle::new(i * 1920, 0, 1920, 1080)))
        .collect();
    (Size::new(count * 1920, 1080), monitors)
}

fn world(platform: &HeadlessPlatform) -> (WindowRegistry, WindowId) {
    let layout = BoxLayout::new();
    layout.add_container(WidgetId(1), None, 6, 0);
    layout.add_leaf(WidgetId(2), Some(WidgetId(1)), SizeRequest::fixed(320, 240), true);
    let mut registry = WindowRegistry::new(
        CasementConfig::default(),
        Box::new(platform.clone()),
        Box::new(layout),
        Box::new(DamageLog::new()),
    );
    let id = registry.create_window(WindowKind::Toplevel, WidgetId(1));
    (registry, id)
}

/// Benchmark monitor discovery over growing output counts
fn bench_topology_discovery(c: &mut Criterion) {
    let mut group = c.benchmark_group("topology_discovery");

    for count in [1, 4, 16].iter() {
        let (screen, monitors) = outputs(*count);
        let platform = HeadlessPlatform::with_monitors(screen, monitors);
        group.bench_function(format!("discover_{}_outputs", count), |b| {
            b.iter(|| black_box(DisplayTopology::new(DisplayConfig::default(), &platform)))
        });
    }

    group.finish();
}

fn bench_constrain_size(c: &mut Criterion) {
    let hints = GeometryHints::default()
        .with_min_size(100, 80)
        .with_max_size(1600, 1200)
        .with_base_size(20, 10)
        .with_resize_inc(7, 13)
        .with_aspect(0.5, 2.0)
        .with_gravity(Gravity::Center);

    c.bench_function("constrain_size", |b| {
        b.iter(|| {
            for width in (0..2000).step_by(97) {
                black_box(hints.constrain_size(black_box(width), black_box(width / 2 + 31)));
            }
        })
    });
}

fn bench_plan(c: &mut Criterion) {
    let platform = HeadlessPlatform::default();
    let (mut registry, id) = world(&platform);
    if let Err(e) = registry.show(id) {
        panic!("show failed: {}", e);
    }

    c.bench_function("configure_plan", |b| {
        b.iter(|| black_box(registry.plan(id).ok()))
    });
}

/// Full request/notify round trips through the event pump
fn bench_resize_negotiation(c: &mut Criterion) {
    let mut group = c.benchmark_group("resize_negotiation");

    for policy in [WmPolicy::Grant, WmPolicy::Clamp(Size::new(800, 600))] {
        group.bench_function(format!("{:?}", policy), |b| {
            b.iter_batched(
                || {
                    let platform = HeadlessPlatform::default();
                    platform.set_policy(policy);
                    let (registry, id) = world(&platform);
                    (platform, registry, id, EventPump::new().ok())
                },
                |(mut platform, mut registry, id, pump)| {
                    let Some(mut pump) = pump else { return };
                    let _ = registry.show(id);
                    for step in 1..=10 {
                        let _ = registry.resize(id, 320 + step * 40, 240 + step * 30);
                        let _ = pump.run_until_idle(&mut registry, &mut platform);
                    }
                    black_box(registry.window(id).and_then(|w| w.allocation()));
                },
                BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_topology_discovery,
    bench_constrain_size,
    bench_plan,
    bench_resize_negotiation
);
criterion_main!(benches);
