//! Performance benchmarks for geoquiz-map
//!
//! Run with: cargo bench --package geoquiz-map

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use geo::{Coord, LineString, polygon};
use geoquiz_map::{
    Config, Feature, FeatureCollection, GeometryProjector, MapEngine, ProjectionConfig,
    RecordingSurface, RoadLayerConfig, RoadRenderer, SpatialIndex, Transform,
};
use std::sync::Arc;

const CLASSES: [&str; 4] = ["secondary", "primary", "trunk", "motorway"];

/// Short wiggly road segments scattered over the default projection area
fn generate_roads(count: usize) -> FeatureCollection {
    let side = (count as f64).sqrt().ceil() as usize;
    let features = (0..count)
        .map(|i| {
            let lon = 126.5 + (i % side) as f64 / side as f64 * 1.5;
            let lat = 37.0 + (i / side) as f64 / side as f64 * 1.1;
            let t = i as f64;
            let line = LineString::from(vec![
                (lon, lat),
                (lon + 0.004, lat + (t * 0.7).sin() * 0.002),
                (lon + 0.008, lat + 0.003),
            ]);
            Feature::road(CLASSES[i % CLASSES.len()], Some(format!("Road {}", i % 500)), line)
        })
        .collect();
    FeatureCollection::new(features)
}

fn generate_regions(per_side: usize) -> FeatureCollection {
    let d = 1.5 / per_side as f64;
    let features = (0..per_side * per_side)
        .map(|i| {
            let lon = 126.5 + (i % per_side) as f64 * d;
            let lat = 37.0 + (i / per_side) as f64 * d;
            Feature::region(
                format!("{:05}", 10000 + i),
                format!("Region {i}"),
                polygon![
                    (x: lon, y: lat),
                    (x: lon + d, y: lat),
                    (x: lon + d, y: lat + d),
                    (x: lon, y: lat + d),
                    (x: lon, y: lat),
                ],
            )
        })
        .collect();
    FeatureCollection::new(features)
}

fn projector() -> Arc<GeometryProjector> {
    Arc::new(
        GeometryProjector::new(&ProjectionConfig::default(), 1280.0, 720.0)
            .expect("valid viewport"),
    )
}

// ============================================================================
// Core Benchmarks - Key performance indicators
// ============================================================================

fn bench_construction(c: &mut Criterion) {
    let mut group = c.benchmark_group("construction");
    group.sample_size(20);

    for count in [10_000, 50_000] {
        let roads = Arc::new(generate_roads(count));
        let projector = projector();
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::new("index_build", count), &count, |b, _| {
            b.iter(|| SpatialIndex::build(roads.clone(), projector.clone(), 16));
        });
    }

    group.finish();
}

fn bench_draw(c: &mut Criterion) {
    let mut group = c.benchmark_group("draw");

    let index = Arc::new(SpatialIndex::build(
        Arc::new(generate_roads(50_000)),
        projector(),
        16,
    ));
    let mut renderer = RoadRenderer::new(RoadLayerConfig::default()).expect("default config");
    renderer.set_viewport(1280.0, 720.0);
    for class in CLASSES {
        renderer.assign_canvas(class, Box::new(RecordingSurface::new()));
    }
    renderer.set_index(Some(index));

    for k in [1.0, 3.0, 8.0] {
        let transform = Transform::new(-640.0 * (k - 1.0), -360.0 * (k - 1.0), k);
        group.bench_with_input(BenchmarkId::new("frame_50k", k), &transform, |b, t| {
            b.iter(|| renderer.draw(t).drawn_count());
        });
    }

    group.finish();
}

fn bench_region_query(c: &mut Criterion) {
    let mut group = c.benchmark_group("region_query");

    let mut engine = MapEngine::new(Config::default()).expect("default config");
    engine.load_regions(generate_regions(20));
    engine.load_roads(generate_roads(50_000));
    engine
        .resize(1280.0, 720.0)
        .expect("valid viewport");

    group.bench_function("query_region_50k", |b| {
        b.iter(|| engine.query_region("10210"));
    });
    group.bench_function("region_intel_400", |b| {
        b.iter(|| engine.region_intel("10210"));
    });

    group.finish();
}

fn bench_window_query(c: &mut Criterion) {
    let mut group = c.benchmark_group("window_query");

    let projector = projector();
    let index = SpatialIndex::build(Arc::new(generate_roads(50_000)), projector.clone(), 16);
    let center = projector.project_coord(Coord { x: 127.25, y: 37.55 });
    for half in [50.0, 400.0] {
        let window = geo::Rect::new(
            Coord {
                x: center.x - half,
                y: center.y - half,
            },
            Coord {
                x: center.x + half,
                y: center.y + half,
            },
        );
        group.bench_with_input(BenchmarkId::new("query_ids", half), &window, |b, w| {
            b.iter(|| index.query_ids(w).0.len());
        });
    }

    group.finish();
}

// ============================================================================
// Criterion Configuration
// ============================================================================

criterion_group!(
    benches,
    bench_construction,
    bench_draw,
    bench_region_query,
    bench_window_query,
);

criterion_main!(benches);
