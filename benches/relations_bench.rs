//! Relation merging and export throughput.
//!
//! Run with: `cargo bench`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use serde_json::json;

use exportify::export::{Exporter, WofExporter};
use exportify::merge_ids;
use exportify::path;

fn bench_merge_ids(c: &mut Criterion) {
    let mut group = c.benchmark_group("merge_ids");

    for size in [4usize, 64, 1024] {
        let existing: Vec<i64> = (0..size as i64).map(|n| 1_108_000_000 + n * 3).collect();
        let to_add: Vec<i64> = (0..size as i64).map(|n| 1_108_000_000 + n * 2).collect();
        group.throughput(Throughput::Elements((size * 2) as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| merge_ids(black_box(&existing), black_box(&to_add)))
        });
    }

    group.finish();
}

fn bench_paths(c: &mut Criterion) {
    let doc = json!({
        "type": "Feature",
        "properties": {
            "wof:id": 1_108_830_801,
            "wof:hierarchy": [{"country_id": 85633793, "locality_id": 85922583}],
            "wof:supersedes": [1_108_830_799]
        }
    });

    let mut group = c.benchmark_group("path");
    group.bench_function("get_nested", |b| {
        b.iter(|| path::get(black_box(&doc), "properties.wof:hierarchy.0.locality_id"))
    });
    group.bench_function("set_append", |b| {
        b.iter_batched(
            || doc.clone(),
            |mut doc| path::set(&mut doc, "properties.wof:supersedes.-1", json!(1)),
            criterion::BatchSize::SmallInput,
        )
    });
    group.finish();
}

fn bench_export(c: &mut Criterion) {
    let exporter = WofExporter::sequential(1);
    let body = serde_json::to_vec(&json!({
        "type": "Feature",
        "properties": {
            "wof:id": 1_108_830_801,
            "wof:name": "Terminal 2",
            "edtf:cessation": "open",
            "wof:hierarchy": [{"country_id": 85633793, "locality_id": 85922583}],
            "wof:superseded_by": [0, 1_108_830_803, 1_108_830_803]
        },
        "geometry": {"type": "Point", "coordinates": [-122.38, 37.61]}
    }))
    .unwrap();

    c.bench_function("export_record", |b| {
        b.iter(|| exporter.export(black_box(&body)))
    });
}

criterion_group!(benches, bench_merge_ids, bench_paths, bench_export);
criterion_main!(benches);
