//! Criterion measurements of row decoding through `ResultCursor`, covering
//! the composite text formats (arrays, hstore, json) that dominate cost.
//! Inputs come from a seeded generator so runs are comparable.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use pg_session::prelude::*;
use pg_session::test_utils::MemoryResult;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Resolve how many rows each iteration decodes.
fn row_count() -> usize {
    std::env::var("BENCH_ROWS")
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(1000)
}

struct RawRow {
    ids: String,
    attrs: String,
    doc: String,
    elapsed: String,
}

fn generate_rows(count: usize) -> Vec<RawRow> {
    let mut rng = ChaCha8Rng::seed_from_u64(1_234_567_890);
    (0..count)
        .map(|_| {
            let len = rng.random_range(1..32);
            let ids: Vec<String> = (0..len)
                .map(|_| {
                    if rng.random_range(0..10) == 0 {
                        "NULL".to_string()
                    } else {
                        rng.random_range(-100_000_i64..100_000).to_string()
                    }
                })
                .collect();
            let attrs: Vec<String> = (0..rng.random_range(1..8))
                .map(|i| format!("\"key{i}\"=>\"value \\\"{}\\\"\"", rng.random_range(0..1000)))
                .collect();
            RawRow {
                ids: format!("{{{}}}", ids.join(",")),
                attrs: attrs.join(", "),
                doc: format!(r#"{{"n": {}, "tags": ["a", "b"]}}"#, rng.random_range(0..1000)),
                elapsed: format!(
                    "{} days {:02}:{:02}:{:02}",
                    rng.random_range(0..400),
                    rng.random_range(0..24),
                    rng.random_range(0..60),
                    rng.random_range(0..60)
                ),
            }
        })
        .collect()
}

fn build_result(rows: &[RawRow]) -> MemoryResult {
    let mut result = MemoryResult::new(vec![
        RawColumn::new("ids", 1016, "_int8"),
        RawColumn::new("attrs", 16_393, "hstore"),
        RawColumn::new("doc", 3802, "jsonb"),
        RawColumn::new("elapsed", 1186, "interval"),
    ]);
    for row in rows {
        result = result.row(&[
            Some(row.ids.as_str()),
            Some(row.attrs.as_str()),
            Some(row.doc.as_str()),
            Some(row.elapsed.as_str()),
        ]);
    }
    result
}

fn bench_cursor(c: &mut Criterion) {
    let count = row_count();
    let rows = generate_rows(count);
    let template = build_result(&rows);
    let options = SessionOptions::default();

    let mut group = c.benchmark_group("result_cursor");
    group.throughput(Throughput::Elements(count as u64));
    group.bench_with_input(BenchmarkId::new("collect_as_list", count), &template, |b, raw| {
        b.iter(|| {
            let mut cursor = ResultCursor::new(raw.clone(), &options);
            black_box(cursor.collect_as_list().expect("rows decode"))
        });
    });
    group.finish();
}

fn bench_array_parser(c: &mut Criterion) {
    let rows = generate_rows(64);
    let nested = format!(
        "{{{}}}",
        rows.iter().map(|row| row.ids.as_str()).collect::<Vec<_>>().join(",")
    );

    c.bench_function("parse_nested_array", |b| {
        b.iter(|| black_box(parse_array(black_box(&nested)).expect("literal parses")));
    });
}

criterion_group!(benches, bench_cursor, bench_array_parser);
criterion_main!(benches);
