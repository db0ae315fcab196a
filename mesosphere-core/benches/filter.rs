//! Benchmarks for local filter evaluation.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use mesosphere_core::paging::page;
use mesosphere_core::{matches_vector_filters, DocumentFilter, Metadata, Row, Where};
use rand::Rng;

const TAGS: [&str; 4] = ["news", "blog", "docs", "forum"];

fn generate_rows(count: usize) -> Vec<Row> {
    let mut rng = rand::thread_rng();
    (0..count)
        .map(|i| {
            let metadata = Metadata::new()
                .with_field("tag", TAGS[rng.gen_range(0..TAGS.len())])
                .with_field("year", rng.gen_range(2000..2026))
                .with_field("score", rng.gen_range(0.0..1.0));
            Row::new(format!("row-{i}"))
                .with_document(format!("document {i} about {}", TAGS[i % TAGS.len()]))
                .with_metadata(metadata)
        })
        .collect()
}

fn bench_where(c: &mut Criterion) {
    let mut group = c.benchmark_group("where_filter");
    let filter = Where::field("tag")
        .is_in(vec!["news", "docs"])
        .and(Where::field("year").gte(2015))
        .and(Where::field("score").gt(0.5).or(Where::field("tag").eq("docs")));

    for count in [1_000, 10_000, 100_000].iter() {
        let rows = generate_rows(*count);

        group.throughput(Throughput::Elements(*count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), count, |bench, _| {
            bench.iter(|| {
                rows.iter()
                    .filter(|row| matches_vector_filters(row, Some(black_box(&filter)), None))
                    .count()
            })
        });
    }

    group.finish();
}

fn bench_where_document(c: &mut Criterion) {
    let mut group = c.benchmark_group("where_document_filter");
    let filter = DocumentFilter::contains("about docs").with_not_contains("forum");

    for count in [1_000, 10_000, 100_000].iter() {
        let rows = generate_rows(*count);

        group.throughput(Throughput::Elements(*count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), count, |bench, _| {
            bench.iter(|| {
                rows.iter()
                    .filter(|row| matches_vector_filters(row, None, Some(black_box(&filter))))
                    .count()
            })
        });
    }

    group.finish();
}

fn bench_filter_then_page(c: &mut Criterion) {
    let rows = generate_rows(10_000);
    let filter = Where::field("year").lt(2010);

    c.bench_function("filter_then_page_10k", |bench| {
        bench.iter(|| {
            let matched: Vec<&Row> = rows
                .iter()
                .filter(|row| row.matches(Some(&filter), None))
                .collect();
            page(&matched, Some(black_box(50)), Some(black_box(100))).len()
        })
    });
}

criterion_group!(benches, bench_where, bench_where_document, bench_filter_then_page);
criterion_main!(benches);
