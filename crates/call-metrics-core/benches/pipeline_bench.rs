use call_metrics_core::{
    canonical_headers, merge_dedup, normalize, summarize_by_employee, summarize_daily, Cell,
    RawTable,
};
use criterion::{criterion_group, criterion_main, Criterion};

fn mk_upload(rows: usize) -> RawTable {
    let mut raw = RawTable::new(canonical_headers().into_iter().map(str::to_string).collect());
    for index in 0..rows {
        let mut row = vec![
            Cell::Text(format!("2024-01-{:02}", index % 28 + 1)),
            Cell::Text(format!("agent-{}", index % 40)),
        ];
        for column in 2..canonical_headers().len() {
            if column % 3 == 0 {
                row.push(Cell::Text(format!("{}%", (index + column) % 100)));
            } else {
                row.push(Cell::Text(((index * column) % 250).to_string()));
            }
        }
        raw.push_row(row);
    }
    raw
}

fn bench_normalize(c: &mut Criterion) {
    let upload = mk_upload(5_000);
    c.bench_function("normalize_5000_rows", |b| {
        b.iter(|| normalize(&upload));
    });
}

fn bench_merge(c: &mut Criterion) {
    let existing = normalize(&mk_upload(5_000));
    let incoming = normalize(&mk_upload(1_000));
    c.bench_function("merge_dedup_5000_plus_1000", |b| {
        b.iter(|| merge_dedup(existing.clone(), incoming.clone()));
    });
}

fn bench_summaries(c: &mut Criterion) {
    let records = normalize(&mk_upload(5_000));
    c.bench_function("summarize_5000_rows", |b| {
        b.iter(|| (summarize_by_employee(&records), summarize_daily(&records)));
    });
}

criterion_group!(benches, bench_normalize, bench_merge, bench_summaries);
criterion_main!(benches);
