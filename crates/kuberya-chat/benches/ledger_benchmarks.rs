//! Benchmarks for the history ledger hot paths.
//!
//! Recording runs once per completed interaction and truncates both the
//! title and the summary; deletion scans the list and may reselect.

use std::time::Duration;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use kuberya_chat::history::{truncate_chars, HistoryLedger};
use kuberya_core::types::ModelLabel;

fn long_text(chars: usize) -> String {
    "Explain the difference between supervised and unsupervised learning. "
        .chars()
        .cycle()
        .take(chars)
        .collect()
}

fn bench_truncate(c: &mut Criterion) {
    let mut group = c.benchmark_group("truncate_chars");
    for len in [40usize, 400, 4000] {
        let text = long_text(len);
        group.bench_with_input(BenchmarkId::from_parameter(len), &text, |b, text| {
            b.iter(|| truncate_chars(text, 100));
        });
    }
    group.finish();
}

fn bench_record(c: &mut Criterion) {
    let title = long_text(120);
    let summary = long_text(600);
    let model = ModelLabel::new("Mentify 1");

    c.bench_function("record_interaction", |b| {
        let ledger = HistoryLedger::default();
        b.iter(|| ledger.record_interaction(&title, &summary, &model));
    });
}

fn bench_delete_active(c: &mut Criterion) {
    let model = ModelLabel::new("Mentify 2");

    c.bench_function("delete_active_of_500", |b| {
        b.iter_batched(
            || {
                let ledger = HistoryLedger::default();
                for i in 0..500 {
                    ledger.record_interaction(&format!("title {i}"), "summary", &model);
                }
                let middle = ledger.nth(250).map(|e| e.id);
                if let Some(id) = middle {
                    ledger.select(id);
                }
                (ledger, middle)
            },
            |(ledger, middle)| {
                if let Some(id) = middle {
                    ledger.delete(id);
                }
            },
            criterion::BatchSize::SmallInput,
        );
    });
}

criterion_group! {
    name = benches;
    config = Criterion::default().measurement_time(Duration::from_secs(5));
    targets = bench_truncate, bench_record, bench_delete_active
}
criterion_main!(benches);
