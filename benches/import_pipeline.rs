//! Benchmarks for the CSV import pipeline.
//!
//! Benchmark targets:
//! - Date parsing across accepted formats: <10us per value
//! - Import of 1,000 rows into the in-memory store: <50ms

// Criterion macros generate items without docs - this is expected for benchmarks
#![allow(missing_docs)]
#![allow(clippy::unwrap_used)]

use chrono::NaiveDate;
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::fmt::Write;
use std::hint::black_box;
use std::sync::Arc;
use std::time::Duration;

use postport::io::{ImportOptions, ImportService, parse_loose_datetime};
use postport::storage::{MemoryStore, UserDirectory};

const DATES: [&str; 6] = [
    "2024-03-01 09:15:00",
    "2024-03-01",
    "March 1, 2024",
    "Fri, 01 Mar 2024 09:15:00 +0000",
    "01/03/24",
    "yesterday",
];

/// Builds a CSV with `rows` data rows; every tenth row has a bad date.
fn sample_csv(rows: usize) -> String {
    let mut csv = String::from("ID,Title,Content,Date,Author\n");
    for i in 0..rows {
        let date = if i % 10 == 9 { "not a date" } else { DATES[i % 4] };
        let _ = writeln!(
            csv,
            "{i},\"Post {i}, imported\",\"<p>Body of <b>post</b> {i}</p><script>x()</script>\",\"{date}\",{}",
            if i % 2 == 0 { "Jane Doe" } else { "unknown" }
        );
    }
    csv
}

fn bench_date_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("date_parsing");
    let now = NaiveDate::from_ymd_opt(2024, 6, 15)
        .and_then(|d| d.and_hms_opt(12, 0, 0))
        .unwrap();

    for input in DATES {
        group.bench_with_input(BenchmarkId::from_parameter(input), input, |b, input| {
            b.iter(|| parse_loose_datetime(black_box(input), now));
        });
    }

    group.finish();
}

fn bench_import(c: &mut Criterion) {
    let mut group = c.benchmark_group("import");
    group.measurement_time(Duration::from_secs(10));

    for rows in [100usize, 1_000] {
        let csv = sample_csv(rows);
        group.throughput(Throughput::Elements(rows as u64));
        group.bench_with_input(BenchmarkId::new("memory_store", rows), &csv, |b, csv| {
            b.iter(|| {
                let store = Arc::new(MemoryStore::new());
                let operator = store.add_user("admin", "Site Admin").unwrap();
                store.add_user("jdoe", "Jane Doe").unwrap();
                let service = ImportService::new(store.clone(), store);
                service.import_from_reader(
                    black_box(csv.as_bytes()),
                    operator.id,
                    &ImportOptions::default(),
                    None,
                )
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_date_parsing, bench_import);
criterion_main!(benches);
