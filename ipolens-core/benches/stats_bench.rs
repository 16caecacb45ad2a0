use chrono::NaiveDate;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use ipolens_core::stats::{group_summaries, ols, CorrelationMatrix, Summary};
use ipolens_core::{Flag, IpoRecord, ReferenceList, ReferenceSet, ReturnWindow};

fn synthetic_records(n: usize) -> Vec<IpoRecord> {
    let start = NaiveDate::from_ymd_opt(2000, 1, 3).unwrap();
    (0..n)
        .map(|i| {
            let mut r = IpoRecord::new(format!("T{i:05}"), start + chrono::Duration::days(i as i64));
            for w in ReturnWindow::ALL {
                // Deterministic, loosely varied returns.
                let v = ((i * 7919 + w.index() * 104_729) % 2000) as f64 / 1000.0 - 1.0;
                r.set_ipo_return(w, Some(v));
            }
            r
        })
        .collect()
}

fn bench_summary(c: &mut Criterion) {
    let records = synthetic_records(4_000);
    c.bench_function("summary_252day_4k", |b| {
        b.iter(|| {
            Summary::from_values(records.iter().map(|r| r.ipo_return(ReturnWindow::Day252)))
        })
    });
}

fn bench_grouped(c: &mut Criterion) {
    let records = synthetic_records(4_000);
    let spacs = ReferenceList::from_symbols(
        "spacs",
        records.iter().step_by(15).map(|r| r.symbol.clone()),
    );
    let refs = ReferenceSet {
        spacs: Some(spacs),
        ..Default::default()
    };
    let rows = refs.annotate(records);
    c.bench_function("group_by_day0_level_and_spac_4k", |b| {
        b.iter(|| {
            group_summaries(
                black_box(&rows),
                |r| Some((r.membership.day0_level?, r.membership.spac.unwrap_or(Flag::No))),
                |r| r.ipo_return(ReturnWindow::Day0),
            )
        })
    });
}

fn bench_predictive(c: &mut Criterion) {
    let records = synthetic_records(4_000);
    let column = |w: ReturnWindow| -> Vec<Option<f64>> { records.iter().map(|r| r.ipo_return(w)).collect() };
    let columns: Vec<(String, Vec<Option<f64>>)> =
        ReturnWindow::ALL.iter().map(|w| (w.ipo_column(), column(*w))).collect();
    let x = column(ReturnWindow::Day22);
    let y = column(ReturnWindow::Day252);

    c.bench_function("correlation_matrix_6x4k", |b| {
        b.iter(|| CorrelationMatrix::compute(black_box(&columns)))
    });
    c.bench_function("ols_4k", |b| b.iter(|| ols(black_box(&x), black_box(&y))));
}

criterion_group!(benches, bench_summary, bench_grouped, bench_predictive);
criterion_main!(benches);
