//! Criterion benchmarks for the horizontal position-table builder: its cost
//! scales with the number of columns in a system, so this tracks a few
//! representative sizes rather than full pagination end-to-end.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use engrave_core::domain::value_objects::Tick;
use engrave_core::layout::position::{build_position_table, with_end_adjustment, ColumnExtras, ColumnInput};

fn make_columns(count: usize) -> Vec<ColumnInput> {
    (0..count)
        .map(|i| ColumnInput {
            tick: Tick::new(i as i64 * 120),
            extras: ColumnExtras {
                accidental_width: if i % 5 == 0 { 18.0 } else { 0.0 },
                ..Default::default()
            },
        })
        .collect()
}

fn bench_position_table_100_columns(c: &mut Criterion) {
    let columns = make_columns(100);
    c.bench_function("position_table_100_columns", |b| {
        b.iter(|| build_position_table(black_box(&columns)));
    });
}

fn bench_position_table_1000_columns(c: &mut Criterion) {
    let columns = make_columns(1000);
    c.bench_function("position_table_1000_columns", |b| {
        b.iter(|| build_position_table(black_box(&columns)));
    });
}

fn bench_position_table_with_end_adjustment(c: &mut Criterion) {
    let columns = make_columns(500);
    c.bench_function("position_table_500_columns_with_end_adjustment", |b| {
        b.iter(|| {
            let table = build_position_table(black_box(&columns));
            with_end_adjustment(table, 2000.0)
        });
    });
}

criterion_group!(
    benches,
    bench_position_table_100_columns,
    bench_position_table_1000_columns,
    bench_position_table_with_end_adjustment
);
criterion_main!(benches);
