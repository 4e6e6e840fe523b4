use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use scoregrep::{FilterConfig, LineFilter, PatternEntry};
use std::io::{self, Cursor};

fn create_input(lines: usize) -> String {
    (0..lines)
        .map(|j| {
            format!(
                "Line {} TODO: fix bug {} FIXME: optimize line {} NOTE: important task {}\n",
                j, j, j, j
            )
        })
        .collect()
}

fn create_filter(pattern_count: usize) -> LineFilter {
    let base = [
        ".*TODO.*",
        r".*TODO:.*\d+.*",
        r".*FIXME:.*bug.*line \d+.*",
        r".*NOTE:.*important.*\d+",
    ];
    let patterns = (0..pattern_count)
        .map(|i| PatternEntry::new(base[i % base.len()], 1))
        .collect();
    LineFilter::new(&FilterConfig::new(2, patterns)).unwrap()
}

fn bench_line_scaling(c: &mut Criterion) {
    let filter = create_filter(4);

    let mut group = c.benchmark_group("Line Scaling");
    for lines in [10, 100, 1000, 10_000] {
        let input = create_input(lines);
        group.bench_with_input(BenchmarkId::from_parameter(lines), &input, |b, input| {
            b.iter(|| black_box(filter.run(Cursor::new(input.as_str()), io::sink()).unwrap()));
        });
    }
    group.finish();
}

fn bench_pattern_scaling(c: &mut Criterion) {
    let input = create_input(1000);

    let mut group = c.benchmark_group("Pattern Scaling");
    for patterns in [1, 2, 4, 8, 16] {
        let filter = create_filter(patterns);
        group.bench_with_input(BenchmarkId::from_parameter(patterns), &filter, |b, filter| {
            b.iter(|| black_box(filter.run(Cursor::new(input.as_str()), io::sink()).unwrap()));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_line_scaling, bench_pattern_scaling);
criterion_main!(benches);
