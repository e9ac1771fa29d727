//! Compile performance benchmarks: join fan-out, aggregation, and recursion
//! unrolling depth.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use logica::{compile_source, CompileOptions};

fn bench_join_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("join_chain");
    for hops in [2u32, 4, 8] {
        let mut source = String::from("Edge(a, b) :- Base(a, b);\n");
        source.push_str("P0(a, b) :- Edge(a, b);\n");
        for i in 1..hops {
            source.push_str(&format!("P{i}(a, c) :- P{}(a, b), Edge(b, c);\n", i - 1));
        }
        let target = format!("P{}", hops - 1);

        group.bench_with_input(BenchmarkId::from_parameter(hops), &hops, |b, _| {
            b.iter(|| compile_source(&source, "bench.l", &target, &CompileOptions::default()));
        });
    }
    group.finish();
}

fn bench_aggregation(c: &mut Criterion) {
    let source = "Sale(store, amount) :- Base(store, amount);\nTotal(store, total? += amount) :- Sale(store, amount);";
    c.bench_function("aggregation_sum", |b| {
        b.iter(|| compile_source(source, "bench.l", "Total", &CompileOptions::default()));
    });
}

fn bench_recursion_depth(c: &mut Criterion) {
    let mut group = c.benchmark_group("recursion_unroll_depth");
    for depth in [4u32, 8, 20] {
        let source = format!("@Recursive(N, {depth});\nN(0);\nN(n) :- N(m), n = m + 1;");
        group.bench_with_input(BenchmarkId::from_parameter(depth), &depth, |b, _| {
            b.iter(|| compile_source(&source, "bench.l", "N", &CompileOptions::default()));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_join_chain, bench_aggregation, bench_recursion_depth);
criterion_main!(benches);
