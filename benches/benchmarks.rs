use criterion::{black_box, criterion_group, criterion_main, Criterion};
use pra_engine::bdd::Bdd;
use pra_engine::zbdd::Zbdd;

fn bdd_variable_chain_ite(c: &mut Criterion) {
    c.bench_function("bdd_variable_chain_ite", |b| {
        b.iter(|| {
            let mut bdd = Bdd::new();
            let mut acc = bdd.var_node(0);
            for v in 1..30 {
                let next = bdd.var_node(v);
                acc = bdd.ite(next, acc, acc);
            }
            black_box(acc);
        });
    });
}

fn zbdd_union_chain(c: &mut Criterion) {
    c.bench_function("zbdd_union_chain", |b| {
        b.iter(|| {
            let mut zbdd = Zbdd::new();
            let mut acc = zbdd.singleton(0);
            for v in 1..30 {
                let next = zbdd.singleton(v);
                acc = zbdd.union(acc, next);
            }
            black_box(acc);
        });
    });
}

fn zbdd_product_chain(c: &mut Criterion) {
    c.bench_function("zbdd_product_chain", |b| {
        b.iter(|| {
            let mut zbdd = Zbdd::new();
            let mut acc = zbdd.singleton(0);
            for v in 1..16 {
                let next = zbdd.singleton(v);
                acc = zbdd.product(acc, next);
            }
            black_box(acc);
        });
    });
}

criterion_group!(benches, bdd_variable_chain_ite, zbdd_union_chain, zbdd_product_chain);
criterion_main!(benches);
