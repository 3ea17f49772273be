use criterion::{black_box, criterion_group, criterion_main, Criterion};
use strata_tree::{ElementTree, TreePath};

fn build_chain(generations: usize) -> Vec<ElementTree<String>> {
    let root = ElementTree::new();
    for i in 0..32 {
        root.create(&TreePath::parse(&format!("/n{i}")), format!("v{i}"))
            .unwrap();
    }
    let mut chain = vec![root];
    for g in 1..generations {
        let next = chain.last().unwrap().new_empty_delta();
        next.set_data(&TreePath::parse(&format!("/n{}", g % 32)), format!("g{g}"))
            .unwrap();
        chain.push(next);
    }
    chain.last().unwrap().immutable();
    chain
}

fn bench_lookup(c: &mut Criterion) {
    let chain = build_chain(64);
    let newest = chain.last().unwrap();
    let hot = TreePath::parse("/n1");
    let cold = TreePath::parse("/n31");
    c.bench_function("lookup_shallow", |b| {
        b.iter(|| black_box(newest.data(black_box(&hot)).unwrap()))
    });
    c.bench_function("lookup_deep_chain", |b| {
        // resolved far down the chain, past the single-slot cache
        b.iter(|| {
            black_box(newest.data(black_box(&hot)).unwrap());
            black_box(newest.data(black_box(&cold)).unwrap());
        })
    });
}

fn bench_children(c: &mut Criterion) {
    let chain = build_chain(64);
    let newest = chain.last().unwrap();
    c.bench_function("children_of_root", |b| {
        b.iter(|| black_box(newest.child_names(&TreePath::root()).unwrap()))
    });
}

fn bench_collapse(c: &mut Criterion) {
    c.bench_function("collapse_chain_64", |b| {
        b.iter_batched(
            || build_chain(64),
            |chain| {
                chain
                    .last()
                    .unwrap()
                    .collapse_to(chain.first().unwrap())
                    .unwrap()
            },
            criterion::BatchSize::SmallInput,
        )
    });
}

criterion_group!(benches, bench_lookup, bench_children, bench_collapse);
criterion_main!(benches);
