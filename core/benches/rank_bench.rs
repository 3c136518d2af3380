use criterion::{criterion_group, criterion_main, Criterion};
use keysearch_core::{BuildOptions, Bm25Params, IndexSnapshot, RawDocument};

const WORDS: &[&str] = &[
    "gene", "therapy", "risk", "forest", "fire", "covid", "vaccine", "immune", "protein", "folding", "climate",
    "trial", "response", "editing", "model", "learning", "smoke", "crop", "blood", "patients",
];

fn synthetic_corpus(n: u32) -> Vec<RawDocument> {
    (0..n)
        .map(|i| {
            let len = 8 + (i % 17) as usize;
            let text: Vec<&str> = (0..len).map(|j| WORDS[(i as usize * 7 + j * 13) % WORDS.len()]).collect();
            RawDocument::new(i + 1, text.join(" "), i % 5, "synthetic")
        })
        .collect()
}

fn bench_build(c: &mut Criterion) {
    let docs = synthetic_corpus(5_000);
    c.bench_function("build_5k", |b| b.iter(|| IndexSnapshot::build(docs.clone(), &BuildOptions::default())));
}

fn bench_rank(c: &mut Criterion) {
    let snap = IndexSnapshot::build(synthetic_corpus(5_000), &BuildOptions::default()).expect("corpus builds");
    c.bench_function("rank_3_terms", |b| {
        b.iter(|| snap.rank(["gene", "risk", "forest"], 10, Bm25Params::default()))
    });
}

criterion_group!(benches, bench_build, bench_rank);
criterion_main!(benches);
