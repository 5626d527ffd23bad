//! Matching and core-aggregation throughput.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use corescope_chem::NativeToolkit;
use corescope_engine::{
    parse_smiles_records, DecompositionAggregator, EngineConfig, MatchOrchestrator, MoleculeRecord,
    PatternLibrary,
};

const SUBSTITUENTS: &[&str] = &["C", "CC", "O", "N", "Cl", "OC(=O)", "CO", "NC", "CCN", "C(F)(F)(F)"];

const LIBRARY: &str = "\
core_phenyl c1ccccc1
core_pyridyl c1ccncc1
hydroxyl [OX2H]
halide [F,Cl,Br,I]
";

// =========================================================================
// Input generation: deterministic LCG over substituted benzenes and pyridines
// =========================================================================

fn molecule_set(n: usize, seed: u64) -> Vec<MoleculeRecord> {
    let mut state = seed;
    let mut next = |m: usize| {
        state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
        ((state >> 33) as usize) % m
    };
    let mut text = String::new();
    for i in 0..n {
        let a = SUBSTITUENTS[next(SUBSTITUENTS.len())];
        let b = SUBSTITUENTS[next(SUBSTITUENTS.len())];
        let ring = if next(3) == 0 { "c1ccnc" } else { "c1cccc" };
        text.push_str(&format!("{a}{ring}({b})c1 m{i}\n"));
    }
    parse_smiles_records(&text, &NativeToolkit).records
}

fn bench_classify(c: &mut Criterion) {
    let orch = MatchOrchestrator::new(NativeToolkit, EngineConfig::default());
    let library = PatternLibrary::parse_smarts_file(LIBRARY).unwrap();
    let all: Vec<_> = library.all_patterns().collect();
    let compiled = orch.build(&all, library.substitutions());

    let mut group = c.benchmark_group("classify");
    for &n in &[100, 1_000] {
        let records = molecule_set(n, 42);
        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::from_parameter(n), &records, |b, recs| {
            b.iter(|| orch.classify(black_box(recs), &compiled.matchers))
        });
    }
    group.finish();
}

fn bench_aggregate(c: &mut Criterion) {
    let orch = MatchOrchestrator::new(NativeToolkit, EngineConfig::default());
    let library = PatternLibrary::parse_smarts_file(LIBRARY).unwrap();
    let cores = library.core_patterns();
    let compiled = orch.build(&cores, library.substitutions());
    let aggregator = DecompositionAggregator::new(orch.toolkit(), orch.config());

    let mut group = c.benchmark_group("aggregate");
    for &n in &[100, 1_000] {
        let records = molecule_set(n, 7);
        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::from_parameter(n), &records, |b, recs| {
            b.iter(|| aggregator.aggregate(black_box(recs), &compiled.matchers))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_classify, bench_aggregate);
criterion_main!(benches);
