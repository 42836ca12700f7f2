// Parse, score and structured-search throughput
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::prelude::*;
use rand::rngs::StdRng;
use std::sync::Arc;
use viaprox::{AddressParser, AddressRecord, Gazetteer, MemoryStore, SearchOptions, SearchOrchestrator, SimilarityScorer};

const VIAS: &[&str] = &["cl", "calle", "kr", "carrera", "k", "av", "ac", "tv", "dg", "diagonal"];
const MUNICIPALITIES: &[&str] = &["bogotá", "medellín", "cali", ""];

fn random_address(rng: &mut StdRng) -> String {
    let via = VIAS[rng.random_range(0..VIAS.len())];
    let label = rng.random_range(1..200);
    let primary = rng.random_range(1..150);
    let secondary = rng.random_range(1..99);
    let municipality = MUNICIPALITIES[rng.random_range(0..MUNICIPALITIES.len())];
    match rng.random_range(0..3) {
        0 => format!("{} {} # {}-{} {}", via, label, primary, secondary, municipality),
        1 => format!("{} {}b {} {} {}", via, label, primary, secondary, municipality),
        _ => format!("{} {} sur {} {} ap 301", via, label, primary, secondary),
    }
}

fn addresses(n: usize) -> Vec<String> {
    let mut rng = StdRng::seed_from_u64(42);
    (0..n).map(|_| random_address(&mut rng)).collect()
}

fn benchmark_parse(c: &mut Criterion) {
    let parser = AddressParser::default();
    let inputs = addresses(1000);

    c.bench_function("parse_1000", |b| {
        b.iter(|| {
            for raw in &inputs {
                black_box(parser.parse(black_box(raw)));
            }
        });
    });
}

fn benchmark_score(c: &mut Criterion) {
    let parser = AddressParser::default();
    let scorer = SimilarityScorer::default();
    let parsed: Vec<_> = addresses(1000).iter().map(|r| parser.parse(r)).collect();
    let query = parser.parse("kr 81 # 55-30 bogotá");

    c.bench_function("similarity_1000", |b| {
        b.iter(|| {
            for candidate in &parsed {
                black_box(scorer.similarity(&query, candidate));
                black_box(scorer.distance(&query, candidate));
            }
        });
    });
}

fn benchmark_structured_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("structured_search");
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let parser = AddressParser::default();

    for size in [1_000, 10_000].iter() {
        let store = MemoryStore::from_records(
            addresses(*size)
                .iter()
                .enumerate()
                .map(|(i, raw)| AddressRecord::new(format!("{:06}", i), raw.as_str()).with_structure(&parser.parse(raw))),
        );
        let orchestrator = SearchOrchestrator::new(Arc::new(Gazetteer::default()), Arc::new(store));
        let options = SearchOptions::with_radius(5);

        group.bench_with_input(BenchmarkId::new("radius_5", size), size, |b, _| {
            b.iter(|| {
                runtime
                    .block_on(orchestrator.search_nearby_addresses("kr 81 # 55-30 bogotá", &options))
                    .unwrap()
            });
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_parse, benchmark_score, benchmark_structured_search);
criterion_main!(benches);
