use criterion::{Criterion, criterion_group, criterion_main};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::hint::black_box;

use stat_edge::config::EngineConfig;
use stat_edge::fixture_stats::{CompetitionPolicy, parse_fixture_stats_json};
use stat_edge::odds::parse_odds_json;
use stat_edge::profile::{WINDOW, aggregate_profile};
use stat_edge::selection::{evaluate_fixture, evaluate_fixtures};
use stat_edge::synthetic;

fn bench_fixture_stats_parse(c: &mut Criterion) {
    let policy = CompetitionPolicy::default();
    c.bench_function("fixture_stats_parse", |b| {
        b.iter(|| {
            let rows = parse_fixture_stats_json(black_box(HOME_JSON), 40, &policy).unwrap();
            black_box(rows.len());
        })
    });
}

fn bench_odds_parse(c: &mut Criterion) {
    c.bench_function("odds_parse", |b| {
        b.iter(|| {
            let quotes = parse_odds_json(black_box(ODDS_JSON)).unwrap();
            black_box(quotes.len());
        })
    });
}

fn bench_aggregate_profile(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(11);
    let rows = synthetic::team_rows(&mut rng, 1, 40, 1.4, 0.3);

    c.bench_function("aggregate_profile", |b| {
        b.iter(|| {
            let p = aggregate_profile(1, black_box(&rows), WINDOW);
            black_box(p.corners.sample_size);
        })
    });
}

fn bench_evaluate_fixture(c: &mut Criterion) {
    let cfg = EngineConfig::default();
    let inputs = synthetic::slate(3, 1, &cfg);

    c.bench_function("evaluate_fixture", |b| {
        b.iter(|| {
            let report = evaluate_fixture(black_box(&inputs[0]), &cfg);
            black_box(report.selections.len());
        })
    });
}

fn bench_evaluate_slate(c: &mut Criterion) {
    let cfg = EngineConfig::default();
    let inputs = synthetic::slate(5, 500, &cfg);

    c.bench_function("evaluate_slate_500", |b| {
        b.iter(|| {
            let reports = evaluate_fixtures(black_box(&inputs), &cfg);
            black_box(reports.len());
        })
    });
}

criterion_group!(
    perf,
    bench_fixture_stats_parse,
    bench_odds_parse,
    bench_aggregate_profile,
    bench_evaluate_fixture,
    bench_evaluate_slate
);
criterion_main!(perf);

static HOME_JSON: &str = include_str!("../tests/fixtures/team_fixtures_home.json");
static ODDS_JSON: &str = include_str!("../tests/fixtures/odds_payload.json");
