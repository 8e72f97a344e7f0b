use std::fs;
use std::path::PathBuf;

use stat_edge::config::EngineConfig;
use stat_edge::fixture_stats::CompetitionPolicy;
use stat_edge::metric::Metric;
use stat_edge::odds::Side;
use stat_edge::selection::{
    FixtureInput, dedupe_freshest, edge_candidates, evaluate_fixture, evaluate_fixtures,
    ranked_selections,
};
use stat_edge::synthetic;

fn read_fixture(name: &str) -> String {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    fs::read_to_string(path).expect("fixture file should be readable")
}

fn fixture_path(name: &str) -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    path
}

fn case_input(cfg: &EngineConfig) -> FixtureInput {
    FixtureInput::from_payloads(
        "evt-4050",
        Some(39),
        (40, &read_fixture("team_fixtures_home.json")),
        (50, &read_fixture("team_fixtures_away.json")),
        &read_fixture("odds_payload.json"),
        cfg,
    )
    .expect("fixture payloads should parse")
}

#[test]
fn payloads_flow_into_ranked_selections() {
    let cfg = EngineConfig::default();
    let report = evaluate_fixture(&case_input(&cfg), &cfg);

    assert!(report.integrity.is_valid);
    let combined = report.combined.expect("combined metrics");
    assert_eq!(combined.goals, Some(2.6));
    assert_eq!(combined.corners, Some(9.6));
    assert_eq!(combined.cards, Some(3.6));
    assert_eq!(combined.fouls, Some(20.9));
    assert_eq!(combined.offsides, Some(3.1));

    // Cards, fouls and offsides fall between bands, so only two markets qualify.
    assert_eq!(report.selections.len(), 2);

    let corners = &report.selections[0];
    assert_eq!(corners.pick.market, Metric::Corners);
    assert_eq!(corners.pick.side, Side::Over);
    assert_eq!(corners.pick.line, 8.5);
    assert_eq!(corners.bookmaker, "Bet365");
    assert_eq!(corners.odds, 1.85);
    assert!((corners.model_prob - 0.6204).abs() < 1e-3);
    assert!((corners.book_prob - 0.5067).abs() < 1e-3);
    assert!((corners.edge - 0.1137).abs() < 1e-3);

    let goals = &report.selections[1];
    assert_eq!(goals.pick.market, Metric::Goals);
    assert_eq!(goals.pick.side, Side::Over);
    assert_eq!(goals.pick.line, 1.5);
    assert_eq!(goals.bookmaker, "Bet365");
    assert_eq!(goals.odds, 1.33);
    assert!((goals.lambda - 3.0333).abs() < 1e-3);
    assert!((goals.model_prob - 0.8058).abs() < 1e-3);
    assert!((goals.book_prob - 0.7064).abs() < 1e-3);
    assert_eq!(goals.home_goals_sample, 5);
    assert_eq!(goals.away_goals_sample, 5);
    assert_eq!(goals.rules_version, "2024.1");
    assert!(goals.market_available);
}

#[test]
fn guard_flagged_quotes_never_become_selections() {
    let cfg = EngineConfig::default();
    let report = evaluate_fixture(&case_input(&cfg), &cfg);

    assert_eq!(report.flagged.len(), 1);
    let flagged = &report.flagged[0];
    assert_eq!(flagged.bookmaker, "SharpBook");
    assert_eq!(flagged.pick.market, Metric::Goals);
    assert_eq!(flagged.odds, 2.2);
    assert!(
        report
            .selections
            .iter()
            .all(|s| s.bookmaker != "SharpBook")
    );
}

#[test]
fn unguarded_candidates_include_the_flagged_price() {
    let cfg = EngineConfig::default();
    let candidates = edge_candidates(&case_input(&cfg), &cfg);
    assert!(!candidates.is_empty());
    assert!(candidates.windows(2).all(|w| w[0].edge >= w[1].edge));
    assert!(candidates.iter().any(|c| c.bookmaker == "SharpBook"
        && c.market == Metric::Goals
        && c.side == Side::Over));
}

#[test]
fn coverage_policy_removes_unsupported_metrics() {
    let mut cfg = EngineConfig::default();
    cfg.competitions = CompetitionPolicy::load(&fixture_path("competitions.json"))
        .expect("competition policy should load");
    let report = evaluate_fixture(&case_input(&cfg), &cfg);

    assert!(report.integrity.is_valid);
    assert!(!report.integrity.metric_available(Metric::Offsides));
    assert!(report.integrity.metric_available(Metric::Corners));
    let combined = report.combined.expect("combined metrics");
    assert_eq!(combined.offsides, None);
    assert_eq!(combined.corners, Some(9.6));
}

#[test]
fn thin_history_fails_the_gate() {
    let cfg = EngineConfig::default();
    let input = FixtureInput::from_payloads(
        "evt-thin",
        None,
        (40, &read_fixture("team_fixtures_home.json")),
        (50, "[]"),
        &read_fixture("odds_payload.json"),
        &cfg,
    )
    .expect("payloads should parse");
    let report = evaluate_fixture(&input, &cfg);
    assert!(!report.integrity.is_valid);
    assert!(report.selections.is_empty());
    assert!(report.flagged.is_empty());
}

#[test]
fn parallel_batch_matches_sequential_evaluation() {
    let cfg = EngineConfig::default();
    let inputs = synthetic::slate(7, 24, &cfg);
    let parallel = evaluate_fixtures(&inputs, &cfg);
    let sequential: Vec<_> = inputs.iter().map(|i| evaluate_fixture(i, &cfg)).collect();
    assert_eq!(parallel, sequential);

    let ranked = ranked_selections(&parallel);
    assert!(ranked.windows(2).all(|w| w[0].edge >= w[1].edge));
    for s in &ranked {
        assert!(s.edge > 0.0);
        assert!(cfg.guard.check(s.pick.market, s.pick.line, s.odds).is_none());
    }
}

#[test]
fn rerun_supersedes_earlier_rows() {
    let cfg = EngineConfig::default();
    let first = evaluate_fixture(&case_input(&cfg), &cfg);
    let mut second = first.clone();
    for s in &mut second.selections {
        s.odds += 0.01;
    }
    let merged = dedupe_freshest(
        first
            .selections
            .iter()
            .cloned()
            .chain(second.selections.iter().cloned()),
    );
    assert_eq!(merged.len(), first.selections.len());
    assert!(
        merged
            .iter()
            .zip(&second.selections)
            .all(|(m, s)| m.odds == s.odds)
    );
}
