use std::fs;
use std::path::PathBuf;

use stat_edge::combined::combine;
use stat_edge::fixture_stats::{
    CompetitionPolicy, CompetitionReliability, FixtureStatRow, parse_fixture_stats_json,
};
use stat_edge::integrity::validate;
use stat_edge::metric::Metric;
use stat_edge::profile::{WINDOW, aggregate_profile, aggregate_profile_from_payload};

fn read_fixture(name: &str) -> String {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    fs::read_to_string(path).expect("fixture file should be readable")
}

fn cup_row(id: u64, goals: f64, fouls: Option<f64>) -> FixtureStatRow {
    FixtureStatRow {
        fixture_id: id,
        competition_id: 45,
        competition_name: "League Cup".to_string(),
        kickoff_ts: Some(1_710_000_000 - id as i64 * 86_400),
        goals,
        corners: Some(0.0),
        cards: None,
        fouls,
        offsides: Some(0.0),
        reliability: CompetitionReliability {
            flagged: true,
            ..CompetitionReliability::default()
        },
    }
}

#[test]
fn fake_zero_cup_rows_only_count_for_goals() {
    let fouls = [Some(0.0), Some(0.0), None, Some(0.0), Some(0.0)];
    let rows: Vec<FixtureStatRow> = fouls
        .iter()
        .enumerate()
        .map(|(i, f)| cup_row(i as u64 + 1, (i % 3) as f64, *f))
        .collect();

    let p = aggregate_profile(7, &rows, WINDOW);
    assert_eq!(p.goals.sample_size, 5);
    assert!((p.goals.average - 0.8).abs() < 1e-12);
    for metric in Metric::SECONDARY {
        let s = p.get(metric);
        assert_eq!(s.sample_size, 0, "{metric} should be empty");
        assert_eq!(s.average, 0.0);
    }
}

#[test]
fn home_payload_skips_unplayed_and_cup_zeros() {
    let policy = CompetitionPolicy::default();
    let rows = parse_fixture_stats_json(&read_fixture("team_fixtures_home.json"), 40, &policy)
        .expect("fixture should parse");
    // The unplayed fixture has no goals and is dropped.
    assert_eq!(rows.len(), 6);
    assert_eq!(rows[0].fixture_id, 9001);
    assert!(rows.windows(2).all(|w| w[0].kickoff_ts >= w[1].kickoff_ts));

    let cup = rows
        .iter()
        .find(|r| r.fixture_id == 9002)
        .expect("cup fixture present");
    assert!(cup.reliability.flagged);
    assert!(cup.is_fake_zero());
    assert_eq!(cup.goals, 1.0);

    let p = aggregate_profile(40, &rows, WINDOW);
    assert_eq!(p.goal_fixture_ids, vec![9001, 9002, 9003, 9004, 9005]);
    assert!((p.goals.average - 2.2).abs() < 1e-12);
    assert_eq!(p.corners.sample_size, 5);
    assert!((p.corners.average - 6.0).abs() < 1e-12);
    assert!((p.cards.average - 2.0).abs() < 1e-12);
    assert!((p.fouls.average - 11.2).abs() < 1e-12);
}

#[test]
fn away_payload_reads_the_right_statistics_block() {
    let policy = CompetitionPolicy::default();
    let raw = read_fixture("team_fixtures_away.json");
    let p = aggregate_profile_from_payload(50, &raw, &policy, WINDOW).expect("fixture should parse");
    assert_eq!(p.goals.sample_size, 5);
    assert!((p.goals.average - 1.0).abs() < 1e-12);
    assert!((p.corners.average - 5.0).abs() < 1e-12);
    assert!((p.fouls.average - 12.0).abs() < 1e-12);
    assert!((p.offsides.average - 1.6).abs() < 1e-12);
}

#[test]
fn profiles_from_payloads_pass_integrity_and_combine() {
    let policy = CompetitionPolicy::default();
    let home_raw = read_fixture("team_fixtures_home.json");
    let away_raw = read_fixture("team_fixtures_away.json");
    let home = aggregate_profile_from_payload(40, &home_raw, &policy, WINDOW).expect("home");
    let away = aggregate_profile_from_payload(50, &away_raw, &policy, WINDOW).expect("away");

    let integrity = validate(Some(&home), Some(&away));
    assert!(integrity.is_valid);
    assert!(Metric::ALL.iter().all(|m| integrity.metric_available(*m)));

    let c = combine(&home, &away);
    assert_eq!(c.goals, Some(2.6));
    assert_eq!(c.sample_size, 5);
}

#[test]
fn malformed_payload_is_an_error_and_empty_is_not() {
    let policy = CompetitionPolicy::default();
    assert!(parse_fixture_stats_json("{not json", 1, &policy).is_err());
    assert!(parse_fixture_stats_json("", 1, &policy)
        .expect("empty payload")
        .is_empty());
    assert!(parse_fixture_stats_json("null", 1, &policy)
        .expect("null payload")
        .is_empty());
}
