use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde_json::Value;
use tracing::info;
use tracing_subscriber::EnvFilter;

use stat_edge::config::EngineConfig;
use stat_edge::fixture_stats::FixtureStatRow;
use stat_edge::odds::parse_odds_json;
use stat_edge::selection::{FixtureInput, evaluate_fixtures, ranked_selections};
use stat_edge::synthetic;

#[derive(Debug, serde::Deserialize)]
struct TeamCase {
    team_id: u32,
    #[serde(default)]
    rows: Option<Vec<FixtureStatRow>>,
    /// Raw provider fixtures payload, used when `rows` is absent.
    #[serde(default)]
    payload: Option<Value>,
}

#[derive(Debug, serde::Deserialize)]
struct SelectCase {
    fixture_id: String,
    #[serde(default)]
    league_id: Option<u32>,
    home: TeamCase,
    away: TeamCase,
    #[serde(default)]
    odds: Option<Value>,
}

fn team_rows(team: &TeamCase, cfg: &EngineConfig) -> Result<Vec<FixtureStatRow>> {
    if let Some(rows) = &team.rows {
        return Ok(rows.clone());
    }
    let raw = team.payload.as_ref().map(Value::to_string).unwrap_or_default();
    stat_edge::fixture_stats::parse_fixture_stats_json(&raw, team.team_id, &cfg.competitions)
        .with_context(|| format!("fixtures payload for team {}", team.team_id))
}

fn load_case(path: &PathBuf, cfg: &EngineConfig) -> Result<FixtureInput> {
    let raw = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let case: SelectCase = serde_json::from_str(&raw).context("invalid select case json")?;

    let home_rows = team_rows(&case.home, cfg)?;
    let away_rows = team_rows(&case.away, cfg)?;
    let odds = match &case.odds {
        Some(v) => parse_odds_json(&v.to_string())?,
        None => Vec::new(),
    };
    Ok(FixtureInput::from_rows(
        case.fixture_id,
        case.league_id,
        (case.home.team_id, &home_rows),
        (case.away.team_id, &away_rows),
        odds,
        cfg,
    ))
}

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cfg = EngineConfig::from_env()?;
    let arg = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "tests/fixtures/select_case.json".to_string());

    // `synthetic[:N]` runs a seeded slate instead of a case file.
    let inputs = if let Some(rest) = arg.strip_prefix("synthetic") {
        let count = rest
            .trim_start_matches(':')
            .parse::<usize>()
            .unwrap_or(20)
            .max(1);
        synthetic::slate(42, count, &cfg)
    } else {
        vec![load_case(&PathBuf::from(&arg), &cfg)?]
    };

    let reports = evaluate_fixtures(&inputs, &cfg);
    let ranked = ranked_selections(&reports);
    let valid = reports.iter().filter(|r| r.integrity.is_valid).count();
    let flagged: usize = reports.iter().map(|r| r.flagged.len()).sum();
    info!(
        fixtures = reports.len(),
        valid,
        selections = ranked.len(),
        flagged,
        rules = cfg.rules.version(),
        "selection run complete"
    );

    let out = serde_json::json!({
        "rules_version": cfg.rules.version(),
        "computed_at": chrono::Utc::now().to_rfc3339(),
        "reports": reports,
        "ranked": ranked,
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}
