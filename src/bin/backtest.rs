use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use stat_edge::calibration::{calibration_bins, evaluate_over_under};
use stat_edge::config::EngineConfig;
use stat_edge::fixture_stats::FixtureStatRow;
use stat_edge::integrity::validate_with;
use stat_edge::league_params::{MatchResult, compute_all_league_params, model_params_for, save_cached_params};
use stat_edge::probability::over_under_probability;
use stat_edge::selection::FixtureInput;

#[derive(Debug, serde::Deserialize)]
struct HistoricalMatch {
    league_id: u32,
    home_team_id: u32,
    away_team_id: u32,
    home_rows: Vec<FixtureStatRow>,
    away_rows: Vec<FixtureStatRow>,
    home_goals: u8,
    away_goals: u8,
}

#[derive(Debug, serde::Deserialize)]
struct History {
    #[serde(default = "default_line")]
    line: f64,
    #[serde(default)]
    fit_league_params: bool,
    #[serde(default)]
    save_league_params: Option<PathBuf>,
    matches: Vec<HistoricalMatch>,
}

fn default_line() -> f64 {
    2.5
}

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("tests/fixtures/backtest_history.json"));
    let raw = fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))?;
    let history: History = serde_json::from_str(&raw).context("invalid history json")?;
    let cfg = EngineConfig::from_env()?;

    let leagues = if history.fit_league_params {
        let results: Vec<MatchResult> = history
            .matches
            .iter()
            .map(|m| MatchResult {
                league_id: m.league_id,
                home_goals: m.home_goals,
                away_goals: m.away_goals,
            })
            .collect();
        let fitted = compute_all_league_params(&results);
        if let Some(out) = &history.save_league_params {
            save_cached_params(out, &fitted)?;
            info!(path = %out.display(), leagues = fitted.len(), "saved league params");
        }
        fitted
    } else {
        cfg.leagues.as_ref().clone()
    };

    let mut predictions = Vec::new();
    let mut went_over = Vec::new();
    let mut skipped: HashMap<String, usize> = HashMap::new();

    for (i, m) in history.matches.iter().enumerate() {
        let input = FixtureInput::from_rows(
            format!("hist-{i}"),
            Some(m.league_id),
            (m.home_team_id, m.home_rows.as_slice()),
            (m.away_team_id, m.away_rows.as_slice()),
            Vec::new(),
            &cfg,
        );
        let integrity = validate_with(input.home.as_ref(), input.away.as_ref(), cfg.min_sample);
        if let Some(failure) = integrity.failure {
            *skipped.entry(failure.to_string()).or_default() += 1;
            continue;
        }
        let (Some(home), Some(away)) = (&input.home, &input.away) else {
            continue;
        };

        let params = model_params_for(&leagues, Some(m.league_id), cfg.model);
        let Some(ou) = over_under_probability(home, away, history.line, &params) else {
            warn!(line = history.line, "line is not a half line, nothing to score");
            break;
        };
        predictions.push(ou.over);
        went_over.push(f64::from(m.home_goals) + f64::from(m.away_goals) > history.line);
    }

    let metrics = evaluate_over_under(&predictions, &went_over);
    let bins = calibration_bins(&predictions, &went_over, 10);

    println!("Line: over/under {}", history.line);
    println!("Scored: {} (skipped {})", metrics.samples, skipped.values().sum::<usize>());
    for (reason, n) in &skipped {
        println!("  skipped {n}: {reason}");
    }
    println!("Brier: {:.4}", metrics.brier);
    println!("Log loss: {:.4}", metrics.log_loss);
    println!("Accuracy: {:.1}%", metrics.accuracy * 100.0);
    for b in bins.iter().filter(|b| b.count > 0) {
        println!(
            "  [{:.1}, {:.1}) n={:<4} pred={:.3} actual={:.3}",
            b.bucket_start, b.bucket_end, b.count, b.avg_pred, b.actual_rate
        );
    }
    Ok(())
}
