use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::probability::{DEFAULT_LEAGUE_MEAN_GOALS, ModelParams};

const DEFAULT_HOME_ADVANTAGE: f64 = 1.06;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub league_id: u32,
    pub home_goals: u8,
    pub away_goals: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeagueParams {
    pub league_id: u32,
    pub sample_matches: usize,
    /// Goals per team per match.
    pub mean_goals: f64,
    pub home_advantage: f64,
}

impl LeagueParams {
    pub fn defaults(league_id: u32) -> Self {
        Self {
            league_id,
            sample_matches: 0,
            mean_goals: DEFAULT_LEAGUE_MEAN_GOALS,
            home_advantage: DEFAULT_HOME_ADVANTAGE,
        }
    }

    pub fn apply(&self, base: ModelParams) -> ModelParams {
        ModelParams {
            league_mean_goals: self.mean_goals,
            home_advantage: self.home_advantage,
            ..base
        }
    }
}

pub fn compute_league_params(league_id: u32, results: &[MatchResult]) -> LeagueParams {
    let mut home_goals = 0.0;
    let mut away_goals = 0.0;
    let mut n = 0usize;

    for m in results.iter().filter(|m| m.league_id == league_id) {
        home_goals += m.home_goals as f64;
        away_goals += m.away_goals as f64;
        n += 1;
    }

    let d = LeagueParams::defaults(league_id);
    let mut out = d.clone();
    out.sample_matches = n;
    if n == 0 {
        return out;
    }

    let raw_mean = (home_goals + away_goals) / (2.0 * n as f64);
    let raw_home_adv = if away_goals > 0.0 && home_goals > 0.0 {
        (home_goals / away_goals).sqrt()
    } else {
        d.home_advantage
    };

    // Shrink small samples toward defaults to avoid wild swings.
    const MIN_N: f64 = 200.0;
    let w = ((n as f64) / MIN_N).clamp(0.0, 1.0);
    out.mean_goals = (1.0 - w) * d.mean_goals + w * raw_mean;
    out.home_advantage = ((1.0 - w) * d.home_advantage + w * raw_home_adv).clamp(0.90, 1.25);
    out
}

pub fn compute_all_league_params(results: &[MatchResult]) -> HashMap<u32, LeagueParams> {
    let mut ids: Vec<u32> = results.iter().map(|m| m.league_id).collect();
    ids.sort_unstable();
    ids.dedup();
    ids.into_iter()
        .map(|id| (id, compute_league_params(id, results)))
        .collect()
}

pub fn model_params_for(
    params: &HashMap<u32, LeagueParams>,
    league_id: Option<u32>,
    base: ModelParams,
) -> ModelParams {
    league_id
        .and_then(|id| params.get(&id))
        .map(|p| p.apply(base))
        .unwrap_or(base)
}

pub fn load_cached_params(path: &Path) -> HashMap<u32, LeagueParams> {
    let Ok(raw) = fs::read_to_string(path) else {
        return HashMap::new();
    };
    serde_json::from_str::<HashMap<u32, LeagueParams>>(&raw).unwrap_or_default()
}

pub fn save_cached_params(path: &Path, params: &HashMap<u32, LeagueParams>) -> Result<()> {
    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }
    let tmp = path.with_extension("json.tmp");
    let json = serde_json::to_string(params).context("serialize league params")?;
    fs::write(&tmp, json).context("write league params")?;
    fs::rename(&tmp, path).context("swap league params")?;
    Ok(())
}
