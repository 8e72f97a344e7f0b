use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::warn;

use crate::fixture_stats::CompetitionPolicy;
use crate::guard::{ODDS_MAX, ODDS_MIN, OddsGuard};
use crate::league_params::{LeagueParams, load_cached_params};
use crate::metric::MetricTable;
use crate::probability::ModelParams;
use crate::profile::{MIN_SAMPLE, WINDOW};
use crate::rules::{RuleTable, default_rules};

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub window: usize,
    pub min_sample: usize,
    pub metrics: MetricTable,
    pub model: ModelParams,
    pub guard: OddsGuard,
    pub rules: Arc<RuleTable>,
    pub competitions: CompetitionPolicy,
    pub leagues: Arc<HashMap<u32, LeagueParams>>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            window: WINDOW,
            min_sample: MIN_SAMPLE,
            metrics: MetricTable::default(),
            model: ModelParams::default(),
            guard: OddsGuard::default(),
            rules: Arc::new(default_rules().clone()),
            competitions: CompetitionPolicy::default(),
            leagues: Arc::new(HashMap::new()),
        }
    }
}

impl EngineConfig {
    /// Defaults overridden by `STAT_EDGE_*` variables. Files named by the
    /// path variables must exist and parse; numeric knobs fall back quietly.
    pub fn from_env() -> Result<Self> {
        let mut cfg = Self::default();
        let defaults = ModelParams::default();

        cfg.window = env_parse("STAT_EDGE_WINDOW", WINDOW).clamp(1, 20);
        cfg.min_sample = env_parse("STAT_EDGE_MIN_SAMPLE", MIN_SAMPLE).clamp(1, cfg.window);
        cfg.model.shrinkage_tau =
            env_parse("STAT_EDGE_SHRINKAGE_TAU", defaults.shrinkage_tau).clamp(0.0, 100.0);
        cfg.model.home_advantage =
            env_parse("STAT_EDGE_HOME_ADVANTAGE", defaults.home_advantage).clamp(0.80, 1.40);
        cfg.model.league_mean_goals =
            env_parse("STAT_EDGE_LEAGUE_MEAN_GOALS", defaults.league_mean_goals).clamp(0.2, 4.0);

        let min = env_parse("STAT_EDGE_ODDS_MIN", ODDS_MIN);
        let max = env_parse("STAT_EDGE_ODDS_MAX", ODDS_MAX);
        if min >= 1.0 && max > min {
            cfg.guard.min = min;
            cfg.guard.max = max;
        } else {
            warn!(min, max, "ignoring invalid odds band from environment");
        }

        if let Some(path) = env_path("STAT_EDGE_RULES_PATH") {
            cfg.rules = Arc::new(RuleTable::load(&path)?);
        }
        if let Some(path) = env_path("STAT_EDGE_COMPETITIONS_PATH") {
            cfg.competitions = CompetitionPolicy::load(&path)
                .with_context(|| format!("competition policy from {}", path.display()))?;
        }
        cfg.competitions.name_heuristic = env_bool(
            "STAT_EDGE_CUP_HEURISTIC",
            cfg.competitions.name_heuristic,
        );
        if let Some(path) = env_path("STAT_EDGE_LEAGUE_PARAMS_PATH") {
            let leagues = load_cached_params(&path);
            if leagues.is_empty() {
                warn!(path = %path.display(), "no league params loaded, using default baseline");
            }
            cfg.leagues = Arc::new(leagues);
        }
        Ok(cfg)
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

fn env_path(key: &str) -> Option<PathBuf> {
    env::var(key)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .map(PathBuf::from)
}

fn env_bool(key: &str, default: bool) -> bool {
    env::var(key)
        .ok()
        .map(|v| {
            let t = v.trim().to_ascii_lowercase();
            !(t.is_empty() || t == "0" || t == "false" || t == "off" || t == "no")
        })
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_engine_constants() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.window, 5);
        assert_eq!(cfg.min_sample, 3);
        assert_eq!(cfg.guard.min, 1.25);
        assert_eq!(cfg.guard.max, 5.00);
        assert_eq!(cfg.model.shrinkage_tau, 10.0);
        assert_eq!(cfg.rules.version(), crate::rules::DEFAULT_RULES_VERSION);
        assert!(cfg.competitions.name_heuristic);
    }

    #[test]
    fn env_parse_falls_back_on_garbage() {
        assert_eq!(env_parse("STAT_EDGE_TEST_UNSET_KEY_XYZ", 7usize), 7);
    }
}
