use serde::{Deserialize, Serialize};

use crate::profile::TeamMetricProfile;

const SHRINKAGE_TAU: f64 = 10.0;
const HOME_ADVANTAGE: f64 = 1.06;
/// Historical goals per team per match, used when a league has no fitted baseline.
pub const DEFAULT_LEAGUE_MEAN_GOALS: f64 = 1.4;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelParams {
    pub shrinkage_tau: f64,
    pub home_advantage: f64,
    pub league_mean_goals: f64,
}

impl Default for ModelParams {
    fn default() -> Self {
        Self {
            shrinkage_tau: SHRINKAGE_TAU,
            home_advantage: HOME_ADVANTAGE,
            league_mean_goals: DEFAULT_LEAGUE_MEAN_GOALS,
        }
    }
}

impl ModelParams {
    pub fn with_league_mean(self, league_mean_goals: f64) -> Self {
        Self {
            league_mean_goals,
            ..self
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OverUnder {
    pub line: f64,
    pub lambda: f64,
    pub over: f64,
    pub under: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GoalRates {
    pub home: f64,
    pub away: f64,
}

impl GoalRates {
    pub fn total(&self) -> f64 {
        self.home + self.away
    }
}

/// Weight given to a team's own average: n / (n + tau).
pub fn shrinkage_weight(sample_size: usize, tau: f64) -> f64 {
    let n = sample_size as f64;
    let tau = tau.max(0.0);
    if n + tau <= 0.0 {
        return 0.0;
    }
    n / (n + tau)
}

pub fn goal_rates(
    home: &TeamMetricProfile,
    away: &TeamMetricProfile,
    params: &ModelParams,
) -> GoalRates {
    let w_home = shrinkage_weight(home.goals.sample_size, params.shrinkage_tau);
    let w_away = shrinkage_weight(away.goals.sample_size, params.shrinkage_tau);
    let mean = params.league_mean_goals;

    let home_rate =
        (home.goals.average * w_home + mean * (1.0 - w_home)) * params.home_advantage;
    let away_rate = away.goals.average * w_away + mean * (1.0 - w_away);
    GoalRates {
        home: home_rate,
        away: away_rate,
    }
}

pub fn over_under_probability(
    home: &TeamMetricProfile,
    away: &TeamMetricProfile,
    line: f64,
    params: &ModelParams,
) -> Option<OverUnder> {
    count_over_under(goal_rates(home, away, params).total(), line)
}

/// Highest line the model prices. Rule tables and quotes beyond it are rejected.
pub const MAX_LINE: f64 = 200.5;

pub fn count_over_under(lambda: f64, line: f64) -> Option<OverUnder> {
    if !lambda.is_finite() || !is_half_line(line) {
        return None;
    }
    let under = poisson_cdf(lambda, line.floor() as u32);
    Some(OverUnder {
        line,
        lambda,
        over: (1.0 - under).clamp(0.0, 1.0),
        under,
    })
}

/// 0.5, 1.5, 2.5, ... up to `MAX_LINE`.
pub fn is_half_line(line: f64) -> bool {
    line.is_finite()
        && line > 0.0
        && line <= MAX_LINE
        && ((line - line.floor()) - 0.5).abs() < 1e-9
}

pub fn poisson_pmf(lambda: f64, k: u32) -> f64 {
    if lambda <= 0.0 {
        return if k == 0 { 1.0 } else { 0.0 };
    }
    // Log space keeps large k from overflowing.
    (-lambda + k as f64 * lambda.ln() - ln_factorial(k)).exp()
}

pub fn poisson_cdf(lambda: f64, k: u32) -> f64 {
    if lambda <= 0.0 {
        return 1.0;
    }
    let ln_lambda = lambda.ln();
    let mut ln_fact = 0.0;
    let mut sum = 0.0;
    for i in 0..=k {
        if i > 1 {
            ln_fact += (i as f64).ln();
        }
        let term = (-lambda + i as f64 * ln_lambda - ln_fact).exp();
        sum += term;
        // Past the mode the tail only shrinks.
        if i as f64 > lambda && term <= f64::EPSILON * sum {
            break;
        }
    }
    sum.clamp(0.0, 1.0)
}

pub fn ln_factorial(k: u32) -> f64 {
    (2..=k).map(|i| (i as f64).ln()).sum()
}
