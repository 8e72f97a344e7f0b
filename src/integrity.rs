use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::metric::Metric;
use crate::profile::{MIN_SAMPLE, TeamMetricProfile};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricAvailability {
    pub available: bool,
    pub sample_size: usize,
    pub average: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamIntegrity {
    pub has_profile: bool,
    /// Profile exists and its goals sample meets the minimum.
    pub usable: bool,
    pub goals_sample_size: usize,
    pub metrics: BTreeMap<Metric, MetricAvailability>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntegrityFailure {
    MissingHomeProfile,
    MissingAwayProfile,
    HomeGoalsSample { sample_size: usize, min: usize },
    AwayGoalsSample { sample_size: usize, min: usize },
}

impl fmt::Display for IntegrityFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntegrityFailure::MissingHomeProfile => f.write_str("missing_home_profile"),
            IntegrityFailure::MissingAwayProfile => f.write_str("missing_away_profile"),
            IntegrityFailure::HomeGoalsSample { sample_size, min } => {
                write!(f, "home_goals_sample {sample_size} < {min}")
            }
            IntegrityFailure::AwayGoalsSample { sample_size, min } => {
                write!(f, "away_goals_sample {sample_size} < {min}")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntegrityResult {
    pub is_valid: bool,
    #[serde(default)]
    pub failure: Option<IntegrityFailure>,
    pub home: TeamIntegrity,
    pub away: TeamIntegrity,
}

impl IntegrityResult {
    pub fn metric_available(&self, metric: Metric) -> bool {
        let ok = |t: &TeamIntegrity| t.metrics.get(&metric).is_some_and(|m| m.available);
        ok(&self.home) && ok(&self.away)
    }
}

pub fn validate(
    home: Option<&TeamMetricProfile>,
    away: Option<&TeamMetricProfile>,
) -> IntegrityResult {
    validate_with(home, away, MIN_SAMPLE)
}

/// Only goals decide validity. Secondary gaps are reported, never blocking.
pub fn validate_with(
    home: Option<&TeamMetricProfile>,
    away: Option<&TeamMetricProfile>,
    min_sample: usize,
) -> IntegrityResult {
    let failure = match (home, away) {
        (None, _) => Some(IntegrityFailure::MissingHomeProfile),
        (_, None) => Some(IntegrityFailure::MissingAwayProfile),
        (Some(h), Some(a)) => {
            if h.goals.sample_size < min_sample {
                Some(IntegrityFailure::HomeGoalsSample {
                    sample_size: h.goals.sample_size,
                    min: min_sample,
                })
            } else if a.goals.sample_size < min_sample {
                Some(IntegrityFailure::AwayGoalsSample {
                    sample_size: a.goals.sample_size,
                    min: min_sample,
                })
            } else {
                None
            }
        }
    };

    IntegrityResult {
        is_valid: failure.is_none(),
        failure,
        home: team_integrity(home, min_sample),
        away: team_integrity(away, min_sample),
    }
}

fn team_integrity(profile: Option<&TeamMetricProfile>, min_sample: usize) -> TeamIntegrity {
    let Some(p) = profile else {
        return TeamIntegrity {
            has_profile: false,
            usable: false,
            goals_sample_size: 0,
            metrics: BTreeMap::new(),
        };
    };
    let metrics = Metric::ALL
        .into_iter()
        .map(|m| {
            let s = p.get(m);
            let available =
                s.sample_size >= min_sample && (s.average > 0.0 || m.tolerates_zero());
            (
                m,
                MetricAvailability {
                    available,
                    sample_size: s.sample_size,
                    average: s.average,
                },
            )
        })
        .collect();
    TeamIntegrity {
        has_profile: true,
        usable: p.goals.sample_size >= min_sample,
        goals_sample_size: p.goals.sample_size,
        metrics,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::MetricSummary;

    fn full(goals_n: usize) -> TeamMetricProfile {
        let s = |avg: f64| MetricSummary {
            average: avg,
            sample_size: 5,
        };
        TeamMetricProfile {
            team_id: 1,
            goals: MetricSummary {
                average: 1.4,
                sample_size: goals_n,
            },
            goal_fixture_ids: Vec::new(),
            corners: s(5.0),
            cards: s(2.0),
            fouls: s(12.0),
            offsides: s(1.5),
        }
    }

    #[test]
    fn thin_goals_invalidate_despite_rich_secondary() {
        let r = validate(Some(&full(2)), Some(&full(5)));
        assert!(!r.is_valid);
        assert!(matches!(
            r.failure,
            Some(IntegrityFailure::HomeGoalsSample { sample_size: 2, .. })
        ));
        assert!(r.home.metrics[&Metric::Corners].available);
        assert!(r.home.has_profile);
        assert!(!r.home.usable);
        assert!(r.away.usable);
    }

    #[test]
    fn missing_profile_is_invalid() {
        let r = validate(Some(&full(5)), None);
        assert!(!r.is_valid);
        assert!(!r.away.has_profile);
        assert!(!r.away.usable);
        assert!(r.home.usable);
        assert!(r.away.metrics.is_empty());
    }

    #[test]
    fn zero_average_only_unavailable_for_corners_and_fouls() {
        let mut p = full(5);
        p.corners.average = 0.0;
        p.fouls.average = 0.0;
        p.cards.average = 0.0;
        p.offsides.average = 0.0;
        let r = validate(Some(&p), Some(&full(5)));
        assert!(r.is_valid);
        assert!(!r.home.metrics[&Metric::Corners].available);
        assert!(!r.home.metrics[&Metric::Fouls].available);
        assert!(r.home.metrics[&Metric::Cards].available);
        assert!(r.home.metrics[&Metric::Offsides].available);
        assert!(!r.metric_available(Metric::Corners));
        assert!(r.metric_available(Metric::Cards));
    }
}
