use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::fixture_stats::{CompetitionPolicy, FixtureStatRow, parse_fixture_stats_json};
use crate::metric::Metric;

pub const WINDOW: usize = 5;
pub const MIN_SAMPLE: usize = 3;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricSummary {
    pub average: f64,
    pub sample_size: usize,
}

impl MetricSummary {
    /// Sample size 0 means "nothing known", not "average is zero".
    pub fn is_known(&self) -> bool {
        self.sample_size > 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamMetricProfile {
    pub team_id: u32,
    pub goals: MetricSummary,
    /// Fixtures behind the goals average, newest first.
    #[serde(default)]
    pub goal_fixture_ids: Vec<u64>,
    pub corners: MetricSummary,
    pub cards: MetricSummary,
    pub fouls: MetricSummary,
    pub offsides: MetricSummary,
}

impl TeamMetricProfile {
    pub fn empty(team_id: u32) -> Self {
        Self {
            team_id,
            goals: MetricSummary::default(),
            goal_fixture_ids: Vec::new(),
            corners: MetricSummary::default(),
            cards: MetricSummary::default(),
            fouls: MetricSummary::default(),
            offsides: MetricSummary::default(),
        }
    }

    pub fn get(&self, metric: Metric) -> MetricSummary {
        match metric {
            Metric::Goals => self.goals,
            Metric::Corners => self.corners,
            Metric::Cards => self.cards,
            Metric::Fouls => self.fouls,
            Metric::Offsides => self.offsides,
        }
    }

    fn slot_mut(&mut self, metric: Metric) -> &mut MetricSummary {
        match metric {
            Metric::Goals => &mut self.goals,
            Metric::Corners => &mut self.corners,
            Metric::Cards => &mut self.cards,
            Metric::Fouls => &mut self.fouls,
            Metric::Offsides => &mut self.offsides,
        }
    }

    pub fn is_sufficient(&self, min_sample: usize) -> bool {
        self.goals.sample_size >= min_sample
    }
}

#[derive(Debug, Clone)]
struct Accumulator {
    sum: f64,
    count: usize,
    target: usize,
}

impl Accumulator {
    fn new(target: usize) -> Self {
        Self {
            sum: 0.0,
            count: 0,
            target,
        }
    }

    fn is_full(&self) -> bool {
        self.count >= self.target
    }

    fn push(&mut self, v: f64) {
        self.sum += v;
        self.count += 1;
    }

    fn summary(&self) -> MetricSummary {
        let average = if self.count > 0 {
            self.sum / self.count as f64
        } else {
            0.0
        };
        MetricSummary {
            average,
            sample_size: self.count,
        }
    }
}

/// Build a team's rolling profile from fixtures ordered newest first.
///
/// Goals take the first `window` fixtures unconditionally. Each secondary metric walks
/// the same sequence on its own and skips fixtures whose competition doesn't cover the
/// metric, whose value is missing, or that look like a fake-zero report.
pub fn aggregate_profile(team_id: u32, rows: &[FixtureStatRow], window: usize) -> TeamMetricProfile {
    let window = window.max(1);
    let mut acc: [Accumulator; 5] = std::array::from_fn(|_| Accumulator::new(window));
    let mut goal_fixture_ids = Vec::with_capacity(window);

    for row in rows {
        if acc.iter().all(Accumulator::is_full) {
            break;
        }

        let goals = &mut acc[Metric::Goals.index()];
        if !goals.is_full() {
            goals.push(row.goals);
            goal_fixture_ids.push(row.fixture_id);
        }

        let fake_zero = row.is_fake_zero();
        for metric in Metric::SECONDARY {
            let slot = &mut acc[metric.index()];
            if slot.is_full() || fake_zero || !row.reliability.covers(metric) {
                continue;
            }
            let Some(v) = row.value(metric) else {
                continue;
            };
            slot.push(v);
        }
    }

    let mut profile = TeamMetricProfile::empty(team_id);
    profile.goal_fixture_ids = goal_fixture_ids;
    for metric in Metric::ALL {
        *profile.slot_mut(metric) = acc[metric.index()].summary();
    }
    profile
}

pub fn aggregate_profile_from_payload(
    team_id: u32,
    raw: &str,
    policy: &CompetitionPolicy,
    window: usize,
) -> Result<TeamMetricProfile> {
    let rows = parse_fixture_stats_json(raw, team_id, policy)?;
    Ok(aggregate_profile(team_id, &rows, window))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture_stats::CompetitionReliability;
    use crate::metric::MetricSet;

    fn row(id: u64, goals: f64, corners: Option<f64>) -> FixtureStatRow {
        FixtureStatRow {
            fixture_id: id,
            competition_id: 39,
            competition_name: "Premier League".to_string(),
            kickoff_ts: None,
            goals,
            corners,
            cards: Some(2.0),
            fouls: Some(11.0),
            offsides: Some(1.0),
            reliability: CompetitionReliability::reliable(),
        }
    }

    #[test]
    fn goals_take_first_five_regardless_of_reliability() {
        let mut rows: Vec<FixtureStatRow> = (1..=7).map(|i| row(i, i as f64, Some(5.0))).collect();
        rows[0].reliability.flagged = true;
        rows[0].reliability.unreliable_metrics = MetricSet::secondary();
        let p = aggregate_profile(1, &rows, WINDOW);
        assert_eq!(p.goals.sample_size, 5);
        assert_eq!(p.goal_fixture_ids, vec![1, 2, 3, 4, 5]);
        assert!((p.goals.average - 3.0).abs() < 1e-12);
        // Corners skip the first row and reach further back.
        assert_eq!(p.corners.sample_size, 5);
    }

    #[test]
    fn missing_values_are_skipped_not_zeroed() {
        let rows = vec![
            row(1, 1.0, None),
            row(2, 1.0, Some(6.0)),
            row(3, 1.0, None),
            row(4, 1.0, Some(4.0)),
        ];
        let p = aggregate_profile(1, &rows, WINDOW);
        assert_eq!(p.corners.sample_size, 2);
        assert!((p.corners.average - 5.0).abs() < 1e-12);
        assert_eq!(p.goals.sample_size, 4);
        assert!(!p.is_sufficient(5));
        assert!(p.is_sufficient(MIN_SAMPLE));
    }

    #[test]
    fn no_rows_gives_unknown_profile() {
        let p = aggregate_profile(9, &[], WINDOW);
        assert_eq!(p.team_id, 9);
        assert!(!p.goals.is_known());
        assert_eq!(p.fouls.average, 0.0);
        assert!(!p.is_sufficient(MIN_SAMPLE));
    }

    #[test]
    fn true_zero_in_reliable_competition_counts() {
        let mut r = row(1, 0.0, Some(0.0));
        r.cards = Some(0.0);
        r.fouls = Some(0.0);
        r.offsides = Some(0.0);
        let p = aggregate_profile(1, &[r], WINDOW);
        assert_eq!(p.corners.sample_size, 1);
        assert_eq!(p.offsides.sample_size, 1);
    }
}
