use serde::{Deserialize, Serialize};

use crate::metric::{Metric, MetricTable};
use crate::profile::{MIN_SAMPLE, TeamMetricProfile};

/// Match-level expected totals. `None` means unknown.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CombinedMetrics {
    pub goals: Option<f64>,
    pub corners: Option<f64>,
    pub cards: Option<f64>,
    pub fouls: Option<f64>,
    pub offsides: Option<f64>,
    pub sample_size: usize,
}

impl CombinedMetrics {
    pub fn unknown(sample_size: usize) -> Self {
        Self {
            goals: None,
            corners: None,
            cards: None,
            fouls: None,
            offsides: None,
            sample_size,
        }
    }

    pub fn get(&self, metric: Metric) -> Option<f64> {
        match metric {
            Metric::Goals => self.goals,
            Metric::Corners => self.corners,
            Metric::Cards => self.cards,
            Metric::Fouls => self.fouls,
            Metric::Offsides => self.offsides,
        }
    }

    fn set(&mut self, metric: Metric, value: Option<f64>) {
        match metric {
            Metric::Goals => self.goals = value,
            Metric::Corners => self.corners = value,
            Metric::Cards => self.cards = value,
            Metric::Fouls => self.fouls = value,
            Metric::Offsides => self.offsides = value,
        }
    }

    pub fn is_unknown(&self) -> bool {
        Metric::ALL.iter().all(|m| self.get(*m).is_none())
    }
}

pub fn combine(home: &TeamMetricProfile, away: &TeamMetricProfile) -> CombinedMetrics {
    combine_with(home, away, &MetricTable::default(), MIN_SAMPLE)
}

pub fn combine_with(
    home: &TeamMetricProfile,
    away: &TeamMetricProfile,
    table: &MetricTable,
    min_sample: usize,
) -> CombinedMetrics {
    let sample_size = home.goals.sample_size.min(away.goals.sample_size);
    let mut out = CombinedMetrics::unknown(sample_size);
    if sample_size < min_sample {
        return out;
    }

    for metric in Metric::ALL {
        let h = home.get(metric);
        let a = away.get(metric);
        if !h.is_known() || !a.is_known() {
            continue;
        }
        let scale = table.get(metric);
        let raw = ((h.average + a.average) / 2.0) * scale.multiplier;
        out.set(metric, Some(round1(raw.clamp(scale.min, scale.max))));
    }
    out
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}
