use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    Goals,
    Corners,
    Cards,
    Fouls,
    Offsides,
}

impl Metric {
    pub const ALL: [Metric; 5] = [
        Metric::Goals,
        Metric::Corners,
        Metric::Cards,
        Metric::Fouls,
        Metric::Offsides,
    ];

    /// Everything except goals. These are the stats cup competitions tend to drop.
    pub const SECONDARY: [Metric; 4] = [
        Metric::Corners,
        Metric::Cards,
        Metric::Fouls,
        Metric::Offsides,
    ];

    pub fn index(self) -> usize {
        match self {
            Metric::Goals => 0,
            Metric::Corners => 1,
            Metric::Cards => 2,
            Metric::Fouls => 3,
            Metric::Offsides => 4,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Metric::Goals => "goals",
            Metric::Corners => "corners",
            Metric::Cards => "cards",
            Metric::Fouls => "fouls",
            Metric::Offsides => "offsides",
        }
    }

    pub fn parse(raw: &str) -> Option<Metric> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "goals" | "goal" => Some(Metric::Goals),
            "corners" | "corner" => Some(Metric::Corners),
            "cards" | "card" | "bookings" => Some(Metric::Cards),
            "fouls" | "foul" => Some(Metric::Fouls),
            "offsides" | "offside" => Some(Metric::Offsides),
            _ => None,
        }
    }

    /// Goals, cards and offsides can legitimately finish at zero; a team averaging zero
    /// corners or fouls is a data gap.
    pub fn tolerates_zero(self) -> bool {
        matches!(self, Metric::Cards | Metric::Offsides | Metric::Goals)
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Vec<Metric>", into = "Vec<Metric>")]
pub struct MetricSet(u8);

impl MetricSet {
    pub const EMPTY: MetricSet = MetricSet(0);

    pub fn secondary() -> Self {
        Metric::SECONDARY.into_iter().collect()
    }

    pub fn contains(self, metric: Metric) -> bool {
        self.0 & (1 << metric.index()) != 0
    }

    pub fn insert(&mut self, metric: Metric) {
        self.0 |= 1 << metric.index();
    }

    pub fn union(self, other: MetricSet) -> MetricSet {
        MetricSet(self.0 | other.0)
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn iter(self) -> impl Iterator<Item = Metric> {
        Metric::ALL.into_iter().filter(move |m| self.contains(*m))
    }
}

impl FromIterator<Metric> for MetricSet {
    fn from_iter<I: IntoIterator<Item = Metric>>(iter: I) -> Self {
        let mut set = MetricSet::EMPTY;
        for m in iter {
            set.insert(m);
        }
        set
    }
}

impl From<Vec<Metric>> for MetricSet {
    fn from(value: Vec<Metric>) -> Self {
        value.into_iter().collect()
    }
}

impl From<MetricSet> for Vec<Metric> {
    fn from(value: MetricSet) -> Self {
        value.iter().collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricScale {
    pub multiplier: f64,
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricTable {
    pub goals: MetricScale,
    pub corners: MetricScale,
    pub cards: MetricScale,
    pub fouls: MetricScale,
    pub offsides: MetricScale,
}

impl MetricTable {
    pub fn get(&self, metric: Metric) -> MetricScale {
        match metric {
            Metric::Goals => self.goals,
            Metric::Corners => self.corners,
            Metric::Cards => self.cards,
            Metric::Fouls => self.fouls,
            Metric::Offsides => self.offsides,
        }
    }
}

impl Default for MetricTable {
    fn default() -> Self {
        Self {
            goals: MetricScale {
                multiplier: 1.6,
                min: 0.0,
                max: 12.0,
            },
            corners: MetricScale {
                multiplier: 1.75,
                min: 0.0,
                max: 25.0,
            },
            cards: MetricScale {
                multiplier: 1.8,
                min: 0.0,
                max: 15.0,
            },
            fouls: MetricScale {
                multiplier: 1.8,
                min: 0.0,
                max: 40.0,
            },
            offsides: MetricScale {
                multiplier: 1.8,
                min: 0.0,
                max: 10.0,
            },
        }
    }
}
