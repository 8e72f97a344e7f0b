use std::fmt;

use serde::{Deserialize, Serialize};

use crate::metric::Metric;
use crate::odds::line_key;

pub const ODDS_MIN: f64 = 1.25;
pub const ODDS_MAX: f64 = 5.00;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OddsCeiling {
    pub market: Metric,
    pub line: f64,
    pub max_odds: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SuspiciousOdds {
    NotFinite,
    BelowMin { odds: f64, min: f64 },
    AboveMax { odds: f64, max: f64 },
    AboveCeiling { market: Metric, line: f64, odds: f64, ceiling: f64 },
}

impl fmt::Display for SuspiciousOdds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SuspiciousOdds::NotFinite => f.write_str("odds_not_finite"),
            SuspiciousOdds::BelowMin { odds, min } => {
                write!(f, "odds_below_min odds={odds:.2} min={min:.2}")
            }
            SuspiciousOdds::AboveMax { odds, max } => {
                write!(f, "odds_above_max odds={odds:.2} max={max:.2}")
            }
            SuspiciousOdds::AboveCeiling {
                market,
                line,
                odds,
                ceiling,
            } => write!(
                f,
                "odds_above_market_ceiling market={market} line={line} odds={odds:.2} ceiling={ceiling:.2}"
            ),
        }
    }
}

impl SuspiciousOdds {
    pub fn is_global_band(&self) -> bool {
        matches!(
            self,
            SuspiciousOdds::NotFinite | SuspiciousOdds::BelowMin { .. } | SuspiciousOdds::AboveMax { .. }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OddsGuard {
    pub min: f64,
    pub max: f64,
    #[serde(default)]
    pub ceilings: Vec<OddsCeiling>,
}

impl Default for OddsGuard {
    fn default() -> Self {
        Self {
            min: ODDS_MIN,
            max: ODDS_MAX,
            ceilings: default_ceilings(),
        }
    }
}

impl OddsGuard {
    pub fn check(&self, market: Metric, line: f64, odds: f64) -> Option<SuspiciousOdds> {
        if !odds.is_finite() {
            return Some(SuspiciousOdds::NotFinite);
        }
        if odds < self.min {
            return Some(SuspiciousOdds::BelowMin {
                odds,
                min: self.min,
            });
        }
        if odds > self.max {
            return Some(SuspiciousOdds::AboveMax {
                odds,
                max: self.max,
            });
        }
        let ceiling = self.ceiling(market, line)?;
        (odds >= ceiling).then_some(SuspiciousOdds::AboveCeiling {
            market,
            line,
            odds,
            ceiling,
        })
    }

    pub fn ceiling(&self, market: Metric, line: f64) -> Option<f64> {
        let key = line_key(line);
        self.ceilings
            .iter()
            .find(|c| c.market == market && line_key(c.line) == key)
            .map(|c| c.max_odds)
    }
}

pub fn check_suspicious_odds(market: Metric, line: f64, odds: f64) -> Option<SuspiciousOdds> {
    OddsGuard::default().check(market, line, odds)
}

fn default_ceilings() -> Vec<OddsCeiling> {
    [
        (Metric::Goals, 1.5, 2.10),
        (Metric::Goals, 2.5, 3.20),
        (Metric::Goals, 3.5, 4.50),
        (Metric::Corners, 8.5, 2.40),
        (Metric::Corners, 9.5, 2.80),
        (Metric::Corners, 10.5, 3.20),
        (Metric::Cards, 3.5, 2.60),
        (Metric::Cards, 4.5, 3.40),
    ]
    .into_iter()
    .map(|(market, line, max_odds)| OddsCeiling {
        market,
        line,
        max_odds,
    })
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_band_rejects_long_prices() {
        let reason = check_suspicious_odds(Metric::Goals, 2.5, 6.2).expect("flagged");
        assert!(reason.is_global_band());
        assert!(matches!(reason, SuspiciousOdds::AboveMax { .. }));
        assert!(reason.to_string().starts_with("odds_above_max"));
    }

    #[test]
    fn band_applies_without_table_entry() {
        let guard = OddsGuard {
            ceilings: Vec::new(),
            ..OddsGuard::default()
        };
        assert!(guard.check(Metric::Fouls, 23.5, 1.10).is_some());
        assert!(guard.check(Metric::Fouls, 23.5, 5.01).is_some());
        assert!(guard.check(Metric::Fouls, 23.5, 2.00).is_none());
        assert!(guard.check(Metric::Fouls, 23.5, f64::NAN).is_some());
    }

    #[test]
    fn ceiling_is_inclusive() {
        let guard = OddsGuard::default();
        assert!(guard.check(Metric::Goals, 1.5, 2.09).is_none());
        let hit = guard.check(Metric::Goals, 1.5, 2.10).expect("at ceiling");
        assert!(!hit.is_global_band());
        // Different line, no ceiling.
        assert!(guard.check(Metric::Goals, 4.5, 4.00).is_none());
    }
}
