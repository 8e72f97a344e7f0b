use std::fmt;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::metric::Metric;
use crate::odds::{Side, line_key};
use crate::probability::is_half_line;

pub const DEFAULT_RULES_VERSION: &str = "2024.1";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pick {
    pub market: Metric,
    pub side: Side,
    pub line: f64,
}

impl Pick {
    pub fn same_as(&self, market: Metric, side: Side, line: f64) -> bool {
        self.market == market && self.side == side && line_key(self.line) == line_key(line)
    }
}

impl fmt::Display for Pick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.market, self.side, self.line)
    }
}

/// `[min, max)` on the combined value; `max: None` is open-ended.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RuleBand {
    pub market: Metric,
    pub min: f64,
    #[serde(default)]
    pub max: Option<f64>,
    pub side: Side,
    pub line: f64,
}

impl RuleBand {
    fn contains(&self, value: f64) -> bool {
        value >= self.min && self.max.is_none_or(|m| value < m)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleTable {
    version: String,
    bands: Vec<RuleBand>,
}

#[derive(Debug, Deserialize)]
struct RuleTableFile {
    version: String,
    bands: Vec<RuleBand>,
}

impl RuleTable {
    pub fn new(version: impl Into<String>, bands: Vec<RuleBand>) -> Result<Self> {
        let version = version.into();
        if version.trim().is_empty() {
            return Err(anyhow!("rule table version must not be empty"));
        }
        for band in &bands {
            if !band.min.is_finite() || band.max.is_some_and(|m| !m.is_finite() || m <= band.min) {
                return Err(anyhow!("rule band for {} has an empty range", band.market));
            }
            if !is_half_line(band.line) {
                return Err(anyhow!(
                    "rule band for {} uses line {} which is not a half line within range",
                    band.market,
                    band.line
                ));
            }
        }
        for market in Metric::ALL {
            let mut mine: Vec<&RuleBand> = bands.iter().filter(|b| b.market == market).collect();
            mine.sort_by(|a, b| a.min.total_cmp(&b.min));
            for w in mine.windows(2) {
                let open_ended = w[0].max.is_none();
                if open_ended || w[0].max.is_some_and(|m| m > w[1].min) {
                    return Err(anyhow!(
                        "overlapping rule bands for {market} at {}",
                        w[1].min
                    ));
                }
            }
        }
        Ok(Self { version, bands })
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let file: RuleTableFile = serde_json::from_str(raw).context("invalid rule table json")?;
        Self::new(file.version, file.bands)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("read rule table {}", path.display()))?;
        Self::from_json(&raw).with_context(|| format!("load rule table {}", path.display()))
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn bands(&self) -> &[RuleBand] {
        &self.bands
    }

    pub fn pick(&self, market: Metric, value: f64) -> Option<Pick> {
        if !value.is_finite() {
            return None;
        }
        self.bands
            .iter()
            .find(|b| b.market == market && b.contains(value))
            .map(|b| Pick {
                market,
                side: b.side,
                line: b.line,
            })
    }

    /// Re-derive the pick a stored row should carry under this table.
    pub fn revalidate(&self, row: &PersistedSelection) -> Result<Pick, StaleSelection> {
        let Some(value) = row.combined_value else {
            return Err(StaleSelection::MissingSnapshot);
        };
        let Some(expected) = self.pick(row.market, value) else {
            return Err(StaleSelection::NoLongerQualifies { value });
        };
        if !expected.same_as(row.market, row.side, row.line) {
            return Err(StaleSelection::PickChanged {
                stored: Pick {
                    market: row.market,
                    side: row.side,
                    line: row.line,
                },
                expected,
            });
        }
        Ok(expected)
    }

    pub fn retain_current(&self, rows: Vec<PersistedSelection>) -> Vec<PersistedSelection> {
        rows.into_iter()
            .filter(|row| match self.revalidate(row) {
                Ok(_) => true,
                Err(reason) => {
                    warn!(
                        fixture = %row.fixture_id,
                        stored_version = %row.rules_version,
                        current_version = %self.version,
                        %reason,
                        "dropping stale selection"
                    );
                    false
                }
            })
            .collect()
    }
}

impl Default for RuleTable {
    fn default() -> Self {
        default_rules().clone()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedSelection {
    pub fixture_id: String,
    pub market: Metric,
    pub side: Side,
    pub line: f64,
    #[serde(default)]
    pub combined_value: Option<f64>,
    #[serde(default)]
    pub rules_version: String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StaleSelection {
    MissingSnapshot,
    NoLongerQualifies { value: f64 },
    PickChanged { stored: Pick, expected: Pick },
}

impl fmt::Display for StaleSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StaleSelection::MissingSnapshot => f.write_str("missing_combined_snapshot"),
            StaleSelection::NoLongerQualifies { value } => {
                write!(f, "no_longer_qualifies value={value}")
            }
            StaleSelection::PickChanged { stored, expected } => {
                write!(f, "pick_changed stored=({stored}) expected=({expected})")
            }
        }
    }
}

static DEFAULT_RULES: Lazy<RuleTable> = Lazy::new(|| RuleTable {
    version: DEFAULT_RULES_VERSION.to_string(),
    bands: default_bands(),
});

pub fn default_rules() -> &'static RuleTable {
    &DEFAULT_RULES
}

pub fn pick_from_combined(market: Metric, value: f64) -> Option<Pick> {
    default_rules().pick(market, value)
}

fn default_bands() -> Vec<RuleBand> {
    use Metric::*;
    use Side::*;
    [
        (Goals, 0.0, Some(1.8), Under, 2.5),
        (Goals, 2.4, Some(3.4), Over, 1.5),
        (Goals, 3.4, None, Over, 2.5),
        (Corners, 0.0, Some(7.0), Under, 10.5),
        (Corners, 9.5, Some(11.5), Over, 8.5),
        (Corners, 11.5, None, Over, 9.5),
        (Cards, 0.0, Some(2.5), Under, 4.5),
        (Cards, 4.0, Some(5.5), Over, 3.5),
        (Cards, 5.5, None, Over, 4.5),
        (Fouls, 0.0, Some(18.0), Under, 24.5),
        (Fouls, 26.0, None, Over, 23.5),
        (Offsides, 0.0, Some(2.0), Under, 4.5),
        (Offsides, 4.5, None, Over, 3.5),
    ]
    .into_iter()
    .map(|(market, min, max, side, line)| RuleBand {
        market,
        min,
        max,
        side,
        line,
    })
    .collect()
}
