use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::metric::{Metric, MetricSet};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixtureStatRow {
    pub fixture_id: u64,
    pub competition_id: u32,
    #[serde(default)]
    pub competition_name: String,
    #[serde(default)]
    pub kickoff_ts: Option<i64>,
    pub goals: f64,
    #[serde(default)]
    pub corners: Option<f64>,
    #[serde(default)]
    pub cards: Option<f64>,
    #[serde(default)]
    pub fouls: Option<f64>,
    #[serde(default)]
    pub offsides: Option<f64>,
    #[serde(default)]
    pub reliability: CompetitionReliability,
}

impl FixtureStatRow {
    pub fn value(&self, metric: Metric) -> Option<f64> {
        match metric {
            Metric::Goals => Some(self.goals),
            Metric::Corners => self.corners,
            Metric::Cards => self.cards,
            Metric::Fouls => self.fouls,
            Metric::Offsides => self.offsides,
        }
    }

    pub fn secondary_all_zero_or_absent(&self) -> bool {
        Metric::SECONDARY
            .iter()
            .all(|m| self.value(*m).is_none_or(|v| v == 0.0))
    }

    /// Secondary stats zeroed out by a competition that doesn't really track them.
    pub fn is_fake_zero(&self) -> bool {
        self.reliability.flagged && self.secondary_all_zero_or_absent()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompetitionReliability {
    #[serde(default)]
    pub flagged: bool,
    #[serde(default)]
    pub unreliable_metrics: MetricSet,
}

impl CompetitionReliability {
    pub fn reliable() -> Self {
        Self::default()
    }

    pub fn covers(&self, metric: Metric) -> bool {
        !self.unreliable_metrics.contains(metric)
    }
}

const DEFAULT_CUP_KEYWORDS: &[&str] = &[
    "cup", "trophy", "shield", "pokal", "copa", "coupe", "coppa", "friendl",
];

/// Decides how far a competition's secondary stats can be trusted.
///
/// Explicit coverage entries win. Competitions without an entry fall back to the
/// name heuristic, which only marks them as cup-like and never removes a metric outright.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompetitionPolicy {
    /// competition id -> secondary metrics the provider actually reports.
    #[serde(default)]
    pub coverage: HashMap<u32, MetricSet>,
    #[serde(default = "default_cup_keywords")]
    pub cup_keywords: Vec<String>,
    #[serde(default = "default_true")]
    pub name_heuristic: bool,
}

impl Default for CompetitionPolicy {
    fn default() -> Self {
        Self {
            coverage: HashMap::new(),
            cup_keywords: default_cup_keywords(),
            name_heuristic: true,
        }
    }
}

impl CompetitionPolicy {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("read competition policy {}", path.display()))?;
        serde_json::from_str(&raw).context("invalid competition policy json")
    }

    pub fn classify(&self, competition_id: u32, name: &str) -> CompetitionReliability {
        if let Some(covered) = self.coverage.get(&competition_id) {
            let unreliable: MetricSet = Metric::SECONDARY
                .into_iter()
                .filter(|m| !covered.contains(*m))
                .collect();
            return CompetitionReliability {
                flagged: !unreliable.is_empty(),
                unreliable_metrics: unreliable,
            };
        }
        if self.name_heuristic && self.is_cup_name(name) {
            return CompetitionReliability {
                flagged: true,
                unreliable_metrics: MetricSet::EMPTY,
            };
        }
        CompetitionReliability::reliable()
    }

    pub fn is_cup_name(&self, name: &str) -> bool {
        let n = name.trim().to_lowercase();
        if n.is_empty() {
            return false;
        }
        self.cup_keywords
            .iter()
            .any(|k| !k.is_empty() && n.contains(&k.to_lowercase()))
    }

    /// Fold the policy's view into rows. Flags a row already carries are kept.
    pub fn annotate(&self, rows: &mut [FixtureStatRow]) {
        for row in rows {
            let c = self.classify(row.competition_id, &row.competition_name);
            row.reliability.flagged |= c.flagged;
            row.reliability.unreliable_metrics =
                row.reliability.unreliable_metrics.union(c.unreliable_metrics);
        }
    }
}

fn default_cup_keywords() -> Vec<String> {
    DEFAULT_CUP_KEYWORDS.iter().map(|s| s.to_string()).collect()
}

fn default_true() -> bool {
    true
}

/// Newest first; rows without a kickoff go last, ties broken by fixture id.
pub fn order_newest_first(rows: &mut [FixtureStatRow]) {
    rows.sort_by(|a, b| match (a.kickoff_ts, b.kickoff_ts) {
        (Some(x), Some(y)) => y.cmp(&x).then(b.fixture_id.cmp(&a.fixture_id)),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => b.fixture_id.cmp(&a.fixture_id),
    });
}

pub fn parse_fixture_stats_json(
    raw: &str,
    team_id: u32,
    policy: &CompetitionPolicy,
) -> Result<Vec<FixtureStatRow>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(Vec::new());
    }
    let v: Value = serde_json::from_str(trimmed).context("invalid fixture stats json")?;
    let items = match &v {
        Value::Array(arr) => arr.as_slice(),
        Value::Object(_) => v
            .get("response")
            .and_then(|x| x.as_array())
            .map(|a| a.as_slice())
            .unwrap_or_default(),
        _ => return Err(anyhow::anyhow!("fixture stats payload must be an array")),
    };

    let mut out: Vec<FixtureStatRow> = items
        .iter()
        .filter_map(|item| parse_fixture_row(item, team_id, policy))
        .collect();
    out.sort_by_key(|r| r.fixture_id);
    out.dedup_by_key(|r| r.fixture_id);
    order_newest_first(&mut out);
    Ok(out)
}

fn parse_fixture_row(v: &Value, team_id: u32, policy: &CompetitionPolicy) -> Option<FixtureStatRow> {
    let fixture = v.get("fixture")?;
    let fixture_id = fixture.get("id")?.as_u64()?;
    let kickoff_ts = fixture
        .get("date")
        .and_then(|x| x.as_str())
        .and_then(parse_timestamp);

    let league = v.get("league");
    let competition_id = match league.and_then(|l| l.get("id")).and_then(|x| x.as_u64()) {
        Some(id) => u32::try_from(id).ok()?,
        None => 0,
    };
    let competition_name = league
        .and_then(|l| l.get("name"))
        .and_then(|x| x.as_str())
        .unwrap_or_default()
        .to_string();

    let teams = v.get("teams")?;
    let home_id = u32::try_from(teams.get("home")?.get("id")?.as_u64()?).ok()?;
    let away_id = u32::try_from(teams.get("away")?.get("id")?.as_u64()?).ok()?;
    let side = if home_id == team_id {
        "home"
    } else if away_id == team_id {
        "away"
    } else {
        return None;
    };
    // Unplayed or abandoned fixtures carry null goals.
    let goals = v.get("goals")?.get(side).and_then(stat_value)?;

    let stats = v
        .get("statistics")
        .and_then(|x| x.as_array())
        .and_then(|blocks| {
            blocks.iter().find(|b| {
                b.get("team")
                    .and_then(|t| t.get("id"))
                    .and_then(|x| x.as_u64())
                    == Some(team_id as u64)
            })
        })
        .and_then(|b| b.get("statistics"))
        .and_then(|x| x.as_array());

    let lookup = |names: &[&str]| -> Option<f64> {
        let rows = stats?;
        rows.iter()
            .find(|row| {
                row.get("type")
                    .and_then(|x| x.as_str())
                    .is_some_and(|t| names.iter().any(|n| t.trim().eq_ignore_ascii_case(n)))
            })
            .and_then(|row| row.get("value"))
            .and_then(stat_value)
    };

    let cards = match (lookup(&["Yellow Cards"]), lookup(&["Red Cards"])) {
        (None, None) => None,
        (y, r) => Some(y.unwrap_or(0.0) + r.unwrap_or(0.0)),
    };

    Some(FixtureStatRow {
        fixture_id,
        competition_id,
        reliability: policy.classify(competition_id, &competition_name),
        competition_name,
        kickoff_ts,
        goals,
        corners: lookup(&["Corner Kicks", "Corners"]),
        cards,
        fouls: lookup(&["Fouls"]),
        offsides: lookup(&["Offsides"]),
    })
}

fn stat_value(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64().filter(|x| x.is_finite()),
        Value::String(s) => parse_stat_cell(s),
        _ => None,
    }
}

fn parse_stat_cell(raw: &str) -> Option<f64> {
    let s = raw.trim();
    if s.is_empty() || s == "-" {
        return None;
    }
    let s = s.trim_end_matches('%').replace(',', "");
    s.parse::<f64>().ok().filter(|x| x.is_finite())
}

pub(crate) fn parse_timestamp(raw: &str) -> Option<i64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.timestamp());
    }
    for fmt in [
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
    ] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return Some(Utc.from_utc_datetime(&naive).timestamp());
        }
    }
    None
}
