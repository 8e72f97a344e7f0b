use std::collections::HashMap;

use anyhow::{Context, Result};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::combined::{CombinedMetrics, combine_with};
use crate::config::EngineConfig;
use crate::fixture_stats::{FixtureStatRow, order_newest_first};
use crate::integrity::{IntegrityResult, validate_with};
use crate::league_params::model_params_for;
use crate::metric::Metric;
use crate::odds::{BookPair, OddsQuote, Side, best_price, edge, line_key, parse_odds_json, two_way_pairs};
use crate::probability::{ModelParams, count_over_under, over_under_probability};
use crate::profile::{TeamMetricProfile, aggregate_profile, aggregate_profile_from_payload};
use crate::rules::{PersistedSelection, Pick};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixtureInput {
    pub fixture_id: String,
    #[serde(default)]
    pub league_id: Option<u32>,
    #[serde(default)]
    pub home: Option<TeamMetricProfile>,
    #[serde(default)]
    pub away: Option<TeamMetricProfile>,
    #[serde(default)]
    pub odds: Vec<OddsQuote>,
}

impl FixtureInput {
    pub fn from_rows(
        fixture_id: impl Into<String>,
        league_id: Option<u32>,
        (home_id, home_rows): (u32, &[FixtureStatRow]),
        (away_id, away_rows): (u32, &[FixtureStatRow]),
        odds: Vec<OddsQuote>,
        cfg: &EngineConfig,
    ) -> Self {
        let profile = |team_id: u32, rows: &[FixtureStatRow]| {
            let mut rows = rows.to_vec();
            cfg.competitions.annotate(&mut rows);
            order_newest_first(&mut rows);
            aggregate_profile(team_id, &rows, cfg.window)
        };
        Self {
            fixture_id: fixture_id.into(),
            league_id,
            home: Some(profile(home_id, home_rows)),
            away: Some(profile(away_id, away_rows)),
            odds,
        }
    }

    pub fn from_payloads(
        fixture_id: impl Into<String>,
        league_id: Option<u32>,
        (home_id, home_raw): (u32, &str),
        (away_id, away_raw): (u32, &str),
        odds_raw: &str,
        cfg: &EngineConfig,
    ) -> Result<Self> {
        let home = aggregate_profile_from_payload(home_id, home_raw, &cfg.competitions, cfg.window)
            .context("home fixtures payload")?;
        let away = aggregate_profile_from_payload(away_id, away_raw, &cfg.competitions, cfg.window)
            .context("away fixtures payload")?;
        let odds = parse_odds_json(odds_raw).context("odds payload")?;
        Ok(Self {
            fixture_id: fixture_id.into(),
            league_id,
            home: Some(home),
            away: Some(away),
            odds,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    pub fixture_id: String,
    pub pick: Pick,
    pub bookmaker: String,
    pub odds: f64,
    pub model_prob: f64,
    pub book_prob: f64,
    pub edge: f64,
    /// Expected return per unit staked at `odds`.
    pub expected_value: f64,
    pub book_margin: f64,
    pub combined_value: f64,
    pub lambda: f64,
    pub rules_version: String,
    pub home_goals_sample: usize,
    pub away_goals_sample: usize,
    pub market_available: bool,
}

/// Upsert slot for a selection: newer rows replace older ones with the same key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct SelectionKey {
    pub fixture_id: String,
    pub market: Metric,
    pub side: Side,
    pub line_tenths: i64,
    pub bookmaker: String,
}

impl Selection {
    pub fn key(&self) -> SelectionKey {
        SelectionKey {
            fixture_id: self.fixture_id.clone(),
            market: self.pick.market,
            side: self.pick.side,
            line_tenths: line_key(self.pick.line),
            bookmaker: self.bookmaker.clone(),
        }
    }

    pub fn to_persisted(&self) -> PersistedSelection {
        PersistedSelection {
            fixture_id: self.fixture_id.clone(),
            market: self.pick.market,
            side: self.pick.side,
            line: self.pick.line,
            combined_value: Some(self.combined_value),
            rules_version: self.rules_version.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeCandidate {
    pub market: Metric,
    pub side: Side,
    pub line: f64,
    pub bookmaker: String,
    pub odds: f64,
    pub model_prob: f64,
    pub book_prob: f64,
    pub edge: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlaggedQuote {
    pub bookmaker: String,
    pub pick: Pick,
    pub odds: f64,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FixtureReport {
    pub fixture_id: String,
    pub integrity: IntegrityResult,
    pub combined: Option<CombinedMetrics>,
    pub selections: Vec<Selection>,
    pub flagged: Vec<FlaggedQuote>,
}

fn model_probability(
    input: &FixtureInput,
    combined: &CombinedMetrics,
    market: Metric,
    side: Side,
    line: f64,
    params: &ModelParams,
) -> Option<(f64, f64)> {
    let ou = match market {
        Metric::Goals => {
            let (home, away) = (input.home.as_ref()?, input.away.as_ref()?);
            over_under_probability(home, away, line, params)?
        }
        _ => count_over_under(combined.get(market)?, line)?,
    };
    let p = match side {
        Side::Over => ou.over,
        Side::Under => ou.under,
    };
    Some((p, ou.lambda))
}

fn pairs_for(quotes: &[OddsQuote], market: Metric, line: f64) -> Vec<BookPair> {
    let key = line_key(line);
    two_way_pairs(
        quotes
            .iter()
            .filter(|q| q.market == market && line_key(q.line) == key),
    )
}

pub fn evaluate_fixture(input: &FixtureInput, cfg: &EngineConfig) -> FixtureReport {
    let integrity = validate_with(input.home.as_ref(), input.away.as_ref(), cfg.min_sample);
    let combined = match (&input.home, &input.away) {
        (Some(h), Some(a)) => Some(combine_with(h, a, &cfg.metrics, cfg.min_sample)),
        _ => None,
    };

    let mut report = FixtureReport {
        fixture_id: input.fixture_id.clone(),
        integrity,
        combined,
        selections: Vec::new(),
        flagged: Vec::new(),
    };
    if !report.integrity.is_valid {
        debug!(
            fixture = %input.fixture_id,
            reason = %report.integrity.failure.map(|f| f.to_string()).unwrap_or_default(),
            "fixture failed integrity gate"
        );
        return report;
    }
    let Some(combined) = report.combined else {
        return report;
    };

    let params = model_params_for(&cfg.leagues, input.league_id, cfg.model);
    let (home_goals_sample, away_goals_sample) = (
        report.integrity.home.goals_sample_size,
        report.integrity.away.goals_sample_size,
    );

    for market in Metric::ALL {
        let Some(value) = combined.get(market) else {
            continue;
        };
        let Some(pick) = cfg.rules.pick(market, value) else {
            continue;
        };

        let mut pairs = pairs_for(&input.odds, market, pick.line);
        pairs.retain(|pair| {
            let odds = pair.odds(pick.side);
            match cfg.guard.check(market, pick.line, odds) {
                None => true,
                Some(reason) => {
                    debug!(fixture = %input.fixture_id, bookmaker = %pair.bookmaker, %pick, odds, %reason, "suspicious odds dropped");
                    report.flagged.push(FlaggedQuote {
                        bookmaker: pair.bookmaker.clone(),
                        pick,
                        odds,
                        reason: reason.to_string(),
                    });
                    false
                }
            }
        });
        let Some(price) = best_price(&pairs, pick.side) else {
            continue;
        };
        let Some((model_prob, lambda)) =
            model_probability(input, &combined, market, pick.side, pick.line, &params)
        else {
            continue;
        };

        let e = edge(model_prob, price.book_prob);
        if e <= 0.0 {
            debug!(fixture = %input.fixture_id, %pick, model_prob, book_prob = price.book_prob, "no edge");
            continue;
        }

        report.selections.push(Selection {
            fixture_id: input.fixture_id.clone(),
            pick,
            bookmaker: price.bookmaker,
            odds: price.odds,
            model_prob,
            book_prob: price.book_prob,
            edge: e,
            expected_value: model_prob * price.odds - 1.0,
            book_margin: price.margin,
            combined_value: value,
            lambda,
            rules_version: cfg.rules.version().to_string(),
            home_goals_sample,
            away_goals_sample,
            market_available: report.integrity.metric_available(market),
        });
    }

    report
        .selections
        .sort_by(|a, b| b.edge.total_cmp(&a.edge));
    report
}

/// Every side with a positive edge at its best price, before rule bands and guards.
pub fn edge_candidates(input: &FixtureInput, cfg: &EngineConfig) -> Vec<EdgeCandidate> {
    let (Some(home), Some(away)) = (&input.home, &input.away) else {
        return Vec::new();
    };
    let combined = combine_with(home, away, &cfg.metrics, cfg.min_sample);
    let params = model_params_for(&cfg.leagues, input.league_id, cfg.model);

    let mut lines: Vec<(Metric, i64, f64)> = input
        .odds
        .iter()
        .map(|q| (q.market, line_key(q.line), q.line))
        .collect();
    lines.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.cmp(&b.1)));
    lines.dedup_by(|a, b| a.0 == b.0 && a.1 == b.1);

    let mut out = Vec::new();
    for (market, _, line) in lines {
        if combined.get(market).is_none() {
            continue;
        }
        let pairs = pairs_for(&input.odds, market, line);
        for side in [Side::Over, Side::Under] {
            let Some(price) = best_price(&pairs, side) else {
                continue;
            };
            let Some((model_prob, _)) =
                model_probability(input, &combined, market, side, line, &params)
            else {
                continue;
            };
            let e = edge(model_prob, price.book_prob);
            if e > 0.0 {
                out.push(EdgeCandidate {
                    market,
                    side,
                    line,
                    bookmaker: price.bookmaker,
                    odds: price.odds,
                    model_prob,
                    book_prob: price.book_prob,
                    edge: e,
                });
            }
        }
    }
    out.sort_by(|a, b| b.edge.total_cmp(&a.edge));
    out
}

/// Evaluate fixtures in parallel; output order follows input order.
pub fn evaluate_fixtures(inputs: &[FixtureInput], cfg: &EngineConfig) -> Vec<FixtureReport> {
    inputs.par_iter().map(|i| evaluate_fixture(i, cfg)).collect()
}

pub fn ranked_selections(reports: &[FixtureReport]) -> Vec<Selection> {
    let mut out: Vec<Selection> = reports
        .iter()
        .flat_map(|r| r.selections.iter().cloned())
        .collect();
    out.sort_by(|a, b| b.edge.total_cmp(&a.edge));
    out
}

/// Collapse to one row per key; later rows supersede earlier ones.
pub fn dedupe_freshest<I>(selections: I) -> Vec<Selection>
where
    I: IntoIterator<Item = Selection>,
{
    let mut slots: HashMap<SelectionKey, usize> = HashMap::new();
    let mut out: Vec<Selection> = Vec::new();
    for s in selections {
        match slots.get(&s.key()) {
            Some(&idx) => out[idx] = s,
            None => {
                slots.insert(s.key(), out.len());
                out.push(s);
            }
        }
    }
    out
}
