use std::collections::HashMap;
use std::fmt;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::metric::Metric;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Over,
    Under,
}

impl Side {
    pub fn opposite(self) -> Side {
        match self {
            Side::Over => Side::Under,
            Side::Under => Side::Over,
        }
    }

    pub fn parse(raw: &str) -> Option<Side> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "over" | "o" | "more" => Some(Side::Over),
            "under" | "u" | "less" => Some(Side::Under),
            _ => None,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Over => f.write_str("over"),
            Side::Under => f.write_str("under"),
        }
    }
}

/// Lines compared in tenths so 2.5 and 2.5000000001 land in the same bucket.
pub fn line_key(line: f64) -> i64 {
    (line * 10.0).round() as i64
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OddsQuote {
    pub market: Metric,
    pub side: Side,
    pub line: f64,
    pub bookmaker: String,
    pub odds: f64,
}

impl OddsQuote {
    /// Returns `None` for prices that can't be turned into a probability.
    pub fn new(
        market: Metric,
        side: Side,
        line: f64,
        bookmaker: impl Into<String>,
        odds: f64,
    ) -> Option<Self> {
        let quote = Self {
            market,
            side,
            line,
            bookmaker: bookmaker.into(),
            odds,
        };
        (!quote.is_degenerate()).then_some(quote)
    }

    pub fn is_degenerate(&self) -> bool {
        !self.odds.is_finite() || self.odds <= 1.0 || !self.line.is_finite()
    }
}

pub fn implied_probability(odds: f64) -> Option<f64> {
    if !odds.is_finite() || odds <= 1.0 {
        return None;
    }
    Some(1.0 / odds)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoVig {
    pub over: f64,
    pub under: f64,
    /// Overround above 1.0 that was stripped out.
    pub margin: f64,
}

impl NoVig {
    pub fn side(&self, side: Side) -> f64 {
        match side {
            Side::Over => self.over,
            Side::Under => self.under,
        }
    }
}

pub fn no_vig_two_way(over_odds: f64, under_odds: f64) -> Option<NoVig> {
    let io = implied_probability(over_odds)?;
    let iu = implied_probability(under_odds)?;
    let sum = io + iu;
    if sum <= 0.0 {
        return None;
    }
    Some(NoVig {
        over: io / sum,
        under: iu / sum,
        margin: sum - 1.0,
    })
}

pub fn edge(model_prob: f64, book_prob: f64) -> f64 {
    model_prob - book_prob
}

#[derive(Debug, Clone, PartialEq)]
pub struct BookPair {
    pub bookmaker: String,
    pub market: Metric,
    pub line: f64,
    pub over: f64,
    pub under: f64,
}

impl BookPair {
    pub fn odds(&self, side: Side) -> f64 {
        match side {
            Side::Over => self.over,
            Side::Under => self.under,
        }
    }

    pub fn no_vig(&self) -> Option<NoVig> {
        no_vig_two_way(self.over, self.under)
    }
}

/// Pair quotes into two-way markets per bookmaker. One-sided and degenerate
/// quotes are dropped. Output keeps first-seen order of the bookmaker.
pub fn two_way_pairs<'a, I>(quotes: I) -> Vec<BookPair>
where
    I: IntoIterator<Item = &'a OddsQuote>,
{
    let mut order: Vec<(String, Metric, i64)> = Vec::new();
    let mut sides: HashMap<(String, Metric, i64), (f64, Option<f64>, Option<f64>)> =
        HashMap::new();

    for q in quotes {
        if q.is_degenerate() {
            debug!(bookmaker = %q.bookmaker, market = %q.market, line = q.line, odds = q.odds, "degenerate odds skipped");
            continue;
        }
        let key = (q.bookmaker.clone(), q.market, line_key(q.line));
        let entry = sides.entry(key.clone()).or_insert_with(|| {
            order.push(key);
            (q.line, None, None)
        });
        let slot = match q.side {
            Side::Over => &mut entry.1,
            Side::Under => &mut entry.2,
        };
        // A bookmaker listing the same side twice keeps its better price.
        *slot = Some(slot.map_or(q.odds, |prev| prev.max(q.odds)));
    }

    let mut out = Vec::with_capacity(order.len());
    for key in order {
        let Some(&(line, over, under)) = sides.get(&key) else {
            continue;
        };
        let (Some(over), Some(under)) = (over, under) else {
            debug!(bookmaker = %key.0, market = %key.1, line, "one-sided market skipped");
            continue;
        };
        out.push(BookPair {
            bookmaker: key.0,
            market: key.1,
            line,
            over,
            under,
        });
    }
    out
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricedSide {
    pub bookmaker: String,
    pub odds: f64,
    /// Margin-free probability from the same bookmaker's pair.
    pub book_prob: f64,
    pub margin: f64,
}

/// Highest price for `side` across bookmakers; the first bookmaker wins ties.
pub fn best_price(pairs: &[BookPair], side: Side) -> Option<PricedSide> {
    let mut best: Option<PricedSide> = None;
    for pair in pairs {
        let Some(nv) = pair.no_vig() else {
            continue;
        };
        let odds = pair.odds(side);
        if best.as_ref().is_some_and(|b| odds <= b.odds) {
            continue;
        }
        best = Some(PricedSide {
            bookmaker: pair.bookmaker.clone(),
            odds,
            book_prob: nv.side(side),
            margin: nv.margin,
        });
    }
    best
}

#[derive(Debug, Deserialize)]
struct OddsEvent {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    bookmakers: Vec<OddsBookmaker>,
}

#[derive(Debug, Deserialize)]
struct OddsBookmaker {
    key: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    markets: Vec<OddsMarket>,
}

#[derive(Debug, Deserialize)]
struct OddsMarket {
    key: String,
    #[serde(default)]
    outcomes: Vec<OddsOutcome>,
}

#[derive(Debug, Deserialize)]
struct OddsOutcome {
    name: String,
    #[serde(default)]
    price: Option<f64>,
    #[serde(default)]
    point: Option<f64>,
}

fn market_for_key(key: &str) -> Option<Metric> {
    match key.trim().to_ascii_lowercase().as_str() {
        "totals" | "alternate_totals" | "totals_goals" => Some(Metric::Goals),
        "totals_corners" | "alternate_totals_corners" => Some(Metric::Corners),
        "totals_cards" | "totals_bookings" | "alternate_totals_cards" => Some(Metric::Cards),
        "totals_fouls" => Some(Metric::Fouls),
        "totals_offsides" => Some(Metric::Offsides),
        _ => None,
    }
}

fn event_quotes(event: &OddsEvent) -> Vec<OddsQuote> {
    let mut out = Vec::new();
    for bookmaker in &event.bookmakers {
        let name = bookmaker
            .title
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(bookmaker.key.as_str());
        for market in &bookmaker.markets {
            let Some(metric) = market_for_key(&market.key) else {
                continue;
            };
            for outcome in &market.outcomes {
                let (Some(side), Some(price), Some(point)) =
                    (Side::parse(&outcome.name), outcome.price, outcome.point)
                else {
                    continue;
                };
                if let Some(q) = OddsQuote::new(metric, side, point, name, price) {
                    out.push(q);
                }
            }
        }
    }
    out
}

fn parse_events(raw: &str) -> Result<Vec<OddsEvent>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(Vec::new());
    }
    if trimmed.starts_with('[') {
        serde_json::from_str(trimmed).context("invalid odds json")
    } else {
        let one: OddsEvent = serde_json::from_str(trimmed).context("invalid odds json")?;
        Ok(vec![one])
    }
}

pub fn parse_odds_json(raw: &str) -> Result<Vec<OddsQuote>> {
    Ok(parse_events(raw)?.iter().flat_map(event_quotes).collect())
}

/// Quotes grouped by provider event id. Events without an id are skipped.
pub fn parse_odds_events_json(raw: &str) -> Result<HashMap<String, Vec<OddsQuote>>> {
    let mut out: HashMap<String, Vec<OddsQuote>> = HashMap::new();
    for event in parse_events(raw)? {
        let Some(id) = event.id.as_deref().map(str::trim).filter(|s| !s.is_empty()) else {
            continue;
        };
        out.entry(id.to_string())
            .or_default()
            .extend(event_quotes(&event));
    }
    Ok(out)
}
