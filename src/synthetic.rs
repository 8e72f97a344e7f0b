//! Seeded synthetic fixtures and odds for demos and benchmarks.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::EngineConfig;
use crate::fixture_stats::{CompetitionReliability, FixtureStatRow};
use crate::metric::{Metric, MetricSet};
use crate::odds::{OddsQuote, Side};
use crate::probability::poisson_cdf;
use crate::selection::FixtureInput;

const BOOKMAKERS: &[&str] = &["Pinnacle", "Bet365", "Unibet", "William Hill"];
const LEAGUE_ID: u32 = 39;
const CUP_ID: u32 = 45;

fn poisson_sample(rng: &mut impl Rng, lambda: f64) -> f64 {
    let l = (-lambda.max(0.0)).exp();
    let mut k = 0u32;
    let mut p = 1.0;
    loop {
        p *= rng.r#gen::<f64>();
        if p <= l {
            return k as f64;
        }
        k += 1;
    }
}

/// Recent fixtures for one team, newest first. A share of them are cup games
/// with secondary stats zeroed out the way thin providers report them.
pub fn team_rows(
    rng: &mut impl Rng,
    team_id: u32,
    count: usize,
    goal_rate: f64,
    cup_share: f64,
) -> Vec<FixtureStatRow> {
    (0..count)
        .map(|i| {
            let cup = rng.gen_bool(cup_share.clamp(0.0, 1.0));
            let fixture_id = (team_id as u64) * 1_000 + (count - i) as u64;
            let goals = poisson_sample(rng, goal_rate);
            if cup {
                FixtureStatRow {
                    fixture_id,
                    competition_id: CUP_ID,
                    competition_name: "League Cup".to_string(),
                    kickoff_ts: Some(1_700_000_000 - (i as i64) * 604_800),
                    goals,
                    corners: Some(0.0),
                    cards: None,
                    fouls: Some(0.0),
                    offsides: None,
                    reliability: CompetitionReliability {
                        flagged: true,
                        unreliable_metrics: MetricSet::EMPTY,
                    },
                }
            } else {
                FixtureStatRow {
                    fixture_id,
                    competition_id: LEAGUE_ID,
                    competition_name: "Premier League".to_string(),
                    kickoff_ts: Some(1_700_000_000 - (i as i64) * 604_800),
                    goals,
                    corners: Some(poisson_sample(rng, 5.0)),
                    cards: Some(poisson_sample(rng, 1.9)),
                    fouls: Some(poisson_sample(rng, 11.0)),
                    offsides: Some(poisson_sample(rng, 1.8)),
                    reliability: CompetitionReliability::reliable(),
                }
            }
        })
        .collect()
}

pub fn quotes_for_line(
    rng: &mut impl Rng,
    market: Metric,
    lambda: f64,
    line: f64,
) -> Vec<OddsQuote> {
    let fair_under = poisson_cdf(lambda, line.floor() as u32).clamp(0.02, 0.98);
    let fair_over = 1.0 - fair_under;
    let mut out = Vec::new();
    for book in BOOKMAKERS {
        let margin = rng.gen_range(1.03..1.08);
        let noise = rng.gen_range(-0.04..0.04);
        let over = 1.0 / ((fair_over + noise).clamp(0.02, 0.98) * margin);
        let under = 1.0 / ((fair_under - noise).clamp(0.02, 0.98) * margin);
        out.extend(OddsQuote::new(market, Side::Over, line, *book, round2(over)));
        out.extend(OddsQuote::new(market, Side::Under, line, *book, round2(under)));
    }
    out
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

pub fn fixture(rng: &mut impl Rng, index: usize, cfg: &EngineConfig) -> FixtureInput {
    let home_id = (index as u32) * 2 + 1;
    let away_id = home_id + 1;
    let home_rate = rng.gen_range(0.7..2.3);
    let away_rate = rng.gen_range(0.6..2.0);
    let home_rows = team_rows(rng, home_id, 8, home_rate, 0.25);
    let away_rows = team_rows(rng, away_id, 8, away_rate, 0.25);

    let mut odds = Vec::new();
    for line in [1.5, 2.5, 3.5] {
        odds.extend(quotes_for_line(rng, Metric::Goals, home_rate + away_rate, line));
    }
    for line in [8.5, 9.5, 10.5] {
        odds.extend(quotes_for_line(rng, Metric::Corners, 10.0, line));
    }
    for line in [3.5, 4.5] {
        odds.extend(quotes_for_line(rng, Metric::Cards, 3.8, line));
    }

    FixtureInput::from_rows(
        format!("syn-{index}"),
        Some(LEAGUE_ID),
        (home_id, &home_rows),
        (away_id, &away_rows),
        odds,
        cfg,
    )
}

pub fn slate(seed: u64, count: usize, cfg: &EngineConfig) -> Vec<FixtureInput> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count).map(|i| fixture(&mut rng, i, cfg)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slate_is_reproducible() {
        let cfg = EngineConfig::default();
        let a = slate(7, 3, &cfg);
        let b = slate(7, 3, &cfg);
        assert_eq!(a.len(), 3);
        for (x, y) in a.iter().zip(&b) {
            assert_eq!(x.home, y.home);
            assert_eq!(x.odds, y.odds);
        }
    }

    #[test]
    fn generated_quotes_are_two_way() {
        let mut rng = StdRng::seed_from_u64(1);
        let quotes = quotes_for_line(&mut rng, Metric::Goals, 2.6, 2.5);
        let overs = quotes.iter().filter(|q| q.side == Side::Over).count();
        let unders = quotes.iter().filter(|q| q.side == Side::Under).count();
        assert_eq!(overs, BOOKMAKERS.len());
        assert_eq!(unders, BOOKMAKERS.len());
    }
}
