//! Deterministic sample-corpus generator for the `demo` subcommand.
//!
//! Produces a trading month that contains learnable structure: calm morning
//! breakout trades that mostly win, and fomo-driven afternoon chop trades
//! that mostly lose, plus minute bars spanning each holding window. The same
//! seed always yields the same corpus.

use chrono::{DateTime, Duration, TimeZone, Utc};
use core_types::{JournalEntry, MarketBar, Trade, TradeDirection};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::BTreeSet;
use uuid::Uuid;

pub const ACCOUNT: &str = "sim-account-1";
const SYMBOL: &str = "MES";

pub struct SampleCorpus {
    pub trades: Vec<Trade>,
    pub journals: Vec<JournalEntry>,
    pub bars: Vec<MarketBar>,
}

/// Journal phrasings per setup; the keyword tagger picks up the vocabulary.
const MORNING_NOTES: &[&str] = &[
    "Clean breakout over the opening range, felt calm and followed the plan.",
    "Patient entry on the retest, confident in the setup.",
    "Breakout with volume, stayed calm and let it run.",
];
const AFTERNOON_NOTES: &[&str] = &[
    "Chased the move late, total fomo entry into chop.",
    "Revenge traded after the morning, angry and oversized.",
    "Choppy range, overtrading out of boredom, anxious the whole time.",
];

/// Generates `count` closed trades (plus journals and bars) from the seed.
pub fn generate(count: usize, seed: u64) -> SampleCorpus {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut trades = Vec::with_capacity(count);
    let mut journals = Vec::new();
    let mut bars = Vec::new();

    for i in 0..count {
        let day = i / 4;
        let slot = i % 4;
        // Four slots a day: two morning, two afternoon; weekends skipped.
        let date_offset = (day / 5) * 7 + day % 5;
        let hour = [9, 10, 14, 15][slot];
        // Entry inside the first ten minutes of the slot; together with the
        // hold cap below this keeps every holding window inside its own
        // hour, so no two trades ever emit bars at the same timestamp.
        let entry_time = Utc
            .with_ymd_and_hms(2025, 5, 5, hour, 0, 0)
            .unwrap()
            + Duration::days(date_offset as i64)
            + Duration::minutes(rng.gen_range(0..10));

        let morning = slot < 2;
        let win = if morning {
            rng.gen_bool(0.72)
        } else {
            rng.gen_bool(0.35)
        };

        let entry_price = dec!(5000) + Decimal::new(rng.gen_range(-2000..2000), 2);
        let risk = Decimal::new(rng.gen_range(600..1200), 2); // 6 to 12 points
        let direction = if rng.gen_bool(0.7) {
            TradeDirection::Long
        } else {
            TradeDirection::Short
        };

        // Winners run 1x to 3x their risk; losers give back up to ~1.2x.
        let move_per_unit = if win {
            risk * Decimal::new(rng.gen_range(100..300), 2)
        } else {
            -risk * Decimal::new(rng.gen_range(50..120), 2)
        };
        let exit_price = entry_price + direction.sign() * move_per_unit;
        let hold_minutes = rng.gen_range(10..45);
        let exit_time = entry_time + Duration::minutes(hold_minutes);
        let quantity = Decimal::from(rng.gen_range(1..4));

        let stop_price = if morning {
            Some(entry_price - direction.sign() * risk)
        } else {
            // Afternoon tilt trades often go in without a stop.
            rng.gen_bool(0.4)
                .then(|| entry_price - direction.sign() * risk)
        };

        let trade = Trade {
            id: Uuid::new_v4(),
            account_id: ACCOUNT.to_string(),
            symbol: SYMBOL.to_string(),
            direction,
            entry_price,
            entry_time,
            exit_price: Some(exit_price),
            exit_time: Some(exit_time),
            quantity,
            realized_pnl: Some(move_per_unit * quantity),
            stop_price,
            target_price: None,
            strategy: Some(if morning { "orb" } else { "scalp" }.to_string()),
        };

        bars.extend(bars_for(&trade, move_per_unit, risk, &mut rng));

        // Roughly three quarters of trades get a journal note.
        if rng.gen_bool(0.75) {
            let notes = if morning { MORNING_NOTES } else { AFTERNOON_NOTES };
            journals.push(JournalEntry {
                id: Uuid::new_v4(),
                trade_id: Some(trade.id),
                timestamp: exit_time + Duration::minutes(5),
                text: notes[rng.gen_range(0..notes.len())].to_string(),
                emotion_tags: BTreeSet::new(),
                pattern_tags: BTreeSet::new(),
            });
        }

        trades.push(trade);
    }

    SampleCorpus {
        trades,
        journals,
        bars,
    }
}

/// Minute bars spanning one holding window, shaped so the excursions are
/// consistent with the trade's outcome: an adverse dip early, the favorable
/// run later.
fn bars_for(
    trade: &Trade,
    move_per_unit: Decimal,
    risk: Decimal,
    rng: &mut StdRng,
) -> Vec<MarketBar> {
    let entry = trade.entry_price;
    let sign = trade.direction.sign();
    let exit_time = trade.exit_time.expect("sample trades are closed");
    let minutes = ((exit_time - trade.entry_time).num_minutes().max(3)) as usize;

    let adverse = risk * Decimal::new(rng.gen_range(20..80), 2); // partial stop test
    let favorable = if move_per_unit > Decimal::ZERO {
        move_per_unit + risk * Decimal::new(rng.gen_range(5..30), 2)
    } else {
        risk * Decimal::new(rng.gen_range(10..50), 2)
    };

    let mut out = Vec::with_capacity(minutes);
    for m in 0..minutes {
        let timestamp = trade.entry_time + Duration::minutes(m as i64);
        let phase = m as f64 / minutes as f64;
        // Early bars carry the adverse excursion, later bars the favorable one.
        let (up, down) = if phase < 0.4 {
            (favorable * dec!(0.2), adverse)
        } else {
            (favorable, adverse * dec!(0.3))
        };
        // Translate favor-signed excursions back into price space.
        let (high_off, low_off) = match trade.direction {
            TradeDirection::Long => (up, -down),
            TradeDirection::Short => (down, -up),
        };
        let high = entry + high_off;
        let low = entry + low_off;
        let close = entry + sign * move_per_unit * Decimal::new((phase * 100.0) as i64, 2);
        out.push(MarketBar {
            symbol: trade.symbol.clone(),
            timestamp,
            timeframe_secs: 60,
            open: close,
            high,
            low,
            close,
            volume: Decimal::from(rng.gen_range(50..500)),
        });
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bars_never_duplicate_a_timestamp() {
        let corpus = generate(120, 7);
        let mut seen = BTreeSet::new();
        for bar in &corpus.bars {
            assert!(
                seen.insert((bar.symbol.clone(), bar.timestamp)),
                "duplicate bar at {} for {}",
                bar.timestamp,
                bar.symbol
            );
        }
    }

    #[test]
    fn holding_windows_never_overlap() {
        let corpus = generate(120, 7);
        let mut spans: Vec<_> = corpus
            .trades
            .iter()
            .map(|t| (t.entry_time, t.exit_time.unwrap()))
            .collect();
        spans.sort();
        for pair in spans.windows(2) {
            // Strictly apart, so one trade's bars can never fall inside
            // another trade's window.
            assert!(pair[0].1 + Duration::minutes(1) < pair[1].0);
        }
    }

    #[test]
    fn generation_is_deterministic_per_seed() {
        let a = generate(40, 3);
        let b = generate(40, 3);
        assert_eq!(a.trades.len(), b.trades.len());
        for (ta, tb) in a.trades.iter().zip(&b.trades) {
            assert_eq!(ta.entry_time, tb.entry_time);
            assert_eq!(ta.entry_price, tb.entry_price);
            assert_eq!(ta.realized_pnl, tb.realized_pnl);
        }
        assert_eq!(a.bars.len(), b.bars.len());
    }
}
