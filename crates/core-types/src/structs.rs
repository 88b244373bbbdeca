use crate::enums::{
    ClusterId, ComplianceRule, OutcomeClass, ProfitFactor, TradeDirection, Urgency,
    VolatilityRegime,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

/// A single executed trade as delivered by the broker-history collaborator.
///
/// Trades are immutable once ingested and identified by a stable unique id.
/// `exit_price`, `exit_time` and `realized_pnl` are `None` while the trade is
/// still open.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub id: Uuid,
    pub account_id: String,
    pub symbol: String,
    pub direction: TradeDirection,
    pub entry_price: Decimal,
    pub entry_time: DateTime<Utc>,
    pub exit_price: Option<Decimal>,
    pub exit_time: Option<DateTime<Utc>>,
    pub quantity: Decimal,
    pub realized_pnl: Option<Decimal>,
    pub stop_price: Option<Decimal>,
    pub target_price: Option<Decimal>,
    pub strategy: Option<String>,
}

impl Trade {
    pub fn is_closed(&self) -> bool {
        self.exit_time.is_some() && self.exit_price.is_some()
    }

    /// Realized P&L per contract, signed by direction, derived from prices
    /// when the broker did not supply an explicit P&L figure.
    pub fn pnl_per_unit(&self) -> Option<Decimal> {
        if let (Some(pnl), true) = (self.realized_pnl, !self.quantity.is_zero()) {
            return Some(pnl / self.quantity);
        }
        let exit = self.exit_price?;
        Some(self.direction.sign() * (exit - self.entry_price))
    }

    /// Distance from entry to the protective stop, when one was set.
    pub fn stop_distance(&self) -> Option<Decimal> {
        self.stop_price.map(|stop| (self.entry_price - stop).abs())
    }
}

/// A free-text journal note with structured tags from the NLP collaborator.
///
/// Zero-or-one-to-one with `Trade`; `trade_id` is `None` for standalone
/// session notes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub id: Uuid,
    pub trade_id: Option<Uuid>,
    pub timestamp: DateTime<Utc>,
    pub text: String,
    pub emotion_tags: BTreeSet<String>,
    pub pattern_tags: BTreeSet<String>,
}

/// One OHLCV bar of read-only reference market data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketBar {
    pub symbol: String,
    pub timestamp: DateTime<Utc>,
    /// Bar duration in seconds (e.g. 60 for 1-minute bars).
    pub timeframe_secs: u32,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
}

/// Emotion and pattern tags attached to journal text by a `Tagger`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagSet {
    pub emotion_tags: BTreeSet<String>,
    pub pattern_tags: BTreeSet<String>,
}

/// The immutable per-trade feature record produced by the Feature Aggregator.
///
/// This is the single input type every downstream engine consumes. Excursions
/// are signed by trade direction: `mfe` is the best favorable move and is
/// always >= 0, `mae` is the worst adverse move and is always <= 0. Both are
/// `None` when market data did not cover the holding window and the caller
/// accepted degraded aggregation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRecord {
    pub trade_id: Uuid,
    pub account_id: String,
    pub symbol: String,
    pub direction: TradeDirection,
    pub strategy: Option<String>,
    pub entry_price: Decimal,
    pub entry_time: DateTime<Utc>,
    pub exit_price: Option<Decimal>,
    pub exit_time: Option<DateTime<Utc>>,
    pub quantity: Decimal,
    pub realized_pnl: Option<Decimal>,
    pub stop_price: Option<Decimal>,
    pub target_price: Option<Decimal>,

    /// Maximum favorable excursion per contract, in price units, >= 0.
    pub mfe: Option<Decimal>,
    /// Maximum adverse excursion per contract, in price units, <= 0.
    pub mae: Option<Decimal>,
    /// Holding time in seconds; `None` for open trades.
    pub hold_secs: Option<i64>,
    /// Initial risk per contract: stop distance when a stop was set,
    /// otherwise |MAE| as an estimated proxy.
    pub risk_per_unit: Option<Decimal>,
    /// True when `risk_per_unit` came from the MAE proxy rather than a stop.
    pub risk_estimated: bool,
    /// Realized P&L expressed as a multiple of the initial risk.
    pub r_multiple: Option<Decimal>,

    pub emotion_tags: BTreeSet<String>,
    pub pattern_tags: BTreeSet<String>,
    pub volatility_regime: VolatilityRegime,
    pub entry_hour: u32,
    pub entry_weekday: u32,
}

impl FeatureRecord {
    pub fn is_closed(&self) -> bool {
        self.exit_time.is_some()
    }

    /// Outcome class of a closed trade; `None` while the trade is open.
    pub fn outcome(&self) -> Option<OutcomeClass> {
        let pnl = self.realized_pnl?;
        if pnl > Decimal::ZERO {
            Some(OutcomeClass::Win)
        } else if pnl < Decimal::ZERO {
            Some(OutcomeClass::Loss)
        } else {
            Some(OutcomeClass::Scratch)
        }
    }

    /// Time used to order records for rolling statistics: exit time for
    /// closed trades, entry time otherwise.
    pub fn execution_time(&self) -> DateTime<Utc> {
        self.exit_time.unwrap_or(self.entry_time)
    }
}

/// Per-trade derived metrics returned by `compute_trade_metrics`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeMetrics {
    pub trade_id: Uuid,
    /// Reward-to-risk ratio; `None` when the trade is still open.
    pub r_r_ratio: Option<Decimal>,
    /// True when the risk side of the ratio came from the MAE proxy.
    pub risk_estimated: bool,
    pub r_multiple: Option<Decimal>,
    pub hold_secs: Option<i64>,
    pub mfe: Option<Decimal>,
    pub mae: Option<Decimal>,
}

/// The account/symbol/strategy slice a rolling window is computed over.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsScope {
    pub account_id: String,
    /// Restrict to one instrument; `None` means all symbols in the account.
    pub symbol: Option<String>,
    /// Restrict to one strategy label; `None` means all.
    pub strategy: Option<String>,
}

/// A compliance limit breach, with the record that tripped it for audit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceFlag {
    pub rule: ComplianceRule,
    pub limit: Decimal,
    pub observed: Decimal,
    pub triggered_by: Uuid,
}

/// Aggregate statistics over an ordered window of feature records.
///
/// Always derivable from the underlying records; never authoritative state.
/// `streak` is signed: positive counts consecutive wins, negative counts
/// consecutive losses, zero after a scratch or an empty window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RollingStats {
    pub scope: StatsScope,
    pub trades: usize,
    pub wins: usize,
    pub losses: usize,
    pub win_rate: Option<Decimal>,
    /// Mean R-multiple over the window, when any trade carried one.
    pub expectancy: Option<Decimal>,
    pub profit_factor: ProfitFactor,
    pub gross_profit: Decimal,
    pub gross_loss: Decimal,
    pub net_pnl: Decimal,
    pub max_drawdown: Decimal,
    pub streak: i32,
    pub avg_hold_secs: Option<i64>,
    pub compliance: Vec<ComplianceFlag>,
    /// Set when the window holds fewer records than the configured minimum;
    /// consumers must not issue prescriptive guidance off such a window.
    pub insufficient_data: bool,
}

impl RollingStats {
    /// Creates a zeroed-out stats block for the given scope, used as the
    /// starting point before accumulation (and as the empty-window result).
    pub fn empty(scope: StatsScope) -> Self {
        Self {
            scope,
            trades: 0,
            wins: 0,
            losses: 0,
            win_rate: None,
            expectancy: None,
            profit_factor: ProfitFactor::Undefined,
            gross_profit: Decimal::ZERO,
            gross_loss: Decimal::ZERO,
            net_pnl: Decimal::ZERO,
            max_drawdown: Decimal::ZERO,
            streak: 0,
            avg_hold_secs: None,
            compliance: Vec::new(),
            insufficient_data: true,
        }
    }
}

/// Summary of one learned cluster: its centroid in the normalized feature
/// space and performance statistics computed only from its members.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cluster {
    pub id: ClusterId,
    /// Centroid in the model's normalized feature space. Empty for the
    /// catch-all `Unclustered` bucket, which has no representative point.
    pub centroid: Vec<f64>,
    pub members: usize,
    pub win_rate: Option<Decimal>,
    pub avg_r_multiple: Option<Decimal>,
}

/// Outcome forecast for an open or hypothetical trade.
///
/// Never an error: when the matched cluster is too thin the distribution
/// falls back to the global history and `degraded` is set, with confidence
/// capped at the configured low ceiling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    pub cluster_id: ClusterId,
    pub win_probability: f64,
    pub expected_r: f64,
    pub expected_hold_secs: f64,
    pub outcome_probs: Vec<(OutcomeClass, f64)>,
    /// In [0, 1]; increases with sample size, decreases with outcome variance.
    pub confidence: f64,
    /// Number of historical outcomes the distribution was estimated from.
    pub sample_size: usize,
    pub degraded: bool,
}

/// A piece of supporting evidence attached to a recommendation, referencing
/// the metric, cluster, forecast, or compliance flag that justified it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Evidence {
    Metric { name: String, value: String },
    Cluster { id: ClusterId, win_rate: Option<Decimal> },
    Forecast { win_probability: f64, confidence: f64 },
    Compliance { rule: ComplianceRule, triggered_by: Uuid },
}

/// One prescriptive action produced by the Recommendation Generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub action: String,
    pub rationale: String,
    pub urgency: Urgency,
    /// Numeric urgency used for ordering; higher sorts first.
    pub score: Decimal,
    pub evidence: Vec<Evidence>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn trade(direction: TradeDirection, entry: Decimal, exit: Decimal) -> Trade {
        Trade {
            id: Uuid::new_v4(),
            account_id: "acct-1".to_string(),
            symbol: "MES".to_string(),
            direction,
            entry_price: entry,
            entry_time: Utc::now(),
            exit_price: Some(exit),
            exit_time: Some(Utc::now()),
            quantity: dec!(2),
            realized_pnl: None,
            stop_price: None,
            target_price: None,
            strategy: None,
        }
    }

    #[test]
    fn pnl_per_unit_is_signed_by_direction() {
        let long = trade(TradeDirection::Long, dec!(5000), dec!(5010));
        assert_eq!(long.pnl_per_unit(), Some(dec!(10)));

        let short = trade(TradeDirection::Short, dec!(5000), dec!(5010));
        assert_eq!(short.pnl_per_unit(), Some(dec!(-10)));
    }

    #[test]
    fn explicit_pnl_takes_precedence_over_prices() {
        let mut t = trade(TradeDirection::Long, dec!(5000), dec!(5010));
        t.realized_pnl = Some(dec!(25));
        // 25 over 2 contracts
        assert_eq!(t.pnl_per_unit(), Some(dec!(12.5)));
    }

    #[test]
    fn stop_distance_is_absolute() {
        let mut t = trade(TradeDirection::Short, dec!(5000), dec!(4990));
        t.stop_price = Some(dec!(5012.5));
        assert_eq!(t.stop_distance(), Some(dec!(12.5)));
    }
}
