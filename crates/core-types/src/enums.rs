use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeDirection {
    Long,
    Short,
}

impl TradeDirection {
    /// Returns the sign used to convert raw price excursion into
    /// trade-favorable excursion (+1 for longs, -1 for shorts).
    pub fn sign(&self) -> Decimal {
        match self {
            TradeDirection::Long => dec!(1),
            TradeDirection::Short => dec!(-1),
        }
    }
}

/// Volatility classification of the market-bar window a trade was held over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VolatilityRegime {
    Low,
    Normal,
    High,
}

/// Outcome class of a closed trade, keyed off realized P&L.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OutcomeClass {
    Win,
    Loss,
    /// Flat outcome: realized P&L of exactly zero.
    Scratch,
}

/// Identity of a learned cluster within one model version.
///
/// `Unclustered` is a first-class bucket, not an error: records that land in
/// groups smaller than the configured minimum are merged here rather than
/// silently dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClusterId {
    Cluster(usize),
    Unclustered,
}

impl fmt::Display for ClusterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClusterId::Cluster(n) => write!(f, "cluster-{}", n),
            ClusterId::Unclustered => write!(f, "unclustered"),
        }
    }
}

/// Profit factor with the division-by-zero cases made explicit.
///
/// `Infinite` means gross loss was zero while gross profit was positive;
/// `Undefined` means there was neither profit nor loss in the window.
/// Downstream consumers must match on this rather than dividing blindly.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ProfitFactor {
    Finite(Decimal),
    Infinite,
    Undefined,
}

impl fmt::Display for ProfitFactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProfitFactor::Finite(v) => write!(f, "{}", v.round_dp(2)),
            ProfitFactor::Infinite => write!(f, "inf"),
            ProfitFactor::Undefined => write!(f, "n/a"),
        }
    }
}

/// The compliance limit that a flag was raised against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComplianceRule {
    MaxDailyLoss,
    MaxDrawdown,
    MaxPositionSize,
}

impl fmt::Display for ComplianceRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComplianceRule::MaxDailyLoss => write!(f, "max daily loss"),
            ComplianceRule::MaxDrawdown => write!(f, "max drawdown"),
            ComplianceRule::MaxPositionSize => write!(f, "max position size"),
        }
    }
}

/// Urgency band attached to a recommendation. Ordering matters: `Critical`
/// compares greater than `Warning`, and so on down to `Info`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Urgency {
    Info,
    Advisory,
    Warning,
    Critical,
}
