use crate::error::FeatureError;
use chrono::{DateTime, Datelike, Duration, Timelike, Utc};
use configuration::FeatureSettings;
use core_types::{FeatureRecord, JournalEntry, MarketBar, Trade, VolatilityRegime};
use rust_decimal::Decimal;
use tracing::debug;

/// Signed excursion summary of a holding window, plus its volatility regime.
struct WindowProfile {
    mfe: Decimal,
    mae: Decimal,
    regime: VolatilityRegime,
}

/// A stateless joiner that turns a `Trade` + optional `JournalEntry` + market
/// bars into a single immutable `FeatureRecord`.
#[derive(Debug, Clone)]
pub struct FeatureAggregator {
    settings: FeatureSettings,
}

impl FeatureAggregator {
    pub fn new(settings: FeatureSettings) -> Self {
        Self { settings }
    }

    /// Produces the feature record for one trade.
    ///
    /// The holding window is `[entry_time, exit_time]` for closed trades and
    /// `[entry_time, window_end)` for open ones, where `window_end` is
    /// supplied by the caller (typically "now"). Fails with
    /// `InsufficientMarketData` when no bar overlaps the window; the caller
    /// decides whether to retry with a wider window or accept degraded
    /// features via [`aggregate_degraded`](Self::aggregate_degraded).
    pub fn aggregate(
        &self,
        trade: &Trade,
        journal: Option<&JournalEntry>,
        bars: &[MarketBar],
        window_end: DateTime<Utc>,
    ) -> Result<FeatureRecord, FeatureError> {
        validate(trade, journal)?;

        let end = trade.exit_time.unwrap_or(window_end);
        let in_window: Vec<&MarketBar> = bars
            .iter()
            .filter(|b| b.symbol == trade.symbol && overlaps(b, trade.entry_time, end))
            .collect();

        if in_window.is_empty() {
            return Err(FeatureError::InsufficientMarketData {
                symbol: trade.symbol.clone(),
                start: trade.entry_time,
                end,
            });
        }

        let profile = self.profile_window(trade, &in_window);
        Ok(build_record(trade, journal, Some(profile)))
    }

    /// Degraded aggregation path for callers that accepted missing market
    /// data: MFE/MAE are unknown, the volatility regime defaults to `Normal`,
    /// and risk falls back to the stop distance alone.
    pub fn aggregate_degraded(
        &self,
        trade: &Trade,
        journal: Option<&JournalEntry>,
    ) -> Result<FeatureRecord, FeatureError> {
        validate(trade, journal)?;
        Ok(build_record(trade, journal, None))
    }

    /// Computes signed excursions and the volatility regime over the bars
    /// covering the holding window.
    fn profile_window(&self, trade: &Trade, bars: &[&MarketBar]) -> WindowProfile {
        let sign = trade.direction.sign();
        let entry = trade.entry_price;

        let mut mfe = Decimal::ZERO;
        let mut mae = Decimal::ZERO;
        let mut range_sum = Decimal::ZERO;

        for bar in bars {
            // Favor-signed excursions of this bar's extremes relative to entry.
            let at_high = sign * (bar.high - entry);
            let at_low = sign * (bar.low - entry);
            let best = at_high.max(at_low);
            let worst = at_high.min(at_low);

            if best > mfe {
                mfe = best;
            }
            if worst < mae {
                mae = worst;
            }
            range_sum += bar.high - bar.low;
        }

        if let Some(stop) = trade.stop_distance() {
            if mae.abs() > stop {
                // Price traded through the stop level; keep the measured
                // excursion but leave a trace for the audit trail.
                debug!(trade_id = %trade.id, %mae, %stop, "MAE exceeds stop distance");
            }
        }

        let mean_range = range_sum / Decimal::from(bars.len());
        let relative_range = if entry.is_zero() {
            Decimal::ZERO
        } else {
            mean_range / entry
        };
        let regime = if relative_range < self.settings.low_vol_threshold {
            VolatilityRegime::Low
        } else if relative_range > self.settings.high_vol_threshold {
            VolatilityRegime::High
        } else {
            VolatilityRegime::Normal
        };

        WindowProfile { mfe, mae, regime }
    }
}

/// True when a bar's time span intersects `[start, end]`.
fn overlaps(bar: &MarketBar, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
    let bar_end = bar.timestamp + Duration::seconds(i64::from(bar.timeframe_secs));
    bar.timestamp <= end && bar_end >= start
}

/// Boundary validation: loosely-typed upstream records are rejected here
/// rather than propagated downstream with ambiguous values.
fn validate(trade: &Trade, journal: Option<&JournalEntry>) -> Result<(), FeatureError> {
    let malformed = |reason: &str| FeatureError::MalformedTrade {
        trade_id: trade.id,
        reason: reason.to_string(),
    };

    if trade.entry_price <= Decimal::ZERO {
        return Err(malformed("entry price must be positive"));
    }
    if trade.quantity <= Decimal::ZERO {
        return Err(malformed("quantity must be positive"));
    }
    if let Some(exit_price) = trade.exit_price {
        if exit_price <= Decimal::ZERO {
            return Err(malformed("exit price must be positive"));
        }
    }
    if let Some(exit_time) = trade.exit_time {
        if exit_time < trade.entry_time {
            return Err(malformed("exit time precedes entry time"));
        }
    }
    if trade.exit_price.is_some() != trade.exit_time.is_some() {
        return Err(malformed("exit price and exit time must be set together"));
    }
    if let Some(j) = journal {
        if j.trade_id.is_some_and(|id| id != trade.id) {
            return Err(malformed("journal entry is linked to a different trade"));
        }
    }
    Ok(())
}

fn build_record(
    trade: &Trade,
    journal: Option<&JournalEntry>,
    profile: Option<WindowProfile>,
) -> FeatureRecord {
    let (mfe, mae, regime) = match profile {
        Some(p) => (Some(p.mfe), Some(p.mae), p.regime),
        None => (None, None, VolatilityRegime::Normal),
    };

    // Initial risk per contract: the stop distance when a stop was set,
    // otherwise |MAE| as an estimated proxy.
    let (risk_per_unit, risk_estimated) = match trade.stop_distance() {
        Some(stop) if stop > Decimal::ZERO => (Some(stop), false),
        _ => match mae {
            Some(m) if m < Decimal::ZERO => (Some(m.abs()), true),
            _ => (None, false),
        },
    };

    let r_multiple = match (trade.pnl_per_unit(), risk_per_unit) {
        (Some(pnl), Some(risk)) if trade.is_closed() && !risk.is_zero() => Some(pnl / risk),
        _ => None,
    };

    let hold_secs = trade
        .exit_time
        .map(|exit| (exit - trade.entry_time).num_seconds());

    let realized_pnl = if trade.is_closed() {
        trade
            .realized_pnl
            .or_else(|| trade.pnl_per_unit().map(|p| p * trade.quantity))
    } else {
        None
    };

    FeatureRecord {
        trade_id: trade.id,
        account_id: trade.account_id.clone(),
        symbol: trade.symbol.clone(),
        direction: trade.direction,
        strategy: trade.strategy.clone(),
        entry_price: trade.entry_price,
        entry_time: trade.entry_time,
        exit_price: trade.exit_price,
        exit_time: trade.exit_time,
        quantity: trade.quantity,
        realized_pnl,
        stop_price: trade.stop_price,
        target_price: trade.target_price,
        mfe,
        mae,
        hold_secs,
        risk_per_unit,
        risk_estimated,
        r_multiple,
        emotion_tags: journal.map(|j| j.emotion_tags.clone()).unwrap_or_default(),
        pattern_tags: journal.map(|j| j.pattern_tags.clone()).unwrap_or_default(),
        volatility_regime: regime,
        entry_hour: trade.entry_time.hour(),
        entry_weekday: trade.entry_time.weekday().num_days_from_monday(),
    }
}
