use crate::error::MetricsError;
use chrono::Duration;
use configuration::{MetricsSettings, WindowSettings};
use core_types::{
    ComplianceFlag, ComplianceRule, FeatureRecord, OutcomeClass, ProfitFactor, RollingStats,
    StatsScope, TradeMetrics,
};
use rust_decimal::Decimal;
use std::collections::BTreeSet;
use tracing::debug;

/// Policy for the risk side of the R:R ratio on trades without a stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiskFallback {
    /// Fail with `MissingRiskReference` when no stop was set.
    Strict,
    /// Use |MAE| as an estimated risk proxy; the result is flagged estimated.
    MaeProxy,
}

/// A stateless calculator for per-trade and rolling-window statistics.
#[derive(Debug, Clone)]
pub struct MetricsEngine {
    settings: MetricsSettings,
}

impl MetricsEngine {
    pub fn new(settings: MetricsSettings) -> Self {
        Self { settings }
    }

    /// Derives the per-trade metrics for one feature record.
    ///
    /// The R:R ratio divides realized reward per contract by the initial
    /// risk per contract. Risk is the stop distance when a stop was set;
    /// otherwise the `fallback` policy decides between the MAE proxy and
    /// `MetricsError::MissingRiskReference`. Open trades carry no ratio and
    /// never error.
    pub fn compute_trade_metrics(
        &self,
        record: &FeatureRecord,
        fallback: RiskFallback,
    ) -> Result<TradeMetrics, MetricsError> {
        let mut metrics = TradeMetrics {
            trade_id: record.trade_id,
            r_r_ratio: None,
            risk_estimated: false,
            r_multiple: record.r_multiple,
            hold_secs: record.hold_secs,
            mfe: record.mfe,
            mae: record.mae,
        };

        if !record.is_closed() {
            return Ok(metrics);
        }

        let stop_distance = record
            .stop_price
            .map(|stop| (record.entry_price - stop).abs())
            .filter(|d| !d.is_zero());

        let (risk, estimated) = match stop_distance {
            Some(d) => (Some(d), false),
            None => match fallback {
                RiskFallback::Strict => {
                    return Err(MetricsError::MissingRiskReference(record.trade_id));
                }
                RiskFallback::MaeProxy => match record.mae {
                    Some(mae) if mae < Decimal::ZERO => (Some(mae.abs()), true),
                    // MAE unknown (degraded features): the ratio stays
                    // undefined rather than guessing.
                    _ => (None, false),
                },
            },
        };

        let reward = record
            .realized_pnl
            .filter(|_| !record.quantity.is_zero())
            .map(|pnl| pnl / record.quantity);

        if let (Some(reward), Some(risk)) = (reward, risk) {
            metrics.r_r_ratio = Some(reward / risk);
            metrics.risk_estimated = estimated;
        }

        Ok(metrics)
    }

    /// Computes rolling statistics over the records matching `scope`.
    ///
    /// Records are processed in execution-time order with trade id as the
    /// deterministic tie-breaker, then trimmed to the configured window
    /// (count-based by default, trailing-days optional). Open trades carry
    /// no realized P&L and are excluded. The result is always derivable from
    /// the inputs; nothing here is authoritative state.
    pub fn compute_rolling_stats(
        &self,
        records: &[FeatureRecord],
        scope: &StatsScope,
    ) -> RollingStats {
        let mut window: Vec<&FeatureRecord> = records
            .iter()
            .filter(|r| r.account_id == scope.account_id)
            .filter(|r| scope.symbol.as_ref().is_none_or(|s| &r.symbol == s))
            .filter(|r| scope.strategy.as_ref().is_none_or(|s| r.strategy.as_ref() == Some(s)))
            .filter(|r| r.is_closed() && r.realized_pnl.is_some())
            .collect();

        window.sort_by_key(|r| (r.execution_time(), r.trade_id));

        match self.settings.window {
            WindowSettings::Count { trades } => {
                if window.len() > trades {
                    window.drain(..window.len() - trades);
                }
            }
            WindowSettings::Days { days } => {
                if let Some(last) = window.last() {
                    let cutoff = last.execution_time() - Duration::days(days);
                    window.retain(|r| r.execution_time() >= cutoff);
                }
            }
        }

        let mut stats = RollingStats::empty(scope.clone());
        if window.is_empty() {
            return stats;
        }

        let limits = &self.settings.limits;
        let mut r_multiples: Vec<Decimal> = Vec::new();
        let mut hold_sum: i64 = 0;
        let mut hold_count: i64 = 0;

        // Drawdown tracking over cumulative realized P&L.
        let mut cumulative = Decimal::ZERO;
        let mut peak = Decimal::ZERO;
        let mut drawdown_flagged = false;

        // Daily-loss tracking, bucketed by UTC exit date.
        let mut daily_pnl = Decimal::ZERO;
        let mut current_day = None;
        let mut breached_days: BTreeSet<chrono::NaiveDate> = BTreeSet::new();

        for record in &window {
            let pnl = record.realized_pnl.unwrap_or_default();

            match record.outcome() {
                Some(OutcomeClass::Win) => {
                    stats.wins += 1;
                    stats.gross_profit += pnl;
                    stats.streak = if stats.streak > 0 { stats.streak + 1 } else { 1 };
                }
                Some(OutcomeClass::Loss) => {
                    stats.losses += 1;
                    stats.gross_loss += pnl.abs();
                    stats.streak = if stats.streak < 0 { stats.streak - 1 } else { -1 };
                }
                // Scratches break both kinds of streak.
                _ => stats.streak = 0,
            }

            if let Some(r) = record.r_multiple {
                r_multiples.push(r);
            }
            if let Some(hold) = record.hold_secs {
                hold_sum += hold;
                hold_count += 1;
            }

            cumulative += pnl;
            if cumulative > peak {
                peak = cumulative;
            }
            let drawdown = peak - cumulative;
            if drawdown > stats.max_drawdown {
                stats.max_drawdown = drawdown;
            }
            if !drawdown_flagged && drawdown > limits.max_drawdown {
                drawdown_flagged = true;
                stats.compliance.push(ComplianceFlag {
                    rule: ComplianceRule::MaxDrawdown,
                    limit: limits.max_drawdown,
                    observed: drawdown,
                    triggered_by: record.trade_id,
                });
            }

            let day = record.execution_time().date_naive();
            if current_day != Some(day) {
                current_day = Some(day);
                daily_pnl = Decimal::ZERO;
            }
            daily_pnl += pnl;
            if daily_pnl < -limits.max_daily_loss && breached_days.insert(day) {
                stats.compliance.push(ComplianceFlag {
                    rule: ComplianceRule::MaxDailyLoss,
                    limit: limits.max_daily_loss,
                    observed: daily_pnl,
                    triggered_by: record.trade_id,
                });
            }

            if record.quantity > limits.max_position_size {
                stats.compliance.push(ComplianceFlag {
                    rule: ComplianceRule::MaxPositionSize,
                    limit: limits.max_position_size,
                    observed: record.quantity,
                    triggered_by: record.trade_id,
                });
            }
        }

        stats.trades = window.len();
        stats.net_pnl = stats.gross_profit - stats.gross_loss;
        stats.win_rate = Some(Decimal::from(stats.wins as u64) / Decimal::from(stats.trades as u64));

        if !r_multiples.is_empty() {
            let sum: Decimal = r_multiples.iter().sum();
            stats.expectancy = Some(sum / Decimal::from(r_multiples.len() as u64));
        }

        stats.profit_factor = profit_factor(stats.gross_profit, stats.gross_loss);

        if hold_count > 0 {
            stats.avg_hold_secs = Some(hold_sum / hold_count);
        }

        stats.insufficient_data = stats.trades < self.settings.min_sample;
        if stats.insufficient_data {
            debug!(
                trades = stats.trades,
                min_sample = self.settings.min_sample,
                "rolling window below minimum sample"
            );
        }

        stats
    }
}

/// Profit factor with its division-by-zero cases made explicit: `Infinite`
/// iff gross loss is zero while gross profit is positive, `Undefined` iff
/// both are zero.
fn profit_factor(gross_profit: Decimal, gross_loss: Decimal) -> ProfitFactor {
    if gross_loss.is_zero() {
        if gross_profit.is_zero() {
            ProfitFactor::Undefined
        } else {
            ProfitFactor::Infinite
        }
    } else {
        ProfitFactor::Finite(gross_profit / gross_loss)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};
    use core_types::{TradeDirection, VolatilityRegime};
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn ts(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, day, hour, 0, 0).unwrap()
    }

    /// A closed 1-lot trade with the given P&L and R-multiple, exiting at
    /// the given day/hour.
    fn rec(pnl: Decimal, r: Decimal, day: u32, hour: u32) -> FeatureRecord {
        FeatureRecord {
            trade_id: Uuid::new_v4(),
            account_id: "acct-1".to_string(),
            symbol: "MES".to_string(),
            direction: TradeDirection::Long,
            strategy: None,
            entry_price: dec!(5000),
            entry_time: ts(day, hour),
            exit_price: Some(dec!(5000) + pnl),
            exit_time: Some(ts(day, hour) + Duration::minutes(30)),
            quantity: dec!(1),
            realized_pnl: Some(pnl),
            stop_price: None,
            target_price: None,
            mfe: Some(pnl.max(Decimal::ZERO)),
            mae: Some(pnl.min(Decimal::ZERO)),
            hold_secs: Some(1800),
            risk_per_unit: Some(dec!(1)),
            risk_estimated: true,
            r_multiple: Some(r),
            emotion_tags: Default::default(),
            pattern_tags: Default::default(),
            volatility_regime: VolatilityRegime::Normal,
            entry_hour: hour,
            entry_weekday: 0,
        }
    }

    fn scope() -> StatsScope {
        StatsScope {
            account_id: "acct-1".to_string(),
            symbol: None,
            strategy: None,
        }
    }

    fn engine() -> MetricsEngine {
        let mut settings = MetricsSettings::default();
        settings.min_sample = 3;
        MetricsEngine::new(settings)
    }

    #[test]
    fn streaks_and_expectancy_match_the_worked_example() {
        // R-multiples [+2, +1, -1, +3, -1] in execution order.
        let records = vec![
            rec(dec!(100), dec!(2), 2, 10),
            rec(dec!(50), dec!(1), 2, 11),
            rec(dec!(-50), dec!(-1), 2, 12),
            rec(dec!(150), dec!(3), 2, 13),
            rec(dec!(-50), dec!(-1), 2, 14),
        ];
        let stats = engine().compute_rolling_stats(&records, &scope());

        // The final trade is a loss breaking the prior win streak.
        assert_eq!(stats.streak, -1);
        // Expectancy = (2 + 1 - 1 + 3 - 1) / 5.
        assert_eq!(stats.expectancy, Some(dec!(0.8)));
        assert_eq!(stats.wins, 3);
        assert_eq!(stats.losses, 2);
        assert!(!stats.insufficient_data);
    }

    #[test]
    fn profit_factor_sentinels() {
        // All winners: gross loss 0, gross profit > 0 -> Infinite.
        let winners = vec![rec(dec!(10), dec!(1), 2, 10), rec(dec!(20), dec!(2), 2, 11)];
        let stats = engine().compute_rolling_stats(&winners, &scope());
        assert_eq!(stats.profit_factor, ProfitFactor::Infinite);

        // Only scratches: both sums zero -> Undefined.
        let scratches = vec![rec(dec!(0), dec!(0), 2, 10)];
        let stats = engine().compute_rolling_stats(&scratches, &scope());
        assert_eq!(stats.profit_factor, ProfitFactor::Undefined);

        // Mixed -> Finite ratio.
        let mixed = vec![rec(dec!(30), dec!(3), 2, 10), rec(dec!(-10), dec!(-1), 2, 11)];
        let stats = engine().compute_rolling_stats(&mixed, &scope());
        assert_eq!(stats.profit_factor, ProfitFactor::Finite(dec!(3)));
    }

    #[test]
    fn reordering_tied_timestamps_leaves_expectancy_and_profit_factor_fixed() {
        // Same-timestamp trades: order sensitivity may only flow through the
        // streak, never through expectancy or profit factor.
        let a = rec(dec!(40), dec!(2), 2, 10);
        let mut b = rec(dec!(-20), dec!(-1), 2, 10);
        b.exit_time = a.exit_time;
        let mut c = rec(dec!(10), dec!(1), 2, 10);
        c.exit_time = a.exit_time;

        let forward = vec![a.clone(), b.clone(), c.clone()];
        let backward = vec![c, b, a];

        let s1 = engine().compute_rolling_stats(&forward, &scope());
        let s2 = engine().compute_rolling_stats(&backward, &scope());
        assert_eq!(s1.expectancy, s2.expectancy);
        assert_eq!(s1.profit_factor, s2.profit_factor);
        // Identical inputs in any order produce identical streaks too, since
        // ties are broken by trade id.
        assert_eq!(s1.streak, s2.streak);
    }

    #[test]
    fn scratch_resets_the_streak() {
        let records = vec![
            rec(dec!(10), dec!(1), 2, 10),
            rec(dec!(10), dec!(1), 2, 11),
            rec(dec!(0), dec!(0), 2, 12),
        ];
        let stats = engine().compute_rolling_stats(&records, &scope());
        assert_eq!(stats.streak, 0);
    }

    #[test]
    fn count_window_keeps_only_the_most_recent_trades() {
        let mut settings = MetricsSettings::default();
        settings.window = WindowSettings::Count { trades: 2 };
        settings.min_sample = 1;
        let engine = MetricsEngine::new(settings);

        let records = vec![
            rec(dec!(-100), dec!(-2), 2, 10),
            rec(dec!(10), dec!(1), 2, 11),
            rec(dec!(20), dec!(1), 2, 12),
        ];
        let stats = engine.compute_rolling_stats(&records, &scope());
        assert_eq!(stats.trades, 2);
        // The early loss fell out of the window.
        assert_eq!(stats.losses, 0);
        assert_eq!(stats.net_pnl, dec!(30));
    }

    #[test]
    fn day_window_drops_stale_trades() {
        let mut settings = MetricsSettings::default();
        settings.window = WindowSettings::Days { days: 3 };
        settings.min_sample = 1;
        let engine = MetricsEngine::new(settings);

        let records = vec![
            rec(dec!(-100), dec!(-2), 2, 10), // 2025-06-02, outside trailing 3 days
            rec(dec!(10), dec!(1), 9, 10),
            rec(dec!(20), dec!(1), 10, 10),
        ];
        let stats = engine.compute_rolling_stats(&records, &scope());
        assert_eq!(stats.trades, 2);
        assert_eq!(stats.losses, 0);
    }

    #[test]
    fn daily_loss_flag_records_the_triggering_trade() {
        let mut settings = MetricsSettings::default();
        settings.limits.max_daily_loss = dec!(100);
        settings.min_sample = 1;
        let engine = MetricsEngine::new(settings);

        let trigger = rec(dec!(-80), dec!(-1), 2, 12);
        let records = vec![
            rec(dec!(-60), dec!(-1), 2, 10),
            rec(dec!(20), dec!(1), 2, 11),
            trigger.clone(),
            rec(dec!(-10), dec!(-1), 2, 13), // deeper, but the day is already flagged
        ];
        let stats = engine.compute_rolling_stats(&records, &scope());

        let flags: Vec<_> = stats
            .compliance
            .iter()
            .filter(|f| f.rule == ComplianceRule::MaxDailyLoss)
            .collect();
        assert_eq!(flags.len(), 1);
        assert_eq!(flags[0].triggered_by, trigger.trade_id);
        assert_eq!(flags[0].observed, dec!(-120));
    }

    #[test]
    fn oversized_position_is_flagged() {
        let mut settings = MetricsSettings::default();
        settings.limits.max_position_size = dec!(2);
        settings.min_sample = 1;
        let engine = MetricsEngine::new(settings);

        let mut big = rec(dec!(10), dec!(1), 2, 10);
        big.quantity = dec!(5);
        let stats = engine.compute_rolling_stats(&[big.clone()], &scope());
        assert_eq!(stats.compliance.len(), 1);
        assert_eq!(stats.compliance[0].rule, ComplianceRule::MaxPositionSize);
        assert_eq!(stats.compliance[0].triggered_by, big.trade_id);
    }

    #[test]
    fn empty_window_is_marked_insufficient() {
        let stats = engine().compute_rolling_stats(&[], &scope());
        assert_eq!(stats.trades, 0);
        assert!(stats.insufficient_data);
        assert_eq!(stats.profit_factor, ProfitFactor::Undefined);
        assert_eq!(stats.win_rate, None);
    }

    #[test]
    fn mae_fallback_ratio_matches_the_worked_example() {
        // No stop, MAE of -1.5 price units, realized reward of +3 units:
        // fallback R:R = 3 / 1.5 = 2.0, flagged as risk-estimated.
        let mut record = rec(dec!(3), dec!(2), 2, 10);
        record.stop_price = None;
        record.mae = Some(dec!(-1.5));
        record.realized_pnl = Some(dec!(3));

        let metrics = engine()
            .compute_trade_metrics(&record, RiskFallback::MaeProxy)
            .unwrap();
        assert_eq!(metrics.r_r_ratio, Some(dec!(2)));
        assert!(metrics.risk_estimated);
    }

    #[test]
    fn strict_fallback_fails_without_a_stop() {
        let record = rec(dec!(3), dec!(2), 2, 10);
        let err = engine()
            .compute_trade_metrics(&record, RiskFallback::Strict)
            .unwrap_err();
        assert!(matches!(err, MetricsError::MissingRiskReference(id) if id == record.trade_id));
    }

    #[test]
    fn stop_based_ratio_is_not_flagged_estimated() {
        let mut record = rec(dec!(10), dec!(2), 2, 10);
        record.stop_price = Some(dec!(4995)); // 5 points of risk
        let metrics = engine()
            .compute_trade_metrics(&record, RiskFallback::Strict)
            .unwrap();
        assert_eq!(metrics.r_r_ratio, Some(dec!(2)));
        assert!(!metrics.risk_estimated);
    }

    #[test]
    fn open_trade_has_no_ratio_and_no_error() {
        let mut record = rec(dec!(0), dec!(0), 2, 10);
        record.exit_time = None;
        record.exit_price = None;
        record.realized_pnl = None;
        let metrics = engine()
            .compute_trade_metrics(&record, RiskFallback::Strict)
            .unwrap();
        assert_eq!(metrics.r_r_ratio, None);
    }

    #[test]
    fn out_of_scope_records_are_ignored() {
        let mut other_account = rec(dec!(500), dec!(5), 2, 10);
        other_account.account_id = "acct-2".to_string();
        let records = vec![other_account, rec(dec!(10), dec!(1), 2, 11)];
        let stats = engine().compute_rolling_stats(&records, &scope());
        assert_eq!(stats.trades, 1);
        assert_eq!(stats.net_pnl, dec!(10));
    }
}
