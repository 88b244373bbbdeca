//! # Edgewise Recommendation Generator
//!
//! Turns current rolling statistics, the matched cluster's history, the
//! outcome forecast, and compliance state into a ranked list of prescriptive
//! actions. Rules are evaluated independently (no rule short-circuits
//! another) and every threshold, enablement switch, and urgency score comes
//! from configuration, so behavior changes without touching this crate.
//!
//! Ordering is deterministic: descending urgency score, ties broken by rule
//! registration order.

use configuration::AdvisorSettings;
use core_types::{
    ComplianceRule, Evidence, Forecast, Recommendation, RollingStats, Urgency,
};
use rust_decimal::Decimal;
use tracing::debug;

pub mod rules;

use rules::RuleKind;

/// Everything the advisor looks at for one query: the trader's rolling
/// window (with its compliance flags) and the forecast for the contemplated
/// trade, if one was computed.
#[derive(Debug, Clone)]
pub struct AdvisorContext<'a> {
    pub stats: &'a RollingStats,
    pub forecast: Option<&'a Forecast>,
}

#[derive(Debug, Clone)]
pub struct Advisor {
    settings: AdvisorSettings,
}

impl Advisor {
    pub fn new(settings: AdvisorSettings) -> Self {
        Self { settings }
    }

    /// Evaluates every registered rule against the context and returns the
    /// resulting recommendations ordered by descending urgency score.
    ///
    /// The sort is stable, so rules firing with equal scores keep their
    /// registration order.
    pub fn recommend(&self, ctx: &AdvisorContext<'_>) -> Vec<Recommendation> {
        let mut out: Vec<Recommendation> = Vec::new();

        for kind in RuleKind::REGISTRATION_ORDER {
            if !kind.enabled(&self.settings) {
                continue;
            }
            let fired = kind.evaluate(ctx, &self.settings);
            if !fired.is_empty() {
                debug!(rule = ?kind, count = fired.len(), "rule fired");
            }
            out.extend(fired);
        }

        out.sort_by(|a, b| b.score.cmp(&a.score));
        out
    }
}

/// Shorthand used by the rule implementations.
fn recommendation(
    action: &str,
    rationale: String,
    urgency: Urgency,
    score: Decimal,
    evidence: Vec<Evidence>,
) -> Recommendation {
    Recommendation {
        action: action.to_string(),
        rationale,
        urgency,
        score,
        evidence,
    }
}

pub(crate) fn compliance_action(rule: ComplianceRule) -> &'static str {
    match rule {
        ComplianceRule::MaxDailyLoss => "Stop trading for the day",
        ComplianceRule::MaxDrawdown => "Flatten and step back until drawdown recovers",
        ComplianceRule::MaxPositionSize => "Cut position size back inside the limit",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_types::{ClusterId, ComplianceFlag, OutcomeClass, ProfitFactor, StatsScope};
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn stats() -> RollingStats {
        RollingStats {
            scope: StatsScope {
                account_id: "acct-1".to_string(),
                symbol: None,
                strategy: None,
            },
            trades: 30,
            wins: 18,
            losses: 12,
            win_rate: Some(dec!(0.6)),
            expectancy: Some(dec!(0.4)),
            profit_factor: ProfitFactor::Finite(dec!(1.8)),
            gross_profit: dec!(5400),
            gross_loss: dec!(3000),
            net_pnl: dec!(2400),
            max_drawdown: dec!(600),
            streak: 2,
            avg_hold_secs: Some(1500),
            compliance: Vec::new(),
            insufficient_data: false,
        }
    }

    fn forecast(win_probability: f64, confidence: f64) -> Forecast {
        Forecast {
            cluster_id: ClusterId::Cluster(0),
            win_probability,
            expected_r: 0.5,
            expected_hold_secs: 1500.0,
            outcome_probs: vec![
                (OutcomeClass::Win, win_probability),
                (OutcomeClass::Loss, 1.0 - win_probability),
                (OutcomeClass::Scratch, 0.0),
            ],
            confidence,
            sample_size: 25,
            degraded: false,
        }
    }

    fn advisor() -> Advisor {
        Advisor::new(AdvisorSettings::default())
    }

    #[test]
    fn healthy_context_yields_no_warnings() {
        let stats = stats();
        let fc = forecast(0.55, 0.7);
        let recs = advisor().recommend(&AdvisorContext {
            stats: &stats,
            forecast: Some(&fc),
        });
        assert!(recs.iter().all(|r| r.urgency < Urgency::Warning));
    }

    #[test]
    fn compliance_breach_outranks_everything() {
        let mut stats = stats();
        stats.streak = -5;
        stats.compliance.push(ComplianceFlag {
            rule: ComplianceRule::MaxDailyLoss,
            limit: dec!(1000),
            observed: dec!(-1200),
            triggered_by: Uuid::new_v4(),
        });
        let fc = forecast(0.2, 0.9);
        let recs = advisor().recommend(&AdvisorContext {
            stats: &stats,
            forecast: Some(&fc),
        });

        assert!(recs.len() >= 3);
        assert_eq!(recs[0].urgency, Urgency::Critical);
        assert_eq!(recs[0].action, "Stop trading for the day");
        // Independent evaluation: the probability and streak rules fired too.
        assert!(recs.iter().any(|r| r.action.contains("Reduce size or skip")));
        assert!(recs.iter().any(|r| r.action.contains("Pause")));
    }

    #[test]
    fn low_win_probability_requires_confidence() {
        let stats = stats();
        let unsure = forecast(0.2, 0.3);
        let recs = advisor().recommend(&AdvisorContext {
            stats: &stats,
            forecast: Some(&unsure),
        });
        assert!(!recs.iter().any(|r| r.action.contains("Reduce size or skip")));

        let confident = forecast(0.2, 0.9);
        let recs = advisor().recommend(&AdvisorContext {
            stats: &stats,
            forecast: Some(&confident),
        });
        assert!(recs.iter().any(|r| r.action.contains("Reduce size or skip")));
    }

    #[test]
    fn insufficient_data_blocks_prescriptive_guidance() {
        let mut stats = stats();
        stats.insufficient_data = true;
        stats.expectancy = Some(dec!(-2)); // would normally fire the expectancy rule
        let recs = advisor().recommend(&AdvisorContext {
            stats: &stats,
            forecast: None,
        });

        assert!(recs.iter().any(|r| r.action.contains("Collect more trades")));
        assert!(!recs.iter().any(|r| r.action.contains("Review strategy")));
    }

    #[test]
    fn undefined_expectancy_never_produces_a_review_call() {
        let mut stats = stats();
        stats.expectancy = None;
        let recs = advisor().recommend(&AdvisorContext {
            stats: &stats,
            forecast: None,
        });
        assert!(!recs.iter().any(|r| r.action.contains("Review strategy")));
    }

    #[test]
    fn ordering_is_by_descending_score_with_stable_ties() {
        let mut stats = stats();
        stats.streak = -4;
        let fc = forecast(0.2, 0.9);
        let recs = advisor().recommend(&AdvisorContext {
            stats: &stats,
            forecast: Some(&fc),
        });
        for pair in recs.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
    }

    #[test]
    fn disabled_rules_never_fire() {
        let mut settings = AdvisorSettings::default();
        settings.rules.loss_streak_pause = false;
        let mut stats = stats();
        stats.streak = -10;
        let recs = Advisor::new(settings).recommend(&AdvisorContext {
            stats: &stats,
            forecast: None,
        });
        assert!(!recs.iter().any(|r| r.action.contains("Pause")));
    }

    #[test]
    fn strong_setup_is_supportive_not_prescriptive() {
        let stats = stats();
        let fc = forecast(0.8, 0.9);
        let recs = advisor().recommend(&AdvisorContext {
            stats: &stats,
            forecast: Some(&fc),
        });
        let strong = recs
            .iter()
            .find(|r| r.action.contains("plan"))
            .expect("strong-setup note fires");
        assert_eq!(strong.urgency, Urgency::Advisory);
    }
}
