use crate::{compliance_action, recommendation, AdvisorContext};
use configuration::AdvisorSettings;
use core_types::{Evidence, Recommendation, Urgency};
use rust_decimal::Decimal;

/// The fixed set of registered rules. Evaluation order is
/// [`REGISTRATION_ORDER`](Self::REGISTRATION_ORDER); thresholds, switches,
/// and scores all come from `AdvisorSettings`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
    ComplianceHalt,
    LowWinProbability,
    LossStreakPause,
    NegativeExpectancy,
    StrongSetup,
    InsufficientData,
}

impl RuleKind {
    /// Registration order; the tie-breaker for equal urgency scores.
    pub const REGISTRATION_ORDER: [RuleKind; 6] = [
        RuleKind::ComplianceHalt,
        RuleKind::LowWinProbability,
        RuleKind::LossStreakPause,
        RuleKind::NegativeExpectancy,
        RuleKind::StrongSetup,
        RuleKind::InsufficientData,
    ];

    pub fn enabled(&self, settings: &AdvisorSettings) -> bool {
        let toggles = &settings.rules;
        match self {
            RuleKind::ComplianceHalt => toggles.compliance_halt,
            RuleKind::LowWinProbability => toggles.low_win_probability,
            RuleKind::LossStreakPause => toggles.loss_streak_pause,
            RuleKind::NegativeExpectancy => toggles.negative_expectancy,
            RuleKind::StrongSetup => toggles.strong_setup,
            RuleKind::InsufficientData => toggles.insufficient_data,
        }
    }

    /// Evaluates this rule against the context. Each rule is independent and
    /// may contribute zero or more recommendations.
    pub fn evaluate(
        &self,
        ctx: &AdvisorContext<'_>,
        settings: &AdvisorSettings,
    ) -> Vec<Recommendation> {
        match self {
            RuleKind::ComplianceHalt => compliance_halt(ctx, settings),
            RuleKind::LowWinProbability => low_win_probability(ctx, settings),
            RuleKind::LossStreakPause => loss_streak_pause(ctx, settings),
            RuleKind::NegativeExpectancy => negative_expectancy(ctx, settings),
            RuleKind::StrongSetup => strong_setup(ctx, settings),
            RuleKind::InsufficientData => insufficient_data(ctx, settings),
        }
    }
}

/// Any breached compliance limit is a hard stop, one recommendation per flag.
fn compliance_halt(ctx: &AdvisorContext<'_>, settings: &AdvisorSettings) -> Vec<Recommendation> {
    ctx.stats
        .compliance
        .iter()
        .map(|flag| {
            recommendation(
                compliance_action(flag.rule),
                format!(
                    "{} limit of {} breached (observed {})",
                    flag.rule, flag.limit, flag.observed
                ),
                Urgency::Critical,
                settings.scores.compliance_halt,
                vec![Evidence::Compliance {
                    rule: flag.rule,
                    triggered_by: flag.triggered_by,
                }],
            )
        })
        .collect()
}

/// A confident forecast with a poor win probability argues against the trade.
fn low_win_probability(
    ctx: &AdvisorContext<'_>,
    settings: &AdvisorSettings,
) -> Vec<Recommendation> {
    let Some(fc) = ctx.forecast else {
        return Vec::new();
    };
    if fc.confidence < settings.high_confidence
        || fc.win_probability >= settings.low_win_probability
    {
        return Vec::new();
    }
    vec![recommendation(
        "Reduce size or skip this setup",
        format!(
            "historical analogues win only {:.0}% of the time (confidence {:.2})",
            fc.win_probability * 100.0,
            fc.confidence
        ),
        Urgency::Warning,
        settings.scores.low_win_probability,
        vec![
            Evidence::Forecast {
                win_probability: fc.win_probability,
                confidence: fc.confidence,
            },
            Evidence::Cluster {
                id: fc.cluster_id,
                win_rate: None,
            },
        ],
    )]
}

/// A losing streak beyond the configured depth calls for a break.
fn loss_streak_pause(
    ctx: &AdvisorContext<'_>,
    settings: &AdvisorSettings,
) -> Vec<Recommendation> {
    if ctx.stats.streak > -settings.pause_after_losses {
        return Vec::new();
    }
    vec![recommendation(
        "Pause and review before the next trade",
        format!("{} consecutive losses in the current window", -ctx.stats.streak),
        Urgency::Warning,
        settings.scores.loss_streak_pause,
        vec![Evidence::Metric {
            name: "streak".to_string(),
            value: ctx.stats.streak.to_string(),
        }],
    )]
}

/// Sustained negative expectancy over a full window is a strategy problem,
/// not a trade problem. Suppressed on thin windows: prescriptive guidance
/// must never rest on an undefined or under-sampled metric.
fn negative_expectancy(
    ctx: &AdvisorContext<'_>,
    settings: &AdvisorSettings,
) -> Vec<Recommendation> {
    if ctx.stats.insufficient_data {
        return Vec::new();
    }
    let Some(expectancy) = ctx.stats.expectancy else {
        return Vec::new();
    };
    if expectancy >= Decimal::ZERO {
        return Vec::new();
    }
    vec![recommendation(
        "Review strategy: expectancy is negative over the window",
        format!("mean R-multiple is {} across {} trades", expectancy, ctx.stats.trades),
        Urgency::Advisory,
        settings.scores.negative_expectancy,
        vec![Evidence::Metric {
            name: "expectancy".to_string(),
            value: expectancy.to_string(),
        }],
    )]
}

/// A confident, favorable forecast with a clean compliance slate earns a
/// supportive note.
fn strong_setup(ctx: &AdvisorContext<'_>, settings: &AdvisorSettings) -> Vec<Recommendation> {
    let Some(fc) = ctx.forecast else {
        return Vec::new();
    };
    if fc.confidence < settings.high_confidence
        || fc.win_probability < settings.strong_win_probability
        || !ctx.stats.compliance.is_empty()
        || ctx.stats.insufficient_data
    {
        return Vec::new();
    }
    vec![recommendation(
        "Setup matches a favorable pattern; proceed with the plan",
        format!(
            "matched {} wins {:.0}% of the time historically",
            fc.cluster_id,
            fc.win_probability * 100.0
        ),
        Urgency::Advisory,
        settings.scores.strong_setup,
        vec![Evidence::Forecast {
            win_probability: fc.win_probability,
            confidence: fc.confidence,
        }],
    )]
}

/// Thin windows and degraded forecasts get an explicit marker instead of
/// silence, so the caller can see why prescriptive rules stayed quiet.
fn insufficient_data(
    ctx: &AdvisorContext<'_>,
    settings: &AdvisorSettings,
) -> Vec<Recommendation> {
    let thin_stats = ctx.stats.insufficient_data;
    let degraded_forecast = ctx.forecast.is_some_and(|fc| fc.degraded);
    if !thin_stats && !degraded_forecast {
        return Vec::new();
    }
    let mut reasons = Vec::new();
    if thin_stats {
        reasons.push(format!("window holds only {} trades", ctx.stats.trades));
    }
    if degraded_forecast {
        reasons.push("forecast fell back to the global distribution".to_string());
    }
    vec![recommendation(
        "Collect more trades before acting on these numbers",
        reasons.join("; "),
        Urgency::Info,
        settings.scores.insufficient_data,
        vec![Evidence::Metric {
            name: "trades_in_window".to_string(),
            value: ctx.stats.trades.to_string(),
        }],
    )]
}
