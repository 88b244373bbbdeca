use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;

/// The root configuration structure for the analytics core.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    pub features: FeatureSettings,
    pub metrics: MetricsSettings,
    pub clustering: ClusteringSettings,
    pub forecast: ForecastSettings,
    pub advisor: AdvisorSettings,
}

/// Parameters for the Feature Aggregator.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FeatureSettings {
    /// Mean true range as a fraction of entry price below which the holding
    /// window is classified as a low-volatility regime (e.g. 0.0008).
    pub low_vol_threshold: Decimal,
    /// Threshold above which the window is classified as high volatility.
    pub high_vol_threshold: Decimal,
}

impl Default for FeatureSettings {
    fn default() -> Self {
        Self {
            low_vol_threshold: dec!(0.0008),
            high_vol_threshold: dec!(0.0025),
        }
    }
}

/// How the rolling window selects records. Count-based (last N trades) is the
/// default; time-based (trailing days) is available as a configuration choice.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WindowSettings {
    Count { trades: usize },
    Days { days: i64 },
}

impl Default for WindowSettings {
    fn default() -> Self {
        WindowSettings::Count { trades: 50 }
    }
}

/// Compliance limits evaluated by `compute_rolling_stats`. All limits are
/// expressed as positive magnitudes in account currency / contracts.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ComplianceLimits {
    pub max_daily_loss: Decimal,
    pub max_drawdown: Decimal,
    pub max_position_size: Decimal,
}

impl Default for ComplianceLimits {
    fn default() -> Self {
        Self {
            max_daily_loss: dec!(1000),
            max_drawdown: dec!(2500),
            max_position_size: dec!(10),
        }
    }
}

/// Parameters for the Metrics Calculator.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MetricsSettings {
    pub window: WindowSettings,
    /// Windows holding fewer records than this are marked `insufficient_data`.
    pub min_sample: usize,
    pub limits: ComplianceLimits,
}

impl Default for MetricsSettings {
    fn default() -> Self {
        Self {
            window: WindowSettings::default(),
            min_sample: 10,
            limits: ComplianceLimits::default(),
        }
    }
}

/// Parameters for the Pattern Discovery Engine.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClusteringSettings {
    /// Upper bound on the number of clusters k-means may form.
    pub max_clusters: usize,
    /// Clusters with fewer members than this are merged into the catch-all
    /// unclustered bucket rather than silently dropped.
    pub min_members: usize,
    /// Fixed seed for centroid initialization; training is deterministic
    /// given the same corpus and seed.
    pub seed: u64,
    pub max_iterations: usize,
}

impl Default for ClusteringSettings {
    fn default() -> Self {
        Self {
            max_clusters: 8,
            min_members: 5,
            seed: 42,
            max_iterations: 100,
        }
    }
}

/// Parameters for the Outcome Forecaster.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ForecastSettings {
    /// Half-life in days of the exponential recency weighting.
    pub half_life_days: f64,
    /// Ceiling applied to confidence when the forecast falls back to the
    /// global outcome distribution.
    pub low_confidence_ceiling: f64,
    /// Minimum historical outcomes a cluster must hold before its own
    /// distribution is trusted over the global one.
    pub min_cluster_history: usize,
}

impl Default for ForecastSettings {
    fn default() -> Self {
        Self {
            half_life_days: 30.0,
            low_confidence_ceiling: 0.25,
            min_cluster_history: 5,
        }
    }
}

/// Per-rule configuration for the Recommendation Generator. Thresholds and
/// urgency scores live here so behavior can change without touching rule code.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AdvisorSettings {
    /// Win probability below which a confident forecast argues for skipping.
    pub low_win_probability: f64,
    /// Win probability above which a confident forecast is a supportive note.
    pub strong_win_probability: f64,
    /// Forecast confidence required before probability rules fire.
    pub high_confidence: f64,
    /// Consecutive losses (as a positive number) that trigger a pause.
    pub pause_after_losses: i32,
    pub rules: RuleToggles,
    pub scores: RuleScores,
}

impl Default for AdvisorSettings {
    fn default() -> Self {
        Self {
            low_win_probability: 0.4,
            strong_win_probability: 0.65,
            high_confidence: 0.6,
            pause_after_losses: 3,
            rules: RuleToggles::default(),
            scores: RuleScores::default(),
        }
    }
}

/// Enable/disable switches, one per registered rule.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RuleToggles {
    pub compliance_halt: bool,
    pub low_win_probability: bool,
    pub loss_streak_pause: bool,
    pub negative_expectancy: bool,
    pub strong_setup: bool,
    pub insufficient_data: bool,
}

impl Default for RuleToggles {
    fn default() -> Self {
        Self {
            compliance_halt: true,
            low_win_probability: true,
            loss_streak_pause: true,
            negative_expectancy: true,
            strong_setup: true,
            insufficient_data: true,
        }
    }
}

/// Urgency scores per rule, used for the final descending sort.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RuleScores {
    pub compliance_halt: Decimal,
    pub low_win_probability: Decimal,
    pub loss_streak_pause: Decimal,
    pub negative_expectancy: Decimal,
    pub strong_setup: Decimal,
    pub insufficient_data: Decimal,
}

impl Default for RuleScores {
    fn default() -> Self {
        Self {
            compliance_halt: dec!(100),
            low_win_probability: dec!(70),
            loss_streak_pause: dec!(60),
            negative_expectancy: dec!(40),
            strong_setup: dec!(30),
            insufficient_data: dec!(10),
        }
    }
}
