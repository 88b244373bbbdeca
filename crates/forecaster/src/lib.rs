//! # Edgewise Outcome Forecaster
//!
//! Estimates the likely outcome distribution of a new or open trade from the
//! historical members of its matched cluster. The forecaster never fails: a
//! record landing in the catch-all bucket, or in a cluster with too little
//! history, falls back to the global outcome distribution with confidence
//! capped at a configured low ceiling: a best-effort estimate with an
//! honest reliability signal, not an error.
//!
//! Recent trades count for more than old ones: member outcomes are weighted
//! by an exponential decay with a configurable half-life.

use chrono::{DateTime, Utc};
use configuration::ForecastSettings;
use core_types::{ClusterId, FeatureRecord, Forecast, OutcomeClass};
use patterns::{assign, ClusterModel};
use rust_decimal::prelude::ToPrimitive;
use tracing::debug;

/// Half-saturation point of the sample-size term in the confidence score:
/// eight effective observations yield confidence 0.5 before the variance
/// damping is applied.
const CONFIDENCE_HALF_SATURATION: f64 = 8.0;

#[derive(Debug, Clone)]
pub struct Forecaster {
    settings: ForecastSettings,
}

impl Forecaster {
    pub fn new(settings: ForecastSettings) -> Self {
        Self { settings }
    }

    /// Forecasts the outcome distribution for `record` against one model
    /// snapshot and the historical records supplied by the caller.
    ///
    /// Confidence increases with the effective sample size and decreases
    /// with the outcome variance inside the matched cluster. When the
    /// distribution had to fall back to global history, `degraded` is set
    /// and confidence is capped at the configured ceiling.
    pub fn forecast(
        &self,
        record: &FeatureRecord,
        model: &ClusterModel,
        history: &[FeatureRecord],
    ) -> Forecast {
        let cluster_id = assign(record, model);
        let anchor = record.entry_time;

        let closed: Vec<&FeatureRecord> = history
            .iter()
            .filter(|r| r.is_closed() && r.outcome().is_some())
            .collect();

        let members: Vec<&FeatureRecord> = closed
            .iter()
            .copied()
            .filter(|r| assign(r, model) == cluster_id)
            .collect();

        let thin = cluster_id == ClusterId::Unclustered
            || members.len() < self.settings.min_cluster_history;

        let (pool, degraded) = if thin {
            debug!(
                %cluster_id,
                members = members.len(),
                "falling back to the global outcome distribution"
            );
            (closed, true)
        } else {
            (members, false)
        };

        let mut forecast = self.estimate(cluster_id, anchor, &pool);
        // `estimate` may itself have degraded (empty or fully decayed pool);
        // the thin-cluster fallback only adds to that, never clears it.
        if degraded {
            forecast.degraded = true;
            forecast.confidence = forecast
                .confidence
                .min(self.settings.low_confidence_ceiling);
        }
        forecast
    }

    /// Empirical, recency-weighted outcome distribution over a pool of
    /// closed records.
    fn estimate(
        &self,
        cluster_id: ClusterId,
        anchor: DateTime<Utc>,
        pool: &[&FeatureRecord],
    ) -> Forecast {
        if pool.is_empty() {
            return uniform_prior(cluster_id, 0);
        }

        let half_life_secs = self.settings.half_life_days * 86_400.0;

        let mut weight_sum = 0.0;
        let mut weight_sq_sum = 0.0;
        let mut class_weights = [0.0f64; 3]; // win, loss, scratch

        let mut r_weight_sum = 0.0;
        let mut r_mean_num = 0.0;
        let mut hold_weight_sum = 0.0;
        let mut hold_num = 0.0;

        let mut weighted: Vec<(f64, Option<f64>)> = Vec::with_capacity(pool.len());

        for record in pool {
            let age_secs = (anchor - record.execution_time()).num_seconds().max(0) as f64;
            let weight = 0.5f64.powf(age_secs / half_life_secs);

            weight_sum += weight;
            weight_sq_sum += weight * weight;

            match record.outcome() {
                Some(OutcomeClass::Win) => class_weights[0] += weight,
                Some(OutcomeClass::Loss) => class_weights[1] += weight,
                _ => class_weights[2] += weight,
            }

            let r = record.r_multiple.and_then(|r| r.to_f64());
            if let Some(r) = r {
                r_weight_sum += weight;
                r_mean_num += weight * r;
            }
            if let Some(hold) = record.hold_secs {
                hold_weight_sum += weight;
                hold_num += weight * hold as f64;
            }
            weighted.push((weight, r));
        }

        // With a short half-life and old history, every weight can underflow
        // to zero; dividing by that sum would turn the whole distribution
        // into NaN. Such a pool carries no usable information, same as an
        // empty one.
        if weight_sum <= 0.0 || !weight_sum.is_finite() {
            debug!(pool = pool.len(), "recency weights fully decayed");
            return uniform_prior(cluster_id, pool.len());
        }

        let win_probability = class_weights[0] / weight_sum;
        let expected_r = if r_weight_sum > 0.0 {
            r_mean_num / r_weight_sum
        } else {
            0.0
        };
        let expected_hold_secs = if hold_weight_sum > 0.0 {
            hold_num / hold_weight_sum
        } else {
            0.0
        };

        // Weighted R-multiple variance inside the pool.
        let variance = if r_weight_sum > 0.0 {
            weighted
                .iter()
                .filter_map(|(w, r)| r.map(|r| w * (r - expected_r) * (r - expected_r)))
                .sum::<f64>()
                / r_weight_sum
        } else {
            0.0
        };

        // Effective sample size under the recency weights; equals the plain
        // count when all weights are equal.
        let n_eff = weight_sum * weight_sum / weight_sq_sum;
        let confidence =
            (n_eff / (n_eff + CONFIDENCE_HALF_SATURATION)) * (1.0 / (1.0 + variance));

        Forecast {
            cluster_id,
            win_probability,
            expected_r,
            expected_hold_secs,
            outcome_probs: vec![
                (OutcomeClass::Win, class_weights[0] / weight_sum),
                (OutcomeClass::Loss, class_weights[1] / weight_sum),
                (OutcomeClass::Scratch, class_weights[2] / weight_sum),
            ],
            confidence: confidence.clamp(0.0, 1.0),
            sample_size: pool.len(),
            degraded: false,
        }
    }
}

/// Uniform outcome prior with zero confidence, used whenever the pool holds
/// no usable information (empty, or all recency weights decayed to zero).
fn uniform_prior(cluster_id: ClusterId, sample_size: usize) -> Forecast {
    Forecast {
        cluster_id,
        win_probability: 1.0 / 3.0,
        expected_r: 0.0,
        expected_hold_secs: 0.0,
        outcome_probs: vec![
            (OutcomeClass::Win, 1.0 / 3.0),
            (OutcomeClass::Loss, 1.0 / 3.0),
            (OutcomeClass::Scratch, 1.0 / 3.0),
        ],
        confidence: 0.0,
        sample_size,
        degraded: true,
    }
}
