use chrono::{DateTime, Utc};
use core_types::{Cluster, ClusterId, FeatureRecord, VolatilityRegime};
use ndarray::Array2;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::f64::consts::PI;
use uuid::Uuid;

/// Number of numeric features ahead of the tag indicator block.
const BASE_FEATURES: usize = 11;

/// Fixed-order mapping from a `FeatureRecord` to its raw feature vector.
///
/// The tag vocabularies are frozen at training time (sorted, deduplicated)
/// so the same layout maps later records into the same space. Tags unseen
/// during training simply contribute nothing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureLayout {
    pub emotion_vocab: Vec<String>,
    pub pattern_vocab: Vec<String>,
}

impl FeatureLayout {
    /// Builds the layout from a training corpus.
    pub fn from_corpus(corpus: &[FeatureRecord]) -> Self {
        let mut emotions: BTreeSet<&str> = BTreeSet::new();
        let mut patterns: BTreeSet<&str> = BTreeSet::new();
        for record in corpus {
            emotions.extend(record.emotion_tags.iter().map(String::as_str));
            patterns.extend(record.pattern_tags.iter().map(String::as_str));
        }
        Self {
            emotion_vocab: emotions.into_iter().map(str::to_string).collect(),
            pattern_vocab: patterns.into_iter().map(str::to_string).collect(),
        }
    }

    pub fn width(&self) -> usize {
        BASE_FEATURES + self.emotion_vocab.len() + self.pattern_vocab.len()
    }

    /// Encodes one record as a raw (un-normalized) feature vector.
    pub fn encode(&self, record: &FeatureRecord) -> Vec<f64> {
        let mut v = Vec::with_capacity(self.width());

        // Cyclical time-of-day and day-of-week encoding.
        let hour = f64::from(record.entry_hour);
        v.push((hour * PI / 12.0).sin());
        v.push((hour * PI / 12.0).cos());
        let day = f64::from(record.entry_weekday);
        v.push((day * 2.0 * PI / 7.0).sin());
        v.push((day * 2.0 * PI / 7.0).cos());

        let entry = record.entry_price.to_f64().unwrap_or(0.0);
        let rel = |d: rust_decimal::Decimal| {
            if entry == 0.0 {
                0.0
            } else {
                d.to_f64().unwrap_or(0.0) / entry
            }
        };

        v.push(record.r_multiple.map(|r| r.to_f64().unwrap_or(0.0)).unwrap_or(0.0));
        v.push(record.mfe.map(rel).unwrap_or(0.0));
        v.push(record.mae.map(rel).unwrap_or(0.0));
        // Log-compressed hold time in minutes; long swings and quick scalps
        // should not be separated by raw seconds.
        v.push((1.0 + record.hold_secs.unwrap_or(0).max(0) as f64 / 60.0).ln());
        v.push(match record.direction {
            core_types::TradeDirection::Long => 1.0,
            core_types::TradeDirection::Short => 0.0,
        });
        v.push(f64::from(record.volatility_regime == VolatilityRegime::Low));
        v.push(f64::from(record.volatility_regime == VolatilityRegime::High));

        for tag in &self.emotion_vocab {
            v.push(f64::from(record.emotion_tags.contains(tag)));
        }
        for tag in &self.pattern_vocab {
            v.push(f64::from(record.pattern_tags.contains(tag)));
        }

        v
    }
}

/// Per-feature z-score parameters fitted over the training corpus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Normalizer {
    pub means: Vec<f64>,
    pub stds: Vec<f64>,
}

impl Normalizer {
    pub fn fit(data: &Array2<f64>) -> Self {
        let (n_samples, n_features) = data.dim();
        let mut means = vec![0.0; n_features];
        let mut stds = vec![0.0; n_features];

        for j in 0..n_features {
            let mut sum = 0.0;
            for i in 0..n_samples {
                sum += data[[i, j]];
            }
            means[j] = sum / n_samples as f64;
        }

        for j in 0..n_features {
            let mut sum_sq = 0.0;
            for i in 0..n_samples {
                let diff = data[[i, j]] - means[j];
                sum_sq += diff * diff;
            }
            stds[j] = (sum_sq / n_samples as f64).sqrt();
            // Constant features must not blow up the transform.
            if stds[j] < 1e-10 {
                stds[j] = 1.0;
            }
        }

        Self { means, stds }
    }

    pub fn transform_row(&self, row: &[f64]) -> Vec<f64> {
        row.iter()
            .enumerate()
            .map(|(j, &x)| (x - self.means[j]) / self.stds[j])
            .collect()
    }

    pub fn transform(&self, data: &Array2<f64>) -> Array2<f64> {
        let (n_samples, n_features) = data.dim();
        let mut out = Array2::zeros((n_samples, n_features));
        for i in 0..n_samples {
            for j in 0..n_features {
                out[[i, j]] = (data[[i, j]] - self.means[j]) / self.stds[j];
            }
        }
        out
    }
}

/// An immutable, versioned snapshot of one training run.
///
/// Stores everything needed to map a later feature record into the trained
/// space: the tag vocabularies, the z-score parameters, and the centroids.
/// Published models are never mutated; a retrain produces a new version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterModel {
    pub version: Uuid,
    pub trained_at: DateTime<Utc>,
    pub layout: FeatureLayout,
    pub normalizer: Normalizer,
    pub clusters: Vec<Cluster>,
    /// Number of records the model was trained on.
    pub corpus_size: usize,
}

impl ClusterModel {
    /// The cluster summary for a given id, when present in this version.
    pub fn cluster(&self, id: ClusterId) -> Option<&Cluster> {
        self.clusters.iter().find(|c| c.id == id)
    }
}

/// Nearest-centroid assignment in the model's normalized feature space.
///
/// Idempotent: the same record against the same model version always yields
/// the same cluster id. Returns `Unclustered` when the model holds no real
/// centroid (catch-all-only models), which is a valid result, not an error.
pub fn assign(record: &FeatureRecord, model: &ClusterModel) -> ClusterId {
    let raw = model.layout.encode(record);
    let point = model.normalizer.transform_row(&raw);

    let mut best: Option<(ClusterId, f64)> = None;
    for cluster in &model.clusters {
        if cluster.centroid.is_empty() {
            continue; // the catch-all bucket has no representative point
        }
        let dist = squared_distance(&point, &cluster.centroid);
        if best.is_none_or(|(_, d)| dist < d) {
            best = Some((cluster.id, dist));
        }
    }

    best.map(|(id, _)| id).unwrap_or(ClusterId::Unclustered)
}

pub(crate) fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}
