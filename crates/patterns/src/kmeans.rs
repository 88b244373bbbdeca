use crate::error::PatternError;
use crate::model::{squared_distance, ClusterModel, FeatureLayout, Normalizer};
use crate::store::CancelToken;
use chrono::Utc;
use configuration::ClusteringSettings;
use core_types::{Cluster, ClusterId, FeatureRecord, OutcomeClass};
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Trains a new cluster model over the corpus.
///
/// Numeric features are z-scored over the corpus, tags become fixed-order
/// indicators, and the normalized points are partitioned with k-means
/// (k-means++ initialization from a seeded `StdRng`, Lloyd iterations until
/// assignments stabilize or `max_iterations` is hit). Clusters below
/// `min_members` are merged into the catch-all `Unclustered` bucket. A
/// corpus too small to form any cluster degrades to a single catch-all
/// rather than failing.
///
/// The cancellation token is checked once per sweep; a cancelled run aborts
/// with `PatternError::Cancelled` before any model is committed.
pub fn train(
    corpus: &[FeatureRecord],
    settings: &ClusteringSettings,
    cancel: &CancelToken,
) -> Result<ClusterModel, PatternError> {
    if corpus.is_empty() {
        return Err(PatternError::EmptyCorpus);
    }

    let layout = FeatureLayout::from_corpus(corpus);
    let width = layout.width();
    let n = corpus.len();

    let mut raw = Array2::zeros((n, width));
    for (i, record) in corpus.iter().enumerate() {
        for (j, x) in layout.encode(record).into_iter().enumerate() {
            raw[[i, j]] = x;
        }
    }
    let normalizer = Normalizer::fit(&raw);
    let points = normalizer.transform(&raw);

    // Too small to partition meaningfully: one catch-all bucket, never a failure.
    if n < settings.min_members * 2 {
        warn!(
            corpus = n,
            min_members = settings.min_members,
            "corpus too small to cluster; degrading to a single catch-all bucket"
        );
        let members: Vec<usize> = (0..n).collect();
        return Ok(ClusterModel {
            version: Uuid::new_v4(),
            trained_at: Utc::now(),
            layout,
            normalizer,
            clusters: vec![summarize(ClusterId::Unclustered, Vec::new(), &members, corpus)],
            corpus_size: n,
        });
    }

    let k = settings.max_clusters.min(n / settings.min_members).max(1);
    let mut rng = StdRng::seed_from_u64(settings.seed);

    let mut centroids = init_centroids(&points, k, &mut rng);
    let mut assignments = vec![0usize; n];

    for sweep in 0..settings.max_iterations {
        if cancel.is_cancelled() {
            info!(sweep, "training cancelled before commit");
            return Err(PatternError::Cancelled);
        }

        // Assignment step.
        let mut changed = false;
        for i in 0..n {
            let point = points.row(i);
            let nearest = centroids
                .iter()
                .enumerate()
                .map(|(c, centroid)| (c, squared_distance(point.as_slice().unwrap(), centroid)))
                .min_by(|a, b| a.1.total_cmp(&b.1))
                .map(|(c, _)| c)
                .unwrap_or(0);
            if assignments[i] != nearest {
                assignments[i] = nearest;
                changed = true;
            }
        }
        if !changed && sweep > 0 {
            debug!(sweep, "k-means converged");
            break;
        }

        // Update step. Empty centroids keep their previous position.
        for (c, centroid) in centroids.iter_mut().enumerate() {
            let members: Vec<usize> = (0..n).filter(|&i| assignments[i] == c).collect();
            if members.is_empty() {
                continue;
            }
            for j in 0..width {
                centroid[j] =
                    members.iter().map(|&i| points[[i, j]]).sum::<f64>() / members.len() as f64;
            }
        }
    }

    // Merge undersized clusters into the catch-all bucket and renumber the rest.
    let mut clusters = Vec::new();
    let mut unclustered_members: Vec<usize> = Vec::new();
    let mut next_id = 0usize;
    for (c, centroid) in centroids.into_iter().enumerate() {
        let members: Vec<usize> = (0..n).filter(|&i| assignments[i] == c).collect();
        if members.len() < settings.min_members {
            unclustered_members.extend(members);
            continue;
        }
        clusters.push(summarize(
            ClusterId::Cluster(next_id),
            centroid,
            &members,
            corpus,
        ));
        next_id += 1;
    }
    if !unclustered_members.is_empty() {
        unclustered_members.sort_unstable();
        clusters.push(summarize(
            ClusterId::Unclustered,
            Vec::new(),
            &unclustered_members,
            corpus,
        ));
    }

    info!(
        corpus = n,
        k_requested = k,
        clusters = clusters.len(),
        "trained new cluster model"
    );

    Ok(ClusterModel {
        version: Uuid::new_v4(),
        trained_at: Utc::now(),
        layout,
        normalizer,
        clusters,
        corpus_size: n,
    })
}

/// k-means++ seeding: the first centroid is a uniform draw, each subsequent
/// one is drawn with probability proportional to the squared distance from
/// the nearest centroid chosen so far.
fn init_centroids(points: &Array2<f64>, k: usize, rng: &mut StdRng) -> Vec<Vec<f64>> {
    let n = points.nrows();
    let mut centroids: Vec<Vec<f64>> = Vec::with_capacity(k);

    let first = rng.gen_range(0..n);
    centroids.push(points.row(first).to_vec());

    while centroids.len() < k {
        let distances: Vec<f64> = (0..n)
            .map(|i| {
                let point = points.row(i);
                centroids
                    .iter()
                    .map(|c| squared_distance(point.as_slice().unwrap(), c))
                    .fold(f64::INFINITY, f64::min)
            })
            .collect();
        let total: f64 = distances.iter().sum();
        if total <= 0.0 {
            // All remaining points coincide with a centroid; duplicate one.
            centroids.push(centroids[0].clone());
            continue;
        }
        let mut draw = rng.gen_range(0.0..total);
        let mut chosen = n - 1;
        for (i, d) in distances.iter().enumerate() {
            if draw < *d {
                chosen = i;
                break;
            }
            draw -= d;
        }
        centroids.push(points.row(chosen).to_vec());
    }

    centroids
}

/// Builds the summary statistics of one cluster from its member records only.
fn summarize(
    id: ClusterId,
    centroid: Vec<f64>,
    members: &[usize],
    corpus: &[FeatureRecord],
) -> Cluster {
    let mut wins = 0usize;
    let mut closed = 0usize;
    let mut r_sum = Decimal::ZERO;
    let mut r_count = 0u64;

    for &i in members {
        let record = &corpus[i];
        if let Some(outcome) = record.outcome() {
            closed += 1;
            if outcome == OutcomeClass::Win {
                wins += 1;
            }
        }
        if let Some(r) = record.r_multiple {
            r_sum += r;
            r_count += 1;
        }
    }

    Cluster {
        id,
        centroid,
        members: members.len(),
        win_rate: (closed > 0)
            .then(|| Decimal::from(wins as u64) / Decimal::from(closed as u64)),
        avg_r_multiple: (r_count > 0).then(|| r_sum / Decimal::from(r_count)),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::TimeZone;
    use core_types::{TradeDirection, VolatilityRegime};
    use rust_decimal_macros::dec;
    use std::collections::BTreeSet;

    /// A closed trade entered at the given hour. Winners are calm morning
    /// longs; losers are fomo afternoon trades, so the corpus has two
    /// well-separated setups.
    pub(crate) fn record_at(hour: u32, winner: bool) -> FeatureRecord {
        let entry_time = Utc.with_ymd_and_hms(2025, 6, 2, hour, 0, 0).unwrap();
        let pnl = if winner { dec!(50) } else { dec!(-40) };
        let mut emotion_tags = BTreeSet::new();
        emotion_tags.insert(if winner { "calm" } else { "fomo" }.to_string());

        FeatureRecord {
            trade_id: Uuid::new_v4(),
            account_id: "acct-1".to_string(),
            symbol: "MES".to_string(),
            direction: TradeDirection::Long,
            strategy: None,
            entry_price: dec!(5000),
            entry_time,
            exit_price: Some(dec!(5000) + pnl),
            exit_time: Some(entry_time + chrono::Duration::minutes(20)),
            quantity: dec!(1),
            realized_pnl: Some(pnl),
            stop_price: Some(dec!(4990)),
            target_price: None,
            mfe: Some(pnl.max(dec!(5))),
            mae: Some(pnl.min(dec!(0)).min(dec!(-2))),
            hold_secs: Some(1200),
            risk_per_unit: Some(dec!(10)),
            risk_estimated: false,
            r_multiple: Some(pnl / dec!(10)),
            emotion_tags,
            pattern_tags: BTreeSet::new(),
            volatility_regime: if winner {
                VolatilityRegime::Low
            } else {
                VolatilityRegime::High
            },
            entry_hour: hour,
            entry_weekday: 0,
        }
    }

    pub(crate) fn corpus_of_two_setups() -> Vec<FeatureRecord> {
        let mut corpus = Vec::new();
        for _ in 0..6 {
            corpus.push(record_at(9, true));
            corpus.push(record_at(10, true));
            corpus.push(record_at(14, false));
            corpus.push(record_at(15, false));
        }
        corpus
    }

    fn settings() -> ClusteringSettings {
        ClusteringSettings {
            max_clusters: 2,
            min_members: 3,
            seed: 7,
            max_iterations: 50,
        }
    }

    #[test]
    fn training_is_deterministic_given_a_seed() {
        let corpus = corpus_of_two_setups();
        let a = train(&corpus, &settings(), &CancelToken::default()).unwrap();
        let b = train(&corpus, &settings(), &CancelToken::default()).unwrap();

        assert_eq!(a.clusters.len(), b.clusters.len());
        for (ca, cb) in a.clusters.iter().zip(&b.clusters) {
            assert_eq!(ca.id, cb.id);
            assert_eq!(ca.members, cb.members);
            assert_eq!(ca.centroid, cb.centroid);
        }
    }

    #[test]
    fn two_setups_split_into_two_clusters() {
        let corpus = corpus_of_two_setups();
        let model = train(&corpus, &settings(), &CancelToken::default()).unwrap();

        let real: Vec<_> = model
            .clusters
            .iter()
            .filter(|c| c.id != ClusterId::Unclustered)
            .collect();
        assert_eq!(real.len(), 2);

        // Each setup's records land together.
        let winner_cluster = crate::assign(&record_at(9, true), &model);
        let loser_cluster = crate::assign(&record_at(14, false), &model);
        assert_ne!(winner_cluster, loser_cluster);

        // Summary stats come only from the members.
        let winners = model.cluster(winner_cluster).unwrap();
        assert_eq!(winners.win_rate, Some(dec!(1)));
    }

    #[test]
    fn tiny_corpus_degrades_to_a_single_catch_all() {
        let corpus = vec![record_at(9, true), record_at(14, false)];
        let model = train(&corpus, &settings(), &CancelToken::default()).unwrap();

        assert_eq!(model.clusters.len(), 1);
        assert_eq!(model.clusters[0].id, ClusterId::Unclustered);
        assert_eq!(model.clusters[0].members, 2);
        // No centroid: assignment falls through to the catch-all bucket.
        assert_eq!(crate::assign(&record_at(9, true), &model), ClusterId::Unclustered);
    }

    #[test]
    fn empty_corpus_is_an_error() {
        let err = train(&[], &settings(), &CancelToken::default()).unwrap_err();
        assert!(matches!(err, PatternError::EmptyCorpus));
    }

    #[test]
    fn cancelled_training_commits_nothing() {
        let corpus = corpus_of_two_setups();
        let cancel = CancelToken::default();
        cancel.cancel();
        let err = train(&corpus, &settings(), &cancel).unwrap_err();
        assert!(matches!(err, PatternError::Cancelled));
    }

    #[test]
    fn undersized_clusters_merge_into_the_unclustered_bucket() {
        // One dominant setup plus a single outlier; with min_members = 3 the
        // outlier's cluster cannot stand on its own.
        let mut corpus = Vec::new();
        for _ in 0..8 {
            corpus.push(record_at(9, true));
        }
        corpus.push(record_at(15, false));

        let cfg = ClusteringSettings {
            max_clusters: 2,
            min_members: 3,
            seed: 7,
            max_iterations: 50,
        };
        let model = train(&corpus, &cfg, &CancelToken::default()).unwrap();

        let total_members: usize = model.clusters.iter().map(|c| c.members).sum();
        assert_eq!(total_members, corpus.len());

        if let Some(bucket) = model.cluster(ClusterId::Unclustered) {
            assert!(bucket.members >= 1);
        }
    }
}
