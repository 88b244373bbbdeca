use crate::error::PatternError;
use crate::model::ClusterModel;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use tracing::info;
use uuid::Uuid;

/// Caller-supplied cancellation signal for a training run.
///
/// Cloneable and cheap to share across threads; training checks it once per
/// sweep and aborts before committing a new model version, leaving whatever
/// was published before untouched.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

/// Holds the "current" cluster model as an immutable, versioned snapshot.
///
/// Readers take an `Arc` to one consistent version and keep it for the whole
/// query; `publish` swaps the current pointer atomically, so in-flight
/// forecasts never observe a half-updated model. There is no process-wide
/// singleton; each scope owns its store.
#[derive(Debug, Default)]
pub struct ModelStore {
    current: RwLock<Option<Arc<ClusterModel>>>,
}

impl ModelStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publishes a freshly trained model as the current version and returns
    /// the shared handle. Previously returned handles stay valid.
    pub fn publish(&self, model: ClusterModel) -> Arc<ClusterModel> {
        let model = Arc::new(model);
        let mut guard = self
            .current
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let previous = guard.replace(Arc::clone(&model));
        info!(
            version = %model.version,
            replaced = previous.as_ref().map(|m| m.version.to_string()),
            "published cluster model"
        );
        model
    }

    /// The current model snapshot. Fails with `ModelNotTrained` when no
    /// model was ever published, a usage error rather than a retryable
    /// condition.
    pub fn current(&self) -> Result<Arc<ClusterModel>, PatternError> {
        self.current
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
            .ok_or(PatternError::ModelNotTrained)
    }

    /// Assigns a record against the current model version in one step.
    pub fn assign_current(
        &self,
        record: &core_types::FeatureRecord,
    ) -> Result<core_types::ClusterId, PatternError> {
        let model = self.current()?;
        Ok(crate::model::assign(record, &model))
    }

    pub fn version(&self) -> Option<Uuid> {
        self.current
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .as_ref()
            .map(|m| m.version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kmeans::tests::corpus_of_two_setups;
    use configuration::ClusteringSettings;

    fn trained() -> ClusterModel {
        let corpus = corpus_of_two_setups();
        let settings = ClusteringSettings {
            max_clusters: 2,
            min_members: 3,
            seed: 7,
            max_iterations: 50,
        };
        crate::train(&corpus, &settings, &CancelToken::default()).unwrap()
    }

    #[test]
    fn unpublished_store_reports_model_not_trained() {
        let store = ModelStore::new();
        assert!(matches!(
            store.current(),
            Err(PatternError::ModelNotTrained)
        ));
        let probe = &corpus_of_two_setups()[0];
        assert!(matches!(
            store.assign_current(probe),
            Err(PatternError::ModelNotTrained)
        ));
        assert_eq!(store.version(), None);
    }

    #[test]
    fn assign_current_matches_direct_assignment() {
        let store = ModelStore::new();
        let model = store.publish(trained());
        let probe = &corpus_of_two_setups()[0];
        assert_eq!(
            store.assign_current(probe).unwrap(),
            crate::assign(probe, &model)
        );
    }

    #[test]
    fn publish_swaps_without_mutating_prior_versions() {
        let store = ModelStore::new();
        let first = store.publish(trained());
        let first_snapshot = store.current().unwrap();
        assert_eq!(first_snapshot.version, first.version);

        // Keep a reader handle across a retrain, as an in-flight forecast would.
        let in_flight = store.current().unwrap();
        let in_flight_clusters = in_flight.clusters.clone();

        let second = store.publish(trained());
        assert_ne!(first.version, second.version);
        assert_eq!(store.version(), Some(second.version));

        // The old handle still sees exactly the model it started with.
        assert_eq!(in_flight.version, first.version);
        assert_eq!(in_flight.clusters, in_flight_clusters);
    }

    #[test]
    fn cancel_token_flips_once_for_all_clones() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }
}
