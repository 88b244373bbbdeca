//! # Edgewise Pattern Discovery Engine
//!
//! Groups feature records into clusters representing recurring setups and
//! behaviors. Numeric features are z-scored over the training corpus,
//! categorical tags become fixed-order binary indicators, and the corpus is
//! partitioned with seeded k-means. The trained `ClusterModel` stores the
//! normalization parameters alongside the centroids so later records can be
//! mapped into the same space.
//!
//! ## Architectural Principles
//!
//! - **Deterministic training:** all randomness flows through one seeded
//!   `StdRng`; the same corpus, settings, and seed always produce the same
//!   partition.
//! - **Nothing dropped silently:** clusters below the minimum member count
//!   are merged into the catch-all `Unclustered` bucket, and a corpus too
//!   small to cluster degrades to a single catch-all rather than failing.
//! - **Versioned snapshots:** a retrain builds a whole new model and swaps
//!   it into the `ModelStore` atomically. Published models are never
//!   mutated, so in-flight forecasts keep a consistent view.

pub mod error;
pub mod kmeans;
pub mod model;
pub mod store;

pub use error::PatternError;
pub use kmeans::train;
pub use model::{assign, ClusterModel};
pub use store::{CancelToken, ModelStore};
