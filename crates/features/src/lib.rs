//! # Edgewise Feature Aggregator
//!
//! This crate is the validated boundary between upstream glue code and the
//! analytics core. It joins a `Trade` with its optional `JournalEntry` and
//! the `MarketBar` window spanning its holding period, and produces one
//! immutable `FeatureRecord` per trade: MFE/MAE excursions, initial risk,
//! R-multiple, volatility regime, and the journal tag vector.
//!
//! ## Architectural Principles
//!
//! - **Pure function of its inputs:** no I/O, no hidden state. The caller
//!   supplies the trade, the journal entry, and the bars; the aggregator
//!   computes.
//! - **Reject at the boundary:** malformed records (non-positive prices,
//!   exit before entry, mismatched journal links) are rejected here with
//!   `FeatureError::MalformedTrade` rather than propagated downstream as
//!   ambiguous values.
//! - **Degradation is the caller's call:** missing market data fails with
//!   `InsufficientMarketData`; the caller may retry with a wider window or
//!   explicitly accept degraded features via `aggregate_degraded`.

pub mod aggregator;
pub mod error;
pub mod tagger;

pub use aggregator::FeatureAggregator;
pub use error::FeatureError;
pub use tagger::{KeywordTagger, Tagger};
