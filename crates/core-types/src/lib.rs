//! # Edgewise Core Types
//!
//! This crate is Layer 0 of the system: the shared vocabulary of domain types
//! that every other crate speaks. It holds the immutable input records
//! (`Trade`, `JournalEntry`, `MarketBar`), the derived analytical records
//! (`FeatureRecord`, `TradeMetrics`, `RollingStats`), the learned-pattern
//! types (`Cluster`, `Forecast`), and the prescriptive output
//! (`Recommendation`).
//!
//! ## Architectural Principles
//!
//! - **No behavior, no I/O:** this crate defines data, a few cheap helper
//!   methods, and nothing else. All computation lives in the engine crates.
//! - **Explicit sentinels over NaN:** undefined numeric results are modeled
//!   with `Option` or dedicated enums (`ProfitFactor::Undefined`), never with
//!   floating-point NaN that could leak into downstream recommendations.

pub mod enums;
pub mod structs;

// Re-export the core types to provide a clean public API.
pub use enums::{
    ClusterId, ComplianceRule, OutcomeClass, ProfitFactor, TradeDirection, Urgency,
    VolatilityRegime,
};
pub use structs::{
    Cluster, ComplianceFlag, Evidence, FeatureRecord, Forecast, JournalEntry, MarketBar,
    Recommendation, RollingStats, StatsScope, TagSet, Trade, TradeMetrics,
};
