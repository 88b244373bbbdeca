//! # Edgewise Metrics Calculator
//!
//! A stateless calculator that derives per-trade and rolling-window
//! statistics from feature records: R:R ratios, hold times, win rate,
//! expectancy, profit factor, signed streaks, drawdown, and compliance flags.
//!
//! ## Architectural Principles
//!
//! - **Determinism:** given the same ordered input, output is bit-for-bit
//!   reproducible. Records are ordered by execution time with trade id as
//!   the tie-breaker, and all money math uses `Decimal`.
//! - **Sentinels over NaN:** undefined results are explicit
//!   (`ProfitFactor::Undefined`, `Option` metrics, `insufficient_data`),
//!   never silent division-by-zero or NaN.

pub mod engine;
pub mod error;

pub use engine::{MetricsEngine, RiskFallback};
pub use error::MetricsError;
