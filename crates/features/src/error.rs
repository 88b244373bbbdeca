use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum FeatureError {
    #[error("No market bars cover the holding window for {symbol} ({start} .. {end})")]
    InsufficientMarketData {
        symbol: String,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    #[error("Malformed trade {trade_id}: {reason}")]
    MalformedTrade { trade_id: Uuid, reason: String },
}
