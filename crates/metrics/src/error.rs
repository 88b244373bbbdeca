use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum MetricsError {
    #[error(
        "Trade {0} has no stop and MAE fallback is disabled: no risk reference for the R:R ratio"
    )]
    MissingRiskReference(Uuid),
}
