use thiserror::Error;

#[derive(Error, Debug)]
pub enum PatternError {
    #[error("No cluster model has been trained yet")]
    ModelNotTrained,

    #[error("Training corpus is empty")]
    EmptyCorpus,

    #[error("Training was cancelled before a model was committed")]
    Cancelled,
}
