use thiserror::Error;

#[derive(Error, Debug)]
pub enum DecompositionError {
    #[error("Mixing parameter p must lie in [0, 1], got {0}")]
    InvalidMixingParameter(f64),

    #[error("Total weighted indicator is zero for attributes {attributes:?}")]
    DegenerateIndicator { attributes: Vec<String> },

    #[error("Population has no individuals for attributes {attributes:?}")]
    EmptyPopulation { attributes: Vec<String> },

    #[error("Missing column: {0}")]
    MissingColumn(String),

    #[error("Too many attributes: {count} requested, limit is {limit}")]
    TooManyAttributes { count: usize, limit: usize },

    #[error("Unknown generator: {0}")]
    UnknownGenerator(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Polars error: {0}")]
    Polars(String),
}

impl From<polars::error::PolarsError> for DecompositionError {
    fn from(err: polars::error::PolarsError) -> Self {
        DecompositionError::Polars(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, DecompositionError>;
