use thiserror::Error;

/// Failures the engine reports to its caller. Input problems are caught
/// during ingestion, before any aggregation runs; there is no partial
/// result.
#[derive(Error, Debug)]
pub enum RfvError {
    #[error("missing required column: {0}")]
    MissingColumn(String),
    #[error("row {row}: cannot parse {value:?} as a purchase date (expected YYYY-MM-DD)")]
    InvalidDate { row: usize, value: String },
    #[error("row {row}: cannot parse {value:?} as a monetary value")]
    InvalidValue { row: usize, value: String },
    #[error("input contains no transactions")]
    EmptyInput,
    #[error("failed to read input: {0}")]
    Csv(#[from] csv::Error),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}
