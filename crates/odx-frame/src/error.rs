/// Errors from building, reshaping, or serializing a [`crate::TabularFrame`].
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("column '{0}' not found")]
    UnknownColumn(String),
    #[error("row {row} has {actual} cells, expected {expected}")]
    RaggedRow { row: usize, actual: usize, expected: usize },
    #[error("io error reading/writing frame: {0}")]
    Io(#[from] std::io::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("written header line does not match expected headers: wrote '{written}', expected '{expected}'")]
    HeaderMismatch { written: String, expected: String },
}
