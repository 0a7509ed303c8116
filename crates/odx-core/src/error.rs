/// The four fatal error kinds the core surfaces. Per-row problems are
/// exceptions (see [`crate::exceptions`]), never a `CoreError` — only these
/// four stop an export outright.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("registry invalid: {0}")]
    RegistryInvalid(#[from] odx_registry::RegistryError),
    #[error("rule evaluation failed: {0}")]
    RuleError(#[from] odx_rules::RuleError),
    #[error("output integrity violation: {0}")]
    OutputIntegrity(String),
    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<odx_frame::FrameError> for CoreError {
    fn from(err: odx_frame::FrameError) -> Self {
        match err {
            odx_frame::FrameError::Io(e) => CoreError::IoError(e),
            other => CoreError::OutputIntegrity(other.to_string()),
        }
    }
}

impl From<zip::result::ZipError> for CoreError {
    fn from(err: zip::result::ZipError) -> Self {
        CoreError::IoError(std::io::Error::other(err.to_string()))
    }
}
