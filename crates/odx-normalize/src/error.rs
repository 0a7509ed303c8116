/// Why a normalizer could not produce a value.
///
/// Carries a user-facing `hint` (the same string surfaced on the
/// corresponding validator exception) rather than a generic message, so a
/// caller never has to re-derive one.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct NormalizeError(pub String);

impl NormalizeError {
    pub fn new(hint: impl Into<String>) -> Self {
        Self(hint.into())
    }
}
