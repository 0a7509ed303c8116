/// A malformed ID template. Templates are registry-authored, so this is a
/// startup-time error, never a per-row one.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TemplateError {
    #[error("unexpected end of template expression")]
    UnexpectedEnd,
    #[error("expected '{expected}' at position {position}")]
    Expected { expected: char, position: usize },
    #[error("unknown template function '{0}'")]
    UnknownFunction(String),
}
