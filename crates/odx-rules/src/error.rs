/// Errors from parsing or evaluating a rule expression.
///
/// Parse errors are registry-authored and surface at load time; identifier
/// and operand errors surface once per model, before row iteration begins.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RuleError {
    #[error("rule parse error at position {position}: {message}")]
    Parse { message: String, position: usize },
    #[error("unexpected end of rule expression")]
    UnexpectedEnd,
    #[error("unknown identifier '{0}' referenced in rule")]
    UnknownIdentifier(String),
    #[error("non-boolean operand used in and/or expression")]
    NonBooleanOperand,
}
