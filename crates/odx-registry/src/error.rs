use std::fmt;

/// A single validation problem found while checking a [`crate::Registry`].
///
/// `path` is a dotted pointer into the document (e.g. `models.crm.lead.
/// fields.partner_id/id`) so a diagnostic can be rendered without re-walking
/// the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryIssue {
    pub path: String,
    pub message: String,
}

impl RegistryIssue {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for RegistryIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Failure modes for loading and validating a registry document.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("registry YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("registry I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// One or more structural/semantic checks failed. Never empty.
    #[error("registry failed validation with {n} issue(s):\n{list}", n = .0.len(), list = join_issues(.0))]
    Invalid(Vec<RegistryIssue>),
}

fn join_issues(issues: &[RegistryIssue]) -> String {
    issues
        .iter()
        .map(|i| format!("  - {i}"))
        .collect::<Vec<_>>()
        .join("\n")
}
