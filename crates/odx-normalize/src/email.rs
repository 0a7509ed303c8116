use crate::error::NormalizeError;

/// Normalize an email address: trim, lowercase, and require a single `@`
/// with a domain that has at least one `.` and no empty labels.
pub fn normalize_email(value: &str) -> Result<String, NormalizeError> {
    let email = value.trim().to_lowercase();

    let mut parts = email.split('@');
    let (local, domain) = match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) if !local.is_empty() => (local, domain),
        _ => {
            return Err(NormalizeError::new(format!(
                "Invalid email format: {value}"
            )))
        }
    };

    let labels: Vec<&str> = domain.split('.').collect();
    let domain_ok = labels.len() >= 2 && labels.iter().all(|label| !label.is_empty());
    if !domain_ok {
        return Err(NormalizeError::new(format!(
            "Invalid email format: {value}"
        )));
    }

    Ok(format!("{local}@{domain}"))
}
