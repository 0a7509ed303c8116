use crate::error::NormalizeError;

/// Normalize a US phone number to `1XXXXXXXXXX`.
///
/// Strips every non-digit; a 10-digit result is prefixed with `1`, an
/// 11-digit result already starting with `1` passes through unchanged.
/// Anything else fails.
pub fn normalize_phone_us(value: &str) -> Result<String, NormalizeError> {
    let digits: String = value.chars().filter(|c| c.is_ascii_digit()).collect();

    match digits.len() {
        10 => Ok(format!("1{digits}")),
        11 if digits.starts_with('1') => Ok(digits),
        n => Err(NormalizeError::new(format!(
            "Expected 10 or 11 digits, got {n}"
        ))),
    }
}
