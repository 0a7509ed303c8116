use crate::error::NormalizeError;

/// Coerce a loosely-typed truthy/falsy token to the literal string `"true"`
/// or `"false"`.
pub fn coerce_bool(value: &str) -> Result<String, NormalizeError> {
    let val = value.trim().to_lowercase();

    match val.as_str() {
        "true" => Ok("true".to_string()),
        "false" => Ok("false".to_string()),
        "yes" | "y" | "t" | "1" => Ok("true".to_string()),
        "no" | "n" | "f" | "0" => Ok("false".to_string()),
        _ => Err(NormalizeError::new(format!(
            "Cannot coerce to boolean: {value}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_truthy_tokens() {
        for tok in ["true", "Yes", "Y", "t", "1"] {
            assert_eq!(coerce_bool(tok).unwrap(), "true");
        }
    }

    #[test]
    fn recognizes_falsy_tokens() {
        for tok in ["false", "No", "N", "f", "0"] {
            assert_eq!(coerce_bool(tok).unwrap(), "false");
        }
    }

    #[test]
    fn rejects_unknown_token() {
        assert!(coerce_bool("maybe").is_err());
        assert!(coerce_bool("").is_err());
    }

    #[test]
    fn idempotent() {
        let once = coerce_bool("Yes").unwrap();
        let twice = coerce_bool(&once).unwrap();
        assert_eq!(once, twice);
    }
}
