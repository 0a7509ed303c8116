use std::collections::{BTreeMap, BTreeSet};

use crate::error::NormalizeError;

/// Resolve a raw enum value to its canonical external ID.
///
/// Resolution order (first hit wins):
/// 1. `seed_synonyms` (alias → canonical, from the field's seed);
/// 2. `inline_map` keys (source value → external ID, from the mapping);
/// 3. membership of the raw value in `inline_map`'s values (already an ID);
/// 4. membership of the raw value in `seed_canonical`.
pub fn coerce_enum(
    value: &str,
    inline_map: Option<&BTreeMap<String, String>>,
    seed_synonyms: Option<&BTreeMap<String, String>>,
    seed_canonical: Option<&BTreeSet<String>>,
) -> Result<String, NormalizeError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(NormalizeError::new("Enum value is empty"));
    }

    if let Some(synonyms) = seed_synonyms {
        if let Some(target) = synonyms.get(value) {
            return Ok(target.clone());
        }
    }

    if let Some(map) = inline_map {
        if let Some(target) = map.get(value) {
            return Ok(target.clone());
        }
        if map.values().any(|v| v == value) {
            return Ok(value.to_string());
        }
    }

    if let Some(canonical) = seed_canonical {
        if canonical.contains(value) {
            return Ok(value.to_string());
        }
    }

    Err(NormalizeError::new(format!(
        "Unknown enum value: '{value}' (not in mapping or synonyms)"
    )))
}
