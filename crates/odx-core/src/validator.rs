use std::collections::BTreeMap;

use odx_frame::TabularFrame;
use odx_registry::{FieldType, ModelSpec, SeedSpec};

use crate::exceptions::ExceptionsStore;
use crate::fk_cache::FkCache;

/// Outcome of validating one model's frame: the rows that survived, plus
/// counts for reporting. Rejected rows are recorded in the
/// [`ExceptionsStore`] during the call, not returned here.
pub struct ValidationResult {
    pub valid_frame: TabularFrame,
    pub exception_count: usize,
    pub by_code: BTreeMap<String, usize>,
}

/// Runs the seven admission checks against one model's frame, in order.
/// At most one exception is recorded per row per pass: the first failing
/// check wins and the row is excluded from `valid_frame`.
pub struct Validator<'a> {
    exceptions: &'a dyn ExceptionsStore,
    fk_cache: &'a FkCache,
}

impl<'a> Validator<'a> {
    pub fn new(exceptions: &'a dyn ExceptionsStore, fk_cache: &'a FkCache) -> Self {
        Self { exceptions, fk_cache }
    }

    pub fn validate(
        &self,
        frame: &TabularFrame,
        model: &ModelSpec,
        seeds: &BTreeMap<String, SeedSpec>,
        dataset_id: &str,
    ) -> ValidationResult {
        let mut by_code: BTreeMap<String, usize> = BTreeMap::new();
        let mut kept_rows = Vec::with_capacity(frame.len());

        for row in 0..frame.len() {
            let source_ptr = frame
                .get("source_ptr", row)
                .map(str::to_string)
                .unwrap_or_else(|| format!("row_{row}"));

            match self.check_row(frame, model, seeds, row) {
                None => kept_rows.push(row),
                Some((code, field, value)) => {
                    let mut offending = BTreeMap::new();
                    offending.insert(field, value.unwrap_or_default());
                    self.exceptions.add(dataset_id, &model.name, &source_ptr, code, &hint_for(code), offending);
                    *by_code.entry(code.to_string()).or_insert(0) += 1;
                }
            }
        }

        let valid_frame = frame.select_rows(&kept_rows);

        ValidationResult {
            exception_count: by_code.values().sum(),
            valid_frame,
            by_code,
        }
    }

    /// Run the seven checks in order for a single row. Returns the first
    /// failing `(error_code, field_name, raw_value)`, if any.
    fn check_row(
        &self,
        frame: &TabularFrame,
        model: &ModelSpec,
        seeds: &BTreeMap<String, SeedSpec>,
        row: usize,
    ) -> Option<(&'static str, String, Option<String>)> {
        for field in model.fields.values() {
            if field.required {
                let value = frame.get(&field.name, row);
                if value.is_none_or(str::is_empty) {
                    return Some(("REQ_MISSING", field.name.clone(), value.map(str::to_string)));
                }
            }
        }

        for field in model.fields.values() {
            if field.field_type != Some(FieldType::Email) {
                continue;
            }
            if let Some(value) = frame.get(&field.name, row) {
                if odx_normalize::normalize_email(value).is_err() {
                    return Some(("INVALID_EMAIL", field.name.clone(), Some(value.to_string())));
                }
            }
        }

        for field in model.fields.values() {
            if field.field_type != Some(FieldType::Phone) {
                continue;
            }
            if let Some(value) = frame.get(&field.name, row) {
                if odx_normalize::normalize_phone_us(value).is_err() {
                    return Some(("INVALID_PHONE", field.name.clone(), Some(value.to_string())));
                }
            }
        }

        for field in model.fields.values() {
            if !matches!(field.field_type, Some(FieldType::Date) | Some(FieldType::Datetime)) {
                continue;
            }
            if let Some(value) = frame.get(&field.name, row) {
                if odx_normalize::normalize_date_any(value).is_err() {
                    return Some(("DATE_PARSE_FAIL", field.name.clone(), Some(value.to_string())));
                }
            }
        }

        for field in model.fields.values() {
            if field.field_type != Some(FieldType::Bool) {
                continue;
            }
            if let Some(value) = frame.get(&field.name, row) {
                if odx_normalize::coerce_bool(value).is_err() {
                    return Some(("BOOL_PARSE_FAIL", field.name.clone(), Some(value.to_string())));
                }
            }
        }

        for field in model.fields.values() {
            if field.field_type != Some(FieldType::Enum) {
                continue;
            }
            let value = frame.get(&field.name, row);
            match value {
                Some(v) => {
                    let seed = field.map_from_seed.as_deref().and_then(|name| seeds.get(name));
                    let (synonyms, canonical) = match seed {
                        Some(s) => (Some(&s.synonyms), Some(&s.canonical)),
                        None => (None, None),
                    };
                    if odx_normalize::coerce_enum(v, None, synonyms, canonical).is_err() {
                        return Some(("ENUM_UNKNOWN", field.name.clone(), Some(v.to_string())));
                    }
                }
                None if !field.optional => {
                    return Some(("ENUM_UNKNOWN", field.name.clone(), None));
                }
                None => {}
            }
        }

        for field in model.fields.values() {
            if field.field_type != Some(FieldType::M2o) {
                continue;
            }
            if let Some(value) = frame.get(&field.name, row) {
                let target = field.target.as_deref().unwrap_or_default();
                if !self.fk_cache.contains(target, value) {
                    return Some(("FK_UNRESOLVED", field.name.clone(), Some(value.to_string())));
                }
            }
        }

        None
    }
}

pub fn hint_for(code: &str) -> String {
    match code {
        "REQ_MISSING" => "required field is missing or empty".to_string(),
        "INVALID_EMAIL" => "value does not normalize to a valid email".to_string(),
        "INVALID_PHONE" => "value does not normalize to a valid US phone number".to_string(),
        "DATE_PARSE_FAIL" => "value does not match any recognized date format".to_string(),
        "BOOL_PARSE_FAIL" => "value is not a recognized boolean token".to_string(),
        "ENUM_UNKNOWN" => "value does not resolve to a known enum member".to_string(),
        "FK_UNRESOLVED" => "referenced external ID was not found in the FK cache".to_string(),
        other => format!("validation failed ({other})"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exceptions::InMemoryExceptionsStore;
    use odx_registry::Registry;

    const FIXTURE: &str = r#"
version: 1
import_order: [res.partner]
models:
  res.partner:
    csv: export_res_partner.csv
    headers: [id, name, email]
    id_template: "partner_{slug(name)}"
    fields:
      name: { type: string, required: true }
      email: { type: email, transform: normalize_email }
seeds: {}
"#;

    fn frame_with(headers: &[&str], rows: Vec<Vec<Option<&str>>>) -> TabularFrame {
        let headers = headers.iter().map(|h| h.to_string()).collect();
        let rows = rows
            .into_iter()
            .map(|row| row.into_iter().map(|c| c.map(str::to_string)).collect())
            .collect();
        TabularFrame::from_rows(headers, rows)
    }

    #[test]
    fn rejects_row_missing_a_required_field() {
        let registry = Registry::from_yaml_str(FIXTURE).unwrap();
        let model = registry.model("res.partner").unwrap();
        let frame = frame_with(
            &["source_ptr", "name", "email"],
            vec![
                vec![Some("row1"), Some("Valid Name"), Some("a@b.com")],
                vec![Some("row2"), None, Some("a@b.com")],
            ],
        );

        let store = InMemoryExceptionsStore::new();
        let fk_cache = FkCache::new();
        let validator = Validator::new(&store, &fk_cache);
        let result = validator.validate(&frame, model, &registry.seeds, "ds1");

        assert_eq!(result.exception_count, 1);
        assert_eq!(result.by_code.get("REQ_MISSING"), Some(&1));
        assert_eq!(result.valid_frame.len(), 1);
        assert_eq!(store.list("ds1", None)[0].row_ptr, "row2");
    }

    #[test]
    fn rejects_invalid_email_and_keeps_valid_rows() {
        let registry = Registry::from_yaml_str(FIXTURE).unwrap();
        let model = registry.model("res.partner").unwrap();
        let frame = frame_with(
            &["source_ptr", "name", "email"],
            vec![
                vec![Some("row1"), Some("Name1"), Some("valid@example.com")],
                vec![Some("row2"), Some("Name2"), Some("not-an-email")],
            ],
        );

        let store = InMemoryExceptionsStore::new();
        let fk_cache = FkCache::new();
        let validator = Validator::new(&store, &fk_cache);
        let result = validator.validate(&frame, model, &registry.seeds, "ds1");

        assert_eq!(result.exception_count, 1);
        assert_eq!(result.by_code.get("INVALID_EMAIL"), Some(&1));
        assert_eq!(result.valid_frame.len(), 1);
    }
}
