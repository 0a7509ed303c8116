use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use odx_frame::TabularFrame;
use odx_idgen::{DedupTracker, IdTemplate};
use odx_registry::ModelSpec;
use odx_rules::FieldRule;

use crate::error::CoreError;
use crate::exceptions::ExceptionsStore;

/// Emit exactly one CSV for `model` from an already-validated frame,
/// returning the set of external IDs written. Ten steps, in order, per the
/// documented contract: generate IDs, track dedup exceptions, apply
/// emit-time normalizers, apply defaults/rules, select/order columns,
/// cast-to-text, sort by id, write, verify, return.
pub fn emit(
    mut frame: TabularFrame,
    model: &ModelSpec,
    exceptions: &dyn ExceptionsStore,
    dataset_id: &str,
    output_dir: &Path,
) -> Result<HashSet<String>, CoreError> {
    let template = IdTemplate::parse(&model.id_template)
        .map_err(|e| CoreError::OutputIntegrity(format!("invalid id_template for {}: {e}", model.name)))?;

    // 1. Reset DedupTracker; render external IDs in frame order.
    let mut tracker = DedupTracker::new();
    let named_rows: Vec<BTreeMap<String, String>> = frame.iter_rows_named().collect();
    let mut ids = Vec::with_capacity(named_rows.len());
    let mut base_ids = Vec::with_capacity(named_rows.len());
    for row in &named_rows {
        let base = template.render_base_id(row);
        let final_id = tracker.record(&base);
        base_ids.push(base);
        ids.push(Some(final_id));
    }
    frame.with_column("id", ids.clone());

    // 2. Track duplicates as DUP_EXT_ID exceptions; the suffixed row stays.
    for (row, (base, final_id)) in base_ids.iter().zip(ids.iter()).enumerate() {
        let Some(final_id) = final_id else { continue };
        if final_id != base {
            let source_ptr = frame.get("source_ptr", row).unwrap_or("unknown").to_string();
            let mut offending = BTreeMap::new();
            offending.insert("id".to_string(), final_id.clone());
            offending.insert("base_id".to_string(), base.clone());
            exceptions.add(
                dataset_id,
                &model.name,
                &source_ptr,
                "DUP_EXT_ID",
                &format!("duplicate external ID, deduplicated as '{final_id}'"),
                offending,
            );
        }
    }

    // 3. Apply emit-time normalizers. Failures here indicate latent bugs
    // (the validator already rejected bad rows) so they log and leave null
    // rather than fail the export.
    for field in model.fields.values() {
        let Some(transform) = &field.transform else { continue };
        if !frame.has_column(&field.name) {
            continue;
        }
        let height = frame.len();
        let mut values = Vec::with_capacity(height);
        for row in 0..height {
            let raw = frame.get(&field.name, row);
            let normalized = match raw {
                None => None,
                Some(v) if v.is_empty() => None,
                Some(v) => match apply_named_normalizer(transform, v) {
                    Ok(s) => Some(s),
                    Err(err) => {
                        tracing::warn!(model = %model.name, field = %field.name, %err, "emit-time normalizer failed on a row the validator accepted");
                        None
                    }
                },
            };
            values.push(normalized);
        }
        frame.with_column(&field.name, values);
    }

    // 4. Apply defaults / rules for columns not already populated.
    let field_rules: Vec<FieldRule> = model
        .fields
        .values()
        .filter(|f| f.default.is_some() || f.rule.is_some())
        .map(|f| FieldRule::new(f.name.clone(), f.default.clone(), f.rule.as_deref()))
        .collect::<Result<_, _>>()?;
    odx_rules::apply_field_rules(&mut frame, &field_rules)?;

    // 5. Select and order columns exactly to `headers`.
    let headers: Vec<&str> = model.headers.iter().map(String::as_str).collect();
    let mut frame = frame.select(&headers);

    // 6. Cast every column to text; fill nulls with empty string.
    frame.cast_to_text();

    // 7. Sort rows ascending by id — the determinism anchor.
    frame.sort_by("id")?;

    // 8 + 9. Write CSV and verify the header line (done inside write_csv).
    let csv_path = output_dir.join(&model.csv_filename);
    frame.write_csv(&csv_path)?;

    // 10. Return the set of emitted external IDs.
    let emitted: HashSet<String> = (0..frame.len())
        .filter_map(|row| frame.get("id", row).map(str::to_string))
        .collect();
    Ok(emitted)
}

fn apply_named_normalizer(transform: &str, value: &str) -> Result<String, odx_normalize::NormalizeError> {
    match transform {
        "normalize_email" => odx_normalize::normalize_email(value),
        "normalize_phone_us" => odx_normalize::normalize_phone_us(value),
        "normalize_date_any" => odx_normalize::normalize_date_any(value),
        "coerce_bool" => odx_normalize::coerce_bool(value),
        _ => Ok(value.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exceptions::InMemoryExceptionsStore;

    fn model() -> ModelSpec {
        let yaml = r#"
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
        odx_registry::Registry::from_yaml_str(yaml).unwrap().model("res.partner").unwrap().clone()
    }

    #[test]
    fn emits_sorted_deduped_csv_with_exact_headers() {
        let dir = tempfile::tempdir().unwrap();
        let model = model();
        let frame = TabularFrame::from_rows(
            vec!["source_ptr".to_string(), "name".to_string(), "email".to_string()],
            vec![
                vec![Some("row1".to_string()), Some("Jane Doe".to_string()), Some("Jane@Example.com".to_string())],
                vec![Some("row2".to_string()), Some("Jane Doe".to_string()), Some("jane2@example.com".to_string())],
            ],
        );

        let store = InMemoryExceptionsStore::new();
        let ids = emit(frame, &model, &store, "ds1", dir.path()).unwrap();

        assert!(ids.contains("partner_jane_doe"));
        assert!(ids.contains("partner_jane_doe_2"));
        assert_eq!(store.count("ds1", None), 1);

        let written = std::fs::read_to_string(dir.path().join("export_res_partner.csv")).unwrap();
        assert_eq!(written.lines().next().unwrap(), "id,name,email");
        assert!(!written.contains('\r'));
    }
}
