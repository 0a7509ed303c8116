use std::collections::BTreeMap;
use std::fs;
use std::io::Write as _;
use std::path::PathBuf;
use std::sync::Arc;

use odx_registry::RegistryLoader;

use crate::error::CoreError;
use crate::exceptions::ExceptionsStore;
use crate::fk_cache::FkCache;
use crate::mapping::{apply_mappings, DatasetSource, LambdaRegistry, Mapping, TransformCatalog};
use crate::validator::Validator;
use crate::{emitter, mapping};

#[derive(Debug, Clone, PartialEq)]
pub struct ModelExportSummary {
    pub model: String,
    pub csv_filename: String,
    pub rows_emitted: usize,
    pub exceptions_count: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExportResult {
    pub dataset_id: String,
    pub zip_path: PathBuf,
    pub models: Vec<ModelExportSummary>,
    pub total_emitted: usize,
    pub total_exceptions: usize,
    pub exceptions_by_code: BTreeMap<String, usize>,
}

/// Orchestrates one export run: load the registry, clear old exceptions,
/// then walk `import_order` mapping, validating, and emitting each model
/// before bundling every CSV into a ZIP. Single-threaded within one run —
/// a later model may depend on the full FK set a parent just emitted.
pub struct ExportOrchestrator {
    exceptions: Arc<dyn ExceptionsStore>,
    dataset_source: Arc<dyn DatasetSource>,
    catalog: Arc<dyn TransformCatalog>,
    lambdas: LambdaRegistry,
    artifact_root: PathBuf,
}

impl ExportOrchestrator {
    pub fn new(
        exceptions: Arc<dyn ExceptionsStore>,
        dataset_source: Arc<dyn DatasetSource>,
        catalog: Arc<dyn TransformCatalog>,
        lambdas: LambdaRegistry,
        artifact_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            exceptions,
            dataset_source,
            catalog,
            lambdas,
            artifact_root: artifact_root.into(),
        }
    }

    /// Run a full export. `mappings_by_model` holds the confirmed mappings
    /// for each model that has any; a model absent from the map is skipped
    /// (no confirmed mappings yet).
    pub fn export(
        &self,
        registry_loader: &RegistryLoader,
        dataset_id: &str,
        mappings_by_model: &BTreeMap<String, Vec<Mapping>>,
    ) -> Result<ExportResult, CoreError> {
        // 1. Load registry.
        let registry = registry_loader.load()?;

        // 2. Clear old exceptions; prepare output directory.
        self.exceptions.clear(dataset_id, None);
        let output_dir = self.artifact_root.join(dataset_id);
        fs::create_dir_all(&output_dir)?;

        // 3. Initialize empty FK cache.
        let mut fk_cache = FkCache::new();

        let mut summaries = Vec::new();
        let mut exceptions_by_code: BTreeMap<String, usize> = BTreeMap::new();
        let mut zip_entries: Vec<(String, PathBuf)> = Vec::new();
        let mut total_emitted = 0;

        // 4. Walk models strictly in import order.
        for model_name in &registry.import_order {
            let Some(model_spec) = registry.model(model_name) else { continue };
            let Some(mappings) = mappings_by_model.get(model_name) else { continue };
            if mappings.is_empty() {
                continue;
            }

            let mut frame = self.dataset_source.frame_for(dataset_id, model_name)?;
            if frame.is_empty() {
                continue;
            }

            if !frame.has_column("source_ptr") {
                let synthesized: Vec<Option<String>> =
                    (0..frame.len()).map(|i| Some(format!("row_{i}"))).collect();
                frame.with_column("source_ptr", synthesized);
            }

            apply_mappings(&mut frame, mappings, self.catalog.as_ref(), &self.lambdas)?;

            let validator = Validator::new(self.exceptions.as_ref(), &fk_cache);
            let result = validator.validate(&frame, model_spec, &registry.seeds, dataset_id);
            for (code, count) in &result.by_code {
                *exceptions_by_code.entry(code.clone()).or_insert(0) += count;
            }

            let rows_emitted = if !result.valid_frame.is_empty() {
                let emitted_ids = emitter::emit(result.valid_frame, model_spec, self.exceptions.as_ref(), dataset_id, &output_dir)?;
                fk_cache.insert_many(model_name, emitted_ids.iter().cloned());
                zip_entries.push((model_spec.csv_filename.clone(), output_dir.join(&model_spec.csv_filename)));
                total_emitted += emitted_ids.len();
                emitted_ids.len()
            } else {
                0
            };

            summaries.push(ModelExportSummary {
                model: model_name.clone(),
                csv_filename: model_spec.csv_filename.clone(),
                rows_emitted,
                exceptions_count: result.exception_count,
            });
        }

        // 5. Package all emitted CSVs into a ZIP, entries in import order.
        let zip_path = output_dir.join(format!("odoo_export_{dataset_id}.zip"));
        write_zip_bundle(&zip_path, &zip_entries)?;

        let total_exceptions = exceptions_by_code.values().sum();

        // 6. Return ExportResult.
        Ok(ExportResult {
            dataset_id: dataset_id.to_string(),
            zip_path,
            models: summaries,
            total_emitted,
            total_exceptions,
            exceptions_by_code,
        })
    }
}

fn write_zip_bundle(zip_path: &std::path::Path, entries: &[(String, PathBuf)]) -> Result<(), CoreError> {
    let file = fs::File::create(zip_path)?;
    let mut writer = zip::ZipWriter::new(file);
    let options = zip::write::FileOptions::default().compression_method(zip::CompressionMethod::Deflated);
    for (name, path) in entries {
        writer.start_file(name, options)?;
        let contents = fs::read(path)?;
        writer.write_all(&contents)?;
    }
    writer.finish()?;
    Ok(())
}

/// Convenience constructor wiring the default transform catalog and an
/// empty lambda registry, for callers (the CLI) that don't need custom
/// transforms or lambdas.
pub fn default_orchestrator(
    exceptions: Arc<dyn ExceptionsStore>,
    dataset_dir: impl Into<PathBuf>,
    artifact_root: impl Into<PathBuf>,
) -> ExportOrchestrator {
    ExportOrchestrator::new(
        exceptions,
        Arc::new(mapping::CsvDirDatasetSource::new(dataset_dir)),
        Arc::new(mapping::DefaultTransformCatalog),
        LambdaRegistry::new(),
        artifact_root,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exceptions::InMemoryExceptionsStore;
    use sha2::{Digest, Sha256};

    const REGISTRY: &str = r#"
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

    #[test]
    fn export_emits_csv_and_zip_for_a_mapped_model() {
        let workdir = tempfile::tempdir().unwrap();
        let registry_path = workdir.path().join("registry.yaml");
        fs::write(&registry_path, REGISTRY).unwrap();

        let dataset_dir = workdir.path().join("datasets");
        fs::create_dir_all(dataset_dir.join("ds1")).unwrap();
        fs::write(
            dataset_dir.join("ds1").join("res.partner.csv"),
            "name,email\nAcme Homes,info@acme.example\n",
        )
        .unwrap();

        let artifact_root = workdir.path().join("artifacts");
        let exceptions = Arc::new(InMemoryExceptionsStore::new());
        let orchestrator = default_orchestrator(exceptions, dataset_dir, &artifact_root);

        let loader = RegistryLoader::new(registry_path);
        let mut mappings_by_model = BTreeMap::new();
        mappings_by_model.insert(
            "res.partner".to_string(),
            vec![Mapping::rename("name", "name"), Mapping::rename("email", "email")],
        );

        let result = orchestrator.export(&loader, "ds1", &mappings_by_model).unwrap();
        assert_eq!(result.total_emitted, 1);
        assert_eq!(result.total_exceptions, 0);
        assert!(result.zip_path.exists());
        assert_eq!(result.models[0].csv_filename, "export_res_partner.csv");
    }

    const S1_REGISTRY: &str = r#"
version: 1
import_order: [res.partner]
models:
  res.partner:
    csv: export_res_partner.csv
    headers: [id, name, email]
    id_template: "partner_{slug(email) or slug(name)}"
    fields:
      name: { type: string, required: true }
      email: { type: email, transform: normalize_email }
seeds: {}
"#;

    fn s1_fixture(workdir: &std::path::Path) -> (RegistryLoader, PathBuf, BTreeMap<String, Vec<Mapping>>) {
        let registry_path = workdir.join("registry.yaml");
        fs::write(&registry_path, S1_REGISTRY).unwrap();

        let dataset_dir = workdir.join("datasets");
        fs::create_dir_all(dataset_dir.join("ds1")).unwrap();
        fs::write(
            dataset_dir.join("ds1").join("res.partner.csv"),
            "name,email\n\
             Acme Homes,info@acme.example\n\
             Jane Doe,JANE@DOE.EXAMPLE\n\
             Jane 2,jane@doe.example\n",
        )
        .unwrap();

        let mut mappings_by_model = BTreeMap::new();
        mappings_by_model.insert(
            "res.partner".to_string(),
            vec![Mapping::rename("name", "name"), Mapping::rename("email", "email")],
        );

        (RegistryLoader::new(registry_path), dataset_dir, mappings_by_model)
    }

    /// Literal reproduction of spec scenario S1: party emit with email dedup.
    #[test]
    fn s1_party_emit_with_email_dedup_matches_literal_expected_csv() {
        let workdir = tempfile::tempdir().unwrap();
        let (loader, dataset_dir, mappings_by_model) = s1_fixture(workdir.path());
        let artifact_root = workdir.path().join("artifacts");
        let exceptions = Arc::new(InMemoryExceptionsStore::new());
        let orchestrator = default_orchestrator(exceptions.clone(), dataset_dir, &artifact_root);

        let result = orchestrator.export(&loader, "ds1", &mappings_by_model).unwrap();

        let written = fs::read_to_string(artifact_root.join("ds1").join("export_res_partner.csv")).unwrap();
        assert_eq!(
            written,
            "id,name,email\n\
             partner_info_acme_example,Acme Homes,info@acme.example\n\
             partner_jane_doe_example,Jane Doe,jane@doe.example\n\
             partner_jane_doe_example_2,Jane 2,jane@doe.example\n"
        );

        let dup_exceptions: Vec<_> = exceptions.list("ds1", None).into_iter().filter(|e| e.error_code == "DUP_EXT_ID").collect();
        assert_eq!(dup_exceptions.len(), 1);
        assert_eq!(result.total_emitted, 3);
    }

    /// Property 3/9 (spec S6): re-running the same export twice, with fresh
    /// DedupTracker/FKCache each time, produces byte-identical artifacts.
    #[test]
    fn rerun_produces_byte_identical_csv_and_zip() {
        let workdir = tempfile::tempdir().unwrap();
        let (loader, dataset_dir, mappings_by_model) = s1_fixture(workdir.path());
        let artifact_root = workdir.path().join("artifacts");
        let exceptions = Arc::new(InMemoryExceptionsStore::new());
        let orchestrator = default_orchestrator(exceptions, dataset_dir, &artifact_root);

        let first = orchestrator.export(&loader, "ds1", &mappings_by_model).unwrap();
        let first_csv = fs::read(&artifact_root.join("ds1").join("export_res_partner.csv")).unwrap();
        let first_zip = fs::read(&first.zip_path).unwrap();

        let second = orchestrator.export(&loader, "ds1", &mappings_by_model).unwrap();
        let second_csv = fs::read(&artifact_root.join("ds1").join("export_res_partner.csv")).unwrap();
        let second_zip = fs::read(&second.zip_path).unwrap();

        let hash = |bytes: &[u8]| -> String {
            let mut hasher = Sha256::new();
            hasher.update(bytes);
            format!("{:x}", hasher.finalize())
        };

        assert_eq!(hash(&first_csv), hash(&second_csv));
        assert_eq!(hash(&first_zip), hash(&second_zip));
    }

    const EIGHT_CODE_REGISTRY: &str = r#"
version: 1
import_order: [res.partner, crm.lead]
models:
  res.partner:
    csv: export_res_partner.csv
    headers: [id, name, email]
    id_template: "partner_{slug(name)}"
    fields:
      name: { type: string, required: true }
      email: { type: email }
  crm.lead:
    csv: export_crm_lead.csv
    headers: [id, name, email, phone, date_deadline, active, stage_id/id, partner_id/id]
    id_template: "lead_{slug(name)}"
    fields:
      name: { type: string, required: true }
      email: { type: email }
      phone: { type: phone }
      date_deadline: { type: date }
      active: { type: bool }
      stage_id/id: { type: enum, map_from_seed: crm_stages }
      partner_id/id: { type: m2o, target: res.partner }
seeds:
  crm_stages:
    canonical: [stage_open, stage_won]
    synonyms: { won: stage_won }
"#;

    /// Property 6 (FK precedence / S3) and property 7 (error-code coverage):
    /// one fixture that triggers each of the eight error codes exactly once
    /// and proves a child model only accepts FK references already emitted
    /// by its parent.
    #[test]
    fn fk_precedence_and_all_eight_error_codes_fire_exactly_once() {
        let workdir = tempfile::tempdir().unwrap();
        let registry_path = workdir.path().join("registry.yaml");
        fs::write(&registry_path, EIGHT_CODE_REGISTRY).unwrap();

        let dataset_dir = workdir.path().join("datasets");
        fs::create_dir_all(dataset_dir.join("ds1")).unwrap();
        fs::write(
            dataset_dir.join("ds1").join("res.partner.csv"),
            "name,email\n\
             Acme Homes,info@acme.example\n\
             Acme Homes,info2@acme.example\n\
             ,x@y.z\n",
        )
        .unwrap();
        fs::write(
            dataset_dir.join("ds1").join("crm.lead.csv"),
            "name,email,phone,date_deadline,active,stage_id/id,partner_id/id\n\
             Lead4,not-an-email,5551234567,2024-01-15,true,stage_won,partner_acme_homes\n\
             Lead5,lead5@example.com,123,2024-01-15,true,stage_won,partner_acme_homes\n\
             Lead6,lead6@example.com,5551234567,not-a-date,true,stage_won,partner_acme_homes\n\
             Lead7,lead7@example.com,5551234567,2024-01-15,maybe,stage_won,partner_acme_homes\n\
             Lead8,lead8@example.com,5551234567,2024-01-15,true,WON,partner_acme_homes\n\
             Lead9,lead9@example.com,5551234567,2024-01-15,true,stage_won,partner_ghost\n\
             Lead10,lead10@example.com,5551234567,2024-01-15,true,stage_won,partner_acme_homes\n",
        )
        .unwrap();

        let artifact_root = workdir.path().join("artifacts");
        let exceptions = Arc::new(InMemoryExceptionsStore::new());
        let orchestrator = default_orchestrator(exceptions.clone(), dataset_dir, &artifact_root);
        let loader = RegistryLoader::new(registry_path);

        let mut mappings_by_model = BTreeMap::new();
        mappings_by_model.insert(
            "res.partner".to_string(),
            vec![Mapping::rename("name", "name"), Mapping::rename("email", "email")],
        );
        mappings_by_model.insert(
            "crm.lead".to_string(),
            vec![
                Mapping::rename("name", "name"),
                Mapping::rename("email", "email"),
                Mapping::rename("phone", "phone"),
                Mapping::rename("date_deadline", "date_deadline"),
                Mapping::rename("active", "active"),
                Mapping::rename("stage_id/id", "stage_id/id"),
                Mapping::rename("partner_id/id", "partner_id/id"),
            ],
        );

        let result = orchestrator.export(&loader, "ds1", &mappings_by_model).unwrap();

        let records = exceptions.list("ds1", None);
        assert_eq!(records.len(), 8);
        for code in [
            "REQ_MISSING",
            "INVALID_EMAIL",
            "INVALID_PHONE",
            "DATE_PARSE_FAIL",
            "BOOL_PARSE_FAIL",
            "ENUM_UNKNOWN",
            "FK_UNRESOLVED",
            "DUP_EXT_ID",
        ] {
            assert_eq!(records.iter().filter(|r| r.error_code == code).count(), 1, "expected exactly one {code}");
        }

        let partner_summary = result.models.iter().find(|m| m.model == "res.partner").unwrap();
        let lead_summary = result.models.iter().find(|m| m.model == "crm.lead").unwrap();
        assert_eq!(partner_summary.rows_emitted, 2);
        assert_eq!(lead_summary.rows_emitted, 1);
    }
}
