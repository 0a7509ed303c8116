use odx_registry::{FieldType, Registry, RegistryError, RegistryLoader};

const FIXTURE: &str = r#"
version: 1
import_order: [res.partner, crm.lead]
models:
  res.partner:
    csv: export_res_partner.csv
    headers: [id, name, email]
    id_template: "partner_{slug(email) or slug(name)}"
    fields:
      name:
        type: string
        required: true
      email:
        type: email
        required: true
        transform: normalize_email
  crm.lead:
    csv: export_crm_lead.csv
    headers: [id, stage_id/id, partner_id/id]
    id_template: "lead_{slug(partner_id/id)}"
    fields:
      stage_id/id:
        type: enum
        required: true
        map_from_seed: crm_stages
      partner_id/id:
        type: m2o
        required: true
        target: res.partner
seeds:
  crm_stages:
    canonical: [stage_open_qualification, stage_won]
    synonyms:
      won: stage_won
      open: stage_open_qualification
      closed_won: stage_won
  crm_lost_reasons:
    canonical: [lost_spam, lost_no_response, lost_too_small]
    synonyms:
      spam: lost_spam
      no_response: lost_no_response
      "too small": lost_too_small
"#;

fn fixture() -> Registry {
    Registry::from_yaml_str(FIXTURE).expect("fixture registry should validate")
}

#[test]
fn loads_successfully() {
    let registry = fixture();
    assert_eq!(registry.version, 1);
    assert!(!registry.import_order.is_empty());
    assert!(!registry.models.is_empty());
}

#[test]
fn import_order_precedence() {
    let registry = fixture();
    let partner_idx = registry
        .import_order
        .iter()
        .position(|m| m == "res.partner")
        .unwrap();
    let lead_idx = registry
        .import_order
        .iter()
        .position(|m| m == "crm.lead")
        .unwrap();
    assert!(partner_idx < lead_idx);
}

#[test]
fn res_partner_model_spec() {
    let registry = fixture();
    let partner = registry.model("res.partner").unwrap();
    assert_eq!(partner.csv_filename, "export_res_partner.csv");
    assert!(partner.headers.contains(&"id".to_string()));
    assert!(partner.headers.contains(&"name".to_string()));

    let name_field = partner.field("name").unwrap();
    assert!(name_field.required);
    assert_eq!(name_field.field_type, Some(FieldType::String));

    let email_field = partner.field("email").unwrap();
    assert_eq!(email_field.transform.as_deref(), Some("normalize_email"));
}

#[test]
fn crm_lead_fk_and_enum_fields() {
    let registry = fixture();
    let lead = registry.model("crm.lead").unwrap();

    let partner_field = lead.field("partner_id/id").unwrap();
    assert_eq!(partner_field.field_type, Some(FieldType::M2o));
    assert_eq!(partner_field.target.as_deref(), Some("res.partner"));

    let stage_field = lead.field("stage_id/id").unwrap();
    assert_eq!(stage_field.field_type, Some(FieldType::Enum));
    assert_eq!(stage_field.map_from_seed.as_deref(), Some("crm_stages"));
}

#[test]
fn id_is_implicitly_derived() {
    let registry = fixture();
    let partner = registry.model("res.partner").unwrap();
    let id_field = partner.field("id").unwrap();
    assert!(id_field.derived);
}

#[test]
fn seed_synonym_resolution() {
    let registry = fixture();
    let stages = registry.seed("crm_stages").unwrap();
    assert_eq!(stages.resolve("won"), Some("stage_won"));
    assert_eq!(stages.resolve("open"), Some("stage_open_qualification"));
    assert_eq!(stages.resolve("closed_won"), Some("stage_won"));
    assert_eq!(stages.resolve("stage_won"), Some("stage_won"));
    assert_eq!(stages.resolve("unknown_stage"), None);
}

#[test]
fn lost_reasons_synonyms() {
    let registry = fixture();
    let lost_reasons = registry.seed("crm_lost_reasons").unwrap();
    assert_eq!(lost_reasons.resolve("spam"), Some("lost_spam"));
    assert_eq!(lost_reasons.resolve("no_response"), Some("lost_no_response"));
    assert_eq!(lost_reasons.resolve("too small"), Some("lost_too_small"));
}

#[test]
fn rejects_duplicate_header() {
    let yaml = FIXTURE.replace(
        "headers: [id, name, email]",
        "headers: [id, name, email, email]",
    );
    let err = Registry::from_yaml_str(&yaml).unwrap_err();
    match err {
        RegistryError::Invalid(issues) => {
            assert!(issues.iter().any(|i| i.message.contains("duplicate header")));
        }
        other => panic!("expected Invalid, got {other:?}"),
    }
}

#[test]
fn rejects_fk_target_after_referencing_model() {
    let yaml = FIXTURE.replace(
        "import_order: [res.partner, crm.lead]",
        "import_order: [crm.lead, res.partner]",
    );
    let err = Registry::from_yaml_str(&yaml).unwrap_err();
    match err {
        RegistryError::Invalid(issues) => {
            assert!(issues
                .iter()
                .any(|i| i.message.contains("must appear before")
                    || i.message.contains("canonical topological sort")));
        }
        other => panic!("expected Invalid, got {other:?}"),
    }
}

#[test]
fn rejects_enum_with_unknown_seed() {
    let yaml = FIXTURE.replace("map_from_seed: crm_stages", "map_from_seed: nonexistent_seed");
    let err = Registry::from_yaml_str(&yaml).unwrap_err();
    match err {
        RegistryError::Invalid(issues) => {
            assert!(issues
                .iter()
                .any(|i| i.message.contains("is not a defined seed")));
        }
        other => panic!("expected Invalid, got {other:?}"),
    }
}

#[test]
fn rejects_seed_synonym_target_not_in_canonical() {
    let yaml = FIXTURE.replace("won: stage_won", "won: stage_won_typo");
    let err = Registry::from_yaml_str(&yaml).unwrap_err();
    match err {
        RegistryError::Invalid(issues) => {
            assert!(issues
                .iter()
                .any(|i| i.message.contains("is not in canonical")));
        }
        other => panic!("expected Invalid, got {other:?}"),
    }
}

#[test]
fn loader_caches_by_mtime_and_force_reload_bypasses_it() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("registry.yaml");
    std::fs::write(&path, FIXTURE).unwrap();

    let loader = RegistryLoader::new(&path);
    let reg1 = loader.load().unwrap();
    let reg2 = loader.load().unwrap();
    assert!(std::sync::Arc::ptr_eq(&reg1, &reg2));

    let reg3 = loader.load_force_reload().unwrap();
    assert!(!std::sync::Arc::ptr_eq(&reg1, &reg3));
    assert_eq!(*reg1, *reg3);
}
