use std::collections::{BTreeSet, HashMap, HashSet};

use crate::error::{RegistryError, RegistryIssue};
use crate::types::{FieldType, Registry};

/// Run every structural/semantic check in §4.1, accumulating every issue
/// found rather than stopping at the first one, so a single `load()` call
/// tells a registry author everything wrong with their document at once.
pub(crate) fn validate_registry(registry: &Registry) -> Result<(), RegistryError> {
    let mut issues = Vec::new();

    check_import_order(registry, &mut issues);
    check_duplicate_headers(registry, &mut issues);
    check_fields_in_headers_or_derived(registry, &mut issues);
    check_fk_targets(registry, &mut issues);
    check_enum_seeds(registry, &mut issues);
    check_seed_synonyms(registry, &mut issues);
    check_topological_order(registry, &mut issues);

    if issues.is_empty() {
        Ok(())
    } else {
        Err(RegistryError::Invalid(issues))
    }
}

fn check_import_order(registry: &Registry, issues: &mut Vec<RegistryIssue>) {
    let mut seen = HashSet::new();
    for model in &registry.import_order {
        if !seen.insert(model.as_str()) {
            issues.push(RegistryIssue::new(
                "import_order",
                format!("duplicate model '{model}' in import_order"),
            ));
        }
        if !registry.models.contains_key(model) {
            issues.push(RegistryIssue::new(
                "import_order",
                format!("import_order references unknown model '{model}'"),
            ));
        }
    }
}

fn check_duplicate_headers(registry: &Registry, issues: &mut Vec<RegistryIssue>) {
    for (name, model) in &registry.models {
        let mut seen = HashSet::new();
        for header in &model.headers {
            if !seen.insert(header.as_str()) {
                issues.push(RegistryIssue::new(
                    format!("models.{name}.headers"),
                    format!("duplicate header '{header}'"),
                ));
            }
        }
    }
}

fn check_fields_in_headers_or_derived(registry: &Registry, issues: &mut Vec<RegistryIssue>) {
    for (model_name, model) in &registry.models {
        for (field_name, field) in &model.fields {
            if !field.derived && !model.headers.iter().any(|h| h == field_name) {
                issues.push(RegistryIssue::new(
                    format!("models.{model_name}.fields.{field_name}"),
                    "field is neither in headers nor marked derived".to_string(),
                ));
            }
        }
    }
}

fn check_fk_targets(registry: &Registry, issues: &mut Vec<RegistryIssue>) {
    for (model_name, model) in &registry.models {
        let Some(model_idx) = registry.import_order.iter().position(|m| m == model_name) else {
            continue;
        };
        for (field_name, field) in &model.fields {
            if field.field_type != Some(FieldType::M2o) {
                continue;
            }
            let Some(target) = &field.target else {
                issues.push(RegistryIssue::new(
                    format!("models.{model_name}.fields.{field_name}"),
                    "m2o field has no target model".to_string(),
                ));
                continue;
            };
            match registry.import_order.iter().position(|m| m == target) {
                None => issues.push(RegistryIssue::new(
                    format!("models.{model_name}.fields.{field_name}"),
                    format!("m2o target '{target}' is not a key of import_order"),
                )),
                Some(target_idx) if target_idx >= model_idx => {
                    issues.push(RegistryIssue::new(
                        format!("models.{model_name}.fields.{field_name}"),
                        format!(
                            "m2o target '{target}' must appear before '{model_name}' in import_order"
                        ),
                    ));
                }
                Some(_) => {}
            }
        }
    }
}

fn check_enum_seeds(registry: &Registry, issues: &mut Vec<RegistryIssue>) {
    for (model_name, model) in &registry.models {
        for (field_name, field) in &model.fields {
            if field.field_type != Some(FieldType::Enum) {
                continue;
            }
            match &field.map_from_seed {
                None => issues.push(RegistryIssue::new(
                    format!("models.{model_name}.fields.{field_name}"),
                    "enum field has no map_from_seed".to_string(),
                )),
                Some(seed) if !registry.seeds.contains_key(seed) => {
                    issues.push(RegistryIssue::new(
                        format!("models.{model_name}.fields.{field_name}"),
                        format!("map_from_seed '{seed}' is not a defined seed"),
                    ));
                }
                Some(_) => {}
            }
        }
    }
}

fn check_seed_synonyms(registry: &Registry, issues: &mut Vec<RegistryIssue>) {
    for (seed_name, seed) in &registry.seeds {
        for (alias, target) in &seed.synonyms {
            if !seed.canonical.contains(target) {
                issues.push(RegistryIssue::new(
                    format!("seeds.{seed_name}.synonyms.{alias}"),
                    format!("synonym target '{target}' is not in canonical"),
                ));
            }
        }
    }
}

/// Recompute the canonical topological order of the m2o dependency graph and
/// require bit-exact equality with the declared `import_order`. Ties among
/// models with no remaining unresolved dependency are broken lexicographically
/// by model name, which is the only stable choice the spec and the original
/// source leave unspecified (see `DESIGN.md`).
fn check_topological_order(registry: &Registry, issues: &mut Vec<RegistryIssue>) {
    let canonical = match topological_sort(registry) {
        Ok(order) => order,
        Err(cycle) => {
            issues.push(RegistryIssue::new(
                "import_order",
                format!("m2o graph contains a cycle involving '{cycle}'"),
            ));
            return;
        }
    };

    if canonical != registry.import_order {
        issues.push(RegistryIssue::new(
            "import_order",
            format!(
                "import_order does not match the canonical topological sort of the m2o graph.\n    \
                 declared:  {declared:?}\n    canonical: {canonical:?}",
                declared = registry.import_order,
            ),
        ));
    }
}

fn topological_sort(registry: &Registry) -> Result<Vec<String>, String> {
    let mut dependents: HashMap<&str, BTreeSet<&str>> = HashMap::new();
    let mut indegree: HashMap<&str, usize> = HashMap::new();

    for name in registry.models.keys() {
        indegree.entry(name.as_str()).or_insert(0);
    }

    for (model_name, model) in &registry.models {
        for field in model.fields.values() {
            if field.field_type == Some(FieldType::M2o) {
                if let Some(target) = &field.target {
                    if registry.models.contains_key(target) {
                        let inserted = dependents
                            .entry(target.as_str())
                            .or_default()
                            .insert(model_name.as_str());
                        if inserted {
                            *indegree.entry(model_name.as_str()).or_insert(0) += 1;
                        }
                    }
                }
            }
        }
    }

    let mut ready: BTreeSet<&str> = indegree
        .iter()
        .filter(|(_, &deg)| deg == 0)
        .map(|(&name, _)| name)
        .collect();

    let mut order = Vec::with_capacity(registry.models.len());
    while let Some(&name) = ready.iter().next() {
        ready.remove(name);
        order.push(name.to_string());
        if let Some(children) = dependents.get(name) {
            for &child in children {
                let deg = indegree.get_mut(child).expect("known node");
                *deg -= 1;
                if *deg == 0 {
                    ready.insert(child);
                }
            }
        }
    }

    if order.len() != registry.models.len() {
        let remaining: Vec<&str> = indegree
            .into_iter()
            .filter(|(name, deg)| *deg > 0 && !order.iter().any(|o| o == name))
            .map(|(name, _)| name)
            .collect();
        return Err(remaining.first().copied().unwrap_or("?").to_string());
    }

    Ok(order)
}
