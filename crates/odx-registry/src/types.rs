use std::collections::{BTreeMap, BTreeSet};

use serde::Deserialize;

use crate::error::RegistryError;
use crate::validate::validate_registry;

/// Closed set of field types a [`FieldSpec`] may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    String,
    Email,
    Phone,
    Date,
    Datetime,
    Bool,
    Int,
    Float,
    Enum,
    M2o,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Email => "email",
            FieldType::Phone => "phone",
            FieldType::Date => "date",
            FieldType::Datetime => "datetime",
            FieldType::Bool => "bool",
            FieldType::Int => "int",
            FieldType::Float => "float",
            FieldType::Enum => "enum",
            FieldType::M2o => "m2o",
        }
    }
}

/// A single column of a [`ModelSpec`].
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    pub name: String,
    pub field_type: Option<FieldType>,
    pub required: bool,
    pub optional: bool,
    pub derived: bool,
    pub default: Option<String>,
    pub transform: Option<String>,
    pub rule: Option<String>,
    pub map_from_seed: Option<String>,
    pub target: Option<String>,
}

/// One target model: its output file, header order, ID template, and fields.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelSpec {
    pub name: String,
    pub csv_filename: String,
    pub headers: Vec<String>,
    pub id_template: String,
    pub fields: BTreeMap<String, FieldSpec>,
}

impl ModelSpec {
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.get(name)
    }
}

/// A reference vocabulary used to resolve enum-typed fields.
#[derive(Debug, Clone, PartialEq)]
pub struct SeedSpec {
    pub canonical: BTreeSet<String>,
    pub synonyms: BTreeMap<String, String>,
}

impl SeedSpec {
    /// Resolve a raw value to its canonical external ID, if any.
    ///
    /// Resolution order matches the enum coercion rule in `odx-normalize`:
    /// a synonym takes precedence over a bare canonical match so registry
    /// authors can rename a canonical value without breaking old synonyms.
    pub fn resolve(&self, raw: &str) -> Option<&str> {
        if let Some(target) = self.synonyms.get(raw) {
            return Some(target.as_str());
        }
        self.canonical.get(raw).map(|s| s.as_str())
    }
}

/// The root document: models, their import order, and seed vocabularies.
#[derive(Debug, Clone, PartialEq)]
pub struct Registry {
    pub version: u32,
    pub import_order: Vec<String>,
    pub models: BTreeMap<String, ModelSpec>,
    pub seeds: BTreeMap<String, SeedSpec>,
}

impl Registry {
    /// Parse and validate a registry document from a YAML string.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, RegistryError> {
        let raw: RawRegistry = serde_yaml::from_str(yaml)?;
        let registry = raw.into_registry();
        validate_registry(&registry)?;
        Ok(registry)
    }

    pub fn model(&self, name: &str) -> Option<&ModelSpec> {
        self.models.get(name)
    }

    pub fn seed(&self, name: &str) -> Option<&SeedSpec> {
        self.seeds.get(name)
    }
}

// --- raw (wire) shapes -----------------------------------------------------
//
// Kept separate from the public types so the public API never has to carry
// `#[serde(...)]` attributes or accept a document shape wider than what we
// actually support; `into_registry` is the single seam where defaults are
// applied (e.g. the implicit derived `id` field).

#[derive(Debug, Deserialize)]
struct RawRegistry {
    version: u32,
    import_order: Vec<String>,
    models: BTreeMap<String, RawModelSpec>,
    #[serde(default)]
    seeds: BTreeMap<String, RawSeedSpec>,
}

#[derive(Debug, Deserialize)]
struct RawModelSpec {
    csv: String,
    headers: Vec<String>,
    id_template: String,
    #[serde(default)]
    fields: BTreeMap<String, RawFieldSpec>,
}

#[derive(Debug, Deserialize)]
struct RawFieldSpec {
    #[serde(rename = "type", default)]
    field_type: Option<FieldType>,
    #[serde(default)]
    required: bool,
    #[serde(default)]
    optional: bool,
    #[serde(default)]
    derived: bool,
    #[serde(default)]
    default: Option<String>,
    #[serde(default)]
    transform: Option<String>,
    #[serde(default)]
    rule: Option<String>,
    #[serde(default)]
    map_from_seed: Option<String>,
    #[serde(default)]
    target: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawSeedSpec {
    canonical: BTreeSet<String>,
    #[serde(default)]
    synonyms: BTreeMap<String, String>,
}

impl RawRegistry {
    fn into_registry(self) -> Registry {
        let models = self
            .models
            .into_iter()
            .map(|(name, raw)| (name.clone(), raw.into_model_spec(name)))
            .collect();
        let seeds = self
            .seeds
            .into_iter()
            .map(|(name, raw)| (name, raw.into_seed_spec()))
            .collect();
        Registry {
            version: self.version,
            import_order: self.import_order,
            models,
            seeds,
        }
    }
}

impl RawModelSpec {
    fn into_model_spec(self, name: String) -> ModelSpec {
        let mut fields: BTreeMap<String, FieldSpec> = self
            .fields
            .into_iter()
            .map(|(fname, raw)| (fname.clone(), raw.into_field_spec(fname)))
            .collect();

        // `id` is always present, always derived, even when the document
        // never spells it out explicitly.
        fields
            .entry("id".to_string())
            .or_insert_with(|| FieldSpec {
                name: "id".to_string(),
                field_type: Some(FieldType::String),
                required: false,
                optional: false,
                derived: true,
                default: None,
                transform: None,
                rule: None,
                map_from_seed: None,
                target: None,
            });

        ModelSpec {
            name,
            csv_filename: self.csv,
            headers: self.headers,
            id_template: self.id_template,
            fields,
        }
    }
}

impl RawFieldSpec {
    fn into_field_spec(self, name: String) -> FieldSpec {
        FieldSpec {
            name,
            field_type: self.field_type,
            required: self.required,
            optional: self.optional,
            derived: self.derived,
            default: self.default,
            transform: self.transform,
            rule: self.rule,
            map_from_seed: self.map_from_seed,
            target: self.target,
        }
    }
}

impl RawSeedSpec {
    fn into_seed_spec(self) -> SeedSpec {
        SeedSpec {
            canonical: self.canonical,
            synonyms: self.synonyms,
        }
    }
}
