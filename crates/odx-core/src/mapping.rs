use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::Arc;

use odx_frame::TabularFrame;

use crate::error::CoreError;

/// One named transform in a mapping's inline chain. Grounded on the
/// upstream transform catalog (trim/case/phone/email/currency/string
/// utilities) — a fixed, named vocabulary, never arbitrary code.
#[derive(Debug, Clone, PartialEq)]
pub enum TransformStep {
    Trim,
    Lower,
    Upper,
    Titlecase,
    PhoneNormalize,
    EmailNormalize,
    CurrencyToFloat,
    Split { sep: String, index: usize },
    Map { table: BTreeMap<String, String> },
    DefaultIfEmpty(String),
    AddPrefix(String),
    AddSuffix(String),
    ParseDate,
    ParseBool,
    Round(u32),
    Replace { from: String, to: String },
    RegexExtract { pattern: String, group: usize },
}

/// Applies a [`TransformStep`] to one cell. A trait so the CLI/tests can
/// swap in a stub catalog without pulling in the full named vocabulary.
pub trait TransformCatalog: Send + Sync {
    fn apply(&self, step: &TransformStep, value: Option<&str>) -> Result<Option<String>, CoreError>;
}

/// The catalog named in the external interfaces: every [`TransformStep`]
/// variant implemented directly, no dynamic dispatch by string name beyond
/// the enum itself.
pub struct DefaultTransformCatalog;

impl TransformCatalog for DefaultTransformCatalog {
    fn apply(&self, step: &TransformStep, value: Option<&str>) -> Result<Option<String>, CoreError> {
        let Some(value) = value else {
            return match step {
                TransformStep::DefaultIfEmpty(default) => Ok(Some(default.clone())),
                _ => Ok(None),
            };
        };
        if value.is_empty() {
            if let TransformStep::DefaultIfEmpty(default) = step {
                return Ok(Some(default.clone()));
            }
        }

        let result = match step {
            TransformStep::Trim => value.trim().to_string(),
            TransformStep::Lower => value.to_lowercase(),
            TransformStep::Upper => value.to_uppercase(),
            TransformStep::Titlecase => titlecase(value),
            TransformStep::PhoneNormalize => odx_normalize::normalize_phone_us(value)
                .unwrap_or_else(|_| value.to_string()),
            TransformStep::EmailNormalize => odx_normalize::normalize_email(value)
                .unwrap_or_else(|_| value.to_string()),
            TransformStep::CurrencyToFloat => currency_to_float(value),
            TransformStep::Split { sep, index } => {
                value.split(sep.as_str()).nth(*index).unwrap_or_default().to_string()
            }
            TransformStep::Map { table } => table.get(value).cloned().unwrap_or_else(|| value.to_string()),
            TransformStep::DefaultIfEmpty(_) => value.to_string(),
            TransformStep::AddPrefix(prefix) => format!("{prefix}{value}"),
            TransformStep::AddSuffix(suffix) => format!("{value}{suffix}"),
            TransformStep::ParseDate => odx_normalize::normalize_date_any(value)
                .unwrap_or_else(|_| value.to_string()),
            TransformStep::ParseBool => {
                odx_normalize::coerce_bool(value).unwrap_or_else(|_| value.to_string())
            }
            TransformStep::Round(digits) => round_text(value, *digits).unwrap_or_else(|| value.to_string()),
            TransformStep::Replace { from, to } => value.replace(from.as_str(), to),
            TransformStep::RegexExtract { pattern, group } => {
                let re = regex::Regex::new(pattern)
                    .map_err(|e| CoreError::OutputIntegrity(format!("invalid regex '{pattern}': {e}")))?;
                re.captures(value)
                    .and_then(|caps| caps.get(*group))
                    .map(|m| m.as_str().to_string())
                    .unwrap_or_default()
            }
        };
        Ok(Some(result))
    }
}

fn titlecase(value: &str) -> String {
    value
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn currency_to_float(value: &str) -> String {
    let cleaned: String = value.chars().filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-').collect();
    cleaned.parse::<f64>().map(|n| n.to_string()).unwrap_or_else(|_| "0".to_string())
}

fn round_text(value: &str, digits: u32) -> Option<String> {
    let n: f64 = value.parse().ok()?;
    let factor = 10f64.powi(digits as i32);
    Some(((n * factor).round() / factor).to_string())
}

/// A registry of named per-row closures for `lambda`-typed mappings.
/// Deliberately not arbitrary code: only closures registered ahead of time
/// by name can be dispatched (see SPEC_FULL.md's "Lambda mappings" note).
pub type LambdaFn = Arc<dyn Fn(&BTreeMap<String, String>) -> Option<String> + Send + Sync>;

#[derive(Default, Clone)]
pub struct LambdaRegistry {
    lambdas: HashMap<String, LambdaFn>,
}

impl LambdaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, f: LambdaFn) {
        self.lambdas.insert(name.into(), f);
    }

    pub fn get(&self, name: &str) -> Option<&LambdaFn> {
        self.lambdas.get(name)
    }
}

/// One field's mapping from a source column to a target field, with an
/// inline transform chain and/or a named lambda.
#[derive(Debug, Clone, PartialEq)]
pub struct Mapping {
    pub target_field: String,
    pub source_field: Option<String>,
    pub transforms: Vec<TransformStep>,
    pub lambda_name: Option<String>,
}

impl Mapping {
    pub fn rename(source_field: impl Into<String>, target_field: impl Into<String>) -> Self {
        Self {
            target_field: target_field.into(),
            source_field: Some(source_field.into()),
            transforms: Vec::new(),
            lambda_name: None,
        }
    }
}

/// Rename source columns to target fields and apply each mapping's inline
/// transform chain, then dispatch any `lambda`-typed mappings against the
/// already-mapped row. Mirrors the orchestrator's §4.9(d) responsibility.
pub fn apply_mappings(
    frame: &mut TabularFrame,
    mappings: &[Mapping],
    catalog: &dyn TransformCatalog,
    lambdas: &LambdaRegistry,
) -> Result<(), CoreError> {
    for mapping in mappings {
        if mapping.lambda_name.is_some() {
            continue;
        }
        let Some(source) = &mapping.source_field else { continue };
        if source != &mapping.target_field && frame.has_column(source) {
            frame.rename(source, &mapping.target_field)?;
        }
        if !mapping.transforms.is_empty() && frame.has_column(&mapping.target_field) {
            let height = frame.len();
            let mut values = Vec::with_capacity(height);
            for row in 0..height {
                let mut cell = frame.get(&mapping.target_field, row).map(str::to_string);
                for step in &mapping.transforms {
                    cell = catalog.apply(step, cell.as_deref())?;
                }
                values.push(cell);
            }
            frame.with_column(&mapping.target_field, values);
        }
    }

    let lambda_mappings: Vec<&Mapping> = mappings.iter().filter(|m| m.lambda_name.is_some()).collect();
    if !lambda_mappings.is_empty() {
        let rows: Vec<BTreeMap<String, String>> = frame.iter_rows_named().collect();
        for mapping in lambda_mappings {
            let name = mapping.lambda_name.as_deref().unwrap_or_default();
            let lambda = lambdas
                .get(name)
                .ok_or_else(|| CoreError::OutputIntegrity(format!("unknown lambda mapping '{name}'")))?;
            let values: Vec<Option<String>> = rows.iter().map(|row| lambda(row)).collect();
            frame.with_column(&mapping.target_field, values);
        }
    }

    Ok(())
}

/// The trait boundary to the external Dataset collaborator. A real
/// implementation would pull from the profiling/mapping-UI database; this
/// crate only needs "give me a frame for this model given these mappings".
pub trait DatasetSource: Send + Sync {
    fn frame_for(&self, dataset_id: &str, model: &str) -> Result<TabularFrame, CoreError>;
}

/// Reads one pre-mapped CSV per model from `<dir>/<dataset_id>/<model>.csv`.
/// A deliberately simple stand-in for the CLI and tests, since upload,
/// profiling, and the mapping UI are out of scope for this core.
pub struct CsvDirDatasetSource {
    dir: PathBuf,
}

impl CsvDirDatasetSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl DatasetSource for CsvDirDatasetSource {
    fn frame_for(&self, dataset_id: &str, model: &str) -> Result<TabularFrame, CoreError> {
        let path = self.dir.join(dataset_id).join(format!("{model}.csv"));
        if !path.exists() {
            return Ok(TabularFrame::from_rows(Vec::new(), Vec::new()));
        }
        Ok(TabularFrame::read_csv(path)?)
    }
}
