//! Shared validation, mapping, ID-emission, and orchestration logic for one
//! export run: registry-driven rules and checks over an [`odx_frame::TabularFrame`],
//! producing per-model CSVs and a ZIP bundle, with every rejected row recorded
//! as an [`ExceptionRecord`] rather than failing the run.

mod emitter;
mod error;
mod exceptions;
mod fk_cache;
mod mapping;
mod orchestrator;
mod tasks;
mod validator;

pub use error::CoreError;
pub use exceptions::{ExceptionRecord, ExceptionsStore, InMemoryExceptionsStore};
pub use fk_cache::FkCache;
pub use mapping::{
    apply_mappings, CsvDirDatasetSource, DatasetSource, DefaultTransformCatalog, LambdaFn,
    LambdaRegistry, Mapping, TransformCatalog, TransformStep,
};
pub use orchestrator::{default_orchestrator, ExportOrchestrator, ExportResult, ModelExportSummary};
pub use tasks::{TaskRunner, TaskStatus};
pub use validator::{hint_for, ValidationResult, Validator};

pub use emitter::emit;
