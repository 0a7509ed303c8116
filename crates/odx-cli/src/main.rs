mod settings;

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

use odx_core::{default_orchestrator, ExportResult, InMemoryExceptionsStore, Mapping, TaskRunner};
use odx_registry::RegistryLoader;

use settings::Settings;

#[derive(Parser, Debug)]
#[command(name = "odx", about = "Deterministic ERP-import export pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load a registry document and report every validation issue found.
    Lint {
        /// Path to the registry YAML. Falls back to $REGISTRY_FILE.
        registry: Option<PathBuf>,
    },
    /// Run one export end-to-end against a directory of pre-mapped CSVs.
    Export {
        #[arg(long)]
        registry: Option<PathBuf>,
        #[arg(long = "dataset-dir")]
        dataset_dir: PathBuf,
        #[arg(long = "dataset-id")]
        dataset_id: String,
        #[arg(long = "artifact-root")]
        artifact_root: Option<PathBuf>,
        #[arg(long, value_parser = ["inline", "thread"])]
        runner: Option<String>,
        #[arg(long)]
        workers: Option<usize>,
        /// Column mapped 1:1 into the target model, `model:field`. May be
        /// repeated; every other field in the source CSV is dropped.
        #[arg(long = "map", value_name = "model:field")]
        maps: Vec<String>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let settings = Settings::load()?;

    match cli.command {
        Command::Lint { registry } => run_lint(resolve_registry_path(registry, &settings)?),
        Command::Export {
            registry,
            dataset_dir,
            dataset_id,
            artifact_root,
            runner,
            workers,
            maps,
        } => run_export(
            resolve_registry_path(registry, &settings)?,
            dataset_dir,
            dataset_id,
            artifact_root.unwrap_or(settings.artifact_root),
            runner.unwrap_or(settings.runner),
            workers.unwrap_or(settings.workers),
            maps,
        ),
    }
}

fn resolve_registry_path(cli_value: Option<PathBuf>, settings: &Settings) -> Result<PathBuf> {
    cli_value
        .or_else(|| settings.registry_file.clone())
        .context("no registry path given (pass it, or set REGISTRY_FILE)")
}

fn run_lint(registry_path: PathBuf) -> Result<()> {
    let loader = RegistryLoader::new(registry_path.clone());
    match loader.load() {
        Ok(registry) => {
            println!("registry OK: {} model(s), version {}", registry.models.len(), registry.version);
            for name in &registry.import_order {
                println!("  - {name}");
            }
            Ok(())
        }
        Err(err) => {
            println!("registry invalid: {}", registry_path.display());
            println!("  {err}");
            bail!("lint failed");
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn run_export(
    registry_path: PathBuf,
    dataset_dir: PathBuf,
    dataset_id: String,
    artifact_root: PathBuf,
    runner: String,
    workers: usize,
    maps: Vec<String>,
) -> Result<()> {
    if !matches!(runner.as_str(), "inline" | "thread") {
        bail!("--runner must be 'inline' or 'thread', got '{runner}'");
    }
    tracing::info!(runner, workers, "starting export");

    let loader = RegistryLoader::new(registry_path);
    let registry = loader.load().context("failed to load registry")?;

    let mut mappings_by_model: BTreeMap<String, Vec<Mapping>> = BTreeMap::new();
    for model in &registry.import_order {
        let Some(spec) = registry.model(model) else { continue };
        let fields: Vec<Mapping> = spec
            .fields
            .values()
            .filter(|f| !f.derived)
            .map(|f| Mapping::rename(f.name.clone(), f.name.clone()))
            .collect();
        if !fields.is_empty() {
            mappings_by_model.insert(model.clone(), fields);
        }
    }
    for raw in &maps {
        let Some((model, field)) = raw.split_once(':') else {
            bail!("--map must be 'model:field', got '{raw}'");
        };
        mappings_by_model
            .entry(model.to_string())
            .or_default()
            .push(Mapping::rename(field, field));
    }

    let exceptions = Arc::new(InMemoryExceptionsStore::new());
    let orchestrator = Arc::new(default_orchestrator(exceptions.clone(), dataset_dir, &artifact_root));

    // The export itself always runs to completion before this function
    // returns; `--runner`/`--workers` only select which TaskRunner mode
    // drives it, matching the ports/adapters split the pipeline exposes to
    // a future HTTP surface.
    let task_runner: TaskRunner<ExportResult> = if runner == "thread" {
        TaskRunner::thread_pool(workers)
    } else {
        TaskRunner::inline()
    };

    let task_id = task_runner.submit(
        move || orchestrator.export(&loader, &dataset_id, &mappings_by_model).map_err(|e| e.to_string()),
        None,
    );
    let result = task_runner
        .result(&task_id, None)
        .map_err(|e| anyhow::anyhow!(e))?;

    println!("export complete: {}", result.zip_path.display());
    println!("  models emitted: {}", result.models.len());
    for summary in &result.models {
        println!(
            "    {} -> {} ({} rows, {} exceptions)",
            summary.model, summary.csv_filename, summary.rows_emitted, summary.exceptions_count
        );
    }
    println!("  total rows: {}", result.total_emitted);
    println!("  total exceptions: {}", result.total_exceptions);
    for (code, count) in &result.exceptions_by_code {
        println!("    {code}: {count}");
    }

    Ok(())
}
