use std::path::PathBuf;

use serde::Deserialize;

/// Process-wide defaults, layered as environment < `.env` file < CLI flags.
/// CLI flags always win; see each subcommand's `Option` fields for the
/// override points.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default = "default_artifact_root")]
    pub artifact_root: PathBuf,
    pub registry_file: Option<PathBuf>,
    #[serde(default = "default_runner")]
    pub runner: String,
    #[serde(default = "default_workers")]
    pub workers: usize,
}

fn default_artifact_root() -> PathBuf {
    PathBuf::from("./artifacts")
}

fn default_runner() -> String {
    "inline".to_string()
}

fn default_workers() -> usize {
    4
}

impl Settings {
    /// Load from `.env` (if present) then the environment, with no
    /// hard failure when variables are absent — every field has a default
    /// except `registry_file`, which the caller must supply via env or flag.
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(config::Environment::default().try_parsing(true))
            .build()?;

        Ok(config.try_deserialize().unwrap_or_else(|_| Settings {
            artifact_root: default_artifact_root(),
            registry_file: None,
            runner: default_runner(),
            workers: default_workers(),
        }))
    }
}
