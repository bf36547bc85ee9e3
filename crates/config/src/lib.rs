//! Layered configuration.
//!
//! Values are resolved in increasing order of precedence:
//!
//! 1. built-in defaults ([`Config::default`]),
//! 2. the per-user configuration directory (`config.toml`, `config.yaml` or
//!    `config.json`, whichever exist),
//! 3. an explicitly requested file,
//! 4. `CJIFC_` environment variables, with `__` separating nested keys
//!    (`CJIFC_PROJECT__NAME_SITE=...`).
//!
//! Command-line flags are applied on top by the binary.

pub mod error;

use crate::error::{ErrorKind, Result};
use cjifc_convert::{DEFAULT_ARGS, DEFAULT_PROGRAM, Lod, ProjectMetadata};
use directories::ProjectDirs;
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::time::Duration;

const ENV_PREFIX: &str = "CJIFC_";
const DEFAULT_TIMEOUT_SECS: u64 = 60 * 60;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Levels of detail exported for every document, in order.
    pub lods: Vec<Lod>,
    pub project: ProjectMetadata,
    /// Worker pool size; defaults to the available parallelism.
    pub workers: Option<usize>,
    /// Per-file timeout in seconds. `0` disables the timeout.
    pub timeout: u64,
    /// Tolerate duplicate object keys while loading documents.
    pub ignore_duplicate_keys: bool,
    /// Decompress `.city.json.gz` sources before processing.
    pub decompress: bool,
    pub converter: ConverterConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConverterConfig {
    /// Program name (searched on `PATH`) or path.
    pub program: PathBuf,
    /// Argument templates, see `cjifc_convert::CommandConverter`.
    pub args: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            lods: Lod::defaults(),
            project: ProjectMetadata::default(),
            workers: None,
            timeout: DEFAULT_TIMEOUT_SECS,
            ignore_duplicate_keys: false,
            decompress: false,
            converter: ConverterConfig::default(),
        }
    }
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            program: PathBuf::from(DEFAULT_PROGRAM),
            args: DEFAULT_ARGS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl Config {
    /// Resolve configuration from every layer, then validate it.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        Self::from_figment(Self::figment(explicit)?)
    }

    /// Build the provider stack without extracting it.
    pub fn figment(explicit: Option<&Path>) -> Result<Figment> {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if let Some(dirs) = ProjectDirs::from("", "", "cjifc") {
            let dir = dirs.config_dir();
            tracing::debug!(dir = %dir.display(), "Looking for user configuration");
            figment = figment
                .merge(Toml::file(dir.join("config.toml")))
                .merge(Yaml::file(dir.join("config.yaml")))
                .merge(Json::file(dir.join("config.json")));
        }
        if let Some(path) = explicit {
            if !path.is_file() {
                exn::bail!(ErrorKind::NotFound(path.to_path_buf()));
            }
            figment = match path.extension().and_then(|e| e.to_str()).map(str::to_lowercase).as_deref() {
                Some("toml") => figment.merge(Toml::file(path)),
                Some("yaml" | "yml") => figment.merge(Yaml::file(path)),
                Some("json") => figment.merge(Json::file(path)),
                _ => exn::bail!(ErrorKind::UnsupportedFormat(path.to_path_buf())),
            };
        }
        Ok(figment.merge(Env::prefixed(ENV_PREFIX).split("__")))
    }

    pub fn from_figment(figment: Figment) -> Result<Self> {
        let config: Config = figment.extract().map_err(|e| exn::Exn::from(ErrorKind::Invalid(e.to_string())))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.lods.is_empty() {
            exn::bail!(ErrorKind::NoLods);
        }
        let mut seen = HashSet::new();
        if let Some(duplicate) = self.lods.iter().find(|lod| !seen.insert(*lod)) {
            exn::bail!(ErrorKind::DuplicateLod(duplicate.to_string()));
        }
        if self.workers == Some(0) {
            exn::bail!(ErrorKind::NoWorkers);
        }
        Ok(())
    }

    /// Resolved worker pool size.
    pub fn workers(&self) -> usize {
        self.workers
            .or_else(|| std::thread::available_parallelism().ok().map(NonZeroUsize::get))
            .unwrap_or(1)
    }

    /// Resolved per-file timeout.
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout > 0).then(|| Duration::from_secs(self.timeout))
    }
}
