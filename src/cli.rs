use cjifc_config::Config;
use clap::Parser;
use std::num::NonZeroUsize;
use std::path::PathBuf;

/// Convert CityJSON documents into zipped per-LOD IFC archives.
///
/// Every `<name>.city.json` under ROOT becomes `<name>.ifc.zip`. Files that
/// already have an archive are skipped, so an interrupted run can simply be
/// started again.
#[derive(Debug, Parser)]
#[command(version, about)]
pub struct Args {
    /// Directory to search recursively for CityJSON documents.
    #[arg(default_value = ".")]
    pub root: PathBuf,
    /// Accept documents that repeat an object key (the last one wins).
    #[arg(long)]
    pub ignore_duplicate_keys: bool,
    /// Decompress `<name>.city.json.gz` documents before converting.
    #[arg(long)]
    pub decompress: bool,
    /// Number of files converted at the same time.
    #[arg(short, long)]
    pub workers: Option<NonZeroUsize>,
    /// Give up on a file after this many seconds (0 to wait forever).
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,
    /// Configuration file (toml, yaml or json).
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,
    /// Converter program, by name or path.
    #[arg(long, value_name = "PROGRAM")]
    pub converter: Option<PathBuf>,
    /// Log debug output.
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    /// Flags take precedence over every configuration layer.
    pub fn apply(&self, config: &mut Config) {
        if self.ignore_duplicate_keys {
            config.ignore_duplicate_keys = true;
        }
        if self.decompress {
            config.decompress = true;
        }
        if let Some(workers) = self.workers {
            config.workers = Some(workers.get());
        }
        if let Some(timeout) = self.timeout {
            config.timeout = timeout;
        }
        if let Some(program) = &self.converter {
            config.converter.program = program.clone();
        }
    }
}
