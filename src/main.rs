mod cli;

use crate::cli::Args;
use cjifc_batch::error::ErrorKind as BatchErrorKind;
use cjifc_batch::{FileOutcome, PipelineContext};
use cjifc_config::Config;
use cjifc_convert::CommandConverter;
use cjifc_model::{CityJsonLoader, LoadOptions};
use clap::Parser;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

const EXIT_NOTHING_TO_DO: u8 = 1;
const EXIT_CONFIG: u8 = 2;

fn init_logging(verbose: bool) {
    let default = if verbose { "cjifc=debug,warn" } else { "cjifc=info,warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Why a run could not be set up.
enum SetupError {
    Config(cjifc_config::error::Error),
    Converter(cjifc_convert::error::Error),
}

fn context(args: &Args) -> Result<PipelineContext, SetupError> {
    let mut config = Config::load(args.config.as_deref()).map_err(SetupError::Config)?;
    args.apply(&mut config);
    config.validate().map_err(SetupError::Config)?;
    tracing::debug!(?config, "Configuration loaded");

    let converter =
        CommandConverter::new(&config.converter.program, config.converter.args.clone()).map_err(SetupError::Converter)?;
    Ok(PipelineContext {
        workers: config.workers(),
        timeout: config.timeout(),
        lods: config.lods,
        project: config.project,
        load_options: LoadOptions { ignore_duplicate_keys: config.ignore_duplicate_keys },
        decompress: config.decompress,
        loader: Arc::new(CityJsonLoader),
        converter: Arc::new(converter),
    })
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);

    let ctx = match context(&args) {
        Ok(ctx) => ctx,
        Err(SetupError::Config(e)) => {
            tracing::error!(error = ?e, "Invalid configuration");
            return ExitCode::from(EXIT_CONFIG);
        },
        Err(SetupError::Converter(e)) => {
            tracing::error!(error = ?e, "Converter unavailable");
            return ExitCode::from(EXIT_CONFIG);
        },
    };

    let report = match cjifc_batch::run(args.root.clone(), Arc::new(ctx)).await {
        Ok(report) => report,
        Err(e) => {
            match &*e {
                BatchErrorKind::DiscoveryEmpty(_) => tracing::error!("{}", *e),
                _ => tracing::error!(error = ?e, "Batch aborted"),
            }
            return ExitCode::from(EXIT_NOTHING_TO_DO);
        },
    };

    for outcome in report.outcomes.iter().filter(|o| o.is_failure()) {
        let reason = match outcome {
            FileOutcome::NoArtifacts { failed, .. } => format!("all {failed} LODs failed"),
            FileOutcome::FailedToLoad { error, .. } | FileOutcome::Failed { error, .. } => (**error).to_string(),
            FileOutcome::Skipped { .. } | FileOutcome::Archived(_) => continue,
        };
        tracing::warn!(path = %outcome.source().display(), %reason, "Not archived");
    }
    tracing::info!(
        processed = report.processed(),
        skipped = report.skipped(),
        failed = report.failed(),
        "All CityJSON files have been processed"
    );
    ExitCode::SUCCESS
}
