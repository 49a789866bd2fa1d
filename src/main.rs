//! nvme-regress: negotiate, run and report NVMe regression tests.

#![forbid(unsafe_code)]

use std::io;

use anyhow::Result;
use clap::Parser;
use nvme_regress::cli::Cli;
use nvme_regress::config::Config;
use nvme_regress::regression::{Regression, RunOutcome};
use nvme_regress::shell::ShellExecutor;
use tracing_subscriber::EnvFilter;

fn main() {
    if let Err(err) = main_impl() {
        print_error_with_hints(&err);
        std::process::exit(1);
    }
}

fn main_impl() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    let config = Config::load(cli.config.as_deref())?;
    let executor = ShellExecutor;
    let mut regression = Regression::prepare(&config, &executor, cli.debug)?;
    if let Some(paths) = regression.paths() {
        tracing::info!(log = %paths.log_file.display(), "run directory {}", paths.dir.display());
    }

    match regression.execute(cli.test)? {
        RunOutcome::NothingSelected => {}
        RunOutcome::Debug { runs } => {
            tracing::info!(tests = runs.len(), "debug run finished");
        }
        RunOutcome::Reported { runs, report } => {
            let failed = regression
                .registry()
                .active()
                .filter(|t| t.failed)
                .count();
            tracing::info!(
                tests = runs.len(),
                failed,
                control = %report.control,
                status = %report.failures,
                bandwidth_bytes = report.bandwidth_bytes,
                "regression reported"
            );
        }
    }
    Ok(())
}

fn print_error_with_hints(err: &anyhow::Error) {
    for cause in err.chain() {
        if let Some(regress_error) = cause.downcast_ref::<nvme_regress::Error>() {
            eprint!(
                "{}",
                nvme_regress::error_hints::format_error_with_hints(regress_error)
            );
            return;
        }
    }

    eprintln!("{err}");
}
