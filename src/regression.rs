//! One regression run, end to end.
//!
//! negotiate → run → analyze → report. Debug runs skip everything except
//! running the enabled tests, and print their output instead of logging it.

use crate::analyzer;
use crate::bitmap::TestBitmap;
use crate::config::Config;
use crate::device::DeviceCli;
use crate::error::Result;
use crate::negotiate::negotiate;
use crate::registry::TestRegistry;
use crate::report::{self, ReportOutcome};
use crate::run_log::RunLog;
use crate::runner::{Runner, TestRun};
use crate::shell::CommandExecutor;
use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};

pub const LOG_FILE_NAME: &str = "nvme.log";
pub const BANDWIDTH_FILE_NAME: &str = "bw.log";

/// Per-run output locations: `<root>/<YYYYmmdd.HHMMSS>/{nvme.log,bw.log}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunPaths {
    pub dir: PathBuf,
    pub log_file: PathBuf,
    pub bw_file: PathBuf,
}

impl RunPaths {
    pub fn for_time(root: &Path, when: DateTime<Local>) -> Self {
        let dir = root.join(when.format("%Y%m%d.%H%M%S").to_string());
        Self {
            log_file: dir.join(LOG_FILE_NAME),
            bw_file: dir.join(BANDWIDTH_FILE_NAME),
            dir,
        }
    }

    /// Create the run directory under `root` for the current time.
    pub fn create(root: &Path) -> Result<Self> {
        let paths = Self::for_time(root, Local::now());
        std::fs::create_dir_all(&paths.dir)?;
        Ok(paths)
    }
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// The device supports none of the enabled tests; nothing ran.
    NothingSelected,
    /// Debug run: tests ran, nothing was analyzed or reported.
    Debug { runs: Vec<TestRun> },
    /// Full run with its report.
    Reported {
        runs: Vec<TestRun>,
        report: ReportOutcome,
    },
}

pub struct Regression<'a> {
    config: &'a Config,
    executor: &'a dyn CommandExecutor,
    registry: TestRegistry,
    /// `None` in debug mode.
    paths: Option<RunPaths>,
}

impl<'a> Regression<'a> {
    /// Set up a run. Outside debug mode this creates the run directory.
    pub fn prepare(
        config: &'a Config,
        executor: &'a dyn CommandExecutor,
        debug: bool,
    ) -> Result<Self> {
        let mut registry = TestRegistry::builtin();
        if let Some(names) = &config.enabled_tests {
            registry.enable_only(names)?;
        }
        let paths = if debug {
            None
        } else {
            Some(RunPaths::create(&config.log_root())?)
        };
        Ok(Self {
            config,
            executor,
            registry,
            paths,
        })
    }

    pub fn registry(&self) -> &TestRegistry {
        &self.registry
    }

    pub fn paths(&self) -> Option<&RunPaths> {
        self.paths.as_ref()
    }

    /// Run the regression. `restrict_to` limits which negotiated tests run.
    pub fn execute(&mut self, restrict_to: Option<TestBitmap>) -> Result<RunOutcome> {
        let runner = Runner::new(self.executor, self.config.framework());

        let Some(paths) = self.paths.clone() else {
            let mut log = RunLog::stdout();
            let runs = runner.run(&mut self.registry, &mut log, restrict_to)?;
            return Ok(RunOutcome::Debug { runs });
        };

        let device = DeviceCli::from_config(self.executor, self.config);
        if !negotiate(&mut self.registry, &device) {
            println!("No test selected by user");
            return Ok(RunOutcome::NothingSelected);
        }

        let runs = {
            let mut log = RunLog::append_to(&paths.log_file)?;
            runner.run(&mut self.registry, &mut log, restrict_to)?
        };

        let records = match std::fs::read_to_string(&paths.log_file) {
            Ok(text) => analyzer::analyze(&text, &mut self.registry),
            Err(err) => {
                tracing::warn!(path = %paths.log_file.display(), "run log unreadable: {err}");
                Vec::new()
            }
        };

        let report = report::report(&self.registry, &records, &paths.bw_file, &device)?;
        Ok(RunOutcome::Reported { runs, report })
    }
}
