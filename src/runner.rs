//! Sequential execution of the active tests through the test framework.

use crate::bitmap::TestBitmap;
use crate::error::Result;
use crate::registry::TestRegistry;
use crate::run_log::RunLog;
use crate::shell::CommandExecutor;

/// Marker line written before each test's output. The analyzer splits the
/// log on it.
pub const TEST_MARKER: &str = "Test: ";

const SEPARATOR_WIDTH: usize = 70;

/// How one test subprocess ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestRun {
    pub name: String,
    /// Framework exit status; `None` when the framework could not be started.
    pub status: Option<i32>,
}

/// Drives the framework once per active test.
pub struct Runner<'a> {
    executor: &'a dyn CommandExecutor,
    framework: Vec<String>,
}

impl<'a> Runner<'a> {
    /// `framework` is the full argv prefix, program first; the test target
    /// is appended per test.
    pub fn new(executor: &'a dyn CommandExecutor, framework: Vec<String>) -> Self {
        Self {
            executor,
            framework,
        }
    }

    /// Run every active test in order, appending output to `log`.
    ///
    /// With `restrict_to`, the active set is first narrowed to tests whose
    /// bit intersects it; that narrowing stays in effect for reporting. A
    /// failing or unspawnable test never stops the run. Only log write
    /// errors are returned.
    pub fn run(
        &self,
        registry: &mut TestRegistry,
        log: &mut RunLog,
        restrict_to: Option<TestBitmap>,
    ) -> Result<Vec<TestRun>> {
        if let Some(restrict) = restrict_to {
            registry.retain_active(restrict);
        }
        log.line(&format!("Running {} tests in regression", registry.active_len()))?;

        let Some((program, base_args)) = self.framework.split_first() else {
            tracing::error!("test framework command is empty");
            return Ok(Vec::new());
        };

        let mut runs = Vec::with_capacity(registry.active_len());
        for test in registry.active() {
            log.line(&"-".repeat(SEPARATOR_WIDTH))?;
            log.line(&format!("{TEST_MARKER}{}", test.name))?;

            let mut args = base_args.to_vec();
            args.push(test.target.clone());
            let status = match self.executor.execute(program, &args, false) {
                Ok(result) => {
                    log.lines(&result.lines)?;
                    if !result.success() {
                        tracing::warn!(test = %test.name, status = result.status, "test exited nonzero");
                    }
                    Some(result.status)
                }
                Err(err) => {
                    tracing::error!(test = %test.name, "could not start test: {err}");
                    log.line(&format!("ERROR: {err}"))?;
                    None
                }
            };
            log.line("")?;
            log.flush()?;

            runs.push(TestRun {
                name: test.name.clone(),
                status,
            });
        }
        Ok(runs)
    }
}
