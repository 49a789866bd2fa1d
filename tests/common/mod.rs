//! Common test infrastructure for `nvme_regress` integration tests.
//!
//! [`ScriptedDevice`] stands in for both the `nvme` tool and the test
//! framework, answering each call from a closure and recording the argv.

use nvme_regress::error::Result;
use nvme_regress::shell::{CommandExecutor, ExecutionResult};
use std::cell::RefCell;

type Responder = Box<dyn Fn(&str, &[String]) -> ExecutionResult>;

pub struct ScriptedDevice {
    responder: Responder,
    calls: RefCell<Vec<Vec<String>>>,
}

#[allow(dead_code)]
impl ScriptedDevice {
    pub fn new(responder: impl Fn(&str, &[String]) -> ExecutionResult + 'static) -> Self {
        Self {
            responder: Box::new(responder),
            calls: RefCell::new(Vec::new()),
        }
    }

    /// Every call so far as `[program, args...]`.
    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.borrow().clone()
    }

    /// Calls whose argv contains `needle`.
    pub fn calls_with(&self, needle: &str) -> Vec<Vec<String>> {
        self.calls
            .borrow()
            .iter()
            .filter(|argv| argv.iter().any(|a| a == needle))
            .cloned()
            .collect()
    }
}

impl CommandExecutor for ScriptedDevice {
    fn execute(&self, program: &str, args: &[String], _log: bool) -> Result<ExecutionResult> {
        let mut argv = vec![program.to_string()];
        argv.extend(args.iter().cloned());
        self.calls.borrow_mut().push(argv);
        Ok((self.responder)(program, args))
    }
}

#[allow(dead_code)]
pub fn output(status: i32, lines: &[&str]) -> ExecutionResult {
    ExecutionResult {
        status,
        lines: lines.iter().map(|s| (*s).to_string()).collect(),
    }
}

/// Framework output for one passing test, optionally with bandwidth lines.
#[allow(dead_code)]
pub fn passing_output(bandwidth: Option<(&str, &str)>) -> ExecutionResult {
    let mut lines = Vec::new();
    if let Some((write, read)) = bandwidth {
        lines.push(format!(
            "Accumulated Write: latency = 1 s, num_bytes = 1048576, average bandwidth = {write} MB/s"
        ));
        lines.push(format!(
            "Accumulated Read: latency = 1 s, num_bytes = 1048576, average bandwidth = {read} MB/s"
        ));
    }
    lines.push("ok".to_string());
    lines.push("-".repeat(70));
    lines.push("Ran 1 test in 0.123s".to_string());
    lines.push(String::new());
    lines.push("OK".to_string());
    ExecutionResult { status: 0, lines }
}

#[allow(dead_code)]
pub fn failing_output() -> ExecutionResult {
    output(
        1,
        &[
            "FAIL: test_init (test_nvme_admin.TestNvmeAdmin)",
            "AssertionError: 'X' != 'MARVELL - Zao'",
            "Ran 1 test in 0.050s",
            "",
            "FAILED (failures=1)",
        ],
    )
}
