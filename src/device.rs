//! Structured wrapper around the device management tool (`nvme`).
//!
//! Every call has the shape `<tool> [<vendor>] <opcode> <namespace> <args...>`.
//! The vendor flag is only passed to vendor-specific opcodes.

use crate::bandwidth::{
    BandwidthAccumulator, BandwidthSample, Direction, LatencySource, parse_latency,
};
use crate::bitmap::TestBitmap;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::shell::{CommandExecutor, ExecutionResult};
use regex::Regex;
use std::fmt;
use std::path::Path;
use std::sync::OnceLock;

/// Vendor opcode used for negotiation and status reporting.
pub const CONTROL_TEST_OPCODE: &str = "control-test";

/// Report flavor sent with `--control`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCode {
    /// Failure bitmap only.
    StatusOnly,
    /// Failure bitmap plus a bandwidth file.
    StatusAndBandwidth,
}

impl ControlCode {
    pub const fn value(self) -> u32 {
        match self {
            Self::StatusOnly => 0x1,
            Self::StatusAndBandwidth => 0x3,
        }
    }
}

impl fmt::Display for ControlCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.value())
    }
}

/// Bandwidth file reference attached to a `0x3` report.
#[derive(Debug, Clone, Copy)]
pub struct BandwidthAttachment<'a> {
    pub path: &'a Path,
    pub size: u64,
}

/// Block range and payload file for a standard read/write.
#[derive(Debug, Clone)]
pub struct IoRequest {
    pub start_block: u64,
    /// Zero-based block count, as the tool expects.
    pub block_count: u64,
    pub data_size: u64,
    pub data_file: String,
}

impl IoRequest {
    fn to_args(&self) -> Vec<String> {
        vec![
            format!("--start-block={}", self.start_block),
            format!("--block-count={}", self.block_count),
            format!("--data-size={}", self.data_size),
            format!("--data={}", self.data_file),
            "--latency".to_string(),
        ]
    }
}

/// Handle on one device namespace.
pub struct DeviceCli<'a> {
    executor: &'a dyn CommandExecutor,
    tool: String,
    vendor: String,
    namespace: String,
}

impl fmt::Debug for DeviceCli<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceCli")
            .field("tool", &self.tool)
            .field("vendor", &self.vendor)
            .field("namespace", &self.namespace)
            .finish_non_exhaustive()
    }
}

impl<'a> DeviceCli<'a> {
    pub fn new(
        executor: &'a dyn CommandExecutor,
        tool: impl Into<String>,
        vendor: impl Into<String>,
        namespace: impl Into<String>,
    ) -> Self {
        Self {
            executor,
            tool: tool.into(),
            vendor: vendor.into(),
            namespace: namespace.into(),
        }
    }

    pub fn from_config(executor: &'a dyn CommandExecutor, config: &Config) -> Self {
        Self::new(executor, config.tool(), config.vendor(), config.namespace())
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Invoke `opcode` against the namespace. `vendor_specific` adds the
    /// vendor flag in front of the opcode.
    pub fn invoke(
        &self,
        vendor_specific: bool,
        opcode: &str,
        args: Vec<String>,
        log_enabled: bool,
    ) -> Result<ExecutionResult> {
        let mut argv = Vec::with_capacity(args.len() + 3);
        if vendor_specific && !self.vendor.is_empty() {
            argv.push(self.vendor.clone());
        }
        argv.push(opcode.to_string());
        argv.push(self.namespace.clone());
        argv.extend(args);
        self.executor.execute(&self.tool, &argv, log_enabled)
    }

    /// Ask the device which of `requested` it supports.
    ///
    /// Anything short of a clean `Test IDs=<hex>` answer is read as "nothing
    /// supported"; this never fails.
    pub fn query_tests(&self, requested: TestBitmap) -> TestBitmap {
        let args = vec![
            "--query".to_string(),
            format!("--test-list={requested}"),
        ];
        let result = match self.invoke(true, CONTROL_TEST_OPCODE, args, true) {
            Ok(result) => result,
            Err(err) => {
                tracing::warn!("test query failed: {err}");
                return TestBitmap::EMPTY;
            }
        };
        if !result.success() {
            tracing::warn!(
                status = result.status,
                "test query exited nonzero: {}",
                result.joined()
            );
            return TestBitmap::EMPTY;
        }
        parse_test_ids(&result.joined()).unwrap_or_else(|| {
            tracing::warn!("*** No valid tests found from device");
            TestBitmap::EMPTY
        })
    }

    /// Send the final status report. A nonzero exit is fatal for the run.
    pub fn report_status(
        &self,
        control: ControlCode,
        failures: TestBitmap,
        bandwidth: Option<BandwidthAttachment<'_>>,
    ) -> Result<()> {
        let mut args = vec![format!("--control={control}"), format!("--status={failures}")];
        if let Some(attachment) = bandwidth.filter(|a| a.size > 0) {
            args.push(format!("--bwfile={}", attachment.path.display()));
            args.push(format!("--bwsize={}", attachment.size));
        }
        let result = self.invoke(true, CONTROL_TEST_OPCODE, args, true)?;
        if !result.success() {
            return Err(Error::device(
                CONTROL_TEST_OPCODE,
                format!("status report exited with {}: {}", result.status, result.joined()),
            ));
        }
        Ok(())
    }

    /// Standard read or write with latency reporting, folded into `acc`.
    /// Returns the tool's exit status.
    pub fn transfer(
        &self,
        request: &IoRequest,
        acc: &mut BandwidthAccumulator,
        bw_log: bool,
        cmd_log: bool,
    ) -> Result<i32> {
        let opcode = match acc.direction() {
            Direction::Read => "read",
            Direction::Write => "write",
        };
        let result = self.invoke(false, opcode, request.to_args(), cmd_log)?;
        let elapsed = parse_latency(&result.joined(), LatencySource::DeviceTool).unwrap_or(0.0);
        let sample = BandwidthSample::new(request.data_size, elapsed);
        Ok(acc.measure(bw_log, || (result.status, sample)))
    }
}

fn test_ids_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"Test\s+IDs=(\w+)").expect("test ids regex"))
}

/// Pull the supported-test bitmap out of a query response.
pub fn parse_test_ids(text: &str) -> Option<TestBitmap> {
    let caps = test_ids_regex().captures(text)?;
    TestBitmap::parse_hex(&caps[1])
}
