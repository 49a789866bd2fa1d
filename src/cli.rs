//! CLI argument parsing using Clap.

use crate::bitmap::TestBitmap;
use clap::Parser;
use std::path::PathBuf;

/// Execute NVMe regression tests negotiated with the device
#[derive(Parser, Debug)]
#[command(name = "nvme-regress")]
#[command(version, about, long_about = None)]
#[command(after_help = "Examples:
  nvme-regress                     Negotiate, run, and report to the device
  nvme-regress -t 0x4              Run only test id 0x4 (if negotiated)
  nvme-regress -d                  Debug: run enabled tests, no device handshake
")]
pub struct Cli {
    /// Run tests in debug mode (no negotiation, log capture, or report)
    #[arg(short = 'd', long)]
    pub debug: bool,

    /// Restrict the run to these test ids (decimal or 0x-prefixed hex bitmap)
    #[arg(short = 't', long, value_parser = parse_test_ids)]
    pub test: Option<TestBitmap>,

    /// Settings file (defaults to $NVME_REGRESS_CONFIG, then ./nvme.json)
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,
}

fn parse_test_ids(text: &str) -> Result<TestBitmap, String> {
    let trimmed = text.trim();
    let parsed = if trimmed.starts_with("0x") || trimmed.starts_with("0X") {
        TestBitmap::parse_hex(trimmed)
    } else {
        trimmed.parse::<u32>().ok().map(TestBitmap::from_bits)
    };
    match parsed {
        Some(bitmap) if !bitmap.is_empty() => Ok(bitmap),
        Some(_) => Err("test id bitmap must not be zero".to_string()),
        None => Err(format!("invalid test id bitmap: {text}")),
    }
}
