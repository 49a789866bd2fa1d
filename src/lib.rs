//! nvme_regress - regression orchestrator for NVMe devices
//!
//! Negotiates a test bitmap with the device through `nvme-cli`, runs each
//! selected test as an isolated framework subprocess, scrapes the run log
//! for verdicts and bandwidth figures, and reports the results back to the
//! device as a failure bitmap plus a hex-encoded bandwidth file.
//!
//! Pipeline, leaf-first:
//! - [`shell`]: synchronous subprocess execution with merged output
//! - [`bandwidth`]: throughput accumulation and latency parsing
//! - [`registry`] / [`bitmap`]: the test catalog and its bitmask domain
//! - [`device`]: the `nvme` tool wrapper
//! - [`negotiate`], [`runner`], [`analyzer`], [`report`]: the run stages
//! - [`regression`]: one run, end to end

#![forbid(unsafe_code)]
#![cfg_attr(
    test,
    allow(
        clippy::float_cmp,
        clippy::uninlined_format_args,
        clippy::missing_const_for_fn
    )
)]
#![allow(
    clippy::must_use_candidate,
    clippy::doc_markdown,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions
)]

pub mod analyzer;
pub mod bandwidth;
pub mod bitmap;
pub mod cli;
pub mod config;
pub mod device;
pub mod error;
pub mod error_hints;
pub mod negotiate;
pub mod regression;
pub mod registry;
pub mod report;
pub mod run_log;
pub mod runner;
pub mod shell;

pub use error::{Error, Result as RegressResult};
