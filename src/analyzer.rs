//! Run-log scraping: per-test verdicts and bandwidth figures.
//!
//! Grammar, per chunk of the log that follows a `Test: ` marker:
//!
//! - the chunk starts with the test name (`\w+`);
//! - a `Ran 1 test in ...` line whose *next* line contains `OK` or `FAILED`
//!   gives the verdict;
//! - in a passing chunk, `Write...bandwidth = <num>` followed later by
//!   `Read...bandwidth = <num>` gives the bandwidth pair.
//!
//! Anything that does not fit is a miss, never an error.

use crate::registry::TestRegistry;
use crate::report::BandwidthRecord;
use crate::runner::TEST_MARKER;
use regex::Regex;
use std::sync::OnceLock;

/// Outcome of a single-test framework run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Ok,
    Failed,
}

/// What one log chunk says about one test.
#[derive(Debug, Clone, PartialEq)]
pub struct TestChunk {
    pub name: String,
    pub verdict: Option<Verdict>,
    /// `(write, read)` in MB/s; only present for passing chunks.
    pub bandwidth: Option<(f32, f32)>,
}

fn name_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\w+)").expect("test name regex"))
}

fn verdict_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"Ran 1 test in.*\n.*?(FAILED|OK)").expect("verdict regex"))
}

fn bandwidth_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"Write.*bandwidth = ([.\d]+)[\s\S]*?Read.*bandwidth = ([.\d]+)")
            .expect("bandwidth regex")
    })
}

/// Parse a decimal figure the way the device expects it: as a double,
/// then narrowed to single precision.
fn parse_mbps(text: &str) -> Option<f32> {
    let value: f64 = text.parse().ok()?;
    #[allow(clippy::cast_possible_truncation)]
    let narrowed = value as f32;
    Some(narrowed)
}

/// Split the log on test markers and parse each chunk. Text before the
/// first marker is ignored.
pub fn parse_chunks(log_text: &str) -> Vec<TestChunk> {
    log_text
        .split(TEST_MARKER)
        .skip(1)
        .filter_map(parse_chunk)
        .collect()
}

fn parse_chunk(chunk: &str) -> Option<TestChunk> {
    let name = name_regex().captures(chunk)?[1].to_string();
    let verdict = verdict_regex()
        .captures(chunk)
        .map(|caps| match &caps[1] {
            "FAILED" => Verdict::Failed,
            _ => Verdict::Ok,
        });
    let bandwidth = if verdict == Some(Verdict::Ok) {
        bandwidth_regex().captures(chunk).and_then(|caps| {
            let write = parse_mbps(&caps[1])?;
            let read = parse_mbps(&caps[2])?;
            Some((write, read))
        })
    } else {
        None
    };
    Some(TestChunk {
        name,
        verdict,
        bandwidth,
    })
}

/// Apply the log to the registry's active tests and collect bandwidth
/// records in log order.
///
/// A test without a verdict keeps its previous `failed` flag. When a name
/// appears in several chunks the last verdict wins. Chunks naming tests
/// outside the active set are dropped.
pub fn analyze(log_text: &str, registry: &mut TestRegistry) -> Vec<BandwidthRecord> {
    let mut records = Vec::new();
    for chunk in parse_chunks(log_text) {
        let Some(test) = registry.active_by_name_mut(&chunk.name) else {
            tracing::debug!(name = %chunk.name, "log names a test outside the active set");
            continue;
        };
        if let Some(verdict) = chunk.verdict {
            test.failed = verdict == Verdict::Failed;
        }
        if let Some((write_mbps, read_mbps)) = chunk.bandwidth {
            records.push(BandwidthRecord {
                bit: test.bit(),
                write_mbps,
                read_mbps,
            });
        }
    }
    records
}
