//! Throughput bookkeeping for repeated transfer operations.
//!
//! A [`BandwidthAccumulator`] belongs to one measurement stream (e.g. all
//! writes of one test). The summary line it prints is the format
//! [`crate::analyzer`] scrapes out of the run log.

use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

const MIB: f64 = 1024.0 * 1024.0;

/// Transfer direction, used as the label in summary lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Read,
    Write,
}

impl Direction {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Read => "Read",
            Self::Write => "Write",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Bytes moved by one operation and how long it took.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BandwidthSample {
    pub num_bytes: u64,
    pub elapsed_secs: f64,
}

impl BandwidthSample {
    pub const fn new(num_bytes: u64, elapsed_secs: f64) -> Self {
        Self {
            num_bytes,
            elapsed_secs,
        }
    }
}

/// Running totals for one measurement stream.
#[derive(Debug, Clone)]
pub struct BandwidthAccumulator {
    direction: Direction,
    total: BandwidthSample,
}

impl BandwidthAccumulator {
    pub const fn new(direction: Direction) -> Self {
        Self {
            direction,
            total: BandwidthSample {
                num_bytes: 0,
                elapsed_secs: 0.0,
            },
        }
    }

    pub const fn direction(&self) -> Direction {
        self.direction
    }

    pub const fn total(&self) -> BandwidthSample {
        self.total
    }

    /// Add one sample. Negative or NaN elapsed times count as zero.
    pub fn record(&mut self, sample: BandwidthSample) {
        self.total.num_bytes = self.total.num_bytes.saturating_add(sample.num_bytes);
        if sample.elapsed_secs > 0.0 {
            self.total.elapsed_secs += sample.elapsed_secs;
        }
    }

    /// Average throughput in MiB/s over everything recorded so far.
    pub fn average_mbps(&self) -> f64 {
        if self.total.elapsed_secs == 0.0 {
            return 0.0;
        }
        #[allow(clippy::cast_precision_loss)]
        let bytes = self.total.num_bytes as f64;
        bytes / (MIB * self.total.elapsed_secs)
    }

    pub fn summary_line(&self) -> String {
        format!(
            "Accumulated {}: latency = {} s, num_bytes = {}, average bandwidth = {} MB/s",
            self.direction,
            self.total.elapsed_secs,
            self.total.num_bytes,
            self.average_mbps()
        )
    }

    /// Run `op`, fold its sample into the totals and hand back its status
    /// untouched. With `log`, the summary line goes to stdout so it lands in
    /// the test framework's captured output.
    pub fn measure<F>(&mut self, log: bool, op: F) -> i32
    where
        F: FnOnce() -> (i32, BandwidthSample),
    {
        let (status, sample) = op();
        self.record(sample);
        if log {
            println!("{}", self.summary_line());
        }
        status
    }
}

/// Which tool produced a latency figure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LatencySource {
    /// `nvme read/write --latency`: `latency: <value> <unit>`
    DeviceTool,
    /// `dd`: `..., copied, <value> <unit>, ...`
    ByteCopy,
}

fn unit_scale(unit: &str) -> Option<f64> {
    match unit {
        "us" => Some(0.000_001),
        "ms" => Some(0.001),
        "s" => Some(1.0),
        _ => None,
    }
}

fn device_latency_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"latency:[^.\d]+([.\d]+)\s+(\w+)").expect("latency regex"))
}

fn copy_latency_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"copied,[^.\d]+([.\d]+)\s+(\w+)").expect("copied regex"))
}

/// Extract an elapsed time in seconds from tool output.
pub fn parse_latency(text: &str, source: LatencySource) -> Option<f64> {
    let re = match source {
        LatencySource::DeviceTool => device_latency_regex(),
        LatencySource::ByteCopy => copy_latency_regex(),
    };
    let Some(caps) = re.captures(text) else {
        tracing::warn!(?source, "no latency figure in output: {text}");
        return None;
    };
    let value: f64 = caps[1].parse().ok()?;
    let Some(scale) = unit_scale(&caps[2]) else {
        tracing::warn!(unit = &caps[2], "unknown latency unit");
        return None;
    };
    Some(value * scale)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_calls_average_to_three_mbps() {
        let mut acc = BandwidthAccumulator::new(Direction::Write);
        let first = acc.measure(false, || (0, BandwidthSample::new(1_048_576, 1.0)));
        let second = acc.measure(false, || (0, BandwidthSample::new(2_097_152, 1.0)));
        assert_eq!((first, second), (0, 0));
        assert!((acc.average_mbps() - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn zero_elapsed_reports_zero_bandwidth() {
        let mut acc = BandwidthAccumulator::new(Direction::Read);
        acc.record(BandwidthSample::new(4096, 0.0));
        assert!(acc.average_mbps().abs() < f64::EPSILON);
        assert_eq!(acc.total().num_bytes, 4096);
    }

    #[test]
    fn status_passes_through_unchanged() {
        let mut acc = BandwidthAccumulator::new(Direction::Read);
        assert_eq!(acc.measure(false, || (5, BandwidthSample::default())), 5);
    }

    #[test]
    fn accumulators_do_not_share_totals() {
        let mut reads = BandwidthAccumulator::new(Direction::Read);
        let mut writes = BandwidthAccumulator::new(Direction::Write);
        reads.record(BandwidthSample::new(10, 1.0));
        writes.record(BandwidthSample::new(99, 2.0));
        assert_eq!(reads.total(), BandwidthSample::new(10, 1.0));
        assert_eq!(writes.total(), BandwidthSample::new(99, 2.0));
    }

    #[test]
    fn summary_line_names_direction() {
        let mut acc = BandwidthAccumulator::new(Direction::Write);
        acc.record(BandwidthSample::new(1_048_576, 0.5));
        assert_eq!(
            acc.summary_line(),
            "Accumulated Write: latency = 0.5 s, num_bytes = 1048576, average bandwidth = 2 MB/s"
        );
    }

    #[test]
    fn parses_device_latency_units() {
        let us = parse_latency("write: Success latency: 250 us", LatencySource::DeviceTool);
        assert!((us.unwrap() - 0.000_25).abs() < 1e-12);
        let ms = parse_latency("latency: 1.5 ms", LatencySource::DeviceTool);
        assert!((ms.unwrap() - 0.0015).abs() < 1e-12);
    }

    #[test]
    fn parses_copy_latency() {
        let text = "131072 bytes (131 kB, 128 KiB) copied, 0.25 s, 524 kB/s";
        let secs = parse_latency(text, LatencySource::ByteCopy).unwrap();
        assert!((secs - 0.25).abs() < 1e-12);
    }

    #[test]
    fn unknown_unit_or_missing_figure_is_none() {
        assert_eq!(parse_latency("latency: 3 min", LatencySource::DeviceTool), None);
        assert_eq!(parse_latency("no timing here", LatencySource::DeviceTool), None);
    }
}
