//! Encoding of aggregated results and the final status report.
//!
//! A bandwidth record is three 32-bit words rendered as 8 lowercase hex
//! characters each: test bit, write MB/s, read MB/s. Floats are sent as the
//! raw IEEE-754 single-precision bit pattern.

use crate::bitmap::TestBitmap;
use crate::device::{BandwidthAttachment, ControlCode, DeviceCli};
use crate::error::{Error, Result};
use crate::registry::TestRegistry;
use std::path::Path;

/// Hex characters per encoded word.
pub const WORD_HEX_LEN: usize = 8;

/// Encoded bytes per record: three words.
pub const RECORD_HEX_LEN: usize = 3 * WORD_HEX_LEN;

/// Write/read throughput measured by one passing test.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandwidthRecord {
    pub bit: TestBitmap,
    pub write_mbps: f32,
    pub read_mbps: f32,
}

impl BandwidthRecord {
    pub fn encode(&self) -> String {
        format!(
            "{:08x}{}{}",
            self.bit.bits(),
            float_to_hex(self.write_mbps),
            float_to_hex(self.read_mbps)
        )
    }

    /// Inverse of [`BandwidthRecord::encode`] for exactly one record.
    pub fn decode(text: &str) -> Result<Self> {
        if text.len() != RECORD_HEX_LEN || !text.is_ascii() {
            return Err(Error::encoding(format!(
                "record must be {RECORD_HEX_LEN} hex characters, got {text:?}"
            )));
        }
        let bits = parse_word(&text[..WORD_HEX_LEN])?;
        Ok(Self {
            bit: TestBitmap::from_bits(bits),
            write_mbps: hex_to_float(&text[WORD_HEX_LEN..2 * WORD_HEX_LEN])?,
            read_mbps: hex_to_float(&text[2 * WORD_HEX_LEN..])?,
        })
    }
}

/// Bit pattern of `value` as 8 lowercase hex characters.
///
/// Same result as packing the float little-endian and reading the bytes
/// back as a `u32`.
pub fn float_to_hex(value: f32) -> String {
    format!("{:08x}", value.to_bits())
}

/// Inverse of [`float_to_hex`]. Accepts exactly 8 hex digits.
pub fn hex_to_float(text: &str) -> Result<f32> {
    parse_word(text).map(f32::from_bits)
}

fn parse_word(text: &str) -> Result<u32> {
    if text.len() != WORD_HEX_LEN || !text.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(Error::encoding(format!(
            "expected {WORD_HEX_LEN} hex digits, got {text:?}"
        )));
    }
    u32::from_str_radix(text, 16).map_err(|e| Error::encoding(format!("{text:?}: {e}")))
}

/// Concatenate all records into one buffer, in order.
pub fn encode_records(records: &[BandwidthRecord]) -> String {
    records.iter().map(BandwidthRecord::encode).collect()
}

/// Split a bandwidth file's contents back into records.
pub fn decode_records(text: &str) -> Result<Vec<BandwidthRecord>> {
    if text.len() % RECORD_HEX_LEN != 0 {
        return Err(Error::encoding(format!(
            "{} bytes is not a whole number of {RECORD_HEX_LEN}-byte records",
            text.len()
        )));
    }
    if !text.is_ascii() {
        return Err(Error::encoding("bandwidth data is not ASCII"));
    }
    (0..text.len() / RECORD_HEX_LEN)
        .map(|i| BandwidthRecord::decode(&text[i * RECORD_HEX_LEN..(i + 1) * RECORD_HEX_LEN]))
        .collect()
}

/// What was sent to the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportOutcome {
    pub control: ControlCode,
    pub failures: TestBitmap,
    /// Encoded bandwidth bytes attached to the report (0 for status-only).
    pub bandwidth_bytes: u64,
}

/// The bandwidth file is attached only when something was written and the
/// file on disk holds at least that many bytes.
fn bandwidth_fits(expected: u64, on_disk: Option<u64>) -> bool {
    expected > 0 && on_disk.is_some_and(|size| size >= expected)
}

/// Write the bandwidth file (if there is anything to write) and send the
/// status report.
///
/// Falls back to a status-only report when the bandwidth file cannot be
/// written, is missing, or is shorter than expected. A device failure on the
/// report itself is fatal.
pub fn report(
    registry: &TestRegistry,
    records: &[BandwidthRecord],
    bw_path: &Path,
    device: &DeviceCli<'_>,
) -> Result<ReportOutcome> {
    let failures = registry.failure_bitmap();

    let mut expected: u64 = 0;
    if !records.is_empty() {
        let encoded = encode_records(records);
        match std::fs::write(bw_path, encoded.as_bytes()) {
            Ok(()) => {
                expected = encoded.len() as u64;
                tracing::debug!(records = records.len(), bytes = expected, path = %bw_path.display(), "wrote bandwidth file");
            }
            Err(err) => {
                tracing::warn!(path = %bw_path.display(), "could not write bandwidth file: {err}");
            }
        }
    }

    tracing::info!("[Report]: test status bitmap={failures}");

    let on_disk = std::fs::metadata(bw_path).map(|m| m.len()).ok();
    let attach = bandwidth_fits(expected, on_disk);
    let outcome = if attach {
        let attachment = BandwidthAttachment {
            path: bw_path,
            size: expected,
        };
        device.report_status(ControlCode::StatusAndBandwidth, failures, Some(attachment))?;
        ReportOutcome {
            control: ControlCode::StatusAndBandwidth,
            failures,
            bandwidth_bytes: expected,
        }
    } else {
        if !records.is_empty() {
            tracing::warn!(
                expected,
                on_disk = ?on_disk,
                "bandwidth file not usable, reporting status only"
            );
        }
        device.report_status(ControlCode::StatusOnly, failures, None)?;
        ReportOutcome {
            control: ControlCode::StatusOnly,
            failures,
            bandwidth_bytes: 0,
        }
    };
    Ok(outcome)
}
