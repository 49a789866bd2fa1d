//! Error hints: mapping from error variants to operator-facing remediation.
//!
//! Each variant maps to a one-line summary and up to two actionable hints.
//! Hints must stay stable; tests match on them.

use crate::error::Error;
use std::fmt::Write as _;

/// A remediation hint for an error.
#[derive(Debug, Clone)]
pub struct ErrorHint {
    /// Brief 1-line summary of the error category.
    pub summary: &'static str,
    /// Actionable hints for the operator (0-2 items).
    pub hints: &'static [&'static str],
}

/// Get remediation hints for an error variant.
pub fn hints_for_error(error: &Error) -> ErrorHint {
    match error {
        Error::Config(_) => ErrorHint {
            summary: "Invalid configuration",
            hints: &[
                "Check nvme.json (or the file named by --config / NVME_REGRESS_CONFIG)",
                "Remove the file to fall back to built-in defaults",
            ],
        },
        Error::Registry(_) => ErrorHint {
            summary: "Test catalog is inconsistent",
            hints: &["Every test needs a unique name and a unique single-bit id"],
        },
        Error::Spawn { program, .. } => spawn_hints(program),
        Error::Device { .. } => ErrorHint {
            summary: "The device rejected the command",
            hints: &[
                "Run the logged EXEC_SHELL_CMD line by hand to see the tool's output",
                "Check that the namespace in nvme.json (ns1) is the device under test",
            ],
        },
        Error::Encoding(_) => ErrorHint {
            summary: "Bandwidth data could not be encoded",
            hints: &[],
        },
        Error::Io(err) => io_hints(err),
        Error::Json { source, .. } => json_hints(source),
    }
}

fn spawn_hints(program: &str) -> ErrorHint {
    if program == "nvme" {
        return ErrorHint {
            summary: "nvme-cli is not available",
            hints: &[
                "Install nvme-cli or set \"tool\" in nvme.json",
                "Run as a user allowed to open the NVMe device",
            ],
        };
    }
    ErrorHint {
        summary: "External program could not be started",
        hints: &["Verify the program is installed and on PATH"],
    }
}

fn io_hints(err: &std::io::Error) -> ErrorHint {
    match err.kind() {
        std::io::ErrorKind::NotFound => ErrorHint {
            summary: "File or directory not found",
            hints: &["Verify the path exists"],
        },
        std::io::ErrorKind::PermissionDenied => ErrorHint {
            summary: "Permission denied",
            hints: &["Check permissions on the log directory and the device node"],
        },
        _ => ErrorHint {
            summary: "I/O error",
            hints: &["Check file system and permissions"],
        },
    }
}

fn json_hints(err: &serde_json::Error) -> ErrorHint {
    if err.is_syntax() {
        return ErrorHint {
            summary: "Invalid JSON syntax",
            hints: &["Check for missing commas, brackets, or quotes"],
        };
    }
    ErrorHint {
        summary: "JSON data does not match expected structure",
        hints: &["Check that JSON fields match expected schema"],
    }
}

/// Format an error with its hints for terminal output.
pub fn format_error_with_hints(error: &Error) -> String {
    let hint = hints_for_error(error);
    let mut output = String::new();

    let _ = writeln!(&mut output, "Error: {error}");

    if !error.to_string().contains(hint.summary) {
        output.push('\n');
        output.push_str(hint.summary);
        output.push('\n');
    }

    if !hint.hints.is_empty() {
        output.push_str("\nSuggestions:\n");
        for &h in hint.hints {
            let _ = writeln!(&mut output, "  - {h}");
        }
    }

    output
}
