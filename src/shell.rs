//! Synchronous external command execution with merged output.
//!
//! Programs are always spawned from an argument vector; nothing here goes
//! through a shell, so paths and hex arguments never need quoting.

use crate::error::{Error, Result};
use std::io::Read;
use std::process::{Command, Stdio};
use std::sync::mpsc;
use std::thread;

/// Exit status and captured output of one finished process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionResult {
    /// Process exit code; `-1` when the process was killed by a signal.
    pub status: i32,
    /// Merged stdout/stderr, one entry per line, trailing whitespace removed.
    pub lines: Vec<String>,
}

impl ExecutionResult {
    pub const fn success(&self) -> bool {
        self.status == 0
    }

    /// All lines joined with single spaces, the form the device parsers scan.
    pub fn joined(&self) -> String {
        self.lines.join(" ")
    }
}

/// Runs one program to completion.
///
/// A nonzero exit is reported through [`ExecutionResult::status`]; only a
/// failure to start the program is an `Err`.
pub trait CommandExecutor {
    fn execute(&self, program: &str, args: &[String], log_enabled: bool) -> Result<ExecutionResult>;
}

/// [`CommandExecutor`] backed by real child processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShellExecutor;

impl CommandExecutor for ShellExecutor {
    fn execute(&self, program: &str, args: &[String], log_enabled: bool) -> Result<ExecutionResult> {
        if log_enabled {
            tracing::info!("EXEC_SHELL_CMD: {}", render_command_line(program, args));
        }

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| Error::spawn(program, e.to_string()))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::spawn(program, "missing stdout pipe"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| Error::spawn(program, "missing stderr pipe"))?;

        let (tx, rx) = mpsc::sync_channel::<Vec<u8>>(128);
        let tx_stdout = tx.clone();
        let out_pump = thread::spawn(move || pump_stream(stdout, &tx_stdout));
        let err_pump = thread::spawn(move || pump_stream(stderr, &tx));

        // Ends once both pumps hit EOF and drop their senders.
        let mut merged = Vec::new();
        for chunk in rx {
            merged.extend_from_slice(&chunk);
        }
        let _ = out_pump.join();
        let _ = err_pump.join();

        let status = child.wait()?;
        let status = status.code().unwrap_or(-1);
        tracing::debug!(program, status, bytes = merged.len(), "command finished");

        Ok(ExecutionResult {
            status,
            lines: split_output_lines(&String::from_utf8_lossy(&merged)),
        })
    }
}

fn pump_stream<R: Read + Send + 'static>(mut reader: R, tx: &mpsc::SyncSender<Vec<u8>>) {
    let mut buf = vec![0u8; 8192];
    loop {
        match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => {
                if tx.send(buf[..n].to_vec()).is_err() {
                    break;
                }
            }
            Err(err) if err.kind() == std::io::ErrorKind::Interrupted => {}
            Err(_) => break,
        }
    }
}

/// Split captured output into lines with trailing whitespace trimmed and
/// trailing blank lines dropped. Interior blank lines are kept.
pub fn split_output_lines(text: &str) -> Vec<String> {
    let mut lines: Vec<String> = text.lines().map(|l| l.trim_end().to_string()).collect();
    while lines.last().is_some_and(String::is_empty) {
        lines.pop();
    }
    lines
}

/// Human-readable command line for diagnostics. Never executed.
pub fn render_command_line(program: &str, args: &[String]) -> String {
    let mut line = program.to_string();
    for arg in args {
        line.push(' ');
        line.push_str(arg);
    }
    line
}
