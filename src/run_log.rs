//! Append-only sink for everything the test subprocesses print.
//!
//! File lines carry a `<timestamp>:INFO: ` prefix. Blank lines are dropped
//! from the file so a framework summary (`Ran 1 test in ...`) is always
//! directly followed by its verdict line.

use crate::error::Result;
use chrono::Local;
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S,%3f";

enum Sink {
    File { writer: BufWriter<File>, path: PathBuf },
    Stdout(io::Stdout),
}

pub struct RunLog {
    sink: Sink,
}

impl std::fmt::Debug for RunLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.sink {
            Sink::File { path, .. } => f.debug_tuple("RunLog").field(path).finish(),
            Sink::Stdout(_) => f.write_str("RunLog(stdout)"),
        }
    }
}

impl RunLog {
    /// Open `path` for appending, creating it if needed.
    pub fn append_to(path: &Path) -> Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            sink: Sink::File {
                writer: BufWriter::new(file),
                path: path.to_path_buf(),
            },
        })
    }

    /// Pass output straight through to stdout (debug runs).
    pub fn stdout() -> Self {
        Self {
            sink: Sink::Stdout(io::stdout()),
        }
    }

    /// Path of the backing file, if any.
    pub fn path(&self) -> Option<&Path> {
        match &self.sink {
            Sink::File { path, .. } => Some(path),
            Sink::Stdout(_) => None,
        }
    }

    pub fn line(&mut self, text: &str) -> Result<()> {
        match &mut self.sink {
            Sink::File { writer, .. } => {
                for part in text.lines() {
                    let part = part.trim_end();
                    if part.is_empty() {
                        continue;
                    }
                    writeln!(writer, "{}:INFO: {part}", Local::now().format(TIMESTAMP_FORMAT))?;
                }
            }
            Sink::Stdout(out) => writeln!(out.lock(), "{text}")?,
        }
        Ok(())
    }

    pub fn lines<'a, I>(&mut self, lines: I) -> Result<()>
    where
        I: IntoIterator<Item = &'a String>,
    {
        for line in lines {
            self.line(line)?;
        }
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        match &mut self.sink {
            Sink::File { writer, .. } => writer.flush()?,
            Sink::Stdout(out) => out.flush()?,
        }
        Ok(())
    }
}

impl Drop for RunLog {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}
