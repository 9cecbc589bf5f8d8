//! Timestamped run log
//!
//! The log file is the operator's audit trail, so every line is written and
//! flushed before `log` returns. The file is opened once per run in append
//! mode and flushed again when the logger is dropped. Echo to stdout comes
//! second and never fails a run: after the first echo error (a closed pipe,
//! say) the logger stops echoing and keeps writing the file.

use chrono::{SecondsFormat, Utc};
use std::fs::{self, File, OpenOptions};
use std::io::{self, LineWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::{RunnerError, RunnerResult};

/// Append-only run log echoed to stdout
pub struct RunLogger {
    path: PathBuf,
    writer: LineWriter<File>,
    echo: Option<Box<dyn Write + Send>>,
}

impl RunLogger {
    /// Open (creating parent directories) `path` for appending
    pub fn open(path: &Path) -> RunnerResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| RunnerError::LogOpen {
                path: path.display().to_string(),
                source,
            })?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|source| RunnerError::LogOpen {
                path: path.display().to_string(),
                source,
            })?;

        Ok(Self {
            path: path.to_path_buf(),
            writer: LineWriter::new(file),
            echo: Some(Box::new(io::stdout())),
        })
    }

    /// Stop echoing lines to stdout
    pub fn without_echo(mut self) -> Self {
        self.echo = None;
        self
    }

    /// Echo lines to `out` instead of stdout
    pub fn with_echo(mut self, out: impl Write + Send + 'static) -> Self {
        self.echo = Some(Box::new(out));
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write one timestamped line to the log file, then echo it
    pub fn log(&mut self, message: impl AsRef<str>) -> RunnerResult<()> {
        let line = format!("[{}] {}", timestamp(), message.as_ref());
        writeln!(self.writer, "{}", line)
            .and_then(|_| self.writer.flush())
            .map_err(|source| RunnerError::LogWrite {
                path: self.path.display().to_string(),
                source,
            })?;

        if let Some(out) = self.echo.as_mut() {
            if let Err(e) = writeln!(out, "{}", line).and_then(|_| out.flush()) {
                log::warn!("stdout echo disabled: {}", e);
                self.echo = None;
            }
        }
        Ok(())
    }

    pub fn warn(&mut self, message: impl AsRef<str>) -> RunnerResult<()> {
        self.log(format!("[WARN] {}", message.as_ref()))
    }

    pub fn fatal(&mut self, message: impl AsRef<str>) -> RunnerResult<()> {
        self.log(format!("[FATAL] {}", message.as_ref()))
    }
}

/// ISO-8601 UTC timestamp with millisecond precision
pub fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
