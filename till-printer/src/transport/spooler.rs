//! OS spooler submission
//!
//! The job goes through a temporary file: `copy /b FILE \\localhost\NAME` on
//! Windows, `lp -d NAME -o raw FILE` elsewhere. The file is removed on every
//! exit path when its guard drops.

use super::Printer;
use crate::error::{PrintError, PrintResult};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::process::Command;
use tracing::{info, instrument};

/// Submission command timeout
pub const DEFAULT_SUBMIT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct SpoolerPrinter {
    name: String,
    program: Option<PathBuf>,
    temp_dir: Option<PathBuf>,
    timeout: Duration,
}

impl SpoolerPrinter {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            program: None,
            temp_dir: None,
            timeout: DEFAULT_SUBMIT_TIMEOUT,
        }
    }

    /// Replace the platform command; it receives `NAME FILE`
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = Some(program.into());
        self
    }

    /// Directory for the temporary job file
    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(dir.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn write_job(&self, data: &[u8]) -> PrintResult<tempfile::TempPath> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("till-job-").suffix(".bin");
        let mut file = match &self.temp_dir {
            Some(dir) => builder.tempfile_in(dir),
            None => builder.tempfile(),
        }
        .map_err(|e| PrintError::Spooler(format!("temp file: {}", e)))?;

        file.write_all(data)
            .and_then(|_| file.flush())
            .map_err(|e| PrintError::Spooler(format!("temp file write: {}", e)))?;
        Ok(file.into_temp_path())
    }

    fn command(&self, job: &Path) -> Command {
        match &self.program {
            Some(program) => {
                let mut cmd = Command::new(program);
                cmd.arg(&self.name).arg(job);
                cmd
            }
            None => platform_command(&self.name, job),
        }
    }
}

#[cfg(windows)]
fn platform_command(name: &str, job: &Path) -> Command {
    let mut cmd = Command::new("cmd");
    cmd.arg("/C")
        .arg("copy")
        .arg("/b")
        .arg(job)
        .arg(format!(r"\\localhost\{}", name));
    cmd
}

#[cfg(not(windows))]
fn platform_command(name: &str, job: &Path) -> Command {
    let mut cmd = Command::new("lp");
    cmd.arg("-d").arg(name).arg("-o").arg("raw").arg(job);
    cmd
}

impl Printer for SpoolerPrinter {
    #[instrument(skip(data), fields(printer = %self.name, data_len = data.len()))]
    async fn print(&self, data: &[u8]) -> PrintResult<()> {
        let job = self.write_job(data)?;

        let mut cmd = self.command(&job);
        cmd.kill_on_drop(true);
        let output = tokio::time::timeout(self.timeout, cmd.output())
            .await
            .map_err(|_| PrintError::Timeout(format!("spooler submit to {}", self.name)))?
            .map_err(|e| PrintError::Spooler(format!("{}: {}", self.name, e)))?;

        if !output.status.success() {
            return Err(PrintError::Spooler(format!(
                "{}: submit exited with {}: {}",
                self.name,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        drop(job);
        info!("Print job spooled");
        Ok(())
    }
}
