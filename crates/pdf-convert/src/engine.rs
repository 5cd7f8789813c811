//! Out-of-process conversion engine
//!
//! The engine is invoked as `program [args] [--option value]... <input> <output>`.
//! Markup is staged in a scoped temporary directory that is removed on
//! every exit path, including engine failure and timeout.

use crate::{stub, ConvertError, Converter, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::{Duration, Instant};
use tempfile::TempDir;

/// Poll interval while waiting on a child with a timeout
const WAIT_POLL: Duration = Duration::from_millis(20);

/// How long to wait for the output pipes to close once a timed run is over
const PIPE_GRACE: Duration = Duration::from_millis(500);

/// External engine configuration
///
/// Arguments and options are passed through without interpretation
/// (page size, margins, headers...).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EngineConfig {
    /// Program name (looked up in `PATH`) or path
    pub program: String,

    /// Leading arguments
    #[serde(default)]
    pub args: Vec<String>,

    /// Options rendered as `--name value`, or `--name` when the value is null
    #[serde(default)]
    pub options: BTreeMap<String, Option<String>>,

    /// Kill the engine after this many milliseconds
    #[serde(default)]
    pub timeout_ms: Option<u64>,

    /// Suffix of the staged input file
    #[serde(default = "default_input_suffix")]
    pub input_suffix: String,

    /// Suffix of the output file the engine writes
    #[serde(default = "default_output_suffix")]
    pub output_suffix: String,

    /// Directory for staging files (system temp dir when unset)
    #[serde(default)]
    pub temp_dir: Option<PathBuf>,
}

fn default_input_suffix() -> String {
    ".html".to_string()
}

fn default_output_suffix() -> String {
    ".pdf".to_string()
}

impl EngineConfig {
    /// Create a configuration for `program` with default suffixes
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            options: BTreeMap::new(),
            timeout_ms: None,
            input_suffix: default_input_suffix(),
            output_suffix: default_output_suffix(),
            temp_dir: None,
        }
    }

    /// wkhtmltopdf, reading the input as UTF-8
    pub fn wkhtmltopdf() -> Self {
        Self::new("wkhtmltopdf")
            .with_arg("--quiet")
            .with_option("encoding", Some("utf-8"))
    }

    /// Append a leading argument
    pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Set an `--name value` option
    pub fn with_option(mut self, name: impl Into<String>, value: Option<&str>) -> Self {
        self.options.insert(name.into(), value.map(str::to_string));
        self
    }

    /// Set the timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = Some(timeout.as_millis() as u64);
        self
    }

    /// Stage files under `dir`
    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(dir.into());
        self
    }

    fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}

/// Converter that runs an external engine process
#[derive(Debug, Clone)]
pub struct ExternalEngine {
    config: EngineConfig,
}

/// Captured result of one engine run
struct EngineRun {
    status: ExitStatus,
    stdout: Vec<u8>,
    stderr: Vec<u8>,
}

impl EngineRun {
    fn diagnostics(&self) -> String {
        let stderr = String::from_utf8_lossy(&self.stderr);
        let stdout = String::from_utf8_lossy(&self.stdout);
        [stderr.trim(), stdout.trim()]
            .iter()
            .filter(|s| !s.is_empty())
            .copied()
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl ExternalEngine {
    /// Create an engine from its configuration
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    /// Full argument list for one run (program excluded)
    pub fn command_args(&self, input: &Path, output: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = self.config.args.iter().map(OsString::from).collect();
        for (name, value) in &self.config.options {
            args.push(format!("--{}", name).into());
            if let Some(value) = value {
                args.push(value.into());
            }
        }
        args.push(input.as_os_str().to_owned());
        args.push(output.as_os_str().to_owned());
        args
    }

    fn resolve_program(&self) -> Result<PathBuf> {
        which::which(&self.config.program).map_err(|e| ConvertError::EngineNotFound {
            program: self.config.program.clone(),
            reason: e.to_string(),
        })
    }

    fn staging_dir(&self) -> Result<TempDir> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("rsreport_");
        let dir = match &self.config.temp_dir {
            Some(parent) => builder.tempdir_in(parent)?,
            None => builder.tempdir()?,
        };
        Ok(dir)
    }

    fn run(&self, program: &Path, args: Vec<OsString>) -> Result<EngineRun> {
        let mut command = Command::new(program);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        // Own process group, so a timeout also reaches processes the engine starts
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }
        let mut child = command.spawn()?;

        let stdout = drain(child.stdout.take(), "stdout");
        let stderr = drain(child.stderr.take(), "stderr");

        let timeout = self.config.timeout();
        let status = match timeout {
            Some(timeout) => wait_with_timeout(&mut child, timeout),
            None => child.wait().map_err(ConvertError::from),
        };

        // A descendant that escaped the group may still hold the pipes open
        let pipe_wait = timeout.map(|_| PIPE_GRACE);
        let stdout = collect(&stdout, pipe_wait);
        let stderr = collect(&stderr, pipe_wait);

        Ok(EngineRun {
            status: status?,
            stdout,
            stderr,
        })
    }
}

impl Converter for ExternalEngine {
    fn convert(&self, markup: &[u8]) -> Result<Vec<u8>> {
        let program = self.resolve_program()?;
        let staging = self.staging_dir()?;
        let input = staging.path().join(format!("input{}", self.config.input_suffix));
        let output = staging.path().join(format!("output{}", self.config.output_suffix));

        fs::write(&input, markup)?;

        let started = Instant::now();
        tracing::debug!(program = %program.display(), input = %input.display(), "Starting conversion engine");
        let run = self.run(&program, self.command_args(&input, &output))?;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        if !run.status.success() {
            tracing::warn!(status = %run.status, elapsed_ms, "Conversion engine failed");
            return Err(ConvertError::Engine {
                status: run.status.to_string(),
                diagnostics: run.diagnostics(),
            });
        }

        let bytes = match fs::read(&output) {
            Ok(bytes) if !bytes.is_empty() => bytes,
            _ => {
                tracing::warn!(elapsed_ms, "Conversion engine produced no output");
                return Err(ConvertError::Engine {
                    status: "no output produced".to_string(),
                    diagnostics: run.diagnostics(),
                });
            }
        };

        tracing::info!(
            program = %self.config.program,
            input_bytes = markup.len(),
            output_bytes = bytes.len(),
            elapsed_ms,
            "Conversion complete"
        );
        Ok(bytes)
    }

    fn placeholder(&self) -> Result<Vec<u8>> {
        if self.config.output_suffix.eq_ignore_ascii_case(".pdf") {
            stub::blank_pdf()
        } else {
            Ok(Vec::new())
        }
    }
}

/// Read a child pipe to the end on a separate thread
fn drain<R: Read + Send + 'static>(pipe: Option<R>, name: &'static str) -> Receiver<Vec<u8>> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut buffer = Vec::new();
        if let Some(mut pipe) = pipe {
            if let Err(e) = pipe.read_to_end(&mut buffer) {
                tracing::warn!(pipe = name, error = %e, read_bytes = buffer.len(), "Engine output truncated");
            }
        }
        // The receiver is gone once the run gave up waiting
        let _ = tx.send(buffer);
    });
    rx
}

/// Wait for a drained pipe, at most `wait` when given
fn collect(rx: &Receiver<Vec<u8>>, wait: Option<Duration>) -> Vec<u8> {
    match wait {
        Some(wait) => rx.recv_timeout(wait).unwrap_or_default(),
        None => rx.recv().unwrap_or_default(),
    }
}

fn wait_with_timeout(child: &mut Child, timeout: Duration) -> Result<ExitStatus> {
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(status);
        }
        if Instant::now() >= deadline {
            kill_engine(child);
            return Err(ConvertError::Timeout(timeout));
        }
        thread::sleep(WAIT_POLL);
    }
}

/// Kill the engine together with its process group, then reap it
fn kill_engine(child: &mut Child) {
    #[cfg(unix)]
    {
        if let Ok(pid) = libc::pid_t::try_from(child.id()) {
            // SAFETY: kill(2) with a negative pid signals the group created at spawn
            unsafe {
                libc::kill(-pid, libc::SIGKILL);
            }
        }
    }
    let _ = child.kill();
    let _ = child.wait();
}
