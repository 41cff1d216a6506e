//! Install execution
//!
//! The executor wraps the actual installer behind the [`ToolInstaller`]
//! seam: it logs a start line, times the call, converts any failure into
//! exit code 1, and always emits an end line with the elapsed time. The
//! real installer shells out to the registry's package manager and streams
//! its output.

use anyhow::Result;
use async_trait::async_trait;
use clap::ValueEnum;
use colored::Colorize;
use std::fmt;
use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command as TokioCommand;
use tracing::{error, info};

/// Package registry a tool is installed from
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Registry {
    Npm,
}

impl fmt::Display for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Registry::Npm => write!(f, "npm"),
        }
    }
}

/// A fully resolved install request
///
/// The version is always present and has passed validation by the time a
/// request is handed to the executor; the dispatcher is the only place
/// requests are built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallRequest {
    pub name: String,
    pub version: String,
    pub dry_run: bool,
    pub registry: Registry,
}

/// The external install operation
///
/// Implementations are the only place container state may be mutated. A
/// returned `None` exit code means success.
#[async_trait]
pub trait ToolInstaller: Send + Sync {
    async fn install(&self, request: &InstallRequest) -> Result<Option<u8>>;
}

/// Handle threaded through command dispatch instead of ambient globals
pub struct InstallContext {
    installer: Arc<dyn ToolInstaller>,
}

impl InstallContext {
    pub fn new(installer: Arc<dyn ToolInstaller>) -> Self {
        Self { installer }
    }
}

/// Run the installer for a request, timing it and normalizing failures
///
/// Emits the start and end log lines on every path; a raised installer
/// error is caught exactly once here and becomes exit code 1.
pub async fn execute(ctx: &InstallContext, request: &InstallRequest) -> u8 {
    info!(
        "Installing {} package {} v{}...",
        request.registry, request.name, request.version
    );
    let start = Instant::now();

    let result = ctx.installer.install(request).await;
    let elapsed = start.elapsed();

    let (code, failed) = match result {
        Ok(code) => (code.unwrap_or(0), false),
        Err(err) => {
            error!("{err:#}");
            (1, true)
        }
    };

    info!(
        "Installed {} package {} {}in {}.",
        request.registry,
        request.name,
        if failed { "with errors " } else { "" },
        format_duration(elapsed)
    );

    code
}

/// Render a wall-clock duration the way a human reads it
pub fn format_duration(duration: Duration) -> String {
    let millis = duration.as_millis();
    if millis < 1000 {
        return format!("{millis}ms");
    }
    let secs = duration.as_secs();
    if secs < 60 {
        let fractional = duration.as_secs_f64();
        if (fractional - secs as f64) < 0.05 {
            format!("{secs}s")
        } else {
            format!("{fractional:.1}s")
        }
    } else {
        format!("{}m {}s", secs / 60, secs % 60)
    }
}

/// Installer for npm registry packages
///
/// Runs `npm install --global` and streams its output. A dry run logs the
/// command that would run and spawns nothing.
pub struct NpmInstaller;

impl NpmInstaller {
    fn package_spec(request: &InstallRequest) -> String {
        let version = request
            .version
            .strip_prefix('v')
            .unwrap_or(&request.version);
        format!("{}@{}", request.name, version)
    }
}

/// Stream installer output line by line until stdout closes
///
/// The stderr branch stops being polled once that stream reaches EOF, so
/// a long-running install with a closed stderr does not spin the loop.
async fn stream_output<O, E>(stdout: O, stderr: E)
where
    O: AsyncRead + Unpin,
    E: AsyncRead + Unpin,
{
    let mut stdout_reader = BufReader::new(stdout).lines();
    let mut stderr_reader = BufReader::new(stderr).lines();
    let mut stderr_done = false;

    loop {
        tokio::select! {
            line = stdout_reader.next_line() => {
                match line {
                    Ok(Some(line)) => println!("  {}", line),
                    Ok(None) => break,
                    Err(e) => {
                        eprintln!("{} {}", "Error reading stdout:".red(), e);
                        break;
                    }
                }
            }
            line = stderr_reader.next_line(), if !stderr_done => {
                match line {
                    Ok(Some(line)) => eprintln!("  {}", line.yellow()),
                    Ok(None) => stderr_done = true,
                    Err(e) => {
                        eprintln!("{} {}", "Error reading stderr:".red(), e);
                        stderr_done = true;
                    }
                }
            }
        }
    }
}

#[async_trait]
impl ToolInstaller for NpmInstaller {
    async fn install(&self, request: &InstallRequest) -> Result<Option<u8>> {
        let spec = Self::package_spec(request);
        let args = ["install", "--global", "--no-audit", "--no-fund"];

        if request.dry_run {
            info!("Dry run: would execute 'npm {} {}'", args.join(" "), spec);
            return Ok(None);
        }

        let mut child = TokioCommand::new("npm")
            .args(args)
            .arg(&spec)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        let stdout = child.stdout.take().expect("Failed to capture stdout");
        let stderr = child.stderr.take().expect("Failed to capture stderr");

        stream_output(stdout, stderr).await;

        let status = child.wait().await?;
        if status.success() {
            Ok(None)
        } else {
            anyhow::bail!(
                "npm install of {} failed with exit code: {}",
                spec,
                status.code().unwrap_or(-1)
            );
        }
    }
}
