//! Launching verifier processes.

use std::{
    fs::OpenOptions,
    io,
    path::PathBuf,
    process::{ExitStatus, Stdio},
};

use futures::future::BoxFuture;
use tokio::process::{Child, Command};

use crate::{config::Config, constants};

use super::transport::ListenAddr;

/// A handle to a running verifier process.
///
/// [`tokio::process::Child`] is the production implementation; tests
/// substitute scripted processes.
pub trait SandboxProcess: Send {
    /// Wait for the process to exit.
    fn wait(&mut self) -> BoxFuture<'_, io::Result<ExitStatus>>;

    /// Begin terminating the process, without waiting for it to exit.
    fn start_kill(&mut self) -> io::Result<()>;

    /// The OS process id, if the process has not been reaped yet.
    fn id(&self) -> Option<u32>;
}

impl SandboxProcess for Child {
    fn wait(&mut self) -> BoxFuture<'_, io::Result<ExitStatus>> {
        Box::pin(Child::wait(self))
    }

    fn start_kill(&mut self) -> io::Result<()> {
        Child::start_kill(self)
    }

    fn id(&self) -> Option<u32> {
        Child::id(self)
    }
}

/// A strategy for launching verifier processes.
///
/// The supervisor launches through this trait so tests can substitute
/// processes with scripted behaviour.
pub trait Launcher: Send + Sync + 'static {
    /// Launch a verifier process that connects back to `addr`.
    fn launch(&self, addr: &ListenAddr) -> io::Result<Box<dyn SandboxProcess>>;
}

/// Launches the configured verifier executable.
///
/// The process is started with two arguments, the listen address and the
/// log level, runs in the node base directory, and has its output appended
/// to `logs/verifier-stdout.log` and `logs/verifier-stderr.log` under it.
#[derive(Clone, Debug)]
pub struct ExecutableLauncher {
    program: PathBuf,
    base_dir: PathBuf,
    log_level: String,
}

impl ExecutableLauncher {
    /// Build a launcher from the supervision config.
    pub fn new(config: &Config) -> Self {
        ExecutableLauncher {
            program: config.verifier_path.clone(),
            base_dir: config.base_dir.clone(),
            log_level: config.verifier_log_level.clone(),
        }
    }

    /// Open one of the verifier log files in append mode, creating the log
    /// directory on first use.
    ///
    /// Append mode keeps output from every verifier process the node has
    /// launched, crashes included, in one place.
    fn open_log(&self, file_name: &str) -> io::Result<std::fs::File> {
        let log_dir = self.base_dir.join(constants::LOG_DIR);
        std::fs::create_dir_all(&log_dir)?;

        OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_dir.join(file_name))
    }
}

impl Launcher for ExecutableLauncher {
    fn launch(&self, addr: &ListenAddr) -> io::Result<Box<dyn SandboxProcess>> {
        let stdout = self.open_log(constants::STDOUT_LOG_FILE)?;
        let stderr = self.open_log(constants::STDERR_LOG_FILE)?;

        let child = Command::new(&self.program)
            .arg(addr.to_string())
            .arg(&self.log_level)
            .current_dir(&self.base_dir)
            .stdin(Stdio::null())
            .stdout(stdout)
            .stderr(stderr)
            // The exit monitor owns the child and kills it on session
            // close; kill_on_drop covers shutdown paths where that task
            // never runs.
            .kill_on_drop(true)
            .spawn()?;

        metrics::counter!("okapi.verifier.sandbox.spawns.total", 1);
        info!(
            program = %self.program.display(),
            pid = child.id(),
            %addr,
            "launched verifier process"
        );

        Ok(Box::new(child))
    }
}
