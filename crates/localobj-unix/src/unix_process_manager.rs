use async_trait::async_trait;
use localobj_core::{
    ProcessId, ProcessStatus, StoreCommand, StoreError, StoreProcessHandle, StoreProcessManager,
    TerminationResult,
};
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid as NixPid;
use std::process::Stdio;
use std::time::Duration;
use tempfile::TempDir;
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// How long `wait` lets the output forwarders drain after the process exits
const STDIO_DRAIN_TIMEOUT: Duration = Duration::from_secs(1);

/// Unix-specific store process handle
pub struct UnixProcessHandle {
    child: Child,
    command: String,
    args: Vec<String>,
    stdio_tasks: Vec<JoinHandle<()>>,
    watchdog: JoinHandle<()>,
    /// Removed after the process is gone, when the handle drops
    _data_dir: Option<TempDir>,
}

impl UnixProcessHandle {
    fn nix_pid(&self) -> Option<NixPid> {
        self.child.id().map(|pid| NixPid::from_raw(pid as i32))
    }
}

#[async_trait]
impl StoreProcessHandle for UnixProcessHandle {
    fn pid(&self) -> Option<ProcessId> {
        self.child.id()
    }

    fn command(&self) -> &str {
        &self.command
    }

    fn args(&self) -> &[String] {
        &self.args
    }

    async fn is_running(&mut self) -> bool {
        match self.child.try_wait() {
            Ok(None) => true,
            Ok(Some(_)) => {
                // Reaped: the pid may be reused from here on
                self.watchdog.abort();
                false
            }
            Err(_) => false,
        }
    }

    async fn terminate(&mut self) -> TerminationResult {
        let Some(pid) = self.nix_pid() else {
            return TerminationResult::ProcessNotFound;
        };

        match signal::kill(pid, Signal::SIGTERM) {
            Ok(()) => {
                info!("Sent SIGTERM to process {}", pid);
                TerminationResult::Success
            }
            Err(nix::errno::Errno::ESRCH) => {
                info!("Process {} not found (already terminated)", pid);
                TerminationResult::ProcessNotFound
            }
            Err(nix::errno::Errno::EPERM) => {
                warn!("Permission denied to terminate process {}", pid);
                TerminationResult::PermissionDenied
            }
            Err(e) => {
                warn!("Failed to send SIGTERM to process {}: {}", pid, e);
                TerminationResult::Failed(format!("SIGTERM failed: {e}"))
            }
        }
    }

    async fn wait(&mut self) -> Result<ProcessStatus, StoreError> {
        let status = self.child.wait().await.map_err(StoreError::Wait)?;
        self.watchdog.abort();

        for task in self.stdio_tasks.drain(..) {
            if tokio::time::timeout(STDIO_DRAIN_TIMEOUT, task).await.is_err() {
                debug!("Output forwarder still busy after process exit, detaching it");
            }
        }

        debug!(command = %self.command, %status, "Store process exited");
        Ok(ProcessStatus::Exited(status))
    }
}

impl Drop for UnixProcessHandle {
    fn drop(&mut self) {
        self.watchdog.abort();

        if !matches!(self.child.try_wait(), Ok(None)) {
            return;
        }
        let Some(pid) = self.nix_pid() else {
            return;
        };

        warn!(
            "Store process {} dropped while running - attempting emergency cleanup",
            pid
        );

        // Try SIGTERM first
        if let Err(e) = signal::kill(pid, Signal::SIGTERM) {
            warn!("Failed to send SIGTERM to process {} during drop: {}", pid, e);

            // If SIGTERM fails, try SIGKILL
            if let Err(e) = signal::kill(pid, Signal::SIGKILL) {
                tracing::error!("Failed to send SIGKILL to process {} during drop: {}", pid, e);
            }
        }
    }
}

/// Unix process manager backed by `tokio::process`
#[derive(Debug, Default)]
pub struct UnixProcessManager;

#[async_trait]
impl StoreProcessManager for UnixProcessManager {
    type Handle = UnixProcessHandle;

    fn new() -> Self {
        Self
    }

    async fn spawn(
        &self,
        command: StoreCommand,
        token: &CancellationToken,
    ) -> Result<UnixProcessHandle, StoreError> {
        let StoreCommand {
            program,
            args,
            env,
            data_dir,
            stdout,
            stderr,
        } = command;

        let mut cmd = Command::new(&program);
        cmd.args(&args)
            .envs(&env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = cmd.spawn().map_err(|source| StoreError::Spawn {
            command: program.clone(),
            source,
        })?;

        let pid = child.id();
        info!(
            "Spawned Unix process: {} (PID: {:?}) with args: {:?}",
            program, pid, args
        );

        let mut stdio_tasks = Vec::with_capacity(2);
        if let Some(io) = child.stdout.take() {
            stdio_tasks.push(tokio::spawn(async move {
                if let Err(e) = localobj_core::stream(io, stdout).await {
                    debug!(error = %e, "Stopped forwarding store stdout");
                }
            }));
        }
        if let Some(io) = child.stderr.take() {
            stdio_tasks.push(tokio::spawn(async move {
                if let Err(e) = localobj_core::stream(io, stderr).await {
                    debug!(error = %e, "Stopped forwarding store stderr");
                }
            }));
        }

        let watchdog = tokio::spawn({
            let token = token.clone();
            async move {
                token.cancelled().await;
                let Some(pid) = pid else { return };
                warn!("Cancellation requested, killing store process {}", pid);
                if let Err(e) = signal::kill(NixPid::from_raw(pid as i32), Signal::SIGKILL) {
                    warn!("Failed to kill store process {}: {}", pid, e);
                }
            }
        });

        Ok(UnixProcessHandle {
            child,
            command: program,
            args,
            stdio_tasks,
            watchdog,
            _data_dir: data_dir,
        })
    }

    fn platform_name(&self) -> &'static str {
        "Unix"
    }
}
