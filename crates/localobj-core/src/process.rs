use crate::config::StoreCommand;
use crate::error::StoreError;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// Unique identifier for a process
pub type ProcessId = u32;

/// Status of a store process after it has been waited on
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessStatus {
    /// Process exited with status information
    Exited(std::process::ExitStatus),
    /// Process status is unknown
    Unknown,
}

impl ProcessStatus {
    pub fn success(&self) -> bool {
        matches!(self, ProcessStatus::Exited(status) if status.success())
    }
}

/// Result of delivering a termination signal
#[derive(Debug, Clone, PartialEq)]
pub enum TerminationResult {
    /// Signal was delivered
    Success,
    /// Process was not found (already exited)
    ProcessNotFound,
    /// Permission denied (insufficient privileges)
    PermissionDenied,
    /// Delivery failed with the given message
    Failed(String),
}

/// Handle to a spawned store process, exclusively owned by its `Store`
#[async_trait]
pub trait StoreProcessHandle: Send + Sync {
    /// Get the process ID (None once the process has been reaped)
    fn pid(&self) -> Option<ProcessId>;

    fn command(&self) -> &str;

    fn args(&self) -> &[String];

    /// Check if the process is still running (non-blocking)
    async fn is_running(&mut self) -> bool;

    /// Request termination with SIGTERM. Never escalates.
    async fn terminate(&mut self) -> TerminationResult;

    /// Wait for the process to exit
    async fn wait(&mut self) -> Result<ProcessStatus, StoreError>;
}

/// Platform process manager: turns a `StoreCommand` into a running process
///
/// Implementations should:
/// - Route the child's stdout/stderr into the command's sinks
/// - Take ownership of the command's data directory for the process lifetime
/// - Kill the process if `token` is cancelled while it is running
/// - Leave nothing running behind when a handle is dropped
#[async_trait]
pub trait StoreProcessManager: Send + Sync {
    type Handle: StoreProcessHandle;

    fn new() -> Self
    where
        Self: Sized;

    /// Start the process. Returns once the OS has accepted it; says nothing about readiness.
    async fn spawn(
        &self,
        command: StoreCommand,
        token: &CancellationToken,
    ) -> Result<Self::Handle, StoreError>;

    /// Get the platform name for logging and debugging
    fn platform_name(&self) -> &'static str;
}

/// Factory trait for creating platform-specific process managers
pub trait StoreProcessManagerFactory {
    type Manager: StoreProcessManager;

    fn create_process_manager() -> Self::Manager;
}
