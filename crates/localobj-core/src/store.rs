use crate::backend::StoreBackend;
use crate::client::ClientOptions;
use crate::error::StoreError;
use crate::poll::poll_until_ready;
use crate::process::{ProcessId, StoreProcessHandle, StoreProcessManager, TerminationResult};
use aws_sdk_s3::error::DisplayErrorContext;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Lifecycle of a store subprocess.
///
/// `Stopped` behaves like `Unstarted` for every operation: a stopped store can
/// be started again.
#[derive(Debug)]
pub enum StoreState<H> {
    Unstarted,
    Running(H),
    Stopped,
}

impl<H> StoreState<H> {
    pub fn name(&self) -> &'static str {
        match self {
            StoreState::Unstarted => "unstarted",
            StoreState::Running(_) => "running",
            StoreState::Stopped => "stopped",
        }
    }
}

/// Supervisor for one local object store process.
///
/// Single owner, sequential API: every operation takes the store by reference
/// and completes before the next one starts.
pub struct Store<B, Manager: StoreProcessManager> {
    backend: B,
    process_manager: Arc<Manager>,
    state: StoreState<Manager::Handle>,
}

impl<B: StoreBackend, Manager: StoreProcessManager> Store<B, Manager> {
    /// Validate the backend and create an unstarted store. Spawns nothing.
    pub fn new(backend: B, process_manager: Arc<Manager>) -> Result<Self, StoreError> {
        backend.validate()?;

        Ok(Self {
            backend,
            process_manager,
            state: StoreState::Unstarted,
        })
    }

    /// Launch the store process.
    ///
    /// Returns as soon as the OS accepted the process; use [`Store::poll_ready`]
    /// to wait for it to serve requests. Cancelling `token` while the process
    /// runs kills it.
    pub async fn start(&mut self, token: &CancellationToken) -> Result<(), StoreError> {
        if matches!(self.state, StoreState::Running(_)) {
            return Err(StoreError::AlreadyStarted);
        }
        if token.is_cancelled() {
            return Err(StoreError::Cancelled);
        }

        let command = self.backend.command(token)?;
        info!(
            "Starting store process `{}` on {} with args: {:?}",
            command.program,
            self.process_manager.platform_name(),
            command.args
        );

        let handle = self.process_manager.spawn(command, token).await?;
        if let Some(pid) = handle.pid() {
            info!(pid, "Store process started");
        }

        self.state = StoreState::Running(handle);
        Ok(())
    }

    /// Block until the store answers a `ListBuckets` probe or the poll deadline passes.
    ///
    /// A failed poll leaves the process running; shutting it down is up to the caller.
    pub async fn poll_ready(&self, token: &CancellationToken) -> Result<(), StoreError> {
        self.handle()?;

        let options = self.backend.client_options();
        let config = self.backend.poll_config();

        poll_until_ready(&config, token, || {
            let client = options.probe_client();
            async move {
                client
                    .list_buckets()
                    .send()
                    .await
                    .map(|_| ())
                    .map_err(|e| DisplayErrorContext(e).to_string())
            }
        })
        .await
    }

    /// S3 client preconfigured for the running store
    pub fn new_client(&self) -> Result<aws_sdk_s3::Client, StoreError> {
        self.handle()?;
        Ok(self.backend.client_options().build_client())
    }

    /// Send SIGTERM and wait for the process to exit.
    ///
    /// On success the store is `Stopped`. If the signal cannot be delivered or
    /// waiting fails, the handle is kept and the store stays `Running`.
    pub async fn graceful_shutdown(&mut self) -> Result<(), StoreError> {
        let StoreState::Running(handle) = &mut self.state else {
            return Err(StoreError::NotStarted);
        };
        let pid = handle.pid();

        match handle.terminate().await {
            TerminationResult::Success => debug!(?pid, "Sent SIGTERM to store process"),
            TerminationResult::ProcessNotFound => {
                debug!(?pid, "Store process already exited before SIGTERM")
            }
            TerminationResult::PermissionDenied => {
                return Err(StoreError::Signal("permission denied".to_string()));
            }
            TerminationResult::Failed(message) => return Err(StoreError::Signal(message)),
        }

        let status = handle.wait().await?;
        if !status.success() {
            debug!(?pid, ?status, "Store process exited with non-zero status");
        }

        info!(?pid, "Store process stopped");
        self.state = StoreState::Stopped;
        Ok(())
    }

    /// `start` followed by `poll_ready`. If the poll fails the process is shut
    /// down on a best-effort basis and the poll error is returned.
    pub async fn start_and_wait(&mut self, token: &CancellationToken) -> Result<(), StoreError> {
        self.start(token).await?;

        if let Err(e) = self.poll_ready(token).await {
            if let Err(shutdown_err) = self.graceful_shutdown().await {
                warn!(
                    error = %shutdown_err,
                    "Failed to shut down store after failed readiness poll"
                );
            }
            return Err(e);
        }

        Ok(())
    }

    pub fn state(&self) -> &StoreState<Manager::Handle> {
        &self.state
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, StoreState::Running(_))
    }

    pub fn pid(&self) -> Option<ProcessId> {
        match &self.state {
            StoreState::Running(handle) => handle.pid(),
            _ => None,
        }
    }

    pub fn client_options(&self) -> ClientOptions {
        self.backend.client_options()
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn handle(&self) -> Result<&Manager::Handle, StoreError> {
        match &self.state {
            StoreState::Running(handle) => Ok(handle),
            _ => Err(StoreError::NotStarted),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::StoreOptions;
    use crate::config::{PollConfig, StoreCommand};
    use crate::process::ProcessStatus;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Scripted outcomes for the fake process manager
    #[derive(Default)]
    struct Script {
        fail_spawn: bool,
        terminate: Option<TerminationResult>,
        fail_wait: bool,
    }

    struct FakeHandle {
        pid: ProcessId,
        command: String,
        args: Vec<String>,
        script: Arc<Mutex<Script>>,
        terminated: bool,
    }

    #[async_trait]
    impl StoreProcessHandle for FakeHandle {
        fn pid(&self) -> Option<ProcessId> {
            Some(self.pid)
        }

        fn command(&self) -> &str {
            &self.command
        }

        fn args(&self) -> &[String] {
            &self.args
        }

        async fn is_running(&mut self) -> bool {
            !self.terminated
        }

        async fn terminate(&mut self) -> TerminationResult {
            let result = self
                .script
                .lock()
                .unwrap()
                .terminate
                .clone()
                .unwrap_or(TerminationResult::Success);
            if result == TerminationResult::Success {
                self.terminated = true;
            }
            result
        }

        async fn wait(&mut self) -> Result<ProcessStatus, StoreError> {
            if self.script.lock().unwrap().fail_wait {
                return Err(StoreError::Wait(std::io::Error::other("wait failed")));
            }
            Ok(ProcessStatus::Unknown)
        }
    }

    struct FakeManager {
        next_pid: AtomicU32,
        script: Arc<Mutex<Script>>,
    }

    #[async_trait]
    impl StoreProcessManager for FakeManager {
        type Handle = FakeHandle;

        fn new() -> Self {
            Self {
                next_pid: AtomicU32::new(100),
                script: Default::default(),
            }
        }

        async fn spawn(
            &self,
            command: StoreCommand,
            _token: &CancellationToken,
        ) -> Result<FakeHandle, StoreError> {
            if self.script.lock().unwrap().fail_spawn {
                return Err(StoreError::Spawn {
                    command: command.program,
                    source: std::io::ErrorKind::NotFound.into(),
                });
            }
            Ok(FakeHandle {
                pid: self.next_pid.fetch_add(1, Ordering::SeqCst),
                command: command.program,
                args: command.args,
                script: self.script.clone(),
                terminated: false,
            })
        }

        fn platform_name(&self) -> &'static str {
            "fake"
        }
    }

    fn unreachable_options() -> StoreOptions {
        StoreOptions::builder()
            .command(|_| StoreCommand::builder().program("fake-store").build())
            // Port 9 (discard) is not expected to run an S3 server
            .client_options(|| ClientOptions::localhost(9, "key", "secret", "us-east-1"))
            .poll(PollConfig {
                timeout_ms: 300,
                initial_interval_ms: 20,
                max_interval_ms: 100,
            })
            .build()
            .unwrap()
    }

    fn store() -> (Store<StoreOptions, FakeManager>, Arc<Mutex<Script>>) {
        let manager = FakeManager::new();
        let script = manager.script.clone();
        let store = Store::new(unreachable_options(), Arc::new(manager)).unwrap();
        (store, script)
    }

    #[tokio::test]
    async fn test_start_then_shutdown() {
        let (mut store, _) = store();
        let token = CancellationToken::new();

        assert_eq!(store.state().name(), "unstarted");
        store.start(&token).await.unwrap();
        assert!(store.is_running());
        assert_eq!(store.pid(), Some(100));

        store.graceful_shutdown().await.unwrap();
        assert!(!store.is_running());
        assert_eq!(store.state().name(), "stopped");
        assert_eq!(store.pid(), None);
    }

    #[tokio::test]
    async fn test_double_start_fails() {
        let (mut store, _) = store();
        let token = CancellationToken::new();

        store.start(&token).await.unwrap();
        assert!(matches!(
            store.start(&token).await,
            Err(StoreError::AlreadyStarted)
        ));
        assert_eq!(store.pid(), Some(100));
    }

    #[tokio::test]
    async fn test_operations_require_start() {
        let (mut store, _) = store();
        let token = CancellationToken::new();

        assert!(matches!(
            store.poll_ready(&token).await,
            Err(StoreError::NotStarted)
        ));
        assert!(matches!(store.new_client(), Err(StoreError::NotStarted)));
        assert!(matches!(
            store.graceful_shutdown().await,
            Err(StoreError::NotStarted)
        ));
    }

    #[tokio::test]
    async fn test_stopped_store_rejects_operations_and_restarts() {
        let (mut store, _) = store();
        let token = CancellationToken::new();

        store.start(&token).await.unwrap();
        store.graceful_shutdown().await.unwrap();

        assert!(matches!(store.new_client(), Err(StoreError::NotStarted)));
        assert!(matches!(
            store.graceful_shutdown().await,
            Err(StoreError::NotStarted)
        ));

        store.start(&token).await.unwrap();
        assert_eq!(store.pid(), Some(101));
    }

    #[tokio::test]
    async fn test_spawn_failure_leaves_store_unstarted() {
        let (mut store, script) = store();
        script.lock().unwrap().fail_spawn = true;

        let result = store.start(&CancellationToken::new()).await;
        assert!(matches!(result, Err(StoreError::Spawn { .. })));
        assert_eq!(store.state().name(), "unstarted");
    }

    #[tokio::test]
    async fn test_cancelled_token_prevents_start() {
        let (mut store, _) = store();
        let token = CancellationToken::new();
        token.cancel();

        assert!(matches!(
            store.start(&token).await,
            Err(StoreError::Cancelled)
        ));
        assert!(!store.is_running());
    }

    #[tokio::test]
    async fn test_signal_failure_keeps_handle() {
        let (mut store, script) = store();
        store.start(&CancellationToken::new()).await.unwrap();

        script.lock().unwrap().terminate = Some(TerminationResult::Failed("EINVAL".to_string()));
        assert!(matches!(
            store.graceful_shutdown().await,
            Err(StoreError::Signal(_))
        ));
        assert!(store.is_running());

        script.lock().unwrap().terminate = Some(TerminationResult::PermissionDenied);
        assert!(matches!(
            store.graceful_shutdown().await,
            Err(StoreError::Signal(_))
        ));
        assert!(store.is_running());
    }

    #[tokio::test]
    async fn test_wait_failure_keeps_handle() {
        let (mut store, script) = store();
        store.start(&CancellationToken::new()).await.unwrap();

        script.lock().unwrap().fail_wait = true;
        assert!(matches!(
            store.graceful_shutdown().await,
            Err(StoreError::Wait(_))
        ));
        assert!(store.is_running());

        script.lock().unwrap().fail_wait = false;
        store.graceful_shutdown().await.unwrap();
        assert!(!store.is_running());
    }

    #[tokio::test]
    async fn test_new_client_when_running() {
        let (mut store, _) = store();
        store.start(&CancellationToken::new()).await.unwrap();
        assert!(store.new_client().is_ok());
        assert_eq!(store.client_options().endpoint, "http://localhost:9");
    }

    #[tokio::test]
    async fn test_poll_failure_leaves_store_running() {
        let (mut store, _) = store();
        let token = CancellationToken::new();
        store.start(&token).await.unwrap();

        assert!(matches!(
            store.poll_ready(&token).await,
            Err(StoreError::PollTimeout(_))
        ));
        assert!(store.is_running());
    }

    #[tokio::test]
    async fn test_start_and_wait_cleans_up_on_poll_failure() {
        let (mut store, _) = store();

        let result = store.start_and_wait(&CancellationToken::new()).await;
        assert!(matches!(result, Err(StoreError::PollTimeout(_))));
        assert_eq!(store.state().name(), "stopped");
    }

    #[tokio::test]
    async fn test_start_and_wait_returns_poll_error_when_cleanup_fails() {
        let (mut store, script) = store();
        script.lock().unwrap().fail_wait = true;

        let result = store.start_and_wait(&CancellationToken::new()).await;
        assert!(matches!(result, Err(StoreError::PollTimeout(_))));
        assert!(store.is_running());
    }

    #[test]
    fn test_invalid_backend_rejected_at_construction() {
        let options = StoreOptions::builder()
            .command(|_| StoreCommand::builder().program("fake-store").build())
            .client_options(|| ClientOptions::localhost(9, "key", "secret", "us-east-1"))
            .poll(PollConfig {
                timeout_ms: 0,
                ..Default::default()
            })
            .build()
            .unwrap();

        let result = Store::new(options, Arc::new(FakeManager::new()));
        assert!(matches!(result, Err(StoreError::Configuration(_))));
    }
}
