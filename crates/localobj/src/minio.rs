use localobj_core::{
    CancellationToken, ClientOptions, PollConfig, StoreBackend, StoreCommand, StoreError,
    StoreStdErr, StoreStdOut,
};
use std::path::PathBuf;

pub const DEFAULT_MINIO_BINARY: &str = "minio";
pub const DEFAULT_MINIO_USER: &str = "minioadmin";
pub const DEFAULT_MINIO_PASSWORD: &str = "minioadmin";
pub const DEFAULT_MINIO_REGION: &str = "us-east-1";

/// MinIO server bound to a fixed local port.
///
/// Each launch gets a fresh `minio-data-*` temporary directory which is
/// removed once the process handle is dropped.
#[derive(Debug, Clone)]
pub struct MinioBackend {
    binary: String,
    port: u16,
    user: String,
    password: String,
    region: String,
    data_root: Option<PathBuf>,
    poll: PollConfig,
    stdout: StoreStdOut,
    stderr: StoreStdErr,
}

impl MinioBackend {
    pub fn new(port: u16) -> Self {
        Self {
            binary: DEFAULT_MINIO_BINARY.to_string(),
            port,
            user: DEFAULT_MINIO_USER.to_string(),
            password: DEFAULT_MINIO_PASSWORD.to_string(),
            region: DEFAULT_MINIO_REGION.to_string(),
            data_root: None,
            poll: PollConfig::default(),
            stdout: StoreStdOut::default(),
            stderr: StoreStdErr::default(),
        }
    }

    /// Executable to launch instead of `minio` from `PATH`
    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }

    pub fn with_credentials(mut self, user: impl Into<String>, password: impl Into<String>) -> Self {
        self.user = user.into();
        self.password = password.into();
        self
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    /// Parent for the per-launch data directories; defaults to the system temp dir
    pub fn with_data_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.data_root = Some(root.into());
        self
    }

    pub fn with_poll_config(mut self, poll: PollConfig) -> Self {
        self.poll = poll;
        self
    }

    pub fn with_output(mut self, stdout: StoreStdOut, stderr: StoreStdErr) -> Self {
        self.stdout = stdout;
        self.stderr = stderr;
        self
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

impl StoreBackend for MinioBackend {
    fn command(&self, token: &CancellationToken) -> Result<StoreCommand, StoreError> {
        if token.is_cancelled() {
            return Err(StoreError::Cancelled);
        }

        let mut builder = tempfile::Builder::new();
        builder.prefix("minio-data-");
        let data_dir = match &self.data_root {
            Some(root) => builder.tempdir_in(root),
            None => builder.tempdir(),
        }
        .map_err(StoreError::DataDir)?;
        let data_path = data_dir.path().to_string_lossy().into_owned();

        StoreCommand::builder()
            .program(self.binary.as_str())
            .args([
                "server".to_string(),
                "--address".to_string(),
                format!(":{}", self.port),
                data_path,
            ])
            .env("MINIO_ROOT_USER", self.user.as_str())
            .env("MINIO_ROOT_PASSWORD", self.password.as_str())
            .data_dir(data_dir)
            .stdout(self.stdout.clone())
            .stderr(self.stderr.clone())
            .build()
    }

    fn client_options(&self) -> ClientOptions {
        ClientOptions::localhost(self.port, &self.user, &self.password, &self.region)
    }

    fn poll_config(&self) -> PollConfig {
        self.poll.clone()
    }
}
