use crate::client::ClientOptions;
use crate::config::{PollConfig, StoreCommand};
use crate::error::StoreError;
use derive_builder::Builder;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Capability interface of an S3-compatible store implementation.
///
/// A backend knows how to describe its server process and how a client should
/// reach it. Backends are free to capture their port and credentials.
pub trait StoreBackend: Send + Sync {
    /// Describe the subprocess to launch. Called once per `Store::start`.
    fn command(&self, token: &CancellationToken) -> Result<StoreCommand, StoreError>;

    /// Options for clients talking to the running store
    fn client_options(&self) -> ClientOptions;

    fn poll_config(&self) -> PollConfig {
        PollConfig::default()
    }

    fn validate(&self) -> Result<(), StoreError> {
        self.poll_config()
            .validate()
            .map_err(|e| StoreError::Configuration(format!("Invalid poll config: {e}")))
    }
}

pub type CommandFactory =
    Arc<dyn Fn(&CancellationToken) -> Result<StoreCommand, StoreError> + Send + Sync>;

pub type ClientOptionsFactory = Arc<dyn Fn() -> ClientOptions + Send + Sync>;

/// Closure-based backend, for stores that do not warrant their own type.
///
/// Both factories are required; `StoreOptions::builder().build()` fails with
/// `StoreError::Configuration` when either is missing.
#[derive(Clone, Builder)]
#[builder(build_fn(error = "StoreError"))]
pub struct StoreOptions {
    #[builder(setter(custom))]
    command: CommandFactory,
    #[builder(setter(custom))]
    client_options: ClientOptionsFactory,
    #[builder(default)]
    poll: PollConfig,
}

impl StoreOptions {
    pub fn builder() -> StoreOptionsBuilder {
        StoreOptionsBuilder::default()
    }
}

impl StoreOptionsBuilder {
    pub fn command<F>(&mut self, factory: F) -> &mut Self
    where
        F: Fn(&CancellationToken) -> Result<StoreCommand, StoreError> + Send + Sync + 'static,
    {
        self.command = Some(Arc::new(factory));
        self
    }

    pub fn client_options<F>(&mut self, factory: F) -> &mut Self
    where
        F: Fn() -> ClientOptions + Send + Sync + 'static,
    {
        self.client_options = Some(Arc::new(factory));
        self
    }
}

impl StoreBackend for StoreOptions {
    fn command(&self, token: &CancellationToken) -> Result<StoreCommand, StoreError> {
        (self.command)(token)
    }

    fn client_options(&self) -> ClientOptions {
        (self.client_options)()
    }

    fn poll_config(&self) -> PollConfig {
        self.poll.clone()
    }
}

impl std::fmt::Debug for StoreOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreOptions")
            .field("poll", &self.poll)
            .finish_non_exhaustive()
    }
}
