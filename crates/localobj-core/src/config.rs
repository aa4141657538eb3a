use crate::error::StoreError;
use crate::stdio::{StoreStdErr, StoreStdOut};
use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tempfile::TempDir;

/// Timing of the readiness poll performed after the store process starts
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PollConfig {
    /// Total time allowed for the store to answer a probe (in milliseconds)
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Delay after the first failed probe (in milliseconds); doubles after each failure
    #[serde(default = "default_initial_interval_ms")]
    pub initial_interval_ms: u64,

    /// Upper bound for the delay between probes (in milliseconds)
    #[serde(default = "default_max_interval_ms")]
    pub max_interval_ms: u64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            initial_interval_ms: default_initial_interval_ms(),
            max_interval_ms: default_max_interval_ms(),
        }
    }
}

impl PollConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Short deadline and tight intervals, for tests that expect the poll to fail
    pub fn quick() -> Self {
        Self {
            timeout_ms: 1_000,
            initial_interval_ms: 20,
            max_interval_ms: 200,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Validate the configuration and return errors if invalid
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.timeout_ms == 0 {
            return Err(anyhow::anyhow!("timeout_ms must be greater than zero"));
        }

        if self.initial_interval_ms == 0 {
            return Err(anyhow::anyhow!("initial_interval_ms must be greater than zero"));
        }

        if self.initial_interval_ms > self.max_interval_ms {
            return Err(anyhow::anyhow!(
                "initial_interval_ms cannot be greater than max_interval_ms"
            ));
        }

        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn initial_interval(&self) -> Duration {
        Duration::from_millis(self.initial_interval_ms)
    }

    pub fn max_interval(&self) -> Duration {
        Duration::from_millis(self.max_interval_ms)
    }
}

/// A launchable description of the store subprocess. Not running yet.
///
/// The optional `data_dir` is owned by the command and, once spawned, by the
/// process handle; the directory is removed when the handle is dropped.
#[derive(Debug, Builder)]
#[builder(
    pattern = "owned",
    setter(into, strip_option),
    build_fn(error = "StoreError")
)]
pub struct StoreCommand {
    pub program: String,
    #[builder(default)]
    #[builder(setter(custom))]
    pub args: Vec<String>,
    #[builder(default)]
    #[builder(setter(custom))]
    pub env: HashMap<String, String>,
    #[builder(default)]
    pub data_dir: Option<TempDir>,
    #[builder(default)]
    pub stdout: StoreStdOut,
    #[builder(default)]
    pub stderr: StoreStdErr,
}

impl StoreCommand {
    pub fn builder() -> StoreCommandBuilder {
        StoreCommandBuilder::default()
    }
}

impl StoreCommandBuilder {
    pub fn args<S: ToString, I: IntoIterator<Item = S>>(mut self, iter: I) -> Self {
        self.args = Some(iter.into_iter().map(|s| s.to_string()).collect());
        self
    }

    pub fn env<T: ToString>(mut self, key: T, value: T) -> Self {
        self.env
            .get_or_insert_with(HashMap::new)
            .insert(key.to_string(), value.to_string());
        self
    }

    pub fn env_multi<T: ToString, I: IntoIterator<Item = (T, T)>>(mut self, iter: I) -> Self {
        let env = self.env.get_or_insert_with(HashMap::new);
        for (key, value) in iter {
            env.insert(key.to_string(), value.to_string());
        }
        self
    }
}

// Default value functions for serde
fn default_timeout_ms() -> u64 {
    30_000
}
fn default_initial_interval_ms() -> u64 {
    100
}
fn default_max_interval_ms() -> u64 {
    1_000
}
