use aws_sdk_s3::Client;
use aws_sdk_s3::config::retry::RetryConfig;
use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};

/// Everything needed to talk to a running store. Building a client from these
/// options performs no network I/O.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientOptions {
    pub endpoint: String,
    pub force_path_style: bool,
    pub access_key_id: String,
    pub secret_access_key: String,
    /// Empty means no session token
    pub session_token: String,
    pub region: String,
}

impl ClientOptions {
    /// Options for a store listening on `localhost:<port>` with path-style addressing
    pub fn localhost(port: u16, access_key_id: &str, secret_access_key: &str, region: &str) -> Self {
        Self {
            endpoint: format!("http://localhost:{port}"),
            force_path_style: true,
            access_key_id: access_key_id.to_string(),
            secret_access_key: secret_access_key.to_string(),
            session_token: String::new(),
            region: region.to_string(),
        }
    }

    fn credentials(&self) -> Credentials {
        let session_token = (!self.session_token.is_empty()).then(|| self.session_token.clone());
        Credentials::new(
            &self.access_key_id,
            &self.secret_access_key,
            session_token,
            None,
            "localobj",
        )
    }

    pub fn sdk_config(&self) -> aws_sdk_s3::Config {
        self.sdk_config_builder().build()
    }

    fn sdk_config_builder(&self) -> aws_sdk_s3::config::Builder {
        aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(self.region.clone()))
            .endpoint_url(&self.endpoint)
            .credentials_provider(self.credentials())
            .force_path_style(self.force_path_style)
    }

    /// Build a ready-to-use S3 client
    pub fn build_client(&self) -> Client {
        Client::from_conf(self.sdk_config())
    }

    /// Client used by the readiness poller. SDK-level retries are disabled so
    /// a single probe fails fast and the poller owns the backoff.
    pub(crate) fn probe_client(&self) -> Client {
        Client::from_conf(
            self.sdk_config_builder()
                .retry_config(RetryConfig::disabled())
                .build(),
        )
    }
}
