//! Spawn and supervise a local S3-compatible object store for integration tests.
//!
//! MinIO is the default backend; any S3-compatible server can be plugged in
//! through [`StoreBackend`] or the closure-based [`StoreOptions`].
//!
//! ```rust,no_run
//! use localobj::CancellationToken;
//!
//! # async fn example() -> Result<(), localobj::StoreError> {
//! let token = CancellationToken::new();
//! let mut store = localobj::start_default_store(&token).await?;
//!
//! let client = store.new_client()?;
//! client.list_buckets().send().await.ok();
//!
//! store.graceful_shutdown().await?;
//! # Ok(())
//! # }
//! ```

mod factory;
mod minio;
mod port;

pub use factory::{PlatformStoreProcessManager, PlatformStoreProcessManagerFactory};
pub use minio::*;
pub use port::allocate_port;

// Re-export core functionality
pub use localobj_core::*;

use std::sync::Arc;
use tracing::info;

/// A store supervised by the current platform's process manager
pub type LocalStore<B = StoreOptions> = Store<B, PlatformStoreProcessManager>;

/// Create an unstarted store for `backend`
pub fn new_store<B: StoreBackend>(backend: B) -> Result<LocalStore<B>, StoreError> {
    let manager = PlatformStoreProcessManagerFactory::create_process_manager();
    Store::new(backend, Arc::new(manager))
}

/// Create a store for `backend`, start it and wait until it is ready.
///
/// If the store does not become ready it is shut down before the error is returned.
pub async fn start_store<B: StoreBackend>(
    backend: B,
    token: &CancellationToken,
) -> Result<LocalStore<B>, StoreError> {
    let mut store = new_store(backend)?;
    store.start_and_wait(token).await?;
    Ok(store)
}

/// Unstarted MinIO store on a freshly allocated port
pub fn new_default_store() -> Result<LocalStore<MinioBackend>, StoreError> {
    let port = allocate_port()?;
    info!(port, "Creating default MinIO store");
    new_store(MinioBackend::new(port))
}

/// MinIO store on a freshly allocated port, started and ready to serve requests
pub async fn start_default_store(
    token: &CancellationToken,
) -> Result<LocalStore<MinioBackend>, StoreError> {
    let mut store = new_default_store()?;
    store.start_and_wait(token).await?;
    Ok(store)
}
