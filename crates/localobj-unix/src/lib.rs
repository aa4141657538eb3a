//! Unix process management for localobj stores: spawning through
//! `tokio::process`, SIGTERM-based shutdown and cancellation watchdogs.

#[cfg(unix)]
mod unix_process_manager;

#[cfg(unix)]
pub use unix_process_manager::{UnixProcessHandle, UnixProcessManager};

#[cfg(unix)]
pub struct UnixProcessManagerFactory;

#[cfg(unix)]
impl localobj_core::StoreProcessManagerFactory for UnixProcessManagerFactory {
    type Manager = UnixProcessManager;

    fn create_process_manager() -> Self::Manager {
        <UnixProcessManager as localobj_core::StoreProcessManager>::new()
    }
}
