use localobj_core::StoreProcessManagerFactory;

/// Platform-independent factory that selects the appropriate implementation at compile time
pub struct PlatformStoreProcessManagerFactory;

impl StoreProcessManagerFactory for PlatformStoreProcessManagerFactory {
    #[cfg(unix)]
    type Manager = localobj_unix::UnixProcessManager;

    fn create_process_manager() -> Self::Manager {
        #[cfg(unix)]
        return localobj_unix::UnixProcessManagerFactory::create_process_manager();
    }
}

#[cfg(not(unix))]
compile_error!("Unsupported platform: localobj stores are only supported on Unix");

/// Process manager used by stores on the current platform
pub type PlatformStoreProcessManager =
    <PlatformStoreProcessManagerFactory as StoreProcessManagerFactory>::Manager;
