use localobj_core::StoreError;
use std::net::TcpListener;
use tracing::debug;

/// Ask the OS for a currently unused TCP port.
///
/// The listener is released before returning, so another process may claim
/// the port before the store binds it. Good enough for tests.
pub fn allocate_port() -> Result<u16, StoreError> {
    let listener = TcpListener::bind(("0.0.0.0", 0)).map_err(StoreError::PortAllocation)?;
    let port = listener
        .local_addr()
        .map_err(StoreError::PortAllocation)?
        .port();
    debug!(port, "Allocated port for local store");
    Ok(port)
}
