//! Routing of store subprocess output into shareable async sinks.

use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;
use tokio_stream::StreamExt;
use tokio_util::codec::{BytesCodec, FramedRead};
use tracing::warn;

type SharedWriter = Arc<Mutex<Box<dyn AsyncWrite + Unpin + Sync + Send>>>;

#[derive(Clone, derive_more::From)]
pub enum StoreStdio {
    Out(StoreStdOut),
    Err(StoreStdErr),
}

impl StoreStdio {
    pub fn inner(&self) -> SharedWriter {
        match self {
            StoreStdio::Out(out) => out.inner(),
            StoreStdio::Err(err) => err.inner(),
        }
    }
}

/// Destination for the store process' standard output
#[derive(Clone)]
pub struct StoreStdOut(SharedWriter);

impl StoreStdOut {
    pub fn new(t: Box<dyn AsyncWrite + Unpin + Sync + Send>) -> StoreStdOut {
        StoreStdOut(Arc::new(Mutex::new(t)))
    }

    pub fn inner(&self) -> SharedWriter {
        self.0.clone()
    }
}

impl Default for StoreStdOut {
    fn default() -> Self {
        Self::new(Box::new(tokio::io::stdout()))
    }
}

impl std::fmt::Debug for StoreStdOut {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("StoreStdOut")
    }
}

/// Destination for the store process' standard error
#[derive(Clone)]
pub struct StoreStdErr(SharedWriter);

impl StoreStdErr {
    pub fn new(t: Box<dyn AsyncWrite + Unpin + Sync + Send>) -> StoreStdErr {
        StoreStdErr(Arc::new(Mutex::new(t)))
    }

    pub fn inner(&self) -> SharedWriter {
        self.0.clone()
    }
}

impl Default for StoreStdErr {
    fn default() -> Self {
        Self::new(Box::new(tokio::io::stderr()))
    }
}

impl std::fmt::Debug for StoreStdErr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("StoreStdErr")
    }
}

/// Forward everything read from `io` into `out` until EOF.
///
/// Bytes are passed through untouched. Once the sink fails, the rest of the
/// input is still read and discarded so the writing process never sees a
/// closed pipe.
pub async fn stream<A: AsyncRead + Unpin>(
    io: A,
    out: impl Into<StoreStdio>,
) -> tokio::io::Result<()> {
    let mut frames = FramedRead::with_capacity(io, BytesCodec::new(), 1024);
    let out = out.into();
    let mut sink_open = true;

    while let Some(frame) = frames.next().await {
        let bytes = frame?;
        if !sink_open {
            continue;
        }

        let writer = out.inner();
        let mut writer = writer.lock().await;
        let written = match writer.write_all(&bytes).await {
            Ok(()) => writer.flush().await,
            Err(e) => Err(e),
        };
        if let Err(e) = written {
            warn!(error = %e, "Store output sink failed, discarding further output");
            sink_open = false;
        }
    }

    Ok(())
}
