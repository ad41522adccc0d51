//! Where session futures run.

use std::future::Future;

/// How each accepted connection's session is driven.
///
/// Chosen once at startup from [`ServerConfig::use_os_threads`](crate::ServerConfig).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TaskSpawner {
    /// A tokio task on the shared runtime.
    #[default]
    Tasks,
    /// A named OS thread that blocks on the future using the current
    /// runtime's handle.
    Threads,
}

impl TaskSpawner {
    /// Starts `fut` and returns immediately.
    ///
    /// Must be called from within a tokio runtime. If an OS thread cannot
    /// be created the future is dropped (which closes its connection) and
    /// a warning is logged.
    pub fn spawn<F>(self, name: String, fut: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        match self {
            Self::Tasks => {
                tokio::spawn(fut);
            }
            Self::Threads => {
                let handle = tokio::runtime::Handle::current();
                let spawned = std::thread::Builder::new()
                    .name(name.clone())
                    .spawn(move || handle.block_on(fut));
                if let Err(e) = spawned {
                    tracing::warn!(thread = %name, error = %e, "could not start session thread");
                }
            }
        }
    }
}
