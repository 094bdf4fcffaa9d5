//! Driving asynchronous database work from synchronous callers.
//!
//! A [SyncBridge] takes one future and runs it to completion on the calling thread. It is the
//! only place where the synchronous [Database](crate::Database) contract meets the asynchronous
//! `tokio-postgres` driver.

use crate::error::Error;
use std::future::Future;
use tokio::runtime::{Builder, Handle, Runtime};
use tokio::task::JoinHandle;

/// Runs a future to completion and hands its output back to a synchronous caller.
///
/// The output is returned exactly as the future produced it, so a `Result` coming out of the
/// future keeps its error kind. The outer `Result` only reports failures of the bridge itself.
///
/// Implementations run the given future and nothing else: no retries, no timeouts, and never
/// more than one computation per call.
///
/// Calls are not reentrant. `block_on` must not be called from a thread that is already driving
/// asynchronous tasks, such as from inside an `async` block running on a runtime.
pub trait SyncBridge {
    fn block_on<F: Future>(&self, future: F) -> Result<F::Output, Error>;
}

impl<B: SyncBridge> SyncBridge for &B {
    fn block_on<F: Future>(&self, future: F) -> Result<F::Output, Error> {
        (**self).block_on(future)
    }
}

/// A [SyncBridge] backed by a tokio runtime.
///
/// The `tokio-postgres` connection task must be spawned on the same runtime (see
/// [TokioBridge::spawn]). With the default current-thread runtime that task only makes progress
/// while the bridge is driving a unit of work, which is exactly when it is needed.
#[derive(Debug)]
pub struct TokioBridge {
    driver: Driver,
}

#[derive(Debug)]
enum Driver {
    Owned(Runtime),
    Shared(Handle),
}

impl TokioBridge {
    /// Create a bridge with its own current-thread runtime.
    pub fn new() -> Result<Self, Error> {
        let runtime = Builder::new_current_thread().enable_all().build()?;
        Ok(Self::from_runtime(runtime))
    }

    /// Create a bridge that owns an already configured runtime.
    pub fn from_runtime(runtime: Runtime) -> Self {
        Self {
            driver: Driver::Owned(runtime),
        }
    }

    /// Create a bridge over a runtime owned elsewhere.
    ///
    /// The runtime should be multi-threaded: a current-thread runtime reached through a
    /// [Handle] cannot drive its IO driver, so spawned connection tasks would stall.
    pub fn from_handle(handle: Handle) -> Self {
        Self {
            driver: Driver::Shared(handle),
        }
    }

    pub fn handle(&self) -> Handle {
        match &self.driver {
            Driver::Owned(runtime) => runtime.handle().clone(),
            Driver::Shared(handle) => handle.clone(),
        }
    }

    /// Spawn a background task on the bridge's runtime.
    ///
    /// Used for the connection half returned by `tokio_postgres::connect`.
    pub fn spawn<F>(&self, future: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        self.handle().spawn(future)
    }
}

impl SyncBridge for TokioBridge {
    /// Blocking is allowed from plain threads, `spawn_blocking` threads and threads that merely
    /// hold a runtime `enter()` guard.
    ///
    /// # Panics
    ///
    /// Panics when called from inside a task or `block_on` of any tokio runtime, as tokio does.
    fn block_on<F: Future>(&self, future: F) -> Result<F::Output, Error> {
        let output = match &self.driver {
            Driver::Owned(runtime) => runtime.block_on(future),
            Driver::Shared(handle) => handle.block_on(future),
        };
        Ok(output)
    }
}
