// src/core/processor/mod.rs

//! The seam between the connection manager and application request handling.

mod echo;

pub use echo::EchoProcessor;

use crate::core::errors::SpinelRpcError;
use crate::core::protocol::Protocol;
use std::fmt;
use std::sync::Arc;

/// Reports the outcome of a processor run for one connection.
///
/// The callback may be cloned, moved to another task, and called any number of
/// times. `call(false)` evicts the connection it was created for; `call(true)`
/// leaves it open for further requests.
#[derive(Clone)]
pub struct CompletionCallback {
    inner: Arc<dyn Fn(bool) + Send + Sync>,
}

impl CompletionCallback {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(bool) + Send + Sync + 'static,
    {
        Self { inner: Arc::new(f) }
    }

    pub fn call(&self, healthy: bool) {
        (self.inner)(healthy)
    }
}

impl fmt::Debug for CompletionCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionCallback").finish_non_exhaustive()
    }
}

/// An asynchronous request processor.
///
/// `process` is invoked on the event loop each time a connection becomes
/// readable. It decides how much protocol data makes one request, must not
/// block, and reports completion through `cob` either before returning or later
/// from any task. Returning `Err` evicts the connection; a
/// [`SpinelRpcError::Transport`] error is reported separately from the rest.
pub trait AsyncProcessor: Send + Sync {
    fn process(
        &self,
        cob: CompletionCallback,
        input: Arc<dyn Protocol>,
        output: Arc<dyn Protocol>,
    ) -> Result<(), SpinelRpcError>;
}
