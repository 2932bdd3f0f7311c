//! Handles to the background login tasks.

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;

use futures_util::FutureExt;
use gatekeep_session::ResolveError;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::GatekeepError;

/// A spawned name-check or verification task.
///
/// The host framework only needs fire-and-forget, so it may drop this
/// handle; the task keeps running. Tests and embedders that want to
/// observe completion await [`outcome`](Self::outcome).
///
/// Aborting a task drops its delivery hold, which releases the held
/// packet.
pub struct LoginTask<T> {
    handle: JoinHandle<T>,
}

impl<T: Send + 'static> LoginTask<T> {
    pub(crate) fn spawn<F>(runtime: &Handle, task: F) -> Self
    where
        F: Future<Output = T> + Send + 'static,
    {
        Self {
            handle: runtime.spawn(task),
        }
    }
}

impl<T> LoginTask<T> {
    /// Waits for the task and returns what it decided.
    ///
    /// # Errors
    /// [`GatekeepError::Task`] if the task panicked or was aborted.
    pub async fn outcome(self) -> Result<T, GatekeepError> {
        Ok(self.handle.await?)
    }

    /// Cancels the task.
    pub fn abort(&self) {
        self.handle.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl<T> fmt::Debug for LoginTask<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginTask")
            .field("finished", &self.handle.is_finished())
            .finish()
    }
}

/// Awaits a profile resolver call, turning a panic inside it into
/// [`ResolveError::Unavailable`] so the task still reaches its offline or
/// deny path.
pub(crate) async fn guard_resolver<T, F>(call: F) -> Result<T, ResolveError>
where
    F: Future<Output = Result<T, ResolveError>>,
{
    match AssertUnwindSafe(call).catch_unwind().await {
        Ok(result) => result,
        Err(payload) => Err(ResolveError::Unavailable(format!(
            "profile resolver panicked: {}",
            panic_message(&*payload)
        ))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        *message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string payload"
    }
}
