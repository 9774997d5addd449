//! The pending result handed back by [`Dispatcher::fetch`](super::Dispatcher::fetch).

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::task::{AbortHandle, JoinError, JoinHandle};
use tracing::debug;

use super::error::FetchError;
use super::response::Response;

/// A fetch in progress.
///
/// Await it to get the outcome. Every fetch settles exactly once: with a
/// [`Response`], with the transport's [`FetchError`], or with
/// [`FetchError::Cancelled`] if it was cancelled first.
///
/// Dropping a `PendingFetch` cancels the underlying task.
#[derive(Debug)]
pub struct PendingFetch {
    url: String,
    state: State,
}

#[derive(Debug)]
enum State {
    /// Settled before any task was spawned. `None` once taken.
    Ready(Option<Result<Response, FetchError>>),
    Running(JoinHandle<Result<Response, FetchError>>),
}

impl PendingFetch {
    pub(crate) fn settled(url: impl Into<String>, outcome: Result<Response, FetchError>) -> Self {
        Self {
            url: url.into(),
            state: State::Ready(Some(outcome)),
        }
    }

    pub(crate) fn running(url: impl Into<String>, handle: JoinHandle<Result<Response, FetchError>>) -> Self {
        Self {
            url: url.into(),
            state: State::Running(handle),
        }
    }

    /// The URL being fetched.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Returns true once the outcome is available without waiting.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        match &self.state {
            State::Ready(_) => true,
            State::Running(handle) => handle.is_finished(),
        }
    }

    /// Requests cancellation. The transport stops at its next suspension
    /// point and the result settles with [`FetchError::Cancelled`].
    /// No-op if the fetch already completed.
    pub fn cancel(&self) {
        if let State::Running(handle) = &self.state {
            debug!(url = %self.url, "cancelling fetch");
            handle.abort();
        }
    }

    /// Returns a handle that can cancel this fetch from elsewhere.
    #[must_use]
    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            inner: match &self.state {
                State::Ready(_) => None,
                State::Running(handle) => Some(handle.abort_handle()),
            },
        }
    }
}

fn join_outcome(url: &str, joined: Result<Result<Response, FetchError>, JoinError>) -> Result<Response, FetchError> {
    match joined {
        Ok(outcome) => outcome,
        Err(error) if error.is_cancelled() => Err(FetchError::cancelled(url)),
        Err(error) => Err(FetchError::task_failed(url, error.to_string())),
    }
}

impl Future for PendingFetch {
    type Output = Result<Response, FetchError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        match &mut this.state {
            // Polling again after completion never resolves
            State::Ready(outcome) => outcome.take().map_or(Poll::Pending, Poll::Ready),
            State::Running(handle) => Pin::new(handle)
                .poll(cx)
                .map(|joined| join_outcome(&this.url, joined)),
        }
    }
}

impl Drop for PendingFetch {
    fn drop(&mut self) {
        if let State::Running(handle) = &self.state {
            handle.abort();
        }
    }
}

/// Cloneable handle that cancels a [`PendingFetch`].
#[derive(Debug, Clone)]
pub struct CancelHandle {
    inner: Option<AbortHandle>,
}

impl CancelHandle {
    /// Cancels the fetch. No-op if it already completed.
    pub fn cancel(&self) {
        if let Some(handle) = &self.inner {
            handle.abort();
        }
    }

    /// Returns true once the fetch has completed or been cancelled.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.inner.as_ref().is_none_or(AbortHandle::is_finished)
    }
}
