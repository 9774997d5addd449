//! Notification hooks fired by the network transports.
//!
//! Two signals exist: `request_uploaded` fires once the request has been
//! fully sent and its response received, immediately before the
//! [`Response`] is constructed; `response_downloaded` fires right after. Both
//! are best-effort: an observer that returns an error or panics is logged and
//! skipped, and the fetch still succeeds.

use std::error::Error;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, PoisonError, RwLock};

use tracing::{info, warn};

use super::request::{FetchContext, FetchRequest};
use super::response::Response;

/// Error type observers may return. Logged, never propagated.
pub type ObserverError = Box<dyn Error + Send + Sync>;

/// Signal identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal {
    /// The request was sent and the server answered.
    RequestUploaded,
    /// The response body was fully buffered and the response constructed.
    ResponseDownloaded,
}

impl Signal {
    /// Returns the signal name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RequestUploaded => "request_uploaded",
            Self::ResponseDownloaded => "response_downloaded",
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload delivered to observers.
#[derive(Debug, Clone, Copy)]
pub enum Notification<'a> {
    /// Fired with the request that was sent.
    RequestUploaded {
        /// The request as submitted by the caller.
        request: &'a FetchRequest,
    },
    /// Fired with the completed response.
    ResponseDownloaded {
        /// The freshly built response.
        response: &'a Response,
    },
}

impl Notification<'_> {
    /// The signal this payload belongs to.
    #[must_use]
    pub fn signal(&self) -> Signal {
        match self {
            Self::RequestUploaded { .. } => Signal::RequestUploaded,
            Self::ResponseDownloaded { .. } => Signal::ResponseDownloaded,
        }
    }
}

/// Receives transport notifications.
///
/// Observers run synchronously on the fetch task, so they should be quick.
/// Returned errors and panics are isolated: they are logged and do not
/// affect the fetch or other observers.
pub trait FetchObserver: Send + Sync {
    /// Handles one notification. `sender` names the transport (`"http"`,
    /// `"https"`).
    ///
    /// # Errors
    ///
    /// Any error is logged at `warn` level and otherwise ignored.
    fn on_notification(
        &self,
        notification: &Notification<'_>,
        ctx: &FetchContext,
        sender: &str,
    ) -> Result<(), ObserverError>;
}

/// Shared observer registry. Clones share the same observer list.
#[derive(Clone, Default)]
pub struct Signals {
    observers: Arc<RwLock<Vec<Arc<dyn FetchObserver>>>>,
}

impl Signals {
    /// Creates a hub with no observers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an observer for both signals.
    pub fn connect(&self, observer: Arc<dyn FetchObserver>) {
        self.observers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(observer);
    }

    /// Number of registered observers.
    #[must_use]
    pub fn observer_count(&self) -> usize {
        self.observers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Delivers `notification` to every observer, catching and logging
    /// failures. Returns the number of observers that failed.
    pub fn send_catch_log(
        &self,
        notification: &Notification<'_>,
        ctx: &FetchContext,
        sender: &str,
    ) -> usize {
        // Snapshot so observers may connect others without deadlocking
        let observers: Vec<Arc<dyn FetchObserver>> = self
            .observers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        let signal = notification.signal();
        let mut failures = 0;
        for observer in observers {
            let outcome = catch_unwind(AssertUnwindSafe(|| {
                observer.on_notification(notification, ctx, sender)
            }));
            match outcome {
                Ok(Ok(())) => {}
                Ok(Err(error)) => {
                    failures += 1;
                    warn!(signal = %signal, sender, context = %ctx, error = %error, "observer failed");
                }
                Err(panic) => {
                    failures += 1;
                    warn!(
                        signal = %signal,
                        sender,
                        context = %ctx,
                        panic = panic_message(panic.as_ref()),
                        "observer panicked"
                    );
                }
            }
        }
        failures
    }
}

impl fmt::Debug for Signals {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signals")
            .field("observers", &self.observer_count())
            .finish()
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}

/// Observer that logs every notification at `info` level.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogObserver;

impl FetchObserver for LogObserver {
    fn on_notification(
        &self,
        notification: &Notification<'_>,
        ctx: &FetchContext,
        sender: &str,
    ) -> Result<(), ObserverError> {
        match notification {
            Notification::RequestUploaded { request } => {
                info!(
                    sender,
                    context = %ctx,
                    method = %request.method(),
                    url = %request.url(),
                    "request uploaded"
                );
            }
            Notification::ResponseDownloaded { response } => {
                info!(
                    sender,
                    context = %ctx,
                    status = response.status(),
                    kind = %response.kind(),
                    bytes = response.body().len(),
                    url = %response.url(),
                    "response downloaded"
                );
            }
        }
        Ok(())
    }
}
