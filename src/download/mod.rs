//! Scheme-dispatched download core.
//!
//! A [`FetchRequest`] goes in through [`Dispatcher::fetch`] and a
//! [`PendingFetch`] comes back, settling with a fully buffered [`Response`]
//! or a [`FetchError`].
//!
//! # Features
//!
//! - `http`, `https` (with the `tls` cargo feature), and `file` transports
//! - Hostname resolution memoized in an injectable [`ResolutionCache`]
//! - Content classification into [`ResponseKind`] from headers, names, and bodies
//! - `request_uploaded` / `response_downloaded` notifications with isolated observers
//! - Per-request timeouts and cancellation through [`PendingFetch`]
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use fetcher_core::download::{
//!     Dispatcher, FetchContext, FetchRequest, LogObserver, ResolutionCache, Signals,
//! };
//! use fetcher_core::settings::FetchSettings;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let signals = Signals::new();
//! signals.connect(Arc::new(LogObserver));
//! let dispatcher = Dispatcher::new(
//!     FetchSettings::default(),
//!     Arc::new(ResolutionCache::system()),
//!     signals,
//! )?;
//!
//! let response = dispatcher
//!     .fetch(FetchRequest::parse("file:///etc/hostname")?, FetchContext::new("example"))
//!     .await?;
//! println!("{}", response.text());
//! # Ok(())
//! # }
//! ```

mod classify;
pub(crate) mod constants;
mod dispatcher;
mod dns;
mod error;
mod file;
mod handler;
mod http;
mod pending;
mod request;
mod response;
mod signals;

pub use classify::{ClassifyArgs, classify, classify_strict};
pub use dispatcher::{Dispatcher, DispatcherError};
pub use dns::{HostResolver, ResolutionCache, ResolvedHost, SystemResolver};
pub use error::{FetchError, FetchErrorKind};
pub use file::FileDownloadHandler;
pub use handler::DownloadHandler;
pub use http::HttpDownloadHandler;
pub use pending::{CancelHandle, PendingFetch};
pub use request::{FetchContext, FetchRequest};
pub use response::{Response, ResponseKind};
pub use signals::{FetchObserver, LogObserver, Notification, ObserverError, Signal, Signals};

// No module-local Result alias: signatures spell out `Result<T, FetchError>`.
