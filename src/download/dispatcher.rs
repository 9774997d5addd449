//! Scheme-based dispatch of fetch requests to transports.
//!
//! The [`Dispatcher`] owns a registry mapping URL schemes to
//! [`DownloadHandler`]s. Routing happens synchronously inside
//! [`Dispatcher::fetch`]: requests for unknown or unavailable schemes settle
//! immediately without spawning a task or touching the network. Everything
//! else runs on its own tokio task under the effective timeout.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use fetcher_core::download::{Dispatcher, FetchContext, FetchRequest, ResolutionCache, Signals};
//! use fetcher_core::settings::FetchSettings;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let dispatcher = Dispatcher::new(
//!     FetchSettings::default(),
//!     Arc::new(ResolutionCache::system()),
//!     Signals::new(),
//! )?;
//! let request = FetchRequest::parse("http://example.com/data.json")?;
//! let response = dispatcher.fetch(request, FetchContext::new("docs")).await?;
//! println!("{} {} bytes ({})", response.status(), response.body().len(), response.kind());
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::{Instrument, debug, info_span, instrument, warn};

use super::dns::ResolutionCache;
use super::error::FetchError;
use super::file::FileDownloadHandler;
use super::handler::DownloadHandler;
use super::http::HttpDownloadHandler;
use super::pending::PendingFetch;
use super::request::{FetchContext, FetchRequest};
use super::signals::Signals;
use crate::settings::{FetchSettings, SettingsError};

/// Errors raised while building a [`Dispatcher`].
#[derive(Debug, thiserror::Error)]
pub enum DispatcherError {
    /// The settings failed validation.
    #[error("invalid settings: {0}")]
    Settings(#[from] SettingsError),

    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(#[from] reqwest::Error),
}

/// A registry entry.
enum HandlerSlot {
    Available(Arc<dyn DownloadHandler>),
    /// The scheme is known but cannot be served; names what is missing.
    Unavailable { capability: String },
}

/// Routes requests to transports by URL scheme.
///
/// Cheap to share behind an `Arc`; `fetch` takes `&self`.
pub struct Dispatcher {
    handlers: HashMap<String, HandlerSlot>,
    settings: FetchSettings,
    cache: Arc<ResolutionCache>,
    signals: Signals,
}

impl Dispatcher {
    /// Builds a dispatcher with the `http`, `https`, and `file` transports.
    ///
    /// `https` is available only when the crate is built with the `tls`
    /// feature and `settings.tls_enabled` is set; otherwise requests for it
    /// fail with [`FetchError::UnsupportedTransport`].
    ///
    /// # Errors
    ///
    /// Returns [`DispatcherError`] if the settings are invalid or an HTTP
    /// client cannot be built.
    #[instrument(level = "debug", skip_all)]
    pub fn new(
        settings: FetchSettings,
        cache: Arc<ResolutionCache>,
        signals: Signals,
    ) -> Result<Self, DispatcherError> {
        settings.validate()?;

        let mut handlers = HashMap::new();
        handlers.insert(
            "http".to_string(),
            HandlerSlot::Available(Arc::new(HttpDownloadHandler::http(
                &settings,
                Arc::clone(&cache),
                signals.clone(),
            )?)),
        );
        handlers.insert(
            "https".to_string(),
            https_slot(&settings, &cache, &signals)?,
        );
        handlers.insert(
            "file".to_string(),
            HandlerSlot::Available(Arc::new(FileDownloadHandler::new())),
        );

        let dispatcher = Self {
            handlers,
            settings,
            cache,
            signals,
        };
        debug!(schemes = ?dispatcher.schemes(), "dispatcher ready");
        Ok(dispatcher)
    }

    /// Registers (or replaces) the transport for `scheme`.
    pub fn register(&mut self, scheme: impl Into<String>, handler: Arc<dyn DownloadHandler>) {
        let scheme = scheme.into();
        debug!(scheme = %scheme, handler = handler.name(), "registering transport");
        self.handlers.insert(scheme, HandlerSlot::Available(handler));
    }

    /// Marks `scheme` as known but unavailable, naming the missing capability.
    pub fn mark_unavailable(&mut self, scheme: impl Into<String>, capability: impl Into<String>) {
        self.handlers.insert(
            scheme.into(),
            HandlerSlot::Unavailable {
                capability: capability.into(),
            },
        );
    }

    /// Sorted list of every registered scheme, available or not.
    #[must_use]
    pub fn schemes(&self) -> Vec<&str> {
        let mut schemes: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        schemes.sort_unstable();
        schemes
    }

    /// Returns true if `scheme` has a usable transport.
    #[must_use]
    pub fn supports(&self, scheme: &str) -> bool {
        matches!(self.handlers.get(scheme), Some(HandlerSlot::Available(_)))
    }

    /// The shared resolution cache.
    #[must_use]
    pub fn resolution_cache(&self) -> &Arc<ResolutionCache> {
        &self.cache
    }

    /// The notification hub transports report to.
    #[must_use]
    pub fn signals(&self) -> &Signals {
        &self.signals
    }

    /// The settings this dispatcher was built with.
    #[must_use]
    pub fn settings(&self) -> &FetchSettings {
        &self.settings
    }

    /// Starts fetching `request` and returns its pending result.
    ///
    /// The routing decision is made before this returns: unsupported
    /// schemes yield an already-settled [`PendingFetch`]. Must be called
    /// from within a tokio runtime.
    pub fn fetch(&self, request: FetchRequest, ctx: FetchContext) -> PendingFetch {
        let url = request.url().to_string();
        let scheme = request.scheme();

        let handler = match self.handlers.get(scheme) {
            Some(HandlerSlot::Available(handler)) => Arc::clone(handler),
            Some(HandlerSlot::Unavailable { capability }) => {
                warn!(scheme, url = %url, capability = %capability, "transport unavailable");
                let error = FetchError::unsupported_transport(scheme, &url, capability);
                return PendingFetch::settled(url, Err(error));
            }
            None => {
                warn!(scheme, url = %url, "no transport for scheme");
                let error = FetchError::unsupported_scheme(scheme, &url);
                return PendingFetch::settled(url, Err(error));
            }
        };

        let timeout = self.settings.effective_timeout(&request);
        let span = info_span!("fetch", url = %url, handler = handler.name(), context = %ctx);
        let task_url = url.clone();
        let task = tokio::spawn(
            async move {
                match tokio::time::timeout(timeout, handler.download(&request, &ctx)).await {
                    Ok(outcome) => outcome,
                    Err(_) => {
                        debug!(?timeout, "fetch timed out");
                        Err(FetchError::timeout(task_url, timeout))
                    }
                }
            }
            .instrument(span),
        );
        PendingFetch::running(url, task)
    }
}

#[cfg(feature = "tls")]
fn https_slot(
    settings: &FetchSettings,
    cache: &Arc<ResolutionCache>,
    signals: &Signals,
) -> Result<HandlerSlot, DispatcherError> {
    if settings.tls_enabled {
        let handler = HttpDownloadHandler::https(settings, Arc::clone(cache), signals.clone())?;
        Ok(HandlerSlot::Available(Arc::new(handler)))
    } else {
        Ok(HandlerSlot::Unavailable {
            capability: "TLS support (disabled by `tls_enabled = false`)".to_string(),
        })
    }
}

#[cfg(not(feature = "tls"))]
fn https_slot(
    _settings: &FetchSettings,
    _cache: &Arc<ResolutionCache>,
    _signals: &Signals,
) -> Result<HandlerSlot, DispatcherError> {
    Ok(HandlerSlot::Unavailable {
        capability: "TLS support (built without the `tls` feature)".to_string(),
    })
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("schemes", &self.schemes())
            .field("settings", &self.settings)
            .field("cache", &self.cache)
            .field("signals", &self.signals)
            .finish()
    }
}
