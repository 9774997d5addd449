//! HTTP and HTTPS transport.
//!
//! Both schemes share [`HttpDownloadHandler`]; the `https` instance only
//! differs in how connect failures are reported. Hosts are resolved through
//! the [`ResolutionCache`] before the request is sent, and the reqwest client
//! is wired to the same cache so the socket connects to the cached address
//! while the URL hostname still travels in `Host` and SNI.

use std::error::Error as StdError;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Client;
use reqwest::redirect::Policy;
use tracing::{debug, instrument};

use super::classify::{ClassifyArgs, classify};
use super::constants::{HTTP_DEFAULT_PORT, HTTPS_DEFAULT_PORT};
use super::dns::{CacheBackedResolve, ResolutionCache};
use super::error::FetchError;
use super::handler::DownloadHandler;
use super::request::{FetchContext, FetchRequest};
use super::response::Response;
use super::signals::{Notification, Signals};
use crate::settings::FetchSettings;
use crate::user_agent;

/// Fetches `http://` and `https://` URLs into fully buffered responses.
///
/// Error statuses (4xx, 5xx) are returned as responses. Redirects are not
/// followed and no proxy is used, so the peer is always the cached address.
#[derive(Debug, Clone)]
pub struct HttpDownloadHandler {
    client: Client,
    cache: Arc<ResolutionCache>,
    signals: Signals,
    secure: bool,
    download_timeout: Duration,
    max_response_bytes: Option<u64>,
}

impl HttpDownloadHandler {
    /// Creates the plain HTTP transport.
    ///
    /// # Errors
    ///
    /// Returns the reqwest error if the client cannot be built.
    pub fn http(
        settings: &FetchSettings,
        cache: Arc<ResolutionCache>,
        signals: Signals,
    ) -> Result<Self, reqwest::Error> {
        Self::build(settings, cache, signals, false)
    }

    /// Creates the HTTPS transport using the default TLS verification.
    ///
    /// # Errors
    ///
    /// Returns the reqwest error if the client (or its TLS backend) cannot
    /// be built.
    #[cfg(feature = "tls")]
    pub fn https(
        settings: &FetchSettings,
        cache: Arc<ResolutionCache>,
        signals: Signals,
    ) -> Result<Self, reqwest::Error> {
        Self::build(settings, cache, signals, true)
    }

    fn build(
        settings: &FetchSettings,
        cache: Arc<ResolutionCache>,
        signals: Signals,
        secure: bool,
    ) -> Result<Self, reqwest::Error> {
        let client = build_client(settings, Arc::clone(&cache))?;
        Ok(Self {
            client,
            cache,
            signals,
            secure,
            download_timeout: settings.download_timeout(),
            max_response_bytes: settings.max_response_bytes,
        })
    }

    /// Returns true for the HTTPS transport.
    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.secure
    }

    fn default_port(&self) -> u16 {
        if self.secure {
            HTTPS_DEFAULT_PORT
        } else {
            HTTP_DEFAULT_PORT
        }
    }

    fn map_request_error(&self, url: &str, timeout: Duration, error: reqwest::Error) -> FetchError {
        if error.is_timeout() {
            FetchError::timeout(url, timeout)
        } else if self.secure && error.is_connect() && !is_tcp_level_failure(&error) {
            FetchError::tls_failed(url, error)
        } else {
            FetchError::connection_failed(url, error)
        }
    }

    async fn read_body(
        &self,
        url: &str,
        timeout: Duration,
        response: reqwest::Response,
    ) -> Result<Vec<u8>, FetchError> {
        if let (Some(limit), Some(declared)) = (self.max_response_bytes, response.content_length())
            && declared > limit
        {
            return Err(FetchError::response_too_large(url, limit));
        }

        let mut body = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| self.map_request_error(url, timeout, e))?;
            if let Some(limit) = self.max_response_bytes {
                let buffered = u64::try_from(body.len() + chunk.len()).unwrap_or(u64::MAX);
                if buffered > limit {
                    return Err(FetchError::response_too_large(url, limit));
                }
            }
            body.extend_from_slice(&chunk);
        }
        Ok(body)
    }
}

fn build_client(settings: &FetchSettings, cache: Arc<ResolutionCache>) -> Result<Client, reqwest::Error> {
    Client::builder()
        .no_proxy()
        .redirect(Policy::none())
        .connect_timeout(settings.connect_timeout())
        .gzip(true)
        .user_agent(user_agent::resolve_user_agent(settings.user_agent.as_deref()))
        .dns_resolver(Arc::new(CacheBackedResolve::new(cache)))
        .build()
}

/// Returns true if the error chain holds a socket-level IO failure.
///
/// TCP connect failures always surface as an `io::Error` with one of these
/// kinds. Anything else during an HTTPS connect happened in the handshake.
/// A reset after TCP is up still matches here, so it maps to a connection
/// failure rather than a TLS one.
fn is_tcp_level_failure(error: &(dyn StdError + 'static)) -> bool {
    let mut current = Some(error);
    while let Some(err) = current {
        if let Some(io_error) = err.downcast_ref::<io::Error>() {
            return matches!(
                io_error.kind(),
                io::ErrorKind::ConnectionRefused
                    | io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
                    | io::ErrorKind::NotConnected
                    | io::ErrorKind::AddrInUse
                    | io::ErrorKind::AddrNotAvailable
                    | io::ErrorKind::TimedOut
                    | io::ErrorKind::NetworkUnreachable
                    | io::ErrorKind::HostUnreachable
            );
        }
        current = err.source();
    }
    false
}

#[async_trait]
impl DownloadHandler for HttpDownloadHandler {
    fn name(&self) -> &'static str {
        if self.secure { "https" } else { "http" }
    }

    #[instrument(
        skip(self, request, ctx),
        fields(url = %request.url(), method = %request.method(), context = %ctx, sender = self.name())
    )]
    async fn download(
        &self,
        request: &FetchRequest,
        ctx: &FetchContext,
    ) -> Result<Response, FetchError> {
        let url = request.url().as_str();
        let Some(host) = request.url().host_str() else {
            return Err(FetchError::invalid_request(url, "URL has no host"));
        };

        let ip = self.cache.resolve(host).await?;
        let port = request.url().port().unwrap_or_else(|| self.default_port());
        debug!(peer = %SocketAddr::new(ip, port), "connecting");

        let timeout = request.timeout().unwrap_or(self.download_timeout);
        let mut outgoing = self
            .client
            .request(request.method().clone(), request.wire_url())
            .headers(request.headers().clone())
            .timeout(timeout);
        if let Some(body) = request.body() {
            outgoing = outgoing.body(body.to_vec());
        }

        let response = outgoing
            .send()
            .await
            .map_err(|e| self.map_request_error(url, timeout, e))?;
        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = self.read_body(url, timeout, response).await?;

        let kind = classify(&ClassifyArgs {
            headers: Some(&headers),
            url: Some(request.url()),
            body: Some(body.as_slice()),
            ..ClassifyArgs::default()
        });

        self.signals
            .send_catch_log(&Notification::RequestUploaded { request }, ctx, self.name());
        let response = Response::new(request.url().clone(), status, headers, body, kind);
        self.signals.send_catch_log(
            &Notification::ResponseDownloaded {
                response: &response,
            },
            ctx,
            self.name(),
        );

        debug!(status, %kind, bytes = response.body().len(), "response buffered");
        Ok(response)
    }
}
