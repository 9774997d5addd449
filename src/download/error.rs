//! Error types for the download module.
//!
//! Every fetch settles with either a [`Response`](super::Response) or a
//! [`FetchError`]. Variants carry the context needed to diagnose the failure
//! (URL, host, or path) and expose the underlying cause through
//! [`std::error::Error::source`].

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Coarse classification of a [`FetchError`].
///
/// Callers above the core (retry middleware, stats) should match on this
/// rather than on the variant payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetchErrorKind {
    /// The URL scheme has no registered transport.
    UnsupportedScheme,
    /// The scheme is known but its transport is not compiled in or enabled.
    UnsupportedTransport,
    /// Hostname resolution failed.
    DnsFailed,
    /// The TCP connection failed or broke while reading the response.
    ConnectionFailed,
    /// The TLS handshake failed.
    ///
    /// An HTTPS connect error counts as TLS only when its cause chain holds
    /// no socket-level IO error. A peer that accepts TCP and then resets or
    /// aborts mid-handshake is reported as [`Self::ConnectionFailed`].
    TlsFailed,
    /// The effective timeout elapsed.
    Timeout,
    /// A local file could not be opened or read.
    FileAccessFailed,
    /// No classification rule matched (non-fatal; only surfaced by strict classification).
    ClassificationAmbiguous,
    /// The request could not be turned into a wire request.
    InvalidRequest,
    /// The response body exceeded the configured size limit.
    ResponseTooLarge,
    /// The caller cancelled the fetch.
    Cancelled,
    /// The fetch task panicked.
    TaskFailed,
}

impl FetchErrorKind {
    /// Returns the stable string label for logs and output.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::UnsupportedScheme => "unsupported_scheme",
            Self::UnsupportedTransport => "unsupported_transport",
            Self::DnsFailed => "dns_failed",
            Self::ConnectionFailed => "connection_failed",
            Self::TlsFailed => "tls_failed",
            Self::Timeout => "timeout",
            Self::FileAccessFailed => "file_access_failed",
            Self::ClassificationAmbiguous => "classification_ambiguous",
            Self::InvalidRequest => "invalid_request",
            Self::ResponseTooLarge => "response_too_large",
            Self::Cancelled => "cancelled",
            Self::TaskFailed => "task_failed",
        }
    }
}

impl fmt::Display for FetchErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can occur while fetching a request.
#[derive(Debug, Error)]
pub enum FetchError {
    /// No transport is registered for the URL scheme.
    #[error("unsupported URL scheme '{scheme}' in: <{url}>")]
    UnsupportedScheme {
        /// The offending scheme.
        scheme: String,
        /// The full request URL.
        url: String,
    },

    /// The transport for this scheme is unavailable in this build or configuration.
    #[error("{scheme} not supported for <{url}>: {capability} is not available")]
    UnsupportedTransport {
        /// The scheme whose transport is missing.
        scheme: String,
        /// The full request URL.
        url: String,
        /// The missing capability.
        capability: String,
    },

    /// Hostname resolution failed.
    #[error("DNS lookup failed for {host}: {source}")]
    DnsFailed {
        /// The hostname that failed to resolve.
        host: String,
        /// The underlying resolver error.
        #[source]
        source: std::io::Error,
    },

    /// Network-level failure (connection refused, reset, broken body stream).
    #[error("connection failed fetching {url}: {source}")]
    ConnectionFailed {
        /// The URL that failed.
        url: String,
        /// The underlying HTTP client error.
        #[source]
        source: reqwest::Error,
    },

    /// TLS handshake failed. See [`FetchErrorKind::TlsFailed`] for how this
    /// is told apart from a broken connection.
    #[error("TLS handshake failed fetching {url}: {source}")]
    TlsFailed {
        /// The URL that failed.
        url: String,
        /// The underlying HTTP client error.
        #[source]
        source: reqwest::Error,
    },

    /// The fetch did not settle within its effective timeout.
    #[error("timeout after {timeout:?} fetching {url}")]
    Timeout {
        /// The URL that timed out.
        url: String,
        /// The effective timeout that elapsed.
        timeout: Duration,
    },

    /// A local file could not be read.
    #[error("cannot read {path}: {source}")]
    FileAccessFailed {
        /// The filesystem path taken from the URL.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// No classification rule matched the response.
    #[error("cannot determine response kind for {target}")]
    ClassificationAmbiguous {
        /// The URL or filename being classified.
        target: String,
    },

    /// The request is malformed (bad URL, no host, bad header).
    #[error("invalid request {url}: {reason}")]
    InvalidRequest {
        /// The request URL as given.
        url: String,
        /// What is wrong with it.
        reason: String,
    },

    /// The response body exceeded `max_response_bytes`.
    #[error("response from {url} exceeds {limit} bytes")]
    ResponseTooLarge {
        /// The URL being downloaded.
        url: String,
        /// The configured limit.
        limit: u64,
    },

    /// The fetch was cancelled before it settled.
    #[error("fetch cancelled: {url}")]
    Cancelled {
        /// The URL whose fetch was cancelled.
        url: String,
    },

    /// The fetch task panicked.
    #[error("fetch task failed for {url}: {message}")]
    TaskFailed {
        /// The URL being fetched.
        url: String,
        /// Panic description from the runtime.
        message: String,
    },
}

impl FetchError {
    /// Creates an unsupported-scheme error.
    pub fn unsupported_scheme(scheme: impl Into<String>, url: impl Into<String>) -> Self {
        Self::UnsupportedScheme {
            scheme: scheme.into(),
            url: url.into(),
        }
    }

    /// Creates an unsupported-transport error naming the missing capability.
    pub fn unsupported_transport(
        scheme: impl Into<String>,
        url: impl Into<String>,
        capability: impl Into<String>,
    ) -> Self {
        Self::UnsupportedTransport {
            scheme: scheme.into(),
            url: url.into(),
            capability: capability.into(),
        }
    }

    /// Creates a DNS failure error.
    pub fn dns_failed(host: impl Into<String>, source: std::io::Error) -> Self {
        Self::DnsFailed {
            host: host.into(),
            source,
        }
    }

    /// Creates a connection failure error.
    pub fn connection_failed(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::ConnectionFailed {
            url: url.into(),
            source,
        }
    }

    /// Creates a TLS failure error.
    pub fn tls_failed(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::TlsFailed {
            url: url.into(),
            source,
        }
    }

    /// Creates a timeout error.
    pub fn timeout(url: impl Into<String>, timeout: Duration) -> Self {
        Self::Timeout {
            url: url.into(),
            timeout,
        }
    }

    /// Creates a file access error.
    pub fn file_access(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileAccessFailed {
            path: path.into(),
            source,
        }
    }

    /// Creates an ambiguous-classification error.
    pub fn classification_ambiguous(target: impl Into<String>) -> Self {
        Self::ClassificationAmbiguous {
            target: target.into(),
        }
    }

    /// Creates an invalid-request error.
    pub fn invalid_request(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidRequest {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Creates a response-too-large error.
    pub fn response_too_large(url: impl Into<String>, limit: u64) -> Self {
        Self::ResponseTooLarge {
            url: url.into(),
            limit,
        }
    }

    /// Creates a cancellation error.
    pub fn cancelled(url: impl Into<String>) -> Self {
        Self::Cancelled { url: url.into() }
    }

    /// Creates a task failure error.
    pub fn task_failed(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::TaskFailed {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Returns the taxonomy kind of this error.
    #[must_use]
    pub fn kind(&self) -> FetchErrorKind {
        match self {
            Self::UnsupportedScheme { .. } => FetchErrorKind::UnsupportedScheme,
            Self::UnsupportedTransport { .. } => FetchErrorKind::UnsupportedTransport,
            Self::DnsFailed { .. } => FetchErrorKind::DnsFailed,
            Self::ConnectionFailed { .. } => FetchErrorKind::ConnectionFailed,
            Self::TlsFailed { .. } => FetchErrorKind::TlsFailed,
            Self::Timeout { .. } => FetchErrorKind::Timeout,
            Self::FileAccessFailed { .. } => FetchErrorKind::FileAccessFailed,
            Self::ClassificationAmbiguous { .. } => FetchErrorKind::ClassificationAmbiguous,
            Self::InvalidRequest { .. } => FetchErrorKind::InvalidRequest,
            Self::ResponseTooLarge { .. } => FetchErrorKind::ResponseTooLarge,
            Self::Cancelled { .. } => FetchErrorKind::Cancelled,
            Self::TaskFailed { .. } => FetchErrorKind::TaskFailed,
        }
    }

    /// Returns true if the error was detected before any I/O was attempted.
    #[must_use]
    pub fn is_rejected_upfront(&self) -> bool {
        matches!(
            self.kind(),
            FetchErrorKind::UnsupportedScheme
                | FetchErrorKind::UnsupportedTransport
                | FetchErrorKind::InvalidRequest
        )
    }
}

// Like the rest of the download module, no `From<reqwest::Error>` or
// `From<std::io::Error>` impls: every variant needs a URL, host, or path that
// the source error does not carry.
